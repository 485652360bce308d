//! Key model
//!
//! Object keys are flat strings that double as paths: a key ending in the
//! separator is a folder, anything else is a file. Nothing here does I/O.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator between key segments
pub const SEPARATOR: char = '/';

/// Kind of an entry in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// A remote key together with its derived name and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Full key; folders end with the separator
    pub id: String,
    /// Last path segment with any trailing separator stripped
    pub name: String,
    /// File or folder
    pub kind: EntryKind,
}

impl Entry {
    /// Build an entry from a raw remote key
    pub fn from_key(key: impl Into<String>) -> Self {
        let id = key.into();
        let kind = classify(&id);
        let name = derive_name(&id);
        Self { id, name, kind }
    }

    /// The synthetic root, meaning "the whole bucket"
    pub fn root() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: EntryKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_root(&self) -> bool {
        is_root(&self.id)
    }

    /// Folder that must exist locally before this entry can be written
    pub fn parent_folder(&self) -> Option<String> {
        parent_folder(&self.id)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
        };
        write!(f, "{} - {kind}", self.id)
    }
}

/// Classify a key by its trailing character
pub fn classify(key: &str) -> EntryKind {
    if key.ends_with(SEPARATOR) {
        EntryKind::Folder
    } else {
        EntryKind::File
    }
}

/// Whether a key denotes the synthetic root (no prefix)
pub fn is_root(key: &str) -> bool {
    let trimmed = key.trim();
    trimmed.is_empty() || trimmed == "/"
}

/// Last segment of a key, ignoring one trailing separator
pub fn derive_name(key: &str) -> String {
    let key = key.strip_suffix(SEPARATOR).unwrap_or(key);
    match key.rfind(SEPARATOR) {
        Some(pos) => key[pos + 1..].to_string(),
        None => key.to_string(),
    }
}

/// Prefix of a key up to and including the separator before its last segment
///
/// `"a/b/c.txt"` and `"a/b/"` give `"a/b/"` and `"a/"`; a key without such a
/// separator has no parent.
pub fn parent_folder(key: &str) -> Option<String> {
    let key = key.strip_suffix(SEPARATOR).unwrap_or(key);
    key.rfind(SEPARATOR).map(|pos| key[..=pos].to_string())
}

/// Map a key onto a path under `root`
///
/// Segments are joined one by one so the result uses the platform separator.
/// Only a single trailing separator is allowed. Empty segments, `.` and `..`
/// are rejected so every key maps to its own path inside `root`.
pub fn local_path(root: &Path, key: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    if key.is_empty() {
        return Ok(path);
    }

    let relative = key.strip_suffix(SEPARATOR).unwrap_or(key);
    for segment in relative.split(SEPARATOR) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err(Error::InvalidKey(key.to_string())),
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("photos/"), EntryKind::Folder);
        assert_eq!(classify("photos/a.jpg"), EntryKind::File);
        assert_eq!(classify("a"), EntryKind::File);
        assert_eq!(classify("/"), EntryKind::Folder);
    }

    #[test]
    fn test_is_root() {
        assert!(is_root(""));
        assert!(is_root("/"));
        assert!(is_root("   "));
        assert!(!is_root("photos/"));
    }

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name("photos/sub/b.jpg"), "b.jpg");
        assert_eq!(derive_name("photos/sub/"), "sub");
        assert_eq!(derive_name("photos/"), "photos");
        assert_eq!(derive_name("x.txt"), "x.txt");
    }

    #[test]
    fn test_parent_folder() {
        assert_eq!(parent_folder("a/b/c.txt").as_deref(), Some("a/b/"));
        assert_eq!(parent_folder("a/b/").as_deref(), Some("a/"));
        assert_eq!(parent_folder("a/"), None);
        assert_eq!(parent_folder("x.txt"), None);
    }

    #[test]
    fn test_from_key_keeps_id() {
        for key in ["photos/", "photos/a.jpg", "x.txt", "a/b/c/", "Jungle Fever.jpeg"] {
            let entry = Entry::from_key(key);
            assert_eq!(entry.id, key);
            assert_eq!(entry.is_folder(), key.ends_with('/'));
            assert!(!entry.name.is_empty());
        }
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(Entry::from_key("poze/").to_string(), "poze/ - folder");
        assert_eq!(Entry::from_key("poze/a.jpg").to_string(), "poze/a.jpg - file");
    }

    #[test]
    fn test_root_entry() {
        let root = Entry::root();
        assert!(root.is_root());
        assert!(root.is_folder());
        assert!(root.parent_folder().is_none());
    }

    #[test]
    fn test_local_path() {
        let root = Path::new("/data/bucket");
        assert_eq!(
            local_path(root, "photos/sub/b.jpg").unwrap(),
            Path::new("/data/bucket/photos/sub/b.jpg")
        );
        assert_eq!(
            local_path(root, "photos/").unwrap(),
            Path::new("/data/bucket/photos")
        );
        assert_eq!(local_path(root, "").unwrap(), root);
    }

    #[test]
    fn test_local_path_rejects_traversal() {
        let root = Path::new("/data/bucket");
        assert!(matches!(
            local_path(root, "a/../../etc/passwd"),
            Err(Error::InvalidKey(_))
        ));
        assert!(local_path(root, "./a").is_err());
    }

    #[test]
    fn test_local_path_rejects_empty_segments() {
        let root = Path::new("/data/bucket");
        for key in ["a//b.txt", "/x.txt", "/", "a//", "photos//"] {
            assert!(
                matches!(local_path(root, key), Err(Error::InvalidKey(_))),
                "{key}"
            );
        }
        assert_eq!(
            local_path(root, "a/b/").unwrap(),
            Path::new("/data/bucket/a/b")
        );
    }
}
