//! Local directory materialization
//!
//! Many download tasks race to create the same parent folders, so creation
//! treats "already exists" as success and only the winning call is counted.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Make sure `path` exists as a directory
///
/// Returns `true` only for the call that actually created the leaf directory,
/// in which case `counter` is incremented. Intermediate directories are
/// created as needed but not counted.
pub async fn ensure_dir(path: &Path, counter: Option<&AtomicUsize>) -> Result<bool> {
    if is_dir(path).await {
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::Filesystem {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    match tokio::fs::create_dir(path).await {
        Ok(()) => {
            if let Some(counter) = counter {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            tracing::debug!("Created folder: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists && is_dir(path).await => Ok(false),
        Err(source) => {
            tracing::error!("Error creating folder: {}", path.display());
            Err(Error::Filesystem {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
