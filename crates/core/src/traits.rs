//! RemoteStore trait definition
//!
//! This trait defines the narrow interface the mirroring engine needs from an
//! S3-compatible bucket. It keeps the engine decoupled from any SDK.

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;

/// Byte stream of a single remote object
pub type ObjectStream = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata for a single object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this is a folder marker
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            last_modified: None,
            etag: None,
            content_type: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a folder
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
            etag: None,
            content_type: None,
            is_dir: true,
        }
    }
}

/// A single listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Prefix to filter by (None lists the whole bucket)
    pub prefix: Option<String>,

    /// Continuation token returned by the previous page
    pub continuation_token: Option<String>,

    /// Maximum number of keys to return
    pub max_keys: Option<i32>,
}

/// One page of a recursive listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Raw keys in listing order
    pub keys: Vec<String>,

    /// Token for the next page; None on the last page
    pub continuation_token: Option<String>,
}

/// Trait for the bucket operations the mirror depends on
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the bucket this store is bound to
    fn bucket(&self) -> &str;

    /// Check that the bucket exists
    async fn bucket_exists(&self) -> Result<bool>;

    /// List objects recursively, one page per call
    async fn list_objects(&self, request: ListRequest) -> Result<ListPage>;

    /// Get object metadata
    async fn head_object(&self, key: &str) -> Result<ObjectInfo>;

    /// Open the object's content as a byte stream
    async fn get_object(&self, key: &str) -> Result<ObjectStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_info_file() {
        let info = ObjectInfo::file("test.txt", 1024);
        assert_eq!(info.key, "test.txt");
        assert_eq!(info.size_bytes, Some(1024));
        assert!(info.size_human.is_some());
        assert!(!info.is_dir);
    }

    #[test]
    fn test_object_info_dir() {
        let info = ObjectInfo::dir("path/to/dir/");
        assert_eq!(info.key, "path/to/dir/");
        assert!(info.is_dir);
        assert!(info.size_bytes.is_none());
    }

    #[test]
    fn test_list_request_default() {
        let request = ListRequest::default();
        assert!(request.prefix.is_none());
        assert!(request.continuation_token.is_none());
        assert!(request.max_keys.is_none());
    }
}
