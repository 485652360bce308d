//! bm-core: Core engine for bucket-mirror
//!
//! This crate mirrors a flat-keyed object store onto the local filesystem:
//! - Key model (files, folders, parents, local paths)
//! - Paginated listing walker
//! - Concurrent tree downloads with progress counters
//! - Bucket sessions, configuration and profiles
//!
//! The remote side is reached only through the [`RemoteStore`] trait, so the
//! engine does not depend on any S3 SDK and can be tested with in-memory stores.

pub mod config;
pub mod download;
pub mod error;
pub mod key;
pub mod materialize;
pub mod pagination;
pub mod profile;
pub mod session;
pub mod traits;

pub use config::{Config, ConfigManager, DownloadSettings};
pub use download::{
    DownloadReport, FailedDownload, ProgressFn, ProgressSnapshot, TreeDownloader,
    download_object,
};
pub use error::{Error, Result};
pub use key::{Entry, EntryKind};
pub use materialize::ensure_dir;
pub use pagination::{Page, PageWalker};
pub use profile::{Profile, ProfileManager};
pub use session::Session;
pub use traits::{ListPage, ListRequest, ObjectInfo, ObjectStream, RemoteStore};
