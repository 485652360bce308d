//! Bucket session
//!
//! A session is opened against one bucket, validated up front, and owns the
//! download root and the worker pool shared by every download issued
//! through it. Close it with [`Session::shutdown`]; dropping it also releases
//! the store and the pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::DownloadSettings;
use crate::download::{DownloadReport, ProgressFn, TreeDownloader, download_object};
use crate::error::{Error, Result};
use crate::key::{self, Entry};
use crate::materialize::ensure_dir;
use crate::pagination::PageWalker;
use crate::traits::{ListRequest, RemoteStore};

/// An open connection to a single bucket
pub struct Session {
    store: Arc<dyn RemoteStore>,
    download_root: PathBuf,
    pool: Arc<Semaphore>,
    concurrency: usize,
    queue_limit: Option<usize>,
    page_size: Option<i32>,
    progress: Option<ProgressFn>,
}

impl Session {
    /// Validate the bucket and prepare its download folder
    ///
    /// Fails with `Error::Init` if the bucket does not exist, is empty or
    /// cannot be reached. Downloads land in `<settings.folder>/<bucket>`.
    pub async fn connect(store: Arc<dyn RemoteStore>, settings: &DownloadSettings) -> Result<Self> {
        validate_bucket(store.as_ref()).await?;

        let download_root = settings.resolved_folder().join(store.bucket());
        ensure_dir(&download_root, None)
            .await
            .map_err(|e| Error::Init(e.to_string()))?;

        let concurrency = settings.concurrency.max(1);
        tracing::info!("Successfully initialized session for bucket: {}", store.bucket());

        Ok(Self {
            store,
            download_root,
            pool: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            queue_limit: settings.queue_limit,
            page_size: settings.page_size,
            progress: None,
        })
    }

    /// Report tree download progress to `progress`
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    /// Local folder the bucket is mirrored into
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Walk the listing of `folder`, or of the whole bucket for None
    pub fn list_folder(&self, folder: Option<&Entry>) -> Result<PageWalker<'_>> {
        if let Some(entry) = folder.filter(|e| !e.is_folder()) {
            tracing::error!("The provided resource is not a folder: {}", entry.id);
            return Err(Error::NotAFolder(entry.id.clone()));
        }
        Ok(PageWalker::new(self.store.as_ref(), folder.map(|e| e.id.clone())).page_size(self.page_size))
    }

    /// Check that a key exists and build its entry
    pub async fn get_resource(&self, id: &str) -> Result<Entry> {
        if id.trim().is_empty() {
            return Err(Error::InvalidKey("The id of the resource cannot be empty".into()));
        }

        let entry = Entry::from_key(id);
        if entry.is_folder() {
            let page = self
                .store
                .list_objects(ListRequest {
                    prefix: Some(id.to_string()),
                    max_keys: Some(1),
                    ..Default::default()
                })
                .await?;
            if page.keys.is_empty() {
                tracing::error!("Resource with ID: {id} not found");
                return Err(Error::NotFound(id.to_string()));
            }
        } else {
            self.store.head_object(id).await?;
        }

        tracing::info!("Successfully retrieved resource with ID: {id}");
        Ok(entry)
    }

    /// Download an entry: a single file, or a folder with everything below it
    ///
    /// None, the root entry and folders go through the tree downloader.
    /// Errors of a single-file download are returned to the caller.
    pub async fn get_as_file(&self, entry: Option<&Entry>) -> Result<DownloadReport> {
        match entry.filter(|e| !e.is_root()) {
            Some(file) if !file.is_folder() => {
                if let Some(parent) = file.parent_folder() {
                    ensure_dir(&key::local_path(&self.download_root, &parent)?, None).await?;
                }
                let path = download_object(self.store.as_ref(), &self.download_root, file)
                    .await
                    .inspect_err(|e| tracing::error!("{e}"))?;
                tracing::info!("Successfully downloaded file: {}", path.display());
                Ok(DownloadReport::single(path))
            }
            folder => self.download_tree(folder).await,
        }
    }

    /// Mirror a folder (or the whole bucket for None) into the download root
    pub async fn download_tree(&self, start: Option<&Entry>) -> Result<DownloadReport> {
        self.tree_downloader().download_tree(start).await
    }

    /// Tree downloader bound to this session's store, root and pool
    pub fn tree_downloader(&self) -> TreeDownloader {
        let downloader = TreeDownloader::with_pool(
            self.store.clone(),
            self.download_root.clone(),
            self.pool.clone(),
        )
        .queue_limit(self.queue_limit)
        .page_size(self.page_size);

        match &self.progress {
            Some(progress) => downloader.on_progress(progress.clone()),
            None => downloader,
        }
    }

    /// Close the session
    ///
    /// Waits up to `grace` for running downloads to give back their pool
    /// slots, then closes the pool so queued work that has not started fails
    /// with `Error::SessionClosed`.
    pub async fn shutdown(self, grace: Duration) {
        let permits = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        match tokio::time::timeout(grace, self.pool.acquire_many(permits)).await {
            Ok(Ok(_idle)) => tracing::debug!("All downloads finished"),
            Ok(Err(_)) => tracing::debug!("Worker pool already closed"),
            Err(_) => tracing::warn!(
                "Downloads still running after {}s, dropping unfinished work",
                grace.as_secs()
            ),
        }
        self.pool.close();
        tracing::info!("Closed session for bucket: {}", self.store.bucket());
    }
}

async fn validate_bucket(store: &dyn RemoteStore) -> Result<()> {
    let bucket = store.bucket();
    let init_error = |e: Error| {
        tracing::error!("Error accessing bucket {bucket}: {e}");
        Error::Init(format!("Error accessing bucket {bucket}: {e}"))
    };

    if !store.bucket_exists().await.map_err(init_error)? {
        tracing::error!("Bucket does not exist: {bucket}");
        return Err(Error::Init(format!("Bucket does not exist: {bucket}")));
    }

    let probe = store
        .list_objects(ListRequest {
            max_keys: Some(1),
            ..Default::default()
        })
        .await
        .map_err(init_error)?;
    if probe.keys.is_empty() {
        tracing::error!("The bucket is empty: {bucket}");
        return Err(Error::Init(format!("The bucket is empty: {bucket}")));
    }

    tracing::info!("Successfully validated access to bucket: {bucket}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ListPage, MockRemoteStore, ObjectInfo};
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> DownloadSettings {
        DownloadSettings {
            folder: dir.path().to_string_lossy().into_owned(),
            concurrency: 3,
            ..Default::default()
        }
    }

    fn probe_store() -> MockRemoteStore {
        let mut store = MockRemoteStore::new();
        store.expect_bucket().return_const("test-bucket".to_string());
        store.expect_bucket_exists().returning(|| Ok(true));
        store
            .expect_list_objects()
            .withf(|r| r.prefix.is_none())
            .returning(|_| {
                Ok(ListPage {
                    keys: vec!["dummy".into()],
                    continuation_token: None,
                })
            });
        store
    }

    async fn connect(store: MockRemoteStore, dir: &TempDir) -> Result<Session> {
        Session::connect(Arc::new(store), &settings(dir)).await
    }

    #[tokio::test]
    async fn test_connect_creates_bucket_folder() {
        let temp_dir = TempDir::new().unwrap();
        let session = connect(probe_store(), &temp_dir).await.unwrap();

        assert_eq!(session.download_root(), temp_dir.path().join("test-bucket"));
        assert!(session.download_root().is_dir());
        assert_eq!(session.bucket(), "test-bucket");
    }

    #[tokio::test]
    async fn test_connect_missing_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MockRemoteStore::new();
        store.expect_bucket().return_const("gone".to_string());
        store.expect_bucket_exists().returning(|| Ok(false));
        store.expect_list_objects().never();

        let result = connect(store, &temp_dir).await;
        assert!(matches!(result, Err(Error::Init(msg)) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_connect_empty_bucket() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MockRemoteStore::new();
        store.expect_bucket().return_const("empty".to_string());
        store.expect_bucket_exists().returning(|| Ok(true));
        store
            .expect_list_objects()
            .returning(|_| Ok(ListPage::default()));

        let result = connect(store, &temp_dir).await;
        assert!(matches!(result, Err(Error::Init(msg)) if msg.contains("empty")));
    }

    #[tokio::test]
    async fn test_connect_remote_failure_is_init_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MockRemoteStore::new();
        store.expect_bucket().return_const("b".to_string());
        store
            .expect_bucket_exists()
            .returning(|| Err(Error::Remote("access denied".into())));

        let result = connect(store, &temp_dir).await;
        assert!(matches!(result, Err(Error::Init(_))));
    }

    #[tokio::test]
    async fn test_list_folder_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let session = connect(probe_store(), &temp_dir).await.unwrap();

        let result = session.list_folder(Some(&Entry::from_key("a.txt")));
        assert!(matches!(result, Err(Error::NotAFolder(_))));
        assert!(session.list_folder(None).is_ok());
    }

    #[tokio::test]
    async fn test_get_resource_file_and_folder() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = probe_store();
        store
            .expect_head_object()
            .returning(|key| match key {
                "poze/lp/Jungle Fever.jpeg" => Ok(ObjectInfo::file(key, 10)),
                _ => Err(Error::NotFound(key.to_string())),
            });
        store
            .expect_list_objects()
            .withf(|r| r.prefix.as_deref() == Some("poze/") && r.max_keys == Some(1))
            .returning(|_| {
                Ok(ListPage {
                    keys: vec!["poze/a.jpg".into()],
                    continuation_token: None,
                })
            });
        let session = connect(store, &temp_dir).await.unwrap();

        let file = session.get_resource("poze/lp/Jungle Fever.jpeg").await.unwrap();
        assert_eq!(file.name, "Jungle Fever.jpeg");
        assert!(!file.is_folder());

        let folder = session.get_resource("poze/").await.unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.name, "poze");

        assert!(matches!(
            session.get_resource("inexistent").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            session.get_resource("  ").await,
            Err(Error::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_get_resource_empty_folder_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = probe_store();
        store
            .expect_list_objects()
            .withf(|r| r.prefix.as_deref() == Some("nothing/"))
            .returning(|_| Ok(ListPage::default()));
        let session = connect(store, &temp_dir).await.unwrap();

        assert!(matches!(
            session.get_resource("nothing/").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_as_file_single_object() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = probe_store();
        store
            .expect_get_object()
            .returning(|_| Ok(Box::pin(std::io::Cursor::new(b"jpeg".to_vec()))));
        let session = connect(store, &temp_dir).await.unwrap();

        let report = session
            .get_as_file(Some(&Entry::from_key("poze/lp/cover.jpeg")))
            .await
            .unwrap();
        assert_eq!(
            report.local_path,
            session.download_root().join("poze").join("lp").join("cover.jpeg")
        );
        assert!(report.is_complete());
        assert_eq!(std::fs::read(&report.local_path).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_get_as_file_single_object_error_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = probe_store();
        store
            .expect_get_object()
            .returning(|key| Err(Error::NotFound(key.to_string())));
        let session = connect(store, &temp_dir).await.unwrap();

        let result = session.get_as_file(Some(&Entry::from_key("missing.txt"))).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_shutdown_when_idle() {
        let temp_dir = TempDir::new().unwrap();
        let session = connect(probe_store(), &temp_dir).await.unwrap();
        let downloader = session.tree_downloader();

        session.shutdown(Duration::from_millis(50)).await;

        // work issued after close fails instead of running
        let result = downloader.download_tree(None).await.unwrap();
        assert_eq!(result.total_seen, 1);
        assert_eq!(result.downloaded, 0);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].error, Error::SessionClosed.to_string());
    }
}
