//! Object and tree downloads
//!
//! A tree download walks the listing pages sequentially and fans every entry
//! out to its own task. Tasks share one bounded pool, create the folders they
//! need and never abort their siblings: failures come back as tagged results
//! and end up in the [`DownloadReport`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{self, JoinError, JoinSet};

use crate::error::{Error, Result};
use crate::key::{self, Entry};
use crate::materialize::ensure_dir;
use crate::pagination::PageWalker;
use crate::traits::RemoteStore;

/// Default number of concurrent object downloads
pub const DEFAULT_CONCURRENCY: usize = 11;

/// Callback receiving progress snapshots while a tree download runs
pub type ProgressFn = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Counters shared by all tasks of one tree download
#[derive(Debug, Default)]
pub struct TransferCounters {
    pub total_seen: AtomicUsize,
    pub downloaded: AtomicUsize,
    pub failed: AtomicUsize,
    pub folders_created: AtomicUsize,
}

impl TransferCounters {
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total_seen: self.total_seen.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            folders_created: self.folders_created.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`TransferCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total_seen: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub folders_created: usize,
}

impl ProgressSnapshot {
    /// Entries that have finished, successfully or not
    pub fn finished(&self) -> usize {
        self.downloaded + self.failed
    }
}

/// An entry whose download task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDownload {
    pub key: String,
    pub error: String,
}

/// Outcome of a download request
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    /// Local file or folder the request was mirrored to
    pub local_path: PathBuf,
    pub total_seen: usize,
    pub downloaded: usize,
    pub folders_created: usize,
    pub failures: Vec<FailedDownload>,
}

impl DownloadReport {
    /// Report for a single object downloaded on its own
    pub fn single(local_path: PathBuf) -> Self {
        Self {
            local_path,
            total_seen: 1,
            downloaded: 1,
            folders_created: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every listed entry was mirrored
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.downloaded == self.total_seen
    }
}

/// Download a single file entry to `root/<key>`, replacing any existing file
///
/// Errors from opening the remote object are returned unchanged; failures while
/// copying bytes on either end are `Error::Download`.
pub async fn download_object(
    store: &dyn RemoteStore,
    root: &Path,
    entry: &Entry,
) -> Result<PathBuf> {
    if entry.is_folder() {
        return Err(Error::InvalidKey(format!("{} is a folder", entry.id)));
    }

    let path = key::local_path(root, &entry.id)?;
    let download_error = |source| Error::Download {
        key: entry.id.clone(),
        source,
    };

    let mut reader = store.get_object(&entry.id).await?;
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(download_error)?;
    let bytes = tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(download_error)?;
    file.flush().await.map_err(download_error)?;

    tracing::debug!("Successfully downloaded file: {} ({bytes} bytes)", path.display());
    Ok(path)
}

/// Concurrent downloader for a folder and everything below it
#[derive(Clone)]
pub struct TreeDownloader {
    store: Arc<dyn RemoteStore>,
    root: PathBuf,
    pool: Arc<Semaphore>,
    queue: Option<Arc<Semaphore>>,
    page_size: Option<i32>,
    progress: Option<ProgressFn>,
}

impl TreeDownloader {
    /// Create a downloader with its own pool of `concurrency` slots
    pub fn new(store: Arc<dyn RemoteStore>, root: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self::with_pool(store, root, Arc::new(Semaphore::new(concurrency.max(1))))
    }

    /// Create a downloader sharing an existing pool
    pub fn with_pool(
        store: Arc<dyn RemoteStore>,
        root: impl Into<PathBuf>,
        pool: Arc<Semaphore>,
    ) -> Self {
        Self {
            store,
            root: root.into(),
            pool,
            queue: None,
            page_size: None,
            progress: None,
        }
    }

    /// Bound the number of scheduled but unfinished tasks
    ///
    /// With a limit set, the listing loop waits for a free slot before
    /// scheduling more work. Without one, every listed entry is scheduled
    /// immediately.
    pub fn queue_limit(mut self, limit: Option<usize>) -> Self {
        self.queue = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Limit the number of keys requested per listing page
    pub fn page_size(mut self, size: Option<i32>) -> Self {
        self.page_size = size;
        self
    }

    pub fn on_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Local folder every key is mirrored under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mirror `start` and everything below it
    ///
    /// `None` or the root entry mirrors the whole bucket into the download
    /// root. Listing and folder creation errors abort the call; a failing
    /// object only shows up in the report's `failures`.
    pub async fn download_tree(&self, start: Option<&Entry>) -> Result<DownloadReport> {
        let start = start.filter(|e| !e.is_root());
        if let Some(entry) = start.filter(|e| !e.is_folder()) {
            return Err(Error::NotAFolder(entry.id.clone()));
        }

        let prefix = start.map(|e| e.id.clone());
        let target = match start {
            Some(entry) => key::local_path(&self.root, &entry.id)?,
            None => self.root.clone(),
        };
        let folder = prefix.as_deref().unwrap_or("/");
        tracing::info!("Started downloading folder: {folder}");

        let counters = Arc::new(TransferCounters::default());
        let mut tasks = TaskSet::new(counters.clone(), self.progress.clone());
        let mut walker = PageWalker::new(self.store.as_ref(), prefix.clone()).page_size(self.page_size);

        while let Some(page) = walker.next_page().await? {
            ensure_dir(&target, Some(&counters.folders_created)).await?;
            counters
                .total_seen
                .fetch_add(page.entries.len(), Ordering::Relaxed);
            self.notify(&counters);

            for entry in page.entries {
                let slot = match &self.queue {
                    Some(queue) => Some(
                        queue
                            .clone()
                            .acquire_owned()
                            .await
                            .map_err(|_| Error::SessionClosed)?,
                    ),
                    None => None,
                };
                let job = Job {
                    store: self.store.clone(),
                    root: self.root.clone(),
                    pool: self.pool.clone(),
                    counters: counters.clone(),
                    progress: self.progress.clone(),
                };
                tasks.spawn(job, entry, slot);
                tasks.reap();
            }
        }

        let failures = tasks.join_all().await;

        let totals = counters.snapshot();
        tracing::info!("Successfully downloaded folder: {folder}");
        tracing::info!(
            "{} of {} files downloaded, {} folders created",
            totals.downloaded,
            totals.total_seen,
            totals.folders_created
        );

        Ok(DownloadReport {
            local_path: target,
            total_seen: totals.total_seen,
            downloaded: totals.downloaded,
            folders_created: totals.folders_created,
            failures,
        })
    }

    fn notify(&self, counters: &TransferCounters) {
        if let Some(progress) = &self.progress {
            progress(counters.snapshot());
        }
    }
}

type TaskOutput = std::result::Result<(), FailedDownload>;

/// Spawned tasks of one tree download, each mapped back to its key
struct TaskSet {
    tasks: JoinSet<TaskOutput>,
    keys: HashMap<task::Id, String>,
    failures: Vec<FailedDownload>,
    counters: Arc<TransferCounters>,
    progress: Option<ProgressFn>,
}

impl TaskSet {
    fn new(counters: Arc<TransferCounters>, progress: Option<ProgressFn>) -> Self {
        Self {
            tasks: JoinSet::new(),
            keys: HashMap::new(),
            failures: Vec::new(),
            counters,
            progress,
        }
    }

    fn spawn(&mut self, job: Job, entry: Entry, slot: Option<OwnedSemaphorePermit>) {
        let key = entry.id.clone();
        let handle = self.tasks.spawn(async move {
            let _slot = slot;
            job.run(entry).await
        });
        self.keys.insert(handle.id(), key);
    }

    /// Record every task that already finished, without waiting
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.record(joined);
        }
    }

    /// Wait for the remaining tasks and return all failures
    async fn join_all(mut self) -> Vec<FailedDownload> {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            self.record(joined);
        }
        self.failures
    }

    fn record(&mut self, joined: std::result::Result<(task::Id, TaskOutput), JoinError>) {
        match joined {
            Ok((id, output)) => {
                self.keys.remove(&id);
                if let Err(failure) = output {
                    self.failures.push(failure);
                }
            }
            Err(e) => {
                // panicked or cancelled, so the task never updated the counters
                let key = self
                    .keys
                    .remove(&e.id())
                    .unwrap_or_else(|| "<unknown>".to_string());
                tracing::warn!("Download task for {key} did not complete: {e}");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                if let Some(progress) = &self.progress {
                    progress(self.counters.snapshot());
                }
                self.failures.push(FailedDownload {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Everything one download task needs, owned so it can be spawned
struct Job {
    store: Arc<dyn RemoteStore>,
    root: PathBuf,
    pool: Arc<Semaphore>,
    counters: Arc<TransferCounters>,
    progress: Option<ProgressFn>,
}

impl Job {
    async fn run(self, entry: Entry) -> TaskOutput {
        let result = self.mirror(&entry).await;

        match &result {
            Ok(()) => {
                self.counters.downloaded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Skipping {}: {e}", entry.id);
            }
        }
        if let Some(progress) = &self.progress {
            progress(self.counters.snapshot());
        }

        result.map_err(|e| FailedDownload {
            key: entry.id,
            error: e.to_string(),
        })
    }

    async fn mirror(&self, entry: &Entry) -> Result<()> {
        let _permit = self.pool.acquire().await.map_err(|_| Error::SessionClosed)?;
        let folders = Some(&self.counters.folders_created);

        if let Some(parent) = entry.parent_folder() {
            ensure_dir(&key::local_path(&self.root, &parent)?, folders).await?;
        }

        if entry.is_folder() {
            // folder markers have no content of their own
            ensure_dir(&key::local_path(&self.root, &entry.id)?, folders).await?;
        } else {
            download_object(self.store.as_ref(), &self.root, entry).await?;
        }
        Ok(())
    }
}
