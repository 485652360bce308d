//! Pagination walker
//!
//! Walks a recursive listing page by page. Pages are requested strictly in
//! cursor order; each cursor is used exactly once.

use futures::Stream;

use crate::error::{Error, Result};
use crate::key::{self, Entry};
use crate::traits::{ListRequest, RemoteStore};

/// One page of entries and the cursor for the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<Entry>,
    /// None on the final page
    pub cursor: Option<String>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Start,
    Next(String),
    Done,
}

/// Forward-only walker over a prefix listing
pub struct PageWalker<'a> {
    store: &'a dyn RemoteStore,
    prefix: Option<String>,
    page_size: Option<i32>,
    state: State,
}

impl<'a> PageWalker<'a> {
    /// Create a walker for `prefix`; None or a root marker lists the whole bucket
    pub fn new(store: &'a dyn RemoteStore, prefix: Option<String>) -> Self {
        Self {
            store,
            prefix: prefix.filter(|p| !key::is_root(p)),
            page_size: None,
            state: State::Start,
        }
    }

    /// Limit the number of keys requested per page
    pub fn page_size(mut self, size: Option<i32>) -> Self {
        self.page_size = size;
        self
    }

    /// Effective prefix after root normalisation
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Done
    }

    /// Fetch the next page, or None once the listing is exhausted
    ///
    /// An empty first page for a concrete prefix is `EmptyResult`. Remote
    /// errors are returned as-is and leave the walker where it was.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let continuation_token = match &self.state {
            State::Done => return Ok(None),
            State::Start => None,
            State::Next(cursor) => Some(cursor.clone()),
        };
        let first = continuation_token.is_none();

        let request = ListRequest {
            prefix: self.prefix.clone(),
            continuation_token,
            max_keys: self.page_size,
        };
        let folder = self.prefix.as_deref().unwrap_or("/");
        let page = self.store.list_objects(request).await.inspect_err(|e| {
            tracing::error!(
                "Error listing folder {folder} for bucket {}: {e}",
                self.store.bucket()
            );
        })?;

        if first && page.keys.is_empty() {
            if let Some(prefix) = &self.prefix {
                tracing::error!("The folder is empty or does not exist: {prefix}");
                self.state = State::Done;
                return Err(Error::EmptyResult(prefix.clone()));
            }
        }

        let cursor = page.continuation_token.filter(|c| !c.is_empty());
        self.state = match &cursor {
            Some(c) => State::Next(c.clone()),
            None => State::Done,
        };

        tracing::debug!(
            "Retrieved {} entries from folder {folder} (more: {})",
            page.keys.len(),
            cursor.is_some()
        );

        Ok(Some(Page {
            entries: page.keys.into_iter().map(Entry::from_key).collect(),
            cursor,
        }))
    }

    /// Adapt the walker into a stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + 'a {
        futures::stream::try_unfold(self, |mut walker| async move {
            Ok(walker.next_page().await?.map(|page| (page, walker)))
        })
    }
}
