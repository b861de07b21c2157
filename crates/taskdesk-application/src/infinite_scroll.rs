//! Infinite-scroll coordination.
//!
//! The controller turns viewport scroll metrics into next-page requests. The
//! collection's loading flag is the only gate: while a fetch is in flight, or
//! once the last page is in, scroll events are no-ops. Requests are never
//! queued.

use crate::task_list::TaskListStore;
use async_trait::async_trait;
use std::sync::Arc;
use taskdesk_core::error::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Remaining scroll distance (in pixels) under which the next page loads.
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Geometry of the scrollable viewport at one scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Distance left to scroll before the bottom of the content.
    pub fn remaining(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.remaining() <= threshold
    }
}

/// What the controller needs to know about a paged collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingStatus {
    pub next_page: u32,
    pub loading: bool,
    pub has_more: bool,
}

/// A collection that can load pages on demand.
#[async_trait]
pub trait PagedCollection: Send + Sync {
    fn paging(&self) -> PagingStatus;

    async fn load_page(&self, page: u32) -> Result<()>;
}

#[async_trait]
impl PagedCollection for TaskListStore {
    fn paging(&self) -> PagingStatus {
        self.read(|state| PagingStatus {
            next_page: state.next_page(),
            loading: state.loading,
            has_more: state.has_more,
        })
    }

    async fn load_page(&self, page: u32) -> Result<()> {
        let page_size = self.read(|state| state.pagination.page_size);
        self.fetch_page(page, page_size).await
    }
}

pub struct InfiniteScroll<C: PagedCollection + ?Sized> {
    collection: Arc<C>,
    threshold: f64,
}

impl<C: PagedCollection + ?Sized> InfiniteScroll<C> {
    pub fn new(collection: Arc<C>) -> Self {
        Self::with_threshold(collection, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(collection: Arc<C>, threshold: f64) -> Self {
        Self {
            collection,
            threshold,
        }
    }

    /// The page to request for `metrics`, if any.
    pub fn page_to_fetch(&self, metrics: &ScrollMetrics) -> Option<u32> {
        let status = self.collection.paging();
        if status.loading || !status.has_more || !metrics.near_bottom(self.threshold) {
            return None;
        }
        Some(status.next_page)
    }

    /// Handles one scroll event. Returns whether a page was requested.
    ///
    /// A failed fetch is already recorded in the collection's state, so it
    /// is logged here and not returned.
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> bool {
        let Some(page) = self.page_to_fetch(&metrics) else {
            return false;
        };
        tracing::debug!(page, remaining = metrics.remaining(), "loading next page");
        if let Err(e) = self.collection.load_page(page).await {
            tracing::debug!(page, error = %e, "next page failed");
        }
        true
    }

    /// Consumes scroll events one at a time until the channel closes or
    /// `cancel` fires, so at most one fetch is awaited at any moment.
    pub async fn run(&self, mut events: mpsc::Receiver<ScrollMetrics>, cancel: CancellationToken) {
        loop {
            let metrics = tokio::select! {
                _ = cancel.cancelled() => break,
                next = events.recv() => match next {
                    Some(metrics) => metrics,
                    None => break,
                },
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.on_scroll(metrics) => {}
            }
        }
        tracing::debug!("infinite scroll stopped");
    }
}
