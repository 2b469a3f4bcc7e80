//! Observability hook for stamping requests.
//!
//! The service reports what it does through a [`StampObserver`] handed to it
//! at construction. [`TracingObserver`] forwards every event to `tracing`;
//! tests and embedders can supply their own.

use std::sync::Arc;

use crate::error::StampError;
use crate::page_range::PageSet;
use crate::sink::Delivery;

/// Receives events as a stamping request progresses.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`:
/// page events fire on a blocking worker thread while the request future
/// lives on the runtime.
pub trait StampObserver: Send + Sync {
    /// The request passed validation and its pages were parsed
    fn on_request(&self, source: &str, pages: &PageSet) {
        let _ = (source, pages);
    }

    /// The source document was downloaded
    fn on_fetched(&self, source: &str, bytes: usize) {
        let _ = (source, bytes);
    }

    /// A page received the stamp
    fn on_page_stamped(&self, page: u32, total_pages: u32) {
        let _ = (page, total_pages);
    }

    /// The stamped document reached its sink
    fn on_delivered(&self, delivery: &Delivery, bytes: usize) {
        let _ = (delivery, bytes);
    }

    /// The request was aborted
    fn on_failed(&self, error: &StampError) {
        let _ = error;
    }
}

pub struct NoopObserver;

impl StampObserver for NoopObserver {}

pub struct TracingObserver;

impl StampObserver for TracingObserver {
    fn on_request(&self, source: &str, pages: &PageSet) {
        tracing::info!(source, pages = pages.len(), "stamp request accepted");
    }

    fn on_fetched(&self, source: &str, bytes: usize) {
        tracing::debug!(source, bytes, "source PDF fetched");
    }

    fn on_page_stamped(&self, page: u32, total_pages: u32) {
        tracing::trace!(page, total_pages, "page stamped");
    }

    fn on_delivered(&self, delivery: &Delivery, bytes: usize) {
        match delivery {
            Delivery::Inline { .. } => tracing::info!(bytes, "stamped PDF returned inline"),
            Delivery::Uploaded { url } => tracing::info!(bytes, %url, "stamped PDF uploaded"),
        }
    }

    fn on_failed(&self, error: &StampError) {
        tracing::warn!(status = error.status().as_u16(), "stamp request failed: {}", error);
    }
}

pub type Observer = Arc<dyn StampObserver>;
