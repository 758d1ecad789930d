//! Request queue and scheduling
//!
//! This module handles:
//! - The FIFO queue of pending crawl requests, shared with page handlers
//! - Dropping requests whose unique key was already queued this run
//! - Global concurrency limiting via a semaphore
//! - The per-run request ceiling

use crate::crawler::request::CrawlRequest;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct QueueInner {
    pending: VecDeque<CrawlRequest>,
    seen_keys: HashSet<String>,
}

/// Cloneable handle to the run's request queue
///
/// Handlers hold a clone and enqueue follow-up requests while the
/// coordinator is dispatching from the same queue.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a request to the back of the queue
    ///
    /// Returns false (and drops the request) when a request with the same
    /// unique key was already queued during this run.
    pub fn add_request(&self, request: CrawlRequest) -> bool {
        let mut inner = self.lock();
        if !inner.seen_keys.insert(request.unique_key.clone()) {
            tracing::debug!("Request already queued: {}", request.url);
            return false;
        }
        inner.pending.push_back(request);
        true
    }

    /// Takes the next request off the front of the queue
    pub fn fetch_next(&self) -> Option<CrawlRequest> {
        self.lock().pending.pop_front()
    }

    /// Puts a request back at the front of the queue
    ///
    /// Used for retries and for requests taken but not dispatched; the
    /// request's key is already known, so it is never rejected.
    pub fn reclaim(&self, request: CrawlRequest) {
        self.lock().pending.push_front(request);
    }

    /// Removes and returns every pending request
    pub fn drain(&self) -> Vec<CrawlRequest> {
        self.lock().pending.drain(..).collect()
    }

    /// Number of requests waiting to be dispatched
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns whether no request is waiting
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}

/// A request cleared for dispatch, with its concurrency permit
pub struct ScheduledRequest {
    pub request: CrawlRequest,

    /// Released when the fetch task finishes
    pub permit: OwnedSemaphorePermit,
}

/// Scheduler hands out requests within the concurrency and request limits
///
/// The scheduler coordinates:
/// - Global concurrency limits (max pages in flight)
/// - The request ceiling (max new requests dispatched per run)
///
/// Retries of already-dispatched requests do not count against the ceiling.
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    queue: RequestQueue,
    max_requests: u32,
    dispatched: u32,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `queue` - The request queue to dispatch from
    /// * `max_concurrency` - Maximum number of requests in flight
    /// * `max_requests` - Maximum number of requests dispatched in this run
    pub fn new(queue: RequestQueue, max_concurrency: u32, max_requests: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency as usize)),
            queue,
            max_requests,
            dispatched: 0,
        }
    }

    /// Gets the next request that may be dispatched right now
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledRequest)` - A request and its permit
    /// * `None` - No permit is free, the queue is empty, or the request
    ///   ceiling has been reached
    pub fn next_request(&mut self) -> Option<ScheduledRequest> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        let request = self.queue.fetch_next()?;

        if request.retry_count == 0 {
            if self.ceiling_reached() {
                self.queue.reclaim(request);
                return None;
            }
            self.dispatched += 1;
        }

        Some(ScheduledRequest { request, permit })
    }

    /// Returns whether the request ceiling has been reached
    pub fn ceiling_reached(&self) -> bool {
        self.dispatched >= self.max_requests
    }

    /// Number of requests dispatched so far (retries excluded)
    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    /// Number of permits currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
}
