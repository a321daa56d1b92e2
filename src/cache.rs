use crate::error::CacheError;
use crate::model::DownloadRequest;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Running,
    Closed,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Running => f.write_str("RUNNING"),
            CacheStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Growable FIFO of requests waiting to be fed to the request channel.
#[derive(Debug, Default)]
pub struct RequestCache {
    cache: Mutex<VecDeque<DownloadRequest>>,
    closed: AtomicBool,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, req: DownloadRequest) -> Result<(), CacheError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        self.cache.lock().push_back(req);
        Ok(())
    }

    /// Removes the oldest request. Never blocks; `None` when empty or closed.
    pub fn get(&self) -> Option<DownloadRequest> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.cache.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current backing allocation, not a limit.
    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn status(&self) -> CacheStatus {
        if self.closed.load(Ordering::SeqCst) {
            CacheStatus::Closed
        } else {
            CacheStatus::Running
        }
    }

    pub fn summary(&self) -> CacheSummary {
        let cache = self.cache.lock();
        CacheSummary {
            status: self.status(),
            length: cache.len(),
            capacity: cache.capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub status: CacheStatus,
    pub length: usize,
    pub capacity: usize,
}

impl fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {}, length: {}, capacity: {}",
            self.status, self.length, self.capacity
        )
    }
}
