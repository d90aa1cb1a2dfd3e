//! Round-robin selection over the validated pool

use crate::proxy::models::{ProxyCandidate, ProxyPool};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out pool members in rotation
///
/// The first call returns the lowest-latency proxy; later calls walk the
/// whole pool uniformly. The cursor always stays inside `[0, len)`.
#[derive(Debug, Default)]
pub struct ProxySelector {
    pool: RwLock<ProxyPool>,
    cursor: AtomicUsize,
}

impl ProxySelector {
    pub fn new(pool: ProxyPool) -> Self {
        Self {
            pool: RwLock::new(pool),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Return the proxy under the cursor and advance it, or `None` if the
    /// pool is empty
    pub fn next(&self) -> Option<ProxyCandidate> {
        let pool = self.pool.read();
        let len = pool.len();
        if len == 0 {
            return None;
        }

        // fetch_update returns the previous value, which is the slot we hand out
        let idx = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);

        pool.get(idx % len).map(|p| p.candidate.clone())
    }

    /// Swap in a freshly validated pool and restart the rotation
    pub fn replace(&self, pool: ProxyPool) {
        let mut guard = self.pool.write();
        *guard = pool;
        self.cursor.store(0, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }

    /// Copy of the current pool
    pub fn snapshot(&self) -> ProxyPool {
        self.pool.read().clone()
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}
