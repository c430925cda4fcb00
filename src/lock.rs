//! In-process exclusive locks keyed by record id.
use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct LockTable {
    held: Mutex<HashSet<String>>,
    attempts: u32,
    backoff: Duration,
}

/// Releases the key on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    key: String,
}

impl LockTable {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Takes the lock for `key`, retrying contention a bounded number of times.
    pub fn acquire(&self, key: &str) -> Result<LockGuard<'_>> {
        for attempt in 1..=self.attempts {
            if self.held.lock().insert(key.to_owned()) {
                return Ok(LockGuard {
                    table: self,
                    key: key.to_owned(),
                });
            }
            tracing::debug!(key, attempt, "lock contended");
            if attempt < self.attempts {
                std::thread::sleep(self.backoff);
            }
        }

        Err(Error::Conflict(format!(
            "{key} is held by a concurrent request"
        )))
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.held.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let table = LockTable::new(1, Duration::ZERO);
        {
            let _guard = table.acquire("report_a").unwrap();
            assert!(table.is_held("report_a"));
            assert!(matches!(table.acquire("report_a"), Err(Error::Conflict(_))));
            assert!(table.acquire("report_b").is_ok());
        }
        assert!(!table.is_held("report_a"));
    }

    #[test]
    fn waiter_gets_the_lock_after_release() {
        let table = LockTable::new(200, Duration::from_millis(1));
        let guard = table.acquire("report_a").unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| table.acquire("report_a").map(|_| ()));
            std::thread::sleep(Duration::from_millis(5));
            drop(guard);
            assert!(waiter.join().unwrap().is_ok());
        });
    }
}
