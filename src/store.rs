//! Shared sled keyspace, record codecs and the lock table.
//!
//! All records live in the default tree under typed prefixes so that a
//! multi-record change (a report and its attachments, a notification and its
//! indexes) commits through a single atomic [`sled::Batch`].
use std::sync::Arc;
use std::time::Duration;

use sled::Db;

use crate::config::Config;
use crate::error::Result;
use crate::lock::{LockGuard, LockTable};

pub mod keys {
    pub fn actor(id: &str) -> String {
        format!("actor/{id}")
    }
    pub fn report(id: &str) -> String {
        format!("report/{id}")
    }
    pub fn week(employee_id: &str, week_start: impl std::fmt::Display) -> String {
        format!("week/{employee_id}/{week_start}")
    }
    pub fn attachment(id: &str) -> String {
        format!("attachment/{id}")
    }
    pub fn report_attachment(report_id: &str, attachment_id: &str) -> String {
        format!("report-attachment/{report_id}/{attachment_id}")
    }
    pub fn report_attachments(report_id: &str) -> String {
        format!("report-attachment/{report_id}/")
    }
    pub fn note(id: &str) -> String {
        format!("note/{id}")
    }
    pub fn reply(parent_id: &str, child_id: &str) -> String {
        format!("reply/{parent_id}/{child_id}")
    }
    pub fn replies(parent_id: &str) -> String {
        format!("reply/{parent_id}/")
    }
    // zero padded so that byte order matches sequence order
    pub fn mailbox(actor_id: &str, seq: u64) -> String {
        format!("mailbox/{actor_id}/{seq:020}")
    }
    pub fn mailbox_of(actor_id: &str) -> String {
        format!("mailbox/{actor_id}/")
    }

    pub const ACTORS: &str = "actor/";
    pub const REPORTS: &str = "report/";
}

#[derive(Clone, Debug)]
pub struct Store {
    instance: Arc<Db>,
    locks: Arc<LockTable>,
}

impl Store {
    pub fn new(instance: Arc<Db>, config: &Config) -> Self {
        Self {
            instance,
            locks: Arc::new(LockTable::new(
                config.lock_attempts,
                Duration::from_millis(config.lock_backoff_ms),
            )),
        }
    }

    pub fn lock(&self, key: &str) -> Result<LockGuard<'_>> {
        self.locks.acquire(key)
    }

    pub fn load<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.instance.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save<T: minicbor::Encode<()>>(&self, key: &str, value: &T) -> Result<()> {
        self.instance.insert(key.as_bytes(), encode(value)?)?;
        Ok(())
    }

    /// Decodes every record stored under `prefix`, in key order.
    pub fn scan<T>(&self, prefix: &str) -> Result<Vec<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        self.instance
            .scan_prefix(prefix.as_bytes())
            .values()
            .map(|value| Ok(minicbor::decode(&value?)?))
            .collect()
    }

    /// Index entries under `prefix` whose value is the referenced id.
    pub fn scan_refs(&self, prefix: &str) -> Result<Vec<String>> {
        self.instance
            .scan_prefix(prefix.as_bytes())
            .values()
            .map(|value| Ok(String::from_utf8_lossy(&value?).into_owned()))
            .collect()
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.instance.contains_key(key.as_bytes())?)
    }

    pub fn apply(&self, batch: sled::Batch) -> Result<()> {
        self.instance.apply_batch(batch)?;
        Ok(())
    }

    /// Monotonic sequence number used to order records created in the same instant.
    pub fn next_seq(&self) -> Result<u64> {
        Ok(self.instance.generate_id()?)
    }
}

pub fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>> {
    Ok(minicbor::to_vec(value)?)
}
