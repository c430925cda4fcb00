//! Weekly status reports: a review workflow gated per role, with an internal
//! messaging system for discussing reports.

pub mod actor;
pub mod attachment;
pub mod config;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod logging;
pub mod messaging;
pub mod policy;
pub mod recipients;
pub mod report;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
pub mod week;

use std::sync::Arc;

use anyhow::Context;

use crate::attachment::{AttachmentRegistry, BlobStore};
use crate::config::Config;
use crate::directory::{IdentityProvider, SledDirectory};
use crate::messaging::MessagingEngine;
use crate::service::ReportService;
use crate::store::Store;

/// All services sharing one database.
#[derive(Clone)]
pub struct WeeklyReports {
    pub directory: SledDirectory,
    pub reports: ReportService,
    pub attachments: AttachmentRegistry,
    pub messages: MessagingEngine,
}

impl WeeklyReports {
    /// Open (or create) the database at `config.db_path`.
    pub fn open(config: &Config, blobs: Arc<dyn BlobStore>) -> anyhow::Result<Self> {
        let db = sled::open(&config.db_path)
            .with_context(|| format!("unable to open database {}", config.db_path.display()))?;
        Ok(Self::new(Arc::new(db), config, blobs))
    }

    pub fn new(instance: Arc<sled::Db>, config: &Config, blobs: Arc<dyn BlobStore>) -> Self {
        let store = Store::new(instance, config);
        let directory = SledDirectory::new(store.clone());
        let provider: Arc<dyn IdentityProvider> = Arc::new(directory.clone());

        let messages = MessagingEngine::new(store.clone(), provider.clone());
        let notifier = config.notify_on_transition.then(|| messages.clone());

        Self {
            reports: ReportService::new(
                store.clone(),
                provider,
                config.min_task_chars,
                notifier,
            ),
            attachments: AttachmentRegistry::new(store, blobs, config.max_attachment_bytes),
            directory,
            messages,
        }
    }
}
