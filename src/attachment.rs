//! Attachment metadata bound to a report. The bytes live in an external
//! [`BlobStore`]; only a handle is recorded here.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::actor::Actor;
use crate::error::{Error, Result, ValidationError};
use crate::policy;
use crate::report::Report;
use crate::store::{Store, encode, keys};
use crate::types::TimeStamp;
use crate::utils::{hrp, new_id};

/// Opaque reference into the blob store.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Hash)]
#[cbor(array)]
pub struct BlobHandle(#[n(0)] pub String);

/// Byte storage for attachments. Failures surface as [`Error::Dependency`].
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle>;
    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>>;
}

/// Content addressed in-memory blob store, keyed by sha256 digest.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        let digest = sha256::digest(bytes);
        self.blobs
            .write()
            .entry(digest.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(BlobHandle(digest))
    }

    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| Error::Dependency(format!("blob {} is missing", handle.0)))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub report_id: String,
    #[n(2)]
    pub uploader_id: String,
    #[n(3)]
    pub original_name: String,
    #[n(4)]
    pub mime_type: String,
    #[n(5)]
    pub size_bytes: u64,
    #[n(6)]
    pub blob: BlobHandle,
    #[n(7)]
    pub uploaded_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub original_name: String,
    pub mime_type: String,
}

impl FileMeta {
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub attachment: Attachment,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AttachmentRegistry {
    store: Store,
    blobs: Arc<dyn BlobStore>,
    max_bytes: u64,
}

impl AttachmentRegistry {
    pub fn new(store: Store, blobs: Arc<dyn BlobStore>, max_bytes: u64) -> Self {
        Self {
            store,
            blobs,
            max_bytes,
        }
    }

    /// Record a new attachment on `report_id`. Owner only.
    pub fn upload(
        &self,
        report_id: &str,
        actor: &Actor,
        meta: FileMeta,
        bytes: &[u8],
    ) -> Result<Attachment> {
        if meta.original_name.trim().is_empty() {
            return Err(ValidationError::Blank("original_name").into());
        }
        let size_bytes = bytes.len() as u64;
        if size_bytes > self.max_bytes {
            return Err(ValidationError::AttachmentTooLarge {
                limit: self.max_bytes,
                found: size_bytes,
            }
            .into());
        }

        let _guard = self.store.lock(&keys::report(report_id))?;
        let report = self.visible_report(report_id, actor, policy::can_upload_attachment)?;

        let blob = self.blobs.put(bytes)?;
        let attachment = Attachment {
            id: new_id(hrp::FILE)?,
            report_id: report.id.clone(),
            uploader_id: actor.id().to_owned(),
            original_name: meta.original_name,
            mime_type: meta.mime_type,
            size_bytes,
            blob,
            uploaded_at: TimeStamp::new(),
        };

        let mut batch = sled::Batch::default();
        batch.insert(keys::attachment(&attachment.id).as_bytes(), encode(&attachment)?);
        batch.insert(
            keys::report_attachment(&report.id, &attachment.id).as_bytes(),
            attachment.id.as_bytes(),
        );
        self.store.apply(batch)?;

        tracing::info!(
            report = %report.id,
            attachment = %attachment.id,
            size = size_bytes,
            "attachment uploaded"
        );
        Ok(attachment)
    }

    /// Attachments of a report in upload order.
    pub fn list(&self, report_id: &str, actor: &Actor) -> Result<Vec<Attachment>> {
        self.visible_report(report_id, actor, policy::can_read_attachments)?;
        let mut attachments = self
            .store
            .scan_refs(&keys::report_attachments(report_id))?
            .iter()
            .map(|id| self.load(id))
            .collect::<Result<Vec<_>>>()?;
        attachments.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(attachments)
    }

    pub fn download(&self, attachment_id: &str, actor: &Actor) -> Result<Download> {
        let attachment = self.load(attachment_id)?;
        self.visible_report(&attachment.report_id, actor, policy::can_read_attachments)
            .map_err(|err| match err {
                Error::NotFound(_) => Error::NotFound(format!("attachment {attachment_id}")),
                other => other,
            })?;

        let bytes = self.blobs.get(&attachment.blob)?;
        tracing::debug!(attachment = attachment_id, "attachment downloaded");
        Ok(Download { attachment, bytes })
    }

    /// Remove an attachment record. The uploader or an admin.
    pub fn delete(&self, attachment_id: &str, actor: &Actor) -> Result<()> {
        let attachment = self.load(attachment_id)?;
        let _guard = self.store.lock(&keys::report(&attachment.report_id))?;

        // the report may have been deleted while we waited for its lock
        let attachment = self.load(attachment_id)?;
        let report = self.visible_report(&attachment.report_id, actor, policy::can_view)?;
        if !policy::can_delete_attachment(actor, &attachment.uploader_id) {
            return Err(Error::Unauthorized(
                "only the uploader or an admin can delete an attachment".into(),
            ));
        }

        let mut batch = sled::Batch::default();
        batch.remove(keys::attachment(&attachment.id).as_bytes());
        batch.remove(keys::report_attachment(&report.id, &attachment.id).as_bytes());
        self.store.apply(batch)?;

        tracing::info!(report = %report.id, attachment = attachment_id, "attachment deleted");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Attachment> {
        self.store
            .load(&keys::attachment(id))?
            .ok_or_else(|| Error::NotFound(format!("attachment {id}")))
    }

    /// The report if `actor` can see it (else NotFound) and passes `rule`
    /// (else Unauthorized).
    fn visible_report(
        &self,
        report_id: &str,
        actor: &Actor,
        rule: fn(&Actor, &Report) -> bool,
    ) -> Result<Report> {
        let report = self
            .store
            .load::<Report>(&keys::report(report_id))?
            .filter(|report| policy::can_view(actor, report))
            .ok_or_else(|| Error::NotFound(format!("report {report_id}")))?;
        if !rule(actor, &report) {
            return Err(Error::Unauthorized(format!(
                "attachment access on report {report_id} denied"
            )));
        }
        Ok(report)
    }
}

/// Attachment keys removed alongside a report.
pub(crate) fn cascade(store: &Store, report_id: &str, batch: &mut sled::Batch) -> Result<usize> {
    let ids = store.scan_refs(&keys::report_attachments(report_id))?;
    for id in &ids {
        batch.remove(keys::attachment(id).as_bytes());
        batch.remove(keys::report_attachment(report_id, id).as_bytes());
    }
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_a_blob() {
        let blobs = MemoryBlobStore::new();
        let a = blobs.put(b"same bytes").unwrap();
        let b = blobs.put(b"same bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0, sha256::digest(b"same bytes".as_slice()));
        assert_eq!(blobs.get(&a).unwrap(), b"same bytes");

        let missing = BlobHandle("0".repeat(64));
        assert!(matches!(blobs.get(&missing), Err(Error::Dependency(_))));
    }
}
