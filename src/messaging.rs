//! Internal messaging: notifications, reply threads and read state.
//!
//! Notifications live in an arena keyed by id. The reply tree is the
//! `reply/{parent}/{child}` index, so a thread is walked by index lookups
//! from its root; a parent always exists before its children, so the walk
//! cannot cycle. Notifications are never deleted.
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;

use crate::actor::Actor;
use crate::directory::IdentityProvider;
use crate::error::{Error, Result, ValidationError};
use crate::recipients;
use crate::store::{Store, encode, keys};
use crate::types::TimeStamp;
use crate::utils::{hrp, new_id};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub seq: u64, // store sequence, tiebreak for equal timestamps
    #[n(2)]
    pub sender_id: String,
    #[n(3)]
    pub recipient_id: String,
    #[n(4)]
    pub subject: String,
    #[n(5)]
    pub body: String,
    #[n(6)]
    pub report_id: Option<String>,
    #[n(7)]
    pub parent_id: Option<String>,
    #[n(8)]
    pub root_id: String,
    #[n(9)]
    pub read: bool,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
    #[n(11)]
    pub read_at: Option<TimeStamp<Utc>>,
}

impl Notification {
    pub fn involves(&self, actor_id: &str) -> bool {
        self.sender_id == actor_id || self.recipient_id == actor_id
    }

    fn order_key(&self) -> (TimeStamp<Utc>, u64) {
        (self.created_at.clone(), self.seq)
    }
}

/// An outgoing message, root or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    recipient_id: String,
    subject: String,
    body: String,
    report_id: Option<String>,
    parent_id: Option<String>,
}

impl Message {
    pub fn new(
        recipient_id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            subject: subject.into(),
            body: body.into(),
            report_id: None,
            parent_id: None,
        }
    }
    pub fn about_report(mut self, report_id: impl Into<String>) -> Self {
        self.report_id = Some(report_id.into());
        self
    }
    pub fn in_reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ValidationError::Blank("subject"));
        }
        if self.body.trim().is_empty() {
            return Err(ValidationError::Blank("body"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MessagingEngine {
    store: Store,
    directory: Arc<dyn IdentityProvider>,
}

impl MessagingEngine {
    pub fn new(store: Store, directory: Arc<dyn IdentityProvider>) -> Self {
        Self { store, directory }
    }

    /// Actors `actor` may address; populates compose targets.
    pub fn recipients(&self, actor: &Actor) -> Vec<Actor> {
        recipients::resolve_recipients(self.directory.as_ref(), actor)
    }

    /// Send a root message or a reply.
    pub fn send(&self, sender: &Actor, message: Message) -> Result<Notification> {
        message.validate()?;

        if !recipients::is_permitted_recipient(
            self.directory.as_ref(),
            sender,
            &message.recipient_id,
        ) {
            return Err(ValidationError::RecipientNotAllowed(message.recipient_id).into());
        }

        if let Some(report_id) = &message.report_id {
            if !self.store.contains(&keys::report(report_id))? {
                return Err(Error::NotFound(format!("report {report_id}")));
            }
        }

        let (root_id, report_id) = match &message.parent_id {
            Some(parent_id) => {
                let parent = self.load(parent_id)?;
                // only people already in the thread may extend it
                let in_thread = parent.recipient_id == sender.id()
                    || self.participants(&parent.root_id)?.contains(sender.id());
                if !in_thread {
                    return Err(Error::NotFound(format!("notification {parent_id}")));
                }
                (
                    Some(parent.root_id.clone()),
                    message.report_id.clone().or(parent.report_id),
                )
            }
            None => (None, message.report_id.clone()),
        };

        let id = new_id(hrp::MESSAGE)?;
        let seq = self.store.next_seq()?;
        let notification = Notification {
            root_id: root_id.unwrap_or_else(|| id.clone()),
            id,
            seq,
            sender_id: sender.id().to_owned(),
            recipient_id: message.recipient_id,
            subject: message.subject,
            body: message.body,
            report_id,
            parent_id: message.parent_id,
            read: false,
            created_at: TimeStamp::new(),
            read_at: None,
        };

        let mut batch = sled::Batch::default();
        batch.insert(keys::note(&notification.id).as_bytes(), encode(&notification)?);
        if let Some(parent_id) = &notification.parent_id {
            batch.insert(
                keys::reply(parent_id, &notification.id).as_bytes(),
                notification.id.as_bytes(),
            );
        }
        for party in [&notification.sender_id, &notification.recipient_id] {
            batch.insert(
                keys::mailbox(party, notification.seq).as_bytes(),
                notification.id.as_bytes(),
            );
        }
        self.store.apply(batch)?;

        tracing::info!(
            id = %notification.id,
            sender = %notification.sender_id,
            recipient = %notification.recipient_id,
            parent = notification.parent_id.as_deref().unwrap_or(""),
            "notification sent"
        );
        Ok(notification)
    }

    /// Everything `actor` sent or received, newest first.
    pub fn list_mine(&self, actor: &Actor) -> Result<Vec<Notification>> {
        let mut mine = self
            .store
            .scan_refs(&keys::mailbox_of(actor.id()))?
            .iter()
            .map(|id| self.load(id))
            .collect::<Result<Vec<_>>>()?;
        mine.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
        Ok(mine)
    }

    /// Unread notifications addressed to `actor`, derived from [`Self::list_mine`].
    pub fn unread_count(&self, actor: &Actor) -> Result<usize> {
        Ok(self
            .list_mine(actor)?
            .iter()
            .filter(|n| n.recipient_id == actor.id() && !n.read)
            .count())
    }

    /// The whole thread containing `id`, oldest first. Invisible to
    /// non-participants.
    pub fn list_thread(&self, id: &str, actor: &Actor) -> Result<Vec<Notification>> {
        let not_found = || Error::NotFound(format!("thread {id}"));

        let start = self.store.load::<Notification>(&keys::note(id))?.ok_or_else(not_found)?;
        let thread = self.walk(&start.root_id)?;
        if !thread.iter().any(|n| n.involves(actor.id())) {
            return Err(not_found());
        }

        tracing::debug!(root = %start.root_id, len = thread.len(), "thread listed");
        Ok(thread)
    }

    /// Set the read flag. Only the recipient may; returns whether it changed.
    pub fn mark_read(&self, id: &str, actor: &Actor, read: bool) -> Result<bool> {
        let key = keys::note(id);
        let _guard = self.store.lock(&key)?;

        let mut notification = self.load(id)?;
        if notification.recipient_id != actor.id() {
            if notification.sender_id == actor.id() {
                return Err(Error::Unauthorized(
                    "only the recipient can change read state".into(),
                ));
            }
            return Err(Error::NotFound(format!("notification {id}")));
        }
        if notification.read == read {
            return Ok(false);
        }

        notification.read = read;
        notification.read_at = read.then(TimeStamp::new);
        self.store.save(&key, &notification)?;

        tracing::info!(id, read, "read state changed");
        Ok(true)
    }

    fn load(&self, id: &str) -> Result<Notification> {
        self.store
            .load(&keys::note(id))?
            .ok_or_else(|| Error::NotFound(format!("notification {id}")))
    }

    /// Root and all descendants, ordered by creation.
    fn walk(&self, root_id: &str) -> Result<Vec<Notification>> {
        let mut thread = Vec::new();
        let mut queue = VecDeque::from([root_id.to_owned()]);
        while let Some(id) = queue.pop_front() {
            queue.extend(self.store.scan_refs(&keys::replies(&id))?);
            thread.push(self.load(&id)?);
        }
        thread.sort_by_key(Notification::order_key);
        Ok(thread)
    }

    fn participants(&self, root_id: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .walk(root_id)?
            .into_iter()
            .flat_map(|n| [n.sender_id, n.recipient_id])
            .collect())
    }
}
