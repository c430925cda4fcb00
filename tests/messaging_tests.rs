//! Messaging: recipient rules, threads and read state.

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::{TempDir, tempdir};
use weekly_report::{
    WeeklyReports,
    actor::Actor,
    attachment::MemoryBlobStore,
    config::Config,
    directory::IdentityProvider,
    error::{Error, Result, ValidationError},
    messaging::{Message, MessagingEngine},
    report::ReportDraft,
    store::Store,
    utils::new_uuid_to_bech32,
};

struct Office {
    _dir: TempDir,
    app: WeeklyReports,
    admin: Actor,
    lead: Actor,
    other_lead: Actor,
    alice: Actor,
    bob: Actor,
    carol: Actor,
}

/// Two supervisors: `lead` has alice and bob, `other_lead` has carol.
fn office() -> anyhow::Result<Office> {
    let dir = tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("messages.db"))?);
    let app = WeeklyReports::new(db, &Config::default(), Arc::new(MemoryBlobStore::new()));

    let register = |actor: Actor| app.directory.register(actor);
    let admin = register(Actor::admin(new_uuid_to_bech32("user_")?))?;
    let lead = register(Actor::supervisor(new_uuid_to_bech32("user_")?))?;
    let other_lead = register(Actor::supervisor(new_uuid_to_bech32("user_")?))?;
    let under = |supervisor: &Actor| -> anyhow::Result<Actor> {
        Ok(register(Actor::employee(
            new_uuid_to_bech32("user_")?,
            Some(supervisor.id().to_owned()),
        ))?)
    };
    let alice = under(&lead)?;
    let bob = under(&lead)?;
    let carol = under(&other_lead)?;

    Ok(Office {
        _dir: dir,
        app,
        admin,
        lead,
        other_lead,
        alice,
        bob,
        carol,
    })
}

fn ids<'a>(actors: impl IntoIterator<Item = &'a Actor>) -> Vec<String> {
    let mut ids: Vec<String> = actors.into_iter().map(|a| a.id().to_owned()).collect();
    ids.sort();
    ids
}

#[test]
fn recipient_sets_follow_roles() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;

    assert_eq!(
        ids(&messages.recipients(&o.admin)),
        ids([&o.lead, &o.other_lead, &o.alice, &o.bob, &o.carol])
    );
    assert_eq!(
        ids(&messages.recipients(&o.lead)),
        ids([&o.other_lead, &o.alice, &o.bob])
    );
    assert_eq!(
        ids(&messages.recipients(&o.alice)),
        ids([&o.lead, &o.other_lead, &o.bob, &o.carol])
    );
    Ok(())
}

#[test]
fn sends_outside_the_recipient_set_are_rejected() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;

    for (sender, recipient) in [(&o.lead, &o.carol), (&o.alice, &o.admin), (&o.alice, &o.alice)] {
        let err = messages
            .send(sender, Message::new(recipient.id(), "Hello", "Quick question"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::RecipientNotAllowed(_))
        ));
    }

    let err = messages
        .send(&o.alice, Message::new(o.bob.id(), "  ", "body"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::Blank("subject"))
    ));
    let err = messages
        .send(&o.alice, Message::new(o.bob.id(), "subject", ""))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::Blank("body"))));
    Ok(())
}

#[test]
fn messages_may_reference_existing_reports_only() -> anyhow::Result<()> {
    let o = office()?;
    let friday = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
    let report = o.app.reports.create(
        &o.alice,
        ReportDraft::new(friday).set_accomplished_tasks("Wrote the quarterly summary"),
    )?;

    let err = o
        .app
        .messages
        .send(
            &o.alice,
            Message::new(o.lead.id(), "About my report", "Can you look?").about_report("report_gone"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let root = o.app.messages.send(
        &o.alice,
        Message::new(o.lead.id(), "About my report", "Can you look?").about_report(&report.id),
    )?;
    // replies inherit the report reference
    let reply = o.app.messages.send(
        &o.lead,
        Message::new(o.alice.id(), "Re: About my report", "Looking now").in_reply_to(&root.id),
    )?;
    assert_eq!(reply.report_id.as_deref(), Some(report.id.as_str()));
    assert_eq!(reply.root_id, root.id);
    Ok(())
}

#[test]
fn nested_replies_form_one_thread() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;

    let root = messages.send(&o.alice, Message::new(o.bob.id(), "Lunch", "Noon?"))?;
    let first = messages.send(
        &o.bob,
        Message::new(o.alice.id(), "Re: Lunch", "Sure").in_reply_to(&root.id),
    )?;
    let second = messages.send(
        &o.alice,
        Message::new(o.bob.id(), "Re: Lunch", "Usual place").in_reply_to(&first.id),
    )?;
    let side = messages.send(
        &o.alice,
        Message::new(o.bob.id(), "Re: Lunch", "Bring the slides").in_reply_to(&root.id),
    )?;
    assert_eq!(second.root_id, root.id);
    assert_eq!(second.parent_id.as_deref(), Some(first.id.as_str()));

    // any id in the thread resolves to the whole thread
    for start in [&root.id, &second.id, &side.id] {
        let thread: Vec<String> = messages
            .list_thread(start, &o.bob)?
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(
            thread,
            vec![root.id.clone(), first.id.clone(), second.id.clone(), side.id.clone()]
        );
    }
    Ok(())
}

#[test]
fn outsiders_cannot_see_or_extend_a_thread() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;
    let root = messages.send(&o.alice, Message::new(o.bob.id(), "Private", "Just us"))?;

    for outsider in [&o.carol, &o.admin] {
        let err = messages.list_thread(&root.id, outsider).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    let err = messages
        .send(
            &o.carol,
            Message::new(o.alice.id(), "Re: Private", "Me too").in_reply_to(&root.id),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = messages
        .send(
            &o.alice,
            Message::new(o.bob.id(), "Re: Nothing", "Hello?").in_reply_to("msg_missing"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[test]
fn read_state_belongs_to_the_recipient() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;
    let note = messages.send(&o.lead, Message::new(o.alice.id(), "Standup", "Moved to 10"))?;
    assert_eq!(messages.unread_count(&o.alice)?, 1);
    assert_eq!(messages.unread_count(&o.lead)?, 0);

    assert!(matches!(
        messages.mark_read(&note.id, &o.lead, true).unwrap_err(),
        Error::Unauthorized(_)
    ));
    assert!(matches!(
        messages.mark_read(&note.id, &o.bob, true).unwrap_err(),
        Error::NotFound(_)
    ));

    assert!(messages.mark_read(&note.id, &o.alice, true)?);
    assert!(!messages.mark_read(&note.id, &o.alice, true)?);
    assert_eq!(messages.unread_count(&o.alice)?, 0);

    let read = &messages.list_mine(&o.alice)?[0];
    assert!(read.read);
    assert!(read.read_at.is_some());

    assert!(messages.mark_read(&note.id, &o.alice, false)?);
    let unread = &messages.list_mine(&o.alice)?[0];
    assert!(!unread.read);
    assert!(unread.read_at.is_none());
    Ok(())
}

#[test]
fn mailbox_lists_sent_and_received_newest_first() -> anyhow::Result<()> {
    let o = office()?;
    let messages = &o.app.messages;

    let first = messages.send(&o.alice, Message::new(o.bob.id(), "One", "first"))?;
    let second = messages.send(&o.bob, Message::new(o.alice.id(), "Two", "second"))?;
    let third = messages.send(&o.lead, Message::new(o.alice.id(), "Three", "third"))?;
    messages.send(&o.lead, Message::new(o.bob.id(), "Elsewhere", "not alice's"))?;

    let mine: Vec<String> = messages
        .list_mine(&o.alice)?
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(mine, vec![third.id, second.id, first.id]);
    assert_eq!(messages.unread_count(&o.alice)?, 2);
    Ok(())
}

struct Offline;

impl IdentityProvider for Offline {
    fn lookup(&self, _: &str) -> Result<Option<Actor>> {
        Err(Error::Dependency("identity provider unreachable".into()))
    }
    fn actors(&self) -> Result<Vec<Actor>> {
        Err(Error::Dependency("identity provider unreachable".into()))
    }
}

/// With the directory down nobody is a permitted recipient, so a send is a
/// validation failure rather than a dependency failure.
#[test]
fn send_with_directory_down_fails_validation() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("offline.db"))?);
    let messages = MessagingEngine::new(Store::new(db, &Config::default()), Arc::new(Offline));
    let sender = Actor::supervisor("user_lead");

    assert!(messages.recipients(&sender).is_empty());
    let err = messages
        .send(&sender, Message::new("user_alice", "Standup", "Moved to 10"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::RecipientNotAllowed(ref id)) if id == "user_alice"
    ));
    assert!(messages.list_mine(&sender)?.is_empty());
    Ok(())
}
