//! Who an actor is permitted to message.
use crate::actor::Actor;
use crate::directory::IdentityProvider;

/// Actors `actor` may address, ordered by id.
///
/// - admin: everyone else
/// - supervisor: assigned employees and the other supervisors
/// - employee: every supervisor and every other employee
///
/// When the directory is unavailable the set is empty rather than an error,
/// so a send against it fails validation instead of the whole request.
pub fn resolve_recipients(directory: &dyn IdentityProvider, actor: &Actor) -> Vec<Actor> {
    let everyone = match directory.actors() {
        Ok(actors) => actors,
        Err(err) => {
            tracing::warn!(actor = actor.id(), error = %err, "recipient resolution failed");
            return Vec::new();
        }
    };

    let mut recipients: Vec<Actor> = everyone
        .into_iter()
        .filter(|candidate| candidate.id() != actor.id())
        .filter(|candidate| may_address(actor, candidate))
        .collect();
    recipients.sort_by(|a, b| a.id().cmp(b.id()));
    recipients
}

pub fn is_permitted_recipient(
    directory: &dyn IdentityProvider,
    actor: &Actor,
    recipient_id: &str,
) -> bool {
    resolve_recipients(directory, actor)
        .iter()
        .any(|recipient| recipient.id() == recipient_id)
}

fn may_address(sender: &Actor, candidate: &Actor) -> bool {
    match (sender, candidate) {
        (Actor::Admin { .. }, _) => true,
        (Actor::Supervisor { id }, Actor::Employee { supervisor_id, .. }) => {
            supervisor_id.as_deref() == Some(id.as_str())
        }
        (Actor::Supervisor { .. }, Actor::Supervisor { .. }) => true,
        (Actor::Supervisor { .. }, Actor::Admin { .. }) => false,
        (Actor::Employee { .. }, Actor::Employee { .. } | Actor::Supervisor { .. }) => true,
        (Actor::Employee { .. }, Actor::Admin { .. }) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    struct Fixed(Vec<Actor>);

    impl IdentityProvider for Fixed {
        fn lookup(&self, id: &str) -> Result<Option<Actor>> {
            Ok(self.0.iter().find(|a| a.id() == id).cloned())
        }
        fn actors(&self) -> Result<Vec<Actor>> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    impl IdentityProvider for Down {
        fn lookup(&self, _: &str) -> Result<Option<Actor>> {
            Err(Error::Dependency("directory offline".into()))
        }
        fn actors(&self) -> Result<Vec<Actor>> {
            Err(Error::Dependency("directory offline".into()))
        }
    }

    fn org() -> Fixed {
        Fixed(vec![
            Actor::admin("a1"),
            Actor::supervisor("s1"),
            Actor::supervisor("s2"),
            Actor::employee("e1", Some("s1".into())),
            Actor::employee("e2", Some("s2".into())),
            Actor::employee("e3", None),
        ])
    }

    fn ids(actors: Vec<Actor>) -> Vec<String> {
        actors.into_iter().map(|a| a.id().to_owned()).collect()
    }

    #[test]
    fn admin_reaches_everyone_but_self() {
        let got = ids(resolve_recipients(&org(), &Actor::admin("a1")));
        assert_eq!(got, ["e1", "e2", "e3", "s1", "s2"]);
    }

    #[test]
    fn supervisor_reaches_assigned_employees_and_peers() {
        let got = ids(resolve_recipients(&org(), &Actor::supervisor("s1")));
        assert_eq!(got, ["e1", "s2"]);
    }

    #[test]
    fn employee_reaches_supervisors_and_employees() {
        let got = ids(resolve_recipients(&org(), &Actor::employee("e1", Some("s1".into()))));
        assert_eq!(got, ["e2", "e3", "s1", "s2"]);
    }

    #[test]
    fn unavailable_directory_yields_no_recipients() {
        assert!(resolve_recipients(&Down, &Actor::admin("a1")).is_empty());
        assert!(!is_permitted_recipient(&Down, &Actor::admin("a1"), "e1"));
    }
}
