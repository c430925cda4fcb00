//! Identity directory: who exists, their role, and supervisor assignments.
use crate::actor::{Actor, Role};
use crate::error::{Error, Result, ValidationError};
use crate::store::{Store, keys};

/// Supplies actors to the core. Failures surface as [`Error::Dependency`].
pub trait IdentityProvider: Send + Sync {
    fn lookup(&self, id: &str) -> Result<Option<Actor>>;
    fn actors(&self) -> Result<Vec<Actor>>;
}

/// Directory kept in the same sled keyspace as the reports.
#[derive(Clone, Debug)]
pub struct SledDirectory {
    store: Store,
}

impl SledDirectory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Register a new actor. An employee's supervisor must already exist.
    pub fn register(&self, actor: Actor) -> Result<Actor> {
        let key = keys::actor(actor.id());
        let _guard = self.store.lock(&key)?;

        if self.store.contains(&key)? {
            return Err(ValidationError::DuplicateActor(actor.id().to_owned()).into());
        }
        if let Some(supervisor_id) = actor.supervisor_id() {
            self.require_supervisor(supervisor_id)?;
        }

        self.store.save(&key, &actor)?;
        tracing::info!(actor = actor.id(), role = %actor.role(), "actor registered");
        Ok(actor)
    }

    /// Point an employee at a new supervisor, or none. Existing reports keep
    /// the supervisor they were created under.
    pub fn assign_supervisor(
        &self,
        admin: &Actor,
        employee_id: &str,
        supervisor_id: Option<&str>,
    ) -> Result<Actor> {
        if admin.role() != Role::Admin {
            return Err(Error::Unauthorized(
                "only admins can assign supervisors".into(),
            ));
        }

        let key = keys::actor(employee_id);
        let _guard = self.store.lock(&key)?;

        let employee = match self.store.load::<Actor>(&key)? {
            Some(Actor::Employee { id, .. }) => id,
            Some(_) => return Err(ValidationError::NotAnEmployee(employee_id.to_owned()).into()),
            None => return Err(Error::NotFound(format!("actor {employee_id}"))),
        };
        if let Some(supervisor_id) = supervisor_id {
            self.require_supervisor(supervisor_id)?;
        }

        let updated = Actor::employee(employee, supervisor_id.map(str::to_owned));
        self.store.save(&key, &updated)?;
        tracing::info!(
            employee = employee_id,
            supervisor = supervisor_id.unwrap_or(""),
            "supervisor assigned"
        );
        Ok(updated)
    }

    pub fn employees_of(&self, supervisor_id: &str) -> Result<Vec<Actor>> {
        Ok(self
            .actors()?
            .into_iter()
            .filter(|actor| actor.supervisor_id() == Some(supervisor_id))
            .collect())
    }

    fn require_supervisor(&self, supervisor_id: &str) -> Result<()> {
        match self.lookup(supervisor_id)? {
            Some(Actor::Supervisor { .. }) => Ok(()),
            _ => Err(ValidationError::NotASupervisor(supervisor_id.to_owned()).into()),
        }
    }
}

impl IdentityProvider for SledDirectory {
    fn lookup(&self, id: &str) -> Result<Option<Actor>> {
        self.store.load(&keys::actor(id))
    }

    fn actors(&self) -> Result<Vec<Actor>> {
        self.store.scan(keys::ACTORS)
    }
}
