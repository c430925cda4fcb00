//! Authenticated actors and their roles
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    #[n(0)]
    Employee,
    #[n(1)]
    Supervisor,
    #[n(2)]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE",
            Self::Supervisor => "SUPERVISOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Ok(Self::Employee),
            "SUPERVISOR" => Ok(Self::Supervisor),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An identity with exactly one role. Passed explicitly into every core call.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    #[n(0)]
    Employee {
        #[n(0)]
        id: String,
        #[n(1)]
        supervisor_id: Option<String>,
    },
    #[n(1)]
    Supervisor {
        #[n(0)]
        id: String,
    },
    #[n(2)]
    Admin {
        #[n(0)]
        id: String,
    },
}

impl Actor {
    pub fn employee(id: impl Into<String>, supervisor_id: Option<String>) -> Self {
        Self::Employee {
            id: id.into(),
            supervisor_id,
        }
    }
    pub fn supervisor(id: impl Into<String>) -> Self {
        Self::Supervisor { id: id.into() }
    }
    pub fn admin(id: impl Into<String>) -> Self {
        Self::Admin { id: id.into() }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Employee { id, .. } | Self::Supervisor { id } | Self::Admin { id } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Employee { .. } => Role::Employee,
            Self::Supervisor { .. } => Role::Supervisor,
            Self::Admin { .. } => Role::Admin,
        }
    }

    /// The assigned supervisor, only ever set on employees.
    pub fn supervisor_id(&self) -> Option<&str> {
        match self {
            Self::Employee { supervisor_id, .. } => supervisor_id.as_deref(),
            Self::Supervisor { .. } | Self::Admin { .. } => None,
        }
    }
}
