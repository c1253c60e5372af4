//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches the core the
//! caller's id and role are known and carried as a [`Caller`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Builds surveys for any client and sees everything.
    Admin,
    /// Owns surveys and reviews the audits run against them.
    Client,
    /// Runs audits against surveys they are assigned to.
    Inspector,
}

impl Role {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Client => "CLIENT",
            Self::Inspector => "INSPECTOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "CLIENT" => Ok(Self::Client),
            "INSPECTOR" => Ok(Self::Inspector),
            other => Err(AppError::BadRequest(format!("Unknown role: {other}"))),
        }
    }
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User id.
    pub id: String,
    /// Role of the user.
    pub role: Role,
}

impl Caller {
    /// Create a new caller.
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Whether the caller is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the caller is the client with the given id.
    #[must_use]
    pub fn is_client(&self, client_id: &str) -> bool {
        self.role == Role::Client && self.id == client_id
    }

    /// Whether the caller is the inspector with the given id.
    #[must_use]
    pub fn is_inspector(&self, inspector_id: &str) -> bool {
        self.role == Role::Inspector && self.id == inspector_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Client ".parse::<Role>().unwrap(), Role::Client);
        assert_eq!("INSPECTOR".parse::<Role>().unwrap(), Role::Inspector);
        assert!("staff".parse::<Role>().is_err());
    }

    #[test]
    fn test_caller_checks() {
        let client = Caller::new("c1", Role::Client);
        assert!(client.is_client("c1"));
        assert!(!client.is_client("c2"));
        assert!(!client.is_inspector("c1"));
        assert!(!client.is_admin());
        assert!(Caller::new("a1", Role::Admin).is_admin());
    }
}
