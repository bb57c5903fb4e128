//! Credential roles a caller can hold against the key manager.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Credential role, as provisioned by the identity service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ProjectAdmin,
    ProjectMember,
    ProjectReader,
    SystemAdmin,
    SystemMember,
    SystemReader,
}

/// Error type for parsing Role from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl std::fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_admin" => Ok(Role::ProjectAdmin),
            "project_member" => Ok(Role::ProjectMember),
            "project_reader" => Ok(Role::ProjectReader),
            "system_admin" => Ok(Role::SystemAdmin),
            "system_member" => Ok(Role::SystemMember),
            "system_reader" => Ok(Role::SystemReader),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::ProjectAdmin,
        Role::ProjectMember,
        Role::ProjectReader,
        Role::SystemAdmin,
        Role::SystemMember,
        Role::SystemReader,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProjectAdmin => "project_admin",
            Role::ProjectMember => "project_member",
            Role::ProjectReader => "project_reader",
            Role::SystemAdmin => "system_admin",
            Role::SystemMember => "system_member",
            Role::SystemReader => "system_reader",
        }
    }
}
