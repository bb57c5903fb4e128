//! Personas under test and the outcome each one should see.

use keycheck_client::{DenialKind, Operation};
use keycheck_config::Role;
use serde::Serialize;
use std::str::FromStr;

use crate::outcome::Expected;

/// One caller identity: the role under test plus the role that builds its fixtures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Persona {
    pub name: &'static str,
    pub role: Role,
    pub helper: Role,
}

impl Persona {
    pub const fn new(name: &'static str, role: Role) -> Self {
        Self {
            name,
            role,
            helper: Role::ProjectAdmin,
        }
    }
}

pub const PROJECT_ADMIN: Persona = Persona::new("project_admin", Role::ProjectAdmin);
pub const PROJECT_MEMBER: Persona = Persona::new("project_member", Role::ProjectMember);
pub const PROJECT_READER: Persona = Persona::new("project_reader", Role::ProjectReader);
pub const SYSTEM_ADMIN: Persona = Persona::new("system_admin", Role::SystemAdmin);
pub const SYSTEM_MEMBER: Persona = Persona::new("system_member", Role::SystemMember);
pub const SYSTEM_READER: Persona = Persona::new("system_reader", Role::SystemReader);

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PersonaProfile::all()
            .into_iter()
            .map(|p| p.persona)
            .find(|p| p.name == s)
            .ok_or_else(|| format!("unknown persona: {}", s))
    }
}

/// Expected outcome per operation for one persona.
///
/// `None` means the operation is not asserted for this persona and its
/// scenario is skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PersonaProfile {
    pub persona: Persona,
    pub create_secret: Option<Expected>,
    pub list_secrets: Option<Expected>,
    pub get_secret_metadata: Option<Expected>,
    pub get_secret_payload: Option<Expected>,
    pub put_secret_payload: Option<Expected>,
    pub delete_secret: Option<Expected>,
}

const FORBIDDEN: Option<Expected> = Some(Expected::Denied(DenialKind::Forbidden));

impl PersonaProfile {
    pub fn project_member() -> Self {
        Self {
            persona: PROJECT_MEMBER,
            create_secret: Some(Expected::Status(201)),
            list_secrets: Some(Expected::Status(200)),
            get_secret_metadata: Some(Expected::Status(200)),
            get_secret_payload: Some(Expected::Status(200)),
            put_secret_payload: Some(Expected::Status(204)),
            delete_secret: Some(Expected::Status(204)),
        }
    }

    /// Same allowances as a member.
    pub fn project_admin() -> Self {
        Self {
            persona: PROJECT_ADMIN,
            ..Self::project_member()
        }
    }

    pub fn project_reader() -> Self {
        Self {
            persona: PROJECT_READER,
            create_secret: FORBIDDEN,
            list_secrets: FORBIDDEN,
            get_secret_metadata: FORBIDDEN,
            get_secret_payload: FORBIDDEN,
            put_secret_payload: FORBIDDEN,
            delete_secret: FORBIDDEN,
        }
    }

    /// Nothing asserted yet: system scope has no agreed policy for project secrets.
    pub fn unasserted(persona: Persona) -> Self {
        Self {
            persona,
            create_secret: None,
            list_secrets: None,
            get_secret_metadata: None,
            get_secret_payload: None,
            put_secret_payload: None,
            delete_secret: None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::project_admin(),
            Self::project_member(),
            Self::project_reader(),
            Self::unasserted(SYSTEM_ADMIN),
            Self::unasserted(SYSTEM_MEMBER),
            Self::unasserted(SYSTEM_READER),
        ]
    }

    pub fn expected(&self, operation: Operation) -> Option<Expected> {
        match operation {
            Operation::CreateSecret => self.create_secret,
            Operation::ListSecrets => self.list_secrets,
            Operation::GetSecretMetadata => self.get_secret_metadata,
            Operation::GetSecretPayload => self.get_secret_payload,
            Operation::PutSecretPayload => self.put_secret_payload,
            Operation::DeleteSecret => self.delete_secret,
        }
    }
}
