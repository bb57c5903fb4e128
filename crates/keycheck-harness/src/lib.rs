//! Authorization-conformance harness for a key manager's secrets API.
//!
//! Each scenario runs as a [`Persona`], dispatches calls through that
//! persona's client, compares every observation with a declared [`Expected`]
//! outcome and deletes whatever it created, even when the body fails or panics.

mod clients;
mod dispatcher;
mod error;
mod fixtures;
mod outcome;
mod persona;
mod scenario;
mod suite;
mod tracker;

pub use clients::ClientSet;
pub use dispatcher::{dispatch, perform, Phase, ScenarioContext};
pub use error::HarnessError;
pub use fixtures::{
    aes_secret, create_aes_secret_admin, create_empty_secret_admin, created_id,
    expiration_in_days, put_payload_admin, secret_ids_named_admin, unique_name,
    KEY_EXPIRATION_DAYS,
};
pub use outcome::{ensure, verify, CallResult, Denial, Expected, VerifyError};
pub use persona::{
    Persona, PersonaProfile, PROJECT_ADMIN, PROJECT_MEMBER, PROJECT_READER, SYSTEM_ADMIN,
    SYSTEM_MEMBER, SYSTEM_READER,
};
pub use scenario::ScenarioKind;
pub use suite::{run_scenario, run_suite, ScenarioReport, SuiteFilter, SuiteReport, Verdict};
pub use tracker::{CleanupEntry, CleanupReport, ResourceTracker, ResourceType};
