use keycheck_client::ApiError;
use keycheck_config::{ConfigError, Role};
use thiserror::Error;

use crate::outcome::VerifyError;

/// Errors surfaced by scenarios.
///
/// `Verification` is a test failure; everything else is an error that stops
/// the scenario without saying anything about the policy under test.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("transport error: {0}")]
    Transport(#[from] ApiError),

    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("no client configured for role '{0}'")]
    MissingClient(Role),

    #[error("fixture setup failed: {0}")]
    Fixture(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no expected outcome given for policy scenario '{0}'")]
    MissingExpectation(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl HarnessError {
    pub fn is_verification(&self) -> bool {
        matches!(self, HarnessError::Verification(_))
    }
}
