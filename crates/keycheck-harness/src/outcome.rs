//! Expected outcomes, observed results, and the comparison between them.

use keycheck_client::{ApiResponse, DenialKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// What a call site declares it should observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Status(u16),
    Denied(DenialKind),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Status(status) => write!(f, "status {}", status),
            Expected::Denied(kind) => write!(f, "denial ({})", kind),
        }
    }
}

impl FromStr for Expected {
    type Err = String;

    /// Accepts a status code (`201`) or a denial kind (`forbidden`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(status) = s.parse::<u16>() {
            return match DenialKind::from_status(status) {
                Some(kind) => Ok(Expected::Denied(kind)),
                None => Ok(Expected::Status(status)),
            };
        }
        s.parse::<DenialKind>()
            .map(Expected::Denied)
            .map_err(|e| e.to_string())
    }
}

/// A captured refusal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Denial {
    pub kind: DenialKind,
    pub status: u16,
    pub message: String,
}

/// What the dispatcher observed.
#[derive(Clone, Debug, PartialEq)]
pub enum CallResult {
    Success(ApiResponse),
    Denied(Denial),
}

impl CallResult {
    pub fn status(&self) -> u16 {
        match self {
            CallResult::Success(resp) => resp.status,
            CallResult::Denied(denial) => denial.status,
        }
    }

    pub fn success(&self) -> Option<&ApiResponse> {
        match self {
            CallResult::Success(resp) => Some(resp),
            CallResult::Denied(_) => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, CallResult::Denied(_))
    }
}

/// A mismatch between expected and observed outcome, or a failed data check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("expected status {expected}, got status {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("expected {expected} denial, but the caller unexpectedly had access (status {status})")]
    UnexpectedAccess { expected: DenialKind, status: u16 },

    #[error("expected status {expected}, but the call was refused as {kind} (status {status}): {message}")]
    UnexpectedDenial {
        expected: u16,
        kind: DenialKind,
        status: u16,
        message: String,
    },

    #[error("expected {expected} denial, got {actual} (status {status})")]
    DenialMismatch {
        expected: DenialKind,
        actual: DenialKind,
        status: u16,
    },

    #[error("{0}")]
    Assertion(String),
}

/// Compare a single observation against the declared outcome. No retries.
pub fn verify(result: &CallResult, expected: &Expected) -> Result<(), VerifyError> {
    match (expected, result) {
        (Expected::Status(want), CallResult::Success(resp)) => {
            if resp.status == *want {
                Ok(())
            } else {
                Err(VerifyError::StatusMismatch {
                    expected: *want,
                    actual: resp.status,
                })
            }
        }
        (Expected::Status(want), CallResult::Denied(denial)) => {
            Err(VerifyError::UnexpectedDenial {
                expected: *want,
                kind: denial.kind,
                status: denial.status,
                message: denial.message.clone(),
            })
        }
        (Expected::Denied(kind), CallResult::Success(resp)) => Err(VerifyError::UnexpectedAccess {
            expected: *kind,
            status: resp.status,
        }),
        (Expected::Denied(kind), CallResult::Denied(denial)) => {
            if denial.kind == *kind {
                Ok(())
            } else {
                Err(VerifyError::DenialMismatch {
                    expected: *kind,
                    actual: denial.kind,
                    status: denial.status,
                })
            }
        }
    }
}

/// Fail with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), VerifyError> {
    if condition {
        Ok(())
    } else {
        Err(VerifyError::Assertion(message()))
    }
}
