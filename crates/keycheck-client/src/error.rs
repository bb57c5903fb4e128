use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Classification of a 4xx refusal, independent of the exact status detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    /// Any other 4xx status.
    Other(u16),
}

impl DenialKind {
    /// Classify a client-error status; `None` outside 400..=499.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(DenialKind::BadRequest),
            401 => Some(DenialKind::Unauthorized),
            403 => Some(DenialKind::Forbidden),
            404 => Some(DenialKind::NotFound),
            409 => Some(DenialKind::Conflict),
            402..=499 => Some(DenialKind::Other(status)),
            _ => None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            DenialKind::BadRequest => 400,
            DenialKind::Unauthorized => 401,
            DenialKind::Forbidden => 403,
            DenialKind::NotFound => 404,
            DenialKind::Conflict => 409,
            DenialKind::Other(status) => *status,
        }
    }
}

impl std::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialKind::BadRequest => f.write_str("bad_request"),
            DenialKind::Unauthorized => f.write_str("unauthorized"),
            DenialKind::Forbidden => f.write_str("forbidden"),
            DenialKind::NotFound => f.write_str("not_found"),
            DenialKind::Conflict => f.write_str("conflict"),
            DenialKind::Other(status) => write!(f, "client_error_{}", status),
        }
    }
}

/// Error type for parsing DenialKind from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDenialKindError(pub String);

impl std::fmt::Display for ParseDenialKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid denial kind: {}", self.0)
    }
}

impl std::error::Error for ParseDenialKindError {}

impl FromStr for DenialKind {
    type Err = ParseDenialKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bad_request" => Ok(DenialKind::BadRequest),
            "unauthorized" => Ok(DenialKind::Unauthorized),
            "forbidden" => Ok(DenialKind::Forbidden),
            "not_found" => Ok(DenialKind::NotFound),
            "conflict" => Ok(DenialKind::Conflict),
            _ => s
                .strip_prefix("client_error_")
                .and_then(|code| code.parse::<u16>().ok())
                .and_then(DenialKind::from_status)
                .ok_or_else(|| ParseDenialKindError(s.to_string())),
        }
    }
}

/// Secrets API error types. Response bodies are truncated before they are kept.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error communicating with key manager")]
    Network(#[source] reqwest::Error),

    #[error("request refused ({kind}, status {status}): {message}")]
    Denied {
        kind: DenialKind,
        status: u16,
        message: String,
    },

    #[error("key manager server error: status {status}")]
    Server { status: u16 },

    #[error("unexpected key manager response: status {0}")]
    UnexpectedStatus(u16),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn denied(status: u16, message: impl Into<String>) -> Self {
        ApiError::Denied {
            kind: DenialKind::from_status(status).unwrap_or(DenialKind::Other(status)),
            status,
            message: message.into(),
        }
    }

    pub fn denial_kind(&self) -> Option<DenialKind> {
        match self {
            ApiError::Denied { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_client_errors() {
        assert_eq!(DenialKind::from_status(403), Some(DenialKind::Forbidden));
        assert_eq!(DenialKind::from_status(404), Some(DenialKind::NotFound));
        assert_eq!(DenialKind::from_status(409), Some(DenialKind::Conflict));
        assert_eq!(DenialKind::from_status(418), Some(DenialKind::Other(418)));
        assert_eq!(DenialKind::from_status(500), None);
        assert_eq!(DenialKind::from_status(204), None);
    }

    #[test]
    fn denial_kind_parse_roundtrip() {
        for kind in [
            DenialKind::BadRequest,
            DenialKind::Unauthorized,
            DenialKind::Forbidden,
            DenialKind::NotFound,
            DenialKind::Conflict,
            DenialKind::Other(429),
        ] {
            assert_eq!(kind.to_string().parse::<DenialKind>().unwrap(), kind);
            assert_eq!(DenialKind::from_status(kind.status()), Some(kind));
        }
        assert!("client_error_500".parse::<DenialKind>().is_err());
        assert!("nope".parse::<DenialKind>().is_err());
    }

    #[test]
    fn denied_error_display() {
        let err = ApiError::denied(403, "Forbidden: policy does not allow this request");
        assert_eq!(err.denial_kind(), Some(DenialKind::Forbidden));
        assert!(err.to_string().contains("forbidden"));
        assert!(err.to_string().contains("403"));
    }
}
