//! The closed set of secret operations and their typed parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Logical operation name. Each maps to exactly one REST call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateSecret,
    ListSecrets,
    GetSecretMetadata,
    GetSecretPayload,
    PutSecretPayload,
    DeleteSecret,
}

/// Error type for parsing Operation from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperationError(pub String);

impl std::fmt::Display for ParseOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown operation: {}", self.0)
    }
}

impl std::error::Error for ParseOperationError {}

impl FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_secret" => Ok(Operation::CreateSecret),
            "list_secrets" => Ok(Operation::ListSecrets),
            "get_secret_metadata" => Ok(Operation::GetSecretMetadata),
            "get_secret_payload" => Ok(Operation::GetSecretPayload),
            "put_secret_payload" => Ok(Operation::PutSecretPayload),
            "delete_secret" => Ok(Operation::DeleteSecret),
            _ => Err(ParseOperationError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::CreateSecret,
        Operation::ListSecrets,
        Operation::GetSecretMetadata,
        Operation::GetSecretPayload,
        Operation::PutSecretPayload,
        Operation::DeleteSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateSecret => "create_secret",
            Operation::ListSecrets => "list_secrets",
            Operation::GetSecretMetadata => "get_secret_metadata",
            Operation::GetSecretPayload => "get_secret_payload",
            Operation::PutSecretPayload => "put_secret_payload",
            Operation::DeleteSecret => "delete_secret",
        }
    }

    /// Status the service documents for a successful call.
    pub fn success_status(&self) -> u16 {
        match self {
            Operation::CreateSecret => 201,
            Operation::ListSecrets | Operation::GetSecretMetadata | Operation::GetSecretPayload => {
                200
            }
            Operation::PutSecretPayload | Operation::DeleteSecret => 204,
        }
    }

    /// Whether a successful call leaves a new resource behind.
    pub fn creates_resource(&self) -> bool {
        matches!(self, Operation::CreateSecret)
    }
}

/// Body of `POST /v1/secrets`. Every field is optional; an empty body creates
/// a secret with no payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
}

impl CreateSecret {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// AES-256-CBC key material carried as a base64 octet-stream payload.
    pub fn aes_256_cbc(key_base64: impl Into<String>, expiration: impl Into<String>) -> Self {
        Self {
            expiration: Some(expiration.into()),
            algorithm: Some("aes".to_string()),
            bit_length: Some(256),
            mode: Some("cbc".to_string()),
            payload: Some(key_base64.into()),
            payload_content_type: Some("application/octet-stream".to_string()),
            payload_content_encoding: Some("base64".to_string()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Query for `GET /v1/secrets`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListSecrets {
    pub name: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListSecrets {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// Body and headers for `PUT /v1/secrets/{id}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutPayload {
    pub secret_id: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    pub content_encoding: Option<String>,
}

impl PutPayload {
    /// Binary key sent base64-encoded, the way key material is usually uploaded.
    pub fn base64_octets(secret_id: impl Into<String>, key_base64: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            payload: key_base64.into().into_bytes(),
            content_type: "application/octet-stream".to_string(),
            content_encoding: Some("base64".to_string()),
        }
    }
}

/// One call against the secrets API, with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecretRequest {
    Create(CreateSecret),
    List(ListSecrets),
    GetMetadata { secret_id: String },
    GetPayload { secret_id: String },
    PutPayload(PutPayload),
    Delete { secret_id: String },
}

impl SecretRequest {
    pub fn operation(&self) -> Operation {
        match self {
            SecretRequest::Create(_) => Operation::CreateSecret,
            SecretRequest::List(_) => Operation::ListSecrets,
            SecretRequest::GetMetadata { .. } => Operation::GetSecretMetadata,
            SecretRequest::GetPayload { .. } => Operation::GetSecretPayload,
            SecretRequest::PutPayload(_) => Operation::PutSecretPayload,
            SecretRequest::Delete { .. } => Operation::DeleteSecret,
        }
    }

    /// Target secret, for operations addressed at a single secret.
    pub fn secret_id(&self) -> Option<&str> {
        match self {
            SecretRequest::GetMetadata { secret_id }
            | SecretRequest::GetPayload { secret_id }
            | SecretRequest::Delete { secret_id } => Some(secret_id),
            SecretRequest::PutPayload(put) => Some(&put.secret_id),
            SecretRequest::Create(_) | SecretRequest::List(_) => None,
        }
    }

    pub fn delete(secret_id: impl Into<String>) -> Self {
        SecretRequest::Delete {
            secret_id: secret_id.into(),
        }
    }

    pub fn get_metadata(secret_id: impl Into<String>) -> Self {
        SecretRequest::GetMetadata {
            secret_id: secret_id.into(),
        }
    }

    pub fn get_payload(secret_id: impl Into<String>) -> Self {
        SecretRequest::GetPayload {
            secret_id: secret_id.into(),
        }
    }

    /// Build a request from an operation name and `key=value` parameters.
    pub fn from_params(
        operation: Operation,
        params: &BTreeMap<String, String>,
    ) -> Result<Self, RequestError> {
        let allowed: &[&str] = match operation {
            Operation::CreateSecret => &[
                "name",
                "expiration",
                "algorithm",
                "bit_length",
                "mode",
                "payload",
                "payload_content_type",
                "payload_content_encoding",
                "secret_type",
            ],
            Operation::ListSecrets => &["name", "limit", "offset"],
            Operation::GetSecretMetadata | Operation::GetSecretPayload | Operation::DeleteSecret => {
                &["secret_id"]
            }
            Operation::PutSecretPayload => {
                &["secret_id", "payload", "content_type", "content_encoding"]
            }
        };
        if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(RequestError::UnknownParam {
                operation,
                name: unknown.clone(),
            });
        }

        let get = |name: &str| params.get(name).cloned();
        let require = |name: &'static str| {
            params
                .get(name)
                .cloned()
                .ok_or(RequestError::MissingParam { operation, name })
        };
        let number = |name: &'static str| -> Result<Option<u32>, RequestError> {
            params
                .get(name)
                .map(|v| {
                    v.parse().map_err(|_| RequestError::InvalidParam {
                        name,
                        value: v.clone(),
                    })
                })
                .transpose()
        };

        Ok(match operation {
            Operation::CreateSecret => SecretRequest::Create(CreateSecret {
                name: get("name"),
                expiration: get("expiration"),
                algorithm: get("algorithm"),
                bit_length: number("bit_length")?,
                mode: get("mode"),
                payload: get("payload"),
                payload_content_type: get("payload_content_type"),
                payload_content_encoding: get("payload_content_encoding"),
                secret_type: get("secret_type"),
            }),
            Operation::ListSecrets => SecretRequest::List(ListSecrets {
                name: get("name"),
                limit: number("limit")?,
                offset: number("offset")?,
            }),
            Operation::GetSecretMetadata => SecretRequest::get_metadata(require("secret_id")?),
            Operation::GetSecretPayload => SecretRequest::get_payload(require("secret_id")?),
            Operation::DeleteSecret => SecretRequest::delete(require("secret_id")?),
            Operation::PutSecretPayload => SecretRequest::PutPayload(PutPayload {
                secret_id: require("secret_id")?,
                payload: require("payload")?.into_bytes(),
                content_type: get("content_type")
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                content_encoding: match get("content_encoding") {
                    Some(enc) if enc == "none" => None,
                    Some(enc) => Some(enc),
                    None => Some("base64".to_string()),
                },
            }),
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{operation} requires parameter '{name}'")]
    MissingParam {
        operation: Operation,
        name: &'static str,
    },
    #[error("{operation} does not take parameter '{name}'")]
    UnknownParam { operation: Operation, name: String },
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParam { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn operation_names_roundtrip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("rotate_secret".parse::<Operation>().is_err());
    }

    #[test]
    fn success_statuses() {
        assert_eq!(Operation::CreateSecret.success_status(), 201);
        assert_eq!(Operation::GetSecretPayload.success_status(), 200);
        assert_eq!(Operation::PutSecretPayload.success_status(), 204);
        assert_eq!(Operation::DeleteSecret.success_status(), 204);
    }

    #[test]
    fn create_body_omits_unset_fields() {
        let body = serde_json::to_value(CreateSecret::named("secret_1")).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "secret_1" }));

        let empty = serde_json::to_value(CreateSecret::default()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn aes_body_carries_key_metadata() {
        let body =
            serde_json::to_value(CreateSecret::aes_256_cbc("a2V5", "2030-01-01T00:00:00")).unwrap();
        assert_eq!(body["algorithm"], "aes");
        assert_eq!(body["bit_length"], 256);
        assert_eq!(body["mode"], "cbc");
        assert_eq!(body["payload_content_encoding"], "base64");
        assert_eq!(body["payload_content_type"], "application/octet-stream");
    }

    #[test]
    fn list_query_pairs_in_order() {
        let query = ListSecrets {
            name: Some("secret_1".into()),
            limit: Some(10),
            offset: None,
        };
        assert_eq!(
            query.query_pairs(),
            vec![("name", "secret_1".to_string()), ("limit", "10".to_string())]
        );
    }

    #[test]
    fn from_params_builds_typed_request() {
        let req = SecretRequest::from_params(
            Operation::GetSecretPayload,
            &params(&[("secret_id", "abc")]),
        )
        .unwrap();
        assert_eq!(req, SecretRequest::get_payload("abc"));
        assert_eq!(req.operation(), Operation::GetSecretPayload);
        assert_eq!(req.secret_id(), Some("abc"));
    }

    #[test]
    fn from_params_put_defaults_to_base64_octets() {
        let req = SecretRequest::from_params(
            Operation::PutSecretPayload,
            &params(&[("secret_id", "abc"), ("payload", "a2V5")]),
        )
        .unwrap();
        assert_eq!(req, SecretRequest::PutPayload(PutPayload::base64_octets("abc", "a2V5")));
    }

    #[test]
    fn from_params_rejects_missing_and_unknown() {
        let missing = SecretRequest::from_params(Operation::DeleteSecret, &params(&[]));
        assert_eq!(
            missing.unwrap_err(),
            RequestError::MissingParam {
                operation: Operation::DeleteSecret,
                name: "secret_id"
            }
        );

        let unknown =
            SecretRequest::from_params(Operation::ListSecrets, &params(&[("secret_id", "x")]));
        assert!(matches!(unknown, Err(RequestError::UnknownParam { .. })));

        let invalid =
            SecretRequest::from_params(Operation::ListSecrets, &params(&[("limit", "ten")]));
        assert!(matches!(
            invalid,
            Err(RequestError::InvalidParam { name: "limit", .. })
        ));
    }
}
