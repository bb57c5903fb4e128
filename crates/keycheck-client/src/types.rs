//! Response shapes returned by the secrets API.

use serde::{Deserialize, Serialize};

/// Body of a successful response, decoded according to the operation.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    Empty,
}

/// A successful (2xx) response.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    pub fn bytes(status: u16, bytes: Vec<u8>) -> Self {
        Self {
            status,
            body: ResponseBody::Bytes(bytes),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Decode the JSON body into a typed shape.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.as_json()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Response to a create call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub secret_ref: String,
}

impl SecretRef {
    pub fn id(&self) -> Option<&str> {
        secret_id_from_ref(&self.secret_ref)
    }
}

/// Metadata view of a secret. Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub secret_ref: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub bit_length: Option<u32>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub secret_type: Option<String>,
}

impl SecretMetadata {
    pub fn id(&self) -> Option<&str> {
        secret_id_from_ref(&self.secret_ref)
    }
}

/// Response to a list call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretList {
    pub secrets: Vec<SecretMetadata>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// The identifier is the trailing path segment of a reference URL.
pub fn secret_id_from_ref(secret_ref: &str) -> Option<&str> {
    secret_ref
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
}
