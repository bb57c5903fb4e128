//! Client seam for the key manager secrets API.
//!
//! [`SecretApi`] is the one capability the harness consumes: perform a named
//! operation with the caller's credential and get back the status and decoded
//! body, or a refusal. [`HttpSecretClient`] is the network implementation; the
//! trait exists so scenarios can run against an in-memory service or a mock.

use async_trait::async_trait;

mod error;
mod http;
mod operation;
mod types;

pub use error::{ApiError, DenialKind, ParseDenialKindError};
pub use http::HttpSecretClient;
pub use operation::{
    CreateSecret, ListSecrets, Operation, ParseOperationError, PutPayload, RequestError,
    SecretRequest,
};
pub use types::{
    secret_id_from_ref, ApiResponse, ResponseBody, SecretList, SecretMetadata, SecretRef,
};

#[cfg(any(test, feature = "mock"))]
use mockall::automock;

/// An authenticated caller of the secrets API.
///
/// 2xx responses come back as `Ok`; 4xx responses as [`ApiError::Denied`];
/// anything else is a transport failure.
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait SecretApi: Send + Sync {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError>;
}
