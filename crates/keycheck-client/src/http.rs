//! Key manager REST client bound to one credential.

use async_trait::async_trait;
use keycheck_config::{CredentialConfig, HarnessConfig, Role};
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use crate::{ApiError, ApiResponse, Operation, SecretApi, SecretRequest};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const PROJECT_ID_HEADER: &str = "X-Project-Id";
const MAX_ERROR_BODY: usize = 512;

/// HTTP implementation of [`SecretApi`] for one role's token.
#[derive(Debug, Clone)]
pub struct HttpSecretClient {
    http: reqwest::Client,
    base_url: String,
    role: Role,
    token: String,
    project_id: Option<String>,
}

impl HttpSecretClient {
    fn user_agent() -> String {
        format!("keycheck/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Build a client for the credential configured for `role`.
    pub fn from_config(
        config: &HarnessConfig,
        credential: &CredentialConfig,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_owned(),
            role: credential.role,
            token: credential.token.clone(),
            project_id: credential.project_id.clone(),
        })
    }

    /// Create a client at a custom base URL with default transport settings.
    pub fn with_base_url(base_url: &str, role: Role, token: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            role,
            token: token.to_owned(),
            project_id: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn secrets_url(&self) -> String {
        format!("{}/v1/secrets", self.base_url)
    }

    fn secret_url(&self, secret_id: &str) -> String {
        format!("{}/v1/secrets/{}", self.base_url, secret_id)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(AUTH_TOKEN_HEADER, &self.token);
        match &self.project_id {
            Some(project_id) => builder.header(PROJECT_ID_HEADER, project_id),
            None => builder,
        }
    }

    fn build(&self, request: &SecretRequest) -> reqwest::RequestBuilder {
        let builder = match request {
            SecretRequest::Create(body) => self
                .http
                .post(self.secrets_url())
                .header(ACCEPT, "application/json")
                .json(body),
            SecretRequest::List(query) => self
                .http
                .get(self.secrets_url())
                .header(ACCEPT, "application/json")
                .query(&query.query_pairs()),
            SecretRequest::GetMetadata { secret_id } => self
                .http
                .get(self.secret_url(secret_id))
                .header(ACCEPT, "application/json"),
            SecretRequest::GetPayload { secret_id } => self
                .http
                .get(format!("{}/payload", self.secret_url(secret_id)))
                .header(ACCEPT, "application/octet-stream"),
            SecretRequest::PutPayload(put) => {
                let builder = self
                    .http
                    .put(self.secret_url(&put.secret_id))
                    .header(CONTENT_TYPE, &put.content_type)
                    .body(put.payload.clone());
                match &put.content_encoding {
                    Some(encoding) => builder.header(CONTENT_ENCODING, encoding),
                    None => builder,
                }
            }
            SecretRequest::Delete { secret_id } => self.http.delete(self.secret_url(secret_id)),
        };
        self.authorize(builder)
    }
}

#[async_trait]
impl SecretApi for HttpSecretClient {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        let operation = request.operation();
        debug!(role = %self.role, %operation, "sending request");

        let resp = self
            .build(request)
            .send()
            .await
            .map_err(ApiError::Network)?;
        let status = resp.status();
        debug!(role = %self.role, %operation, status = status.as_u16(), "received response");

        if status.is_success() {
            return decode_success(operation, status, resp).await;
        }

        let code = status.as_u16();
        match code {
            400..=499 => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::denied(code, truncate(&body)))
            }
            500..=599 => Err(ApiError::Server { status: code }),
            _ => Err(ApiError::UnexpectedStatus(code)),
        }
    }
}

async fn decode_success(
    operation: Operation,
    status: StatusCode,
    resp: reqwest::Response,
) -> Result<ApiResponse, ApiError> {
    let code = status.as_u16();
    match operation {
        Operation::GetSecretPayload => {
            let bytes = resp.bytes().await.map_err(ApiError::Network)?;
            Ok(ApiResponse::bytes(code, bytes.to_vec()))
        }
        Operation::PutSecretPayload | Operation::DeleteSecret => Ok(ApiResponse::empty(code)),
        Operation::CreateSecret | Operation::ListSecrets | Operation::GetSecretMetadata => {
            let value = resp
                .json::<serde_json::Value>()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
            Ok(ApiResponse::json(code, value))
        }
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
