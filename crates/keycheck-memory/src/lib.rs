//! In-memory secrets service implementing [`SecretApi`].
//!
//! This implementation is suitable for:
//! - Validating the harness itself without a deployed key manager
//! - Unit and integration tests of scenarios
//!
//! It mirrors the observable behaviour the harness relies on: role-based
//! refusals, one-time payload assignment, name filtering and reference URLs
//! whose trailing segment is the secret id. It is not a key manager.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use dashmap::DashMap;
use keycheck_client::{
    ApiError, ApiResponse, CreateSecret, ListSecrets, Operation, PutPayload, SecretApi,
    SecretRequest,
};
use keycheck_config::Role;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:9311";
const DEFAULT_LIST_LIMIT: usize = 10;

/// Which roles the service lets through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Project admins and members may do everything; every other role is refused.
    ProjectScoped,
    /// Every role may do everything. Useful to prove a suite detects over-permissive services.
    AllowAll,
}

impl AccessPolicy {
    fn permits(&self, role: Role, _operation: Operation) -> bool {
        match self {
            AccessPolicy::ProjectScoped => {
                matches!(role, Role::ProjectAdmin | Role::ProjectMember)
            }
            AccessPolicy::AllowAll => true,
        }
    }
}

#[derive(Clone, Debug)]
struct StoredSecret {
    seq: u64,
    metadata: CreateSecret,
    payload: Option<Vec<u8>>,
    content_type: Option<String>,
    created: String,
}

/// Shared in-memory store. Cloning shares the same secrets.
#[derive(Clone)]
pub struct MemoryKeyManager {
    secrets: Arc<DashMap<String, StoredSecret>>,
    next_seq: Arc<AtomicU64>,
    calls: Arc<Mutex<Vec<(Role, Operation)>>>,
    base_url: String,
    policy: AccessPolicy,
}

impl MemoryKeyManager {
    pub fn new() -> Self {
        Self::with_policy(AccessPolicy::ProjectScoped)
    }

    pub fn with_policy(policy: AccessPolicy) -> Self {
        Self {
            secrets: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            base_url: DEFAULT_BASE_URL.to_string(),
            policy,
        }
    }

    /// A caller bound to `role`.
    pub fn client(&self, role: Role) -> MemoryClient {
        MemoryClient {
            service: self.clone(),
            role,
        }
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn contains(&self, secret_id: &str) -> bool {
        self.secrets.contains_key(secret_id)
    }

    /// Stored payload bytes, bypassing access control.
    pub fn payload(&self, secret_id: &str) -> Option<Vec<u8>> {
        self.secrets
            .get(secret_id)
            .and_then(|s| s.payload.clone())
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<(Role, Operation)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, role: Role, operation: Operation) {
        let mut calls = self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        calls.push((role, operation));
    }

    fn secret_ref(&self, id: &str) -> String {
        format!("{}/v1/secrets/{}", self.base_url, id)
    }

    fn metadata_json(&self, id: &str, secret: &StoredSecret) -> serde_json::Value {
        let mut value = serde_json::json!({
            "secret_ref": self.secret_ref(id),
            "name": secret.metadata.name,
            "status": "ACTIVE",
            "algorithm": secret.metadata.algorithm,
            "bit_length": secret.metadata.bit_length,
            "mode": secret.metadata.mode,
            "expiration": secret.metadata.expiration,
            "secret_type": secret.metadata.secret_type.as_deref().unwrap_or("opaque"),
            "created": secret.created,
        });
        if let Some(content_type) = &secret.content_type {
            value["content_types"] = serde_json::json!({ "default": content_type });
        }
        value
    }

    fn create(&self, body: &CreateSecret) -> Result<ApiResponse, ApiError> {
        let (payload, content_type) = match &body.payload {
            Some(payload) => {
                let content_type = body.payload_content_type.clone().ok_or_else(|| {
                    ApiError::denied(400, "payload_content_type is required with a payload")
                })?;
                let bytes = decode_payload(
                    payload.as_bytes(),
                    body.payload_content_encoding.as_deref(),
                )?;
                (Some(bytes), Some(content_type))
            }
            None => (None, None),
        };

        let id = Uuid::new_v4().to_string();
        let stored = StoredSecret {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            metadata: CreateSecret {
                payload: None,
                ..body.clone()
            },
            payload,
            content_type,
            created: Utc::now().to_rfc3339(),
        };
        self.secrets.insert(id.clone(), stored);
        debug!(secret_id = %id, "created secret");

        Ok(ApiResponse::json(
            201,
            serde_json::json!({ "secret_ref": self.secret_ref(&id) }),
        ))
    }

    fn list(&self, query: &ListSecrets) -> Result<ApiResponse, ApiError> {
        let mut matching: Vec<(String, StoredSecret)> = self
            .secrets
            .iter()
            .filter(|entry| match &query.name {
                Some(name) => entry.value().metadata.name.as_deref() == Some(name.as_str()),
                None => true,
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        matching.sort_by_key(|(_, secret)| secret.seq);

        let total = matching.len();
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(DEFAULT_LIST_LIMIT);
        let secrets: Vec<serde_json::Value> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, secret)| self.metadata_json(id, secret))
            .collect();

        Ok(ApiResponse::json(
            200,
            serde_json::json!({ "secrets": secrets, "total": total }),
        ))
    }

    fn get_metadata(&self, secret_id: &str) -> Result<ApiResponse, ApiError> {
        let secret = self.secrets.get(secret_id).ok_or_else(|| not_found(secret_id))?;
        Ok(ApiResponse::json(200, self.metadata_json(secret_id, &secret)))
    }

    fn get_payload(&self, secret_id: &str) -> Result<ApiResponse, ApiError> {
        let secret = self.secrets.get(secret_id).ok_or_else(|| not_found(secret_id))?;
        match &secret.payload {
            Some(payload) => Ok(ApiResponse::bytes(200, payload.clone())),
            None => Err(ApiError::denied(404, "secret has no payload")),
        }
    }

    fn put_payload(&self, put: &PutPayload) -> Result<ApiResponse, ApiError> {
        let mut secret = self
            .secrets
            .get_mut(&put.secret_id)
            .ok_or_else(|| not_found(&put.secret_id))?;
        if secret.payload.is_some() {
            return Err(ApiError::denied(
                409,
                "secret already has a payload, it cannot be modified",
            ));
        }
        let bytes = decode_payload(&put.payload, put.content_encoding.as_deref())?;
        secret.payload = Some(bytes);
        secret.content_type = Some(put.content_type.clone());
        Ok(ApiResponse::empty(204))
    }

    fn delete(&self, secret_id: &str) -> Result<ApiResponse, ApiError> {
        self.secrets
            .remove(secret_id)
            .map(|_| ApiResponse::empty(204))
            .ok_or_else(|| not_found(secret_id))
    }

    fn handle(&self, role: Role, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        let operation = request.operation();
        self.record(role, operation);

        if !self.policy.permits(role, operation) {
            return Err(ApiError::denied(
                403,
                format!("policy does not allow {} for {}", operation, role),
            ));
        }

        match request {
            SecretRequest::Create(body) => self.create(body),
            SecretRequest::List(query) => self.list(query),
            SecretRequest::GetMetadata { secret_id } => self.get_metadata(secret_id),
            SecretRequest::GetPayload { secret_id } => self.get_payload(secret_id),
            SecretRequest::PutPayload(put) => self.put_payload(put),
            SecretRequest::Delete { secret_id } => self.delete(secret_id),
        }
    }
}

impl Default for MemoryKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A caller of [`MemoryKeyManager`] holding one role.
#[derive(Clone)]
pub struct MemoryClient {
    service: MemoryKeyManager,
    role: Role,
}

impl MemoryClient {
    pub fn role(&self) -> Role {
        self.role
    }
}

#[async_trait]
impl SecretApi for MemoryClient {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        self.service.handle(self.role, request)
    }
}

fn not_found(secret_id: &str) -> ApiError {
    ApiError::denied(404, format!("secret {} not found", secret_id))
}

fn decode_payload(payload: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::denied(400, "payload must not be empty"));
    }
    match encoding {
        Some("base64") => STANDARD
            .decode(payload)
            .map_err(|_| ApiError::denied(400, "payload is not valid base64")),
        Some(other) => Err(ApiError::denied(
            400,
            format!("unsupported payload content encoding: {}", other),
        )),
        None => Ok(payload.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycheck_client::{DenialKind, SecretList, SecretRef};

    async fn create(client: &MemoryClient, body: CreateSecret) -> String {
        let resp = client.call(&SecretRequest::Create(body)).await.unwrap();
        resp.decode::<SecretRef>().unwrap().id().unwrap().to_string()
    }

    fn kind(result: Result<ApiResponse, ApiError>) -> DenialKind {
        result.unwrap_err().denial_kind().unwrap()
    }

    #[tokio::test]
    async fn reader_is_refused() {
        let service = MemoryKeyManager::new();
        let reader = service.client(Role::ProjectReader);

        let result = reader
            .call(&SecretRequest::Create(CreateSecret::default()))
            .await;
        assert_eq!(kind(result), DenialKind::Forbidden);
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn allow_all_policy_lets_reader_through() {
        let service = MemoryKeyManager::with_policy(AccessPolicy::AllowAll);
        let reader = service.client(Role::ProjectReader);

        create(&reader, CreateSecret::default()).await;
        assert_eq!(service.len(), 1);
    }

    #[tokio::test]
    async fn base64_payload_is_decoded() {
        let service = MemoryKeyManager::new();
        let admin = service.client(Role::ProjectAdmin);

        let id = create(
            &admin,
            CreateSecret::aes_256_cbc(STANDARD.encode(b"0123456789abcdef"), "2030-01-01"),
        )
        .await;

        let resp = admin.call(&SecretRequest::get_payload(&id)).await.unwrap();
        assert_eq!(resp.as_bytes(), Some(&b"0123456789abcdef"[..]));
    }

    #[tokio::test]
    async fn payload_without_content_type_rejected() {
        let service = MemoryKeyManager::new();
        let admin = service.client(Role::ProjectAdmin);

        let body = CreateSecret {
            payload: Some("plain".to_string()),
            ..Default::default()
        };
        let result = admin.call(&SecretRequest::Create(body)).await;
        assert_eq!(kind(result), DenialKind::BadRequest);
    }

    #[tokio::test]
    async fn payload_assigned_once() {
        let service = MemoryKeyManager::new();
        let member = service.client(Role::ProjectMember);
        let id = create(&member, CreateSecret::default()).await;

        let first = PutPayload::base64_octets(&id, STANDARD.encode(b"first"));
        member
            .call(&SecretRequest::PutPayload(first))
            .await
            .unwrap();

        let second = PutPayload::base64_octets(&id, STANDARD.encode(b"second"));
        let result = member.call(&SecretRequest::PutPayload(second)).await;
        assert_eq!(kind(result), DenialKind::Conflict);
        assert_eq!(service.payload(&id), Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn empty_secret_has_no_payload() {
        let service = MemoryKeyManager::new();
        let admin = service.client(Role::ProjectAdmin);
        let id = create(&admin, CreateSecret::default()).await;

        let result = admin.call(&SecretRequest::get_payload(&id)).await;
        assert_eq!(kind(result), DenialKind::NotFound);
    }

    #[tokio::test]
    async fn list_filters_by_name_in_creation_order() {
        let service = MemoryKeyManager::new();
        let admin = service.client(Role::ProjectAdmin);
        create(&admin, CreateSecret::named("secret_1")).await;
        create(&admin, CreateSecret::named("secret_2")).await;
        create(&admin, CreateSecret::named("secret_1")).await;

        let resp = admin
            .call(&SecretRequest::List(ListSecrets::by_name("secret_1")))
            .await
            .unwrap();
        let list: SecretList = resp.decode().unwrap();
        assert_eq!(list.total, Some(2));
        assert!(list
            .secrets
            .iter()
            .all(|s| s.name.as_deref() == Some("secret_1")));

        let all: SecretList = admin
            .call(&SecretRequest::List(ListSecrets::default()))
            .await
            .unwrap()
            .decode()
            .unwrap();
        let names: Vec<_> = all.secrets.iter().filter_map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["secret_1", "secret_2", "secret_1"]);
    }

    #[tokio::test]
    async fn delete_then_not_found() {
        let service = MemoryKeyManager::new();
        let admin = service.client(Role::ProjectAdmin);
        let id = create(&admin, CreateSecret::default()).await;

        let resp = admin.call(&SecretRequest::delete(&id)).await.unwrap();
        assert_eq!(resp.status, 204);
        assert!(!service.contains(&id));

        let result = admin.call(&SecretRequest::get_metadata(&id)).await;
        assert_eq!(kind(result), DenialKind::NotFound);
        let again = admin.call(&SecretRequest::delete(&id)).await;
        assert_eq!(kind(again), DenialKind::NotFound);
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let service = MemoryKeyManager::new();
        let reader = service.client(Role::ProjectReader);
        let _ = reader.call(&SecretRequest::get_metadata("missing")).await;

        assert_eq!(
            service.calls(),
            vec![(Role::ProjectReader, Operation::GetSecretMetadata)]
        );
    }
}
