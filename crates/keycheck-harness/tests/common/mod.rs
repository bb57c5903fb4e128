//! Shared setup for harness integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keycheck_client::{ApiError, ApiResponse, Operation, SecretApi, SecretRequest};
use keycheck_config::Role;
use keycheck_harness::ClientSet;
use keycheck_memory::{AccessPolicy, MemoryClient, MemoryKeyManager};
use std::sync::Arc;

/// A fresh service plus one client per role, cleanup as project admin.
pub fn memory_clients(policy: AccessPolicy) -> (MemoryKeyManager, ClientSet) {
    let service = MemoryKeyManager::with_policy(policy);
    let clients = Role::ALL
        .into_iter()
        .fold(ClientSet::new(Role::ProjectAdmin), |set, role| {
            set.with_client(role, Arc::new(service.client(role)))
        });
    (service, clients)
}

/// Wraps a client and panics when it sees `operation`.
pub struct PanicOn<C> {
    pub inner: C,
    pub operation: Operation,
}

#[async_trait]
impl<C: SecretApi> SecretApi for PanicOn<C> {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        if request.operation() == self.operation {
            panic!("client blew up on {}", self.operation);
        }
        self.inner.call(request).await
    }
}

/// Answers 204 to a payload put on a secret that already holds one, without
/// storing anything. Everything else goes to `inner`.
pub struct AcceptsOverwrite {
    pub service: MemoryKeyManager,
    pub inner: MemoryClient,
}

#[async_trait]
impl SecretApi for AcceptsOverwrite {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        if let SecretRequest::PutPayload(put) = request {
            if self.service.payload(&put.secret_id).is_some() {
                return Ok(ApiResponse::empty(204));
            }
        }
        self.inner.call(request).await
    }
}

/// Lets `inner` carry out a create, then reports 403 anyway.
pub struct StoresThenDenies<C> {
    pub inner: C,
}

#[async_trait]
impl<C: SecretApi> SecretApi for StoresThenDenies<C> {
    async fn call(&self, request: &SecretRequest) -> Result<ApiResponse, ApiError> {
        let response = self.inner.call(request).await?;
        match request {
            SecretRequest::Create(_) => Err(ApiError::denied(403, "Forbidden")),
            _ => Ok(response),
        }
    }
}
