//! Scenario bodies. Each one drives a [`ScenarioContext`] through setup, act
//! and verify; the suite driver owns cleanup.

use keycheck_client::{
    CreateSecret, DenialKind, ListSecrets, Operation, PutPayload, SecretList, SecretMetadata,
    SecretRequest,
};
use keycheck_crypto::{create_aes_key, SymmetricKey};
use serde::Serialize;
use std::str::FromStr;

use crate::dispatcher::{Phase, ScenarioContext};
use crate::fixtures::{
    aes_secret, create_aes_secret_admin, create_empty_secret_admin, created_id,
    put_payload_admin, secret_ids_named_admin, unique_name,
};
use crate::outcome::{ensure, CallResult, Expected};
use crate::tracker::ResourceType;
use crate::HarnessError;

/// Every scenario the suite knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    CreateSecret,
    ListSecrets,
    DeleteSecret,
    GetSecret,
    GetSecretPayload,
    PutSecretPayload,
    CreateDeleteEmptySecret,
    CreateDeleteSymmetricKey,
    PayloadAssignedOnce,
}

impl ScenarioKind {
    /// Persona-table scenarios, one per operation.
    pub const POLICY: [ScenarioKind; 6] = [
        ScenarioKind::CreateSecret,
        ScenarioKind::ListSecrets,
        ScenarioKind::DeleteSecret,
        ScenarioKind::GetSecret,
        ScenarioKind::GetSecretPayload,
        ScenarioKind::PutSecretPayload,
    ];

    /// Functional scenarios run once as project admin.
    pub const LIFECYCLE: [ScenarioKind; 3] = [
        ScenarioKind::CreateDeleteEmptySecret,
        ScenarioKind::CreateDeleteSymmetricKey,
        ScenarioKind::PayloadAssignedOnce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::CreateSecret => "create_secret",
            ScenarioKind::ListSecrets => "list_secrets",
            ScenarioKind::DeleteSecret => "delete_secret",
            ScenarioKind::GetSecret => "get_secret",
            ScenarioKind::GetSecretPayload => "get_secret_payload",
            ScenarioKind::PutSecretPayload => "put_secret_payload",
            ScenarioKind::CreateDeleteEmptySecret => "create_delete_empty_secret",
            ScenarioKind::CreateDeleteSymmetricKey => "create_delete_symmetric_key",
            ScenarioKind::PayloadAssignedOnce => "payload_assigned_once",
        }
    }

    /// Operation whose persona expectation governs this scenario.
    /// `None` for lifecycle scenarios.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            ScenarioKind::CreateSecret => Some(Operation::CreateSecret),
            ScenarioKind::ListSecrets => Some(Operation::ListSecrets),
            ScenarioKind::DeleteSecret => Some(Operation::DeleteSecret),
            ScenarioKind::GetSecret => Some(Operation::GetSecretMetadata),
            ScenarioKind::GetSecretPayload => Some(Operation::GetSecretPayload),
            ScenarioKind::PutSecretPayload => Some(Operation::PutSecretPayload),
            ScenarioKind::CreateDeleteEmptySecret
            | ScenarioKind::CreateDeleteSymmetricKey
            | ScenarioKind::PayloadAssignedOnce => None,
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        self.operation().is_none()
    }

    /// Run the body. Policy scenarios need the persona's expectation for the
    /// governing operation; lifecycle scenarios declare their own and ignore it.
    pub async fn run(
        self,
        ctx: &mut ScenarioContext,
        expected: Option<Expected>,
    ) -> Result<(), HarnessError> {
        match (self, expected) {
            (ScenarioKind::CreateDeleteEmptySecret, _) => create_delete_empty_secret(ctx).await,
            (ScenarioKind::CreateDeleteSymmetricKey, _) => create_delete_symmetric_key(ctx).await,
            (ScenarioKind::PayloadAssignedOnce, _) => payload_assigned_once(ctx).await,
            (_, None) => Err(HarnessError::MissingExpectation(self.as_str())),
            (ScenarioKind::CreateSecret, Some(e)) => create_secret(ctx, e).await,
            (ScenarioKind::ListSecrets, Some(e)) => list_secrets(ctx, e).await,
            (ScenarioKind::DeleteSecret, Some(e)) => delete_secret(ctx, e).await,
            (ScenarioKind::GetSecret, Some(e)) => get_secret(ctx, e).await,
            (ScenarioKind::GetSecretPayload, Some(e)) => get_secret_payload(ctx, e).await,
            (ScenarioKind::PutSecretPayload, Some(e)) => put_secret_payload(ctx, e).await,
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::POLICY
            .into_iter()
            .chain(ScenarioKind::LIFECYCLE)
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown scenario: {}", s))
    }
}

const OK_201: Expected = Expected::Status(201);
const OK_200: Expected = Expected::Status(200);
const OK_204: Expected = Expected::Status(204);
const NOT_FOUND: Expected = Expected::Denied(DenialKind::NotFound);
const CONFLICT: Expected = Expected::Denied(DenialKind::Conflict);

/// Page size for the unfiltered listing.
const LIST_PAGE: u32 = 100;
/// Upper bound on pages fetched, in case a service ignores `offset`.
const MAX_LIST_PAGES: usize = 1000;

fn metadata(result: &CallResult) -> Result<SecretMetadata, HarnessError> {
    result
        .success()
        .and_then(|resp| resp.decode::<SecretMetadata>())
        .ok_or_else(|| HarnessError::InvalidResponse("expected secret metadata".to_string()))
}

fn payload_bytes(result: &CallResult) -> Result<&[u8], HarnessError> {
    result
        .success()
        .and_then(|resp| resp.as_bytes())
        .ok_or_else(|| HarnessError::InvalidResponse("expected payload bytes".to_string()))
}

fn secret_list(result: &CallResult) -> Result<Option<SecretList>, HarnessError> {
    match result.success() {
        None => Ok(None),
        Some(resp) => resp
            .decode()
            .map(Some)
            .ok_or_else(|| HarnessError::InvalidResponse("expected a secret list".to_string())),
    }
}

fn check_payload(result: &CallResult, key: &SymmetricKey) -> Result<(), HarnessError> {
    let payload = payload_bytes(result)?;
    ensure(key.matches_payload(payload), || {
        "payload does not match the stored key".to_string()
    })?;
    Ok(())
}

async fn create_secret(ctx: &mut ScenarioContext, expected: Expected) -> Result<(), HarnessError> {
    let key = create_aes_key();
    for body in [CreateSecret::default(), aes_secret(&key)] {
        let name = unique_name();
        ctx.enter(Phase::Act);
        let result = ctx
            .as_persona(
                &SecretRequest::Create(body.with_name(&name)),
                expected,
                Some(ResourceType::Secret),
            )
            .await?;

        if result.is_denied() {
            ctx.enter(Phase::Verify);
            let stored = secret_ids_named_admin(ctx, &name).await?;
            for id in &stored {
                ctx.register(ResourceType::Secret, id.as_str());
            }
            ensure(stored.is_empty(), || {
                format!("denied create still stored {} as {:?}", name, stored)
            })?;
        }
    }
    Ok(())
}

/// Every id the persona can list, following `offset` until the listing is
/// exhausted. `None` when the persona is refused.
async fn list_every_id(
    ctx: &mut ScenarioContext,
    expected: Expected,
) -> Result<Option<Vec<String>>, HarnessError> {
    let mut ids = Vec::new();
    let mut seen: u32 = 0;
    for _ in 0..MAX_LIST_PAGES {
        let query = ListSecrets {
            name: None,
            limit: Some(LIST_PAGE),
            offset: Some(seen),
        };
        let result = ctx
            .as_persona(&SecretRequest::List(query), expected, None)
            .await?;
        let Some(page) = secret_list(&result)? else {
            return Ok(None);
        };

        let fetched = page.secrets.len();
        seen = seen.saturating_add(fetched as u32);
        ids.extend(page.secrets.iter().filter_map(|s| s.id().map(str::to_string)));

        let exhausted = match page.total {
            Some(total) => u64::from(seen) >= total,
            None => fetched < LIST_PAGE as usize,
        };
        if fetched == 0 || exhausted {
            return Ok(Some(ids));
        }
    }
    Err(HarnessError::InvalidResponse(format!(
        "listing did not end after {} pages",
        MAX_LIST_PAGES
    )))
}

async fn list_secrets(ctx: &mut ScenarioContext, expected: Expected) -> Result<(), HarnessError> {
    let first = create_empty_secret_admin(ctx, "secret_1").await?;
    let second = create_empty_secret_admin(ctx, "secret_2").await?;

    ctx.enter(Phase::Act);
    for name in ["secret_1", "secret_2"] {
        let result = ctx
            .as_persona(&SecretRequest::List(ListSecrets::by_name(name)), expected, None)
            .await?;
        if let Some(list) = secret_list(&result)? {
            ensure(!list.secrets.is_empty(), || {
                format!("list by name '{}' returned nothing", name)
            })?;
            ensure(
                list.secrets.iter().all(|s| s.name.as_deref() == Some(name)),
                || format!("list by name '{}' returned other names", name),
            )?;
        }
    }

    if let Some(ids) = list_every_id(ctx, expected).await? {
        ctx.enter(Phase::Verify);
        ensure(ids.contains(&first) && ids.contains(&second), || {
            format!(
                "unfiltered list of {} secrets is missing {} or {}",
                ids.len(),
                first,
                second
            )
        })?;
    }
    Ok(())
}

async fn delete_secret(ctx: &mut ScenarioContext, expected: Expected) -> Result<(), HarnessError> {
    let id = create_empty_secret_admin(ctx, "secret_1").await?;

    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(&SecretRequest::delete(&id), expected, None)
        .await?;

    ctx.enter(Phase::Verify);
    if result.is_denied() {
        ctx.as_helper(&SecretRequest::get_metadata(&id), OK_200, None)
            .await?;
    } else {
        ctx.release(ResourceType::Secret, &id);
    }
    Ok(())
}

async fn get_secret(ctx: &mut ScenarioContext, expected: Expected) -> Result<(), HarnessError> {
    let id = create_empty_secret_admin(ctx, "secret_1").await?;

    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(&SecretRequest::get_metadata(&id), expected, None)
        .await?;

    if result.success().is_some() {
        ctx.enter(Phase::Verify);
        let meta = metadata(&result)?;
        ensure(meta.id() == Some(id.as_str()), || {
            format!("metadata refers to {:?}, expected {}", meta.id(), id)
        })?;
    }
    Ok(())
}

async fn get_secret_payload(
    ctx: &mut ScenarioContext,
    expected: Expected,
) -> Result<(), HarnessError> {
    let (key, id) = create_aes_secret_admin(ctx, "secret_1").await?;

    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(&SecretRequest::get_payload(&id), expected, None)
        .await?;

    if result.success().is_some() {
        ctx.enter(Phase::Verify);
        check_payload(&result, &key)?;
    }
    Ok(())
}

async fn put_secret_payload(
    ctx: &mut ScenarioContext,
    expected: Expected,
) -> Result<(), HarnessError> {
    let id = create_empty_secret_admin(ctx, "secret_1").await?;
    let first = create_aes_key();

    ctx.enter(Phase::Act);
    let put = SecretRequest::PutPayload(PutPayload::base64_octets(&id, first.as_base64()));
    let result = ctx.as_persona(&put, expected, None).await?;

    // Whoever holds the payload now, a second put by the persona must not replace it.
    let stored = if result.is_denied() {
        ctx.enter(Phase::Verify);
        ctx.as_helper(&SecretRequest::get_payload(&id), NOT_FOUND, None)
            .await?;
        put_payload_admin(ctx, &id).await?
    } else {
        ctx.enter(Phase::Verify);
        let read = ctx
            .as_persona(&SecretRequest::get_payload(&id), OK_200, None)
            .await?;
        check_payload(&read, &first)?;
        first
    };

    ctx.enter(Phase::Act);
    let second = create_aes_key();
    let overwrite = if result.is_denied() { expected } else { CONFLICT };
    ctx.as_persona(
        &SecretRequest::PutPayload(PutPayload::base64_octets(&id, second.as_base64())),
        overwrite,
        None,
    )
    .await?;

    ctx.enter(Phase::Verify);
    let read = ctx
        .as_helper(&SecretRequest::get_payload(&id), OK_200, None)
        .await?;
    check_payload(&read, &stored)
}

async fn create_delete_empty_secret(ctx: &mut ScenarioContext) -> Result<(), HarnessError> {
    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(
            &SecretRequest::Create(CreateSecret::default()),
            OK_201,
            Some(ResourceType::Secret),
        )
        .await?;
    let id = created_id(&result)?;

    ctx.as_persona(&SecretRequest::delete(&id), OK_204, None)
        .await?;
    ctx.release(ResourceType::Secret, &id);
    Ok(())
}

async fn create_delete_symmetric_key(ctx: &mut ScenarioContext) -> Result<(), HarnessError> {
    let key = create_aes_key();

    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(
            &SecretRequest::Create(aes_secret(&key)),
            OK_201,
            Some(ResourceType::Secret),
        )
        .await?;
    let id = created_id(&result)?;

    ctx.enter(Phase::Verify);
    let read = ctx
        .as_persona(&SecretRequest::get_payload(&id), OK_200, None)
        .await?;
    check_payload(&read, &key)?;

    ctx.as_persona(&SecretRequest::delete(&id), OK_204, None)
        .await?;
    ctx.release(ResourceType::Secret, &id);

    ctx.as_persona(&SecretRequest::get_metadata(&id), NOT_FOUND, None)
        .await?;
    Ok(())
}

async fn payload_assigned_once(ctx: &mut ScenarioContext) -> Result<(), HarnessError> {
    ctx.enter(Phase::Act);
    let result = ctx
        .as_persona(
            &SecretRequest::Create(CreateSecret::default()),
            OK_201,
            Some(ResourceType::Secret),
        )
        .await?;
    let id = created_id(&result)?;

    let first = create_aes_key();
    ctx.as_persona(
        &SecretRequest::PutPayload(PutPayload::base64_octets(&id, first.as_base64())),
        OK_204,
        None,
    )
    .await?;

    let second = create_aes_key();
    ctx.as_persona(
        &SecretRequest::PutPayload(PutPayload::base64_octets(&id, second.as_base64())),
        CONFLICT,
        None,
    )
    .await?;

    ctx.enter(Phase::Verify);
    let read = ctx
        .as_persona(&SecretRequest::get_payload(&id), OK_200, None)
        .await?;
    check_payload(&read, &first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{PROJECT_ADMIN, PROJECT_MEMBER};
    use keycheck_client::MockSecretApi;
    use std::sync::Arc;

    fn silent_context(scenario: ScenarioKind) -> ScenarioContext {
        // Mocks without expectations panic on any call.
        ScenarioContext::new(
            PROJECT_MEMBER,
            scenario.as_str(),
            Arc::new(MockSecretApi::new()),
            Arc::new(MockSecretApi::new()),
            Arc::new(MockSecretApi::new()),
        )
    }

    #[test]
    fn names_round_trip() {
        for kind in ScenarioKind::POLICY.into_iter().chain(ScenarioKind::LIFECYCLE) {
            assert_eq!(kind.as_str().parse::<ScenarioKind>().unwrap(), kind);
        }
        assert!("rotate_secret".parse::<ScenarioKind>().is_err());
    }

    #[test]
    fn policy_scenarios_cover_every_operation() {
        for op in Operation::ALL {
            assert!(ScenarioKind::POLICY
                .iter()
                .any(|k| k.operation() == Some(op)));
        }
        assert!(ScenarioKind::LIFECYCLE.iter().all(|k| k.is_lifecycle()));
    }

    #[tokio::test]
    async fn policy_scenario_without_expectation_is_an_error() {
        for kind in ScenarioKind::POLICY {
            let mut ctx = silent_context(kind);
            let err = kind.run(&mut ctx, None).await.unwrap_err();
            assert!(
                matches!(err, HarnessError::MissingExpectation(name) if name == kind.as_str()),
                "{}: {}",
                kind,
                err
            );
            assert!(!err.is_verification());
            assert!(ctx.tracker().is_empty());
        }
    }

    #[tokio::test]
    async fn lifecycle_scenario_ignores_expectation() {
        let mut admin = MockSecretApi::new();
        admin.expect_call().returning(|req| match req {
            SecretRequest::Create(_) => Ok(keycheck_client::ApiResponse::json(
                201,
                serde_json::json!({ "secret_ref": "http://kms/v1/secrets/abc" }),
            )),
            _ => Ok(keycheck_client::ApiResponse::empty(204)),
        });
        let mut ctx = ScenarioContext::new(
            PROJECT_ADMIN,
            "create_delete_empty_secret",
            Arc::new(admin),
            Arc::new(MockSecretApi::new()),
            Arc::new(MockSecretApi::new()),
        );

        ScenarioKind::CreateDeleteEmptySecret
            .run(&mut ctx, None)
            .await
            .unwrap();
        assert!(ctx.tracker().is_empty());
    }
}
