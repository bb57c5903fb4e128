//! Resources the helper creates before the persona acts.

use chrono::{Duration, SecondsFormat, Utc};
use keycheck_client::{
    CreateSecret, ListSecrets, PutPayload, SecretList, SecretRef, SecretRequest,
};
use keycheck_crypto::{create_aes_key, SymmetricKey};
use uuid::Uuid;

use crate::dispatcher::ScenarioContext;
use crate::outcome::{CallResult, Expected};
use crate::tracker::ResourceType;
use crate::HarnessError;

/// Days until fixture keys expire.
pub const KEY_EXPIRATION_DAYS: i64 = 5;

/// UTC now plus `days`, ISO-8601.
pub fn expiration_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// AES-256-CBC secret body carrying `key` as its payload.
pub fn aes_secret(key: &SymmetricKey) -> CreateSecret {
    CreateSecret::aes_256_cbc(key.as_base64(), expiration_in_days(KEY_EXPIRATION_DAYS))
}

/// Secret name no other run will pick, so a lookup by name finds only ours.
pub fn unique_name() -> String {
    format!("keycheck-{}", Uuid::new_v4())
}

/// Pull the created id out of a create result.
pub fn created_id(result: &CallResult) -> Result<String, HarnessError> {
    result
        .success()
        .and_then(|resp| resp.decode::<SecretRef>())
        .and_then(|r| r.id().map(str::to_string))
        .ok_or_else(|| HarnessError::Fixture("create returned no secret_ref".to_string()))
}

/// Empty secret named `name`, created by the helper and tracked.
pub async fn create_empty_secret_admin(
    ctx: &mut ScenarioContext,
    name: &str,
) -> Result<String, HarnessError> {
    let result = ctx
        .as_helper(
            &SecretRequest::Create(CreateSecret::named(name)),
            Expected::Status(201),
            Some(ResourceType::Secret),
        )
        .await
        .map_err(as_fixture)?;
    created_id(&result)
}

/// AES secret with a fresh key, created by the helper and tracked.
pub async fn create_aes_secret_admin(
    ctx: &mut ScenarioContext,
    name: &str,
) -> Result<(SymmetricKey, String), HarnessError> {
    let key = create_aes_key();
    let result = ctx
        .as_helper(
            &SecretRequest::Create(aes_secret(&key).with_name(name)),
            Expected::Status(201),
            Some(ResourceType::Secret),
        )
        .await
        .map_err(as_fixture)?;
    let id = created_id(&result)?;
    Ok((key, id))
}

/// Assign a fresh key as the payload of `secret_id`, as the helper.
pub async fn put_payload_admin(
    ctx: &mut ScenarioContext,
    secret_id: &str,
) -> Result<SymmetricKey, HarnessError> {
    let key = create_aes_key();
    ctx.as_helper(
        &SecretRequest::PutPayload(PutPayload::base64_octets(secret_id, key.as_base64())),
        Expected::Status(204),
        None,
    )
    .await
    .map_err(as_fixture)?;
    Ok(key)
}

/// Ids of every secret named `name`, as the helper sees them.
pub async fn secret_ids_named_admin(
    ctx: &mut ScenarioContext,
    name: &str,
) -> Result<Vec<String>, HarnessError> {
    let result = ctx
        .as_helper(
            &SecretRequest::List(ListSecrets::by_name(name)),
            Expected::Status(200),
            None,
        )
        .await
        .map_err(as_fixture)?;
    let list: SecretList = result
        .success()
        .and_then(|resp| resp.decode())
        .ok_or_else(|| HarnessError::InvalidResponse("expected a secret list".to_string()))?;
    Ok(list
        .secrets
        .iter()
        .filter_map(|s| s.id().map(str::to_string))
        .collect())
}

// A helper refusal says nothing about the persona under test.
fn as_fixture(err: HarnessError) -> HarnessError {
    match err {
        HarnessError::Verification(e) => HarnessError::Fixture(e.to_string()),
        other => other,
    }
}
