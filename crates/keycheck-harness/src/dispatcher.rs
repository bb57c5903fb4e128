//! Dispatching calls as a persona and the per-scenario context around it.

use keycheck_client::{ApiError, SecretApi, SecretRef, SecretRequest};
use std::sync::Arc;
use tracing::{debug, info};

use crate::outcome::{verify, CallResult, Denial, Expected};
use crate::persona::Persona;
use crate::tracker::{CleanupReport, ResourceTracker, ResourceType};
use crate::HarnessError;

/// Make the call and capture a 4xx refusal as [`CallResult::Denied`].
/// Transport failures propagate.
pub async fn dispatch(
    client: &dyn SecretApi,
    request: &SecretRequest,
) -> Result<CallResult, ApiError> {
    let result = match client.call(request).await {
        Ok(resp) => CallResult::Success(resp),
        Err(ApiError::Denied {
            kind,
            status,
            message,
        }) => CallResult::Denied(Denial {
            kind,
            status,
            message,
        }),
        Err(e) => return Err(e),
    };
    debug!(
        operation = %request.operation(),
        status = result.status(),
        denied = result.is_denied(),
        "dispatched"
    );
    Ok(result)
}

/// Perform one call and check it against `expected`.
///
/// When `cleanup` is set and the call created something, the new resource is
/// registered with `tracker` before the outcome is verified.
pub async fn perform(
    client: &dyn SecretApi,
    tracker: &mut ResourceTracker,
    request: &SecretRequest,
    expected: Expected,
    cleanup: Option<ResourceType>,
) -> Result<CallResult, HarnessError> {
    let operation = request.operation();
    let result = dispatch(client, request).await?;

    if let (Some(resource_type), Some(resp)) = (cleanup, result.success()) {
        if operation.creates_resource() {
            let id = resp
                .decode::<SecretRef>()
                .and_then(|r| r.id().map(str::to_string))
                .ok_or_else(|| {
                    HarnessError::InvalidResponse(format!(
                        "{} returned no usable secret_ref",
                        operation
                    ))
                })?;
            tracker.register(resource_type, id);
        }
    }

    verify(&result, &expected)?;
    Ok(result)
}

/// Stage of a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Act,
    Verify,
    Cleanup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Act => "act",
            Phase::Verify => "verify",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Everything one scenario needs: the persona's client, the helper's client,
/// the cleanup client and the resources created so far.
pub struct ScenarioContext {
    persona: Persona,
    scenario: &'static str,
    actor: Arc<dyn SecretApi>,
    helper: Arc<dyn SecretApi>,
    cleanup: Arc<dyn SecretApi>,
    tracker: ResourceTracker,
    phase: Phase,
}

impl ScenarioContext {
    pub fn new(
        persona: Persona,
        scenario: &'static str,
        actor: Arc<dyn SecretApi>,
        helper: Arc<dyn SecretApi>,
        cleanup: Arc<dyn SecretApi>,
    ) -> Self {
        Self {
            persona,
            scenario,
            actor,
            helper,
            cleanup,
            tracker: ResourceTracker::new(),
            phase: Phase::Setup,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            info!(
                scenario = self.scenario,
                persona = self.persona.name,
                from = %self.phase,
                to = %phase,
                "phase"
            );
            self.phase = phase;
        }
    }

    /// Call as the persona under test.
    pub async fn as_persona(
        &mut self,
        request: &SecretRequest,
        expected: Expected,
        cleanup: Option<ResourceType>,
    ) -> Result<CallResult, HarnessError> {
        let client = Arc::clone(&self.actor);
        perform(client.as_ref(), &mut self.tracker, request, expected, cleanup).await
    }

    /// Call as the fixture helper.
    pub async fn as_helper(
        &mut self,
        request: &SecretRequest,
        expected: Expected,
        cleanup: Option<ResourceType>,
    ) -> Result<CallResult, HarnessError> {
        let client = Arc::clone(&self.helper);
        perform(client.as_ref(), &mut self.tracker, request, expected, cleanup).await
    }

    /// Track a resource found after the fact so teardown deletes it.
    pub fn register(&mut self, resource_type: ResourceType, id: impl Into<String>) -> bool {
        self.tracker.register(resource_type, id)
    }

    pub fn release(&mut self, resource_type: ResourceType, id: &str) -> bool {
        self.tracker.release(resource_type, id)
    }

    /// Delete whatever is still pending with the cleanup credential.
    pub async fn teardown(&mut self) -> CleanupReport {
        self.enter(Phase::Cleanup);
        let client = Arc::clone(&self.cleanup);
        let report = self.tracker.cleanup_all(client.as_ref()).await;
        if report.attempted() > 0 {
            info!(
                scenario = self.scenario,
                persona = self.persona.name,
                deleted = report.deleted.len(),
                already_gone = report.already_gone.len(),
                failed = report.failed.len(),
                "cleanup finished"
            );
        }
        report
    }
}
