//! Generic scenario driver: one body per scenario, one expectation table per
//! persona, cleanup on every exit path.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::clients::ClientSet;
use crate::dispatcher::ScenarioContext;
use crate::outcome::Expected;
use crate::persona::{PersonaProfile, PROJECT_ADMIN};
use crate::scenario::ScenarioKind;
use crate::tracker::CleanupReport;
use crate::HarnessError;

/// How a scenario ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// An outcome or data check did not hold.
    Failed(String),
    /// The scenario could not complete; says nothing about the policy.
    Errored(String),
    Skipped(String),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASS",
            Verdict::Failed(_) => "FAIL",
            Verdict::Errored(_) => "ERROR",
            Verdict::Skipped(_) => "SKIP",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Verdict::Passed => None,
            Verdict::Failed(d) | Verdict::Errored(d) | Verdict::Skipped(d) => Some(d),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub persona: &'static str,
    pub scenario: ScenarioKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Expected>,
    pub verdict: Verdict,
    pub cleanup: CleanupReport,
}

/// Outcome of a whole run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.scenarios.iter().filter(|s| pred(&s.verdict)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Failed(_)))
    }

    pub fn errored(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Errored(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Skipped(_)))
    }

    /// Cleanup deletes that did not go through.
    pub fn leaked(&self) -> usize {
        self.scenarios.iter().map(|s| s.cleanup.failed.len()).sum()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0 && self.errored() == 0
    }
}

/// Which personas and scenarios to run. Empty filters select everything.
#[derive(Clone, Debug, Default)]
pub struct SuiteFilter {
    pub personas: Vec<String>,
    pub scenarios: Vec<ScenarioKind>,
}

impl SuiteFilter {
    fn wants_persona(&self, name: &str) -> bool {
        self.personas.is_empty() || self.personas.iter().any(|p| p == name)
    }

    fn wants_scenario(&self, kind: ScenarioKind) -> bool {
        self.scenarios.is_empty() || self.scenarios.contains(&kind)
    }
}

/// Run one scenario for one persona, then clean up whatever it left behind.
pub async fn run_scenario(
    clients: &ClientSet,
    profile: &PersonaProfile,
    kind: ScenarioKind,
) -> ScenarioReport {
    let persona = profile.persona;
    let expected = kind.operation().and_then(|op| profile.expected(op));
    let mut report = ScenarioReport {
        persona: persona.name,
        scenario: kind,
        expected,
        verdict: Verdict::Passed,
        cleanup: CleanupReport::default(),
    };

    if !kind.is_lifecycle() && expected.is_none() {
        report.verdict = Verdict::Skipped("not asserted for this persona".to_string());
        return report;
    }
    if !clients.has(persona.role) {
        report.verdict = Verdict::Skipped(format!("no credential for role {}", persona.role));
        return report;
    }

    let mut ctx = match context(clients, profile, kind) {
        Ok(ctx) => ctx,
        Err(e) => {
            report.verdict = Verdict::Errored(e.to_string());
            return report;
        }
    };

    info!(scenario = %kind, persona = persona.name, "scenario started");
    let outcome = AssertUnwindSafe(kind.run(&mut ctx, expected))
        .catch_unwind()
        .await;
    report.cleanup = ctx.teardown().await;

    report.verdict = match outcome {
        Ok(Ok(())) => Verdict::Passed,
        Ok(Err(e)) if e.is_verification() => Verdict::Failed(e.to_string()),
        Ok(Err(e)) => Verdict::Errored(e.to_string()),
        Err(panic) => Verdict::Errored(format!("scenario panicked: {}", panic_message(&*panic))),
    };
    match &report.verdict {
        Verdict::Passed => info!(scenario = %kind, persona = persona.name, "passed"),
        Verdict::Failed(msg) => warn!(scenario = %kind, persona = persona.name, %msg, "failed"),
        Verdict::Errored(msg) => error!(scenario = %kind, persona = persona.name, %msg, "errored"),
        Verdict::Skipped(_) => {}
    }
    report
}

fn context(
    clients: &ClientSet,
    profile: &PersonaProfile,
    kind: ScenarioKind,
) -> Result<ScenarioContext, HarnessError> {
    let persona = profile.persona;
    Ok(ScenarioContext::new(
        persona,
        kind.as_str(),
        clients.client(persona.role)?,
        clients.client(persona.helper)?,
        clients.cleanup_client()?,
    ))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run every selected policy scenario for every selected persona, then the
/// lifecycle scenarios as project admin. Strictly one scenario at a time.
pub async fn run_suite(
    clients: &ClientSet,
    profiles: &[PersonaProfile],
    filter: &SuiteFilter,
) -> SuiteReport {
    let mut report = SuiteReport::default();

    for profile in profiles {
        if !filter.wants_persona(profile.persona.name) {
            continue;
        }
        for kind in ScenarioKind::POLICY {
            if filter.wants_scenario(kind) {
                report
                    .scenarios
                    .push(run_scenario(clients, profile, kind).await);
            }
        }
    }

    if filter.wants_persona(PROJECT_ADMIN.name) {
        let admin = PersonaProfile::project_admin();
        for kind in ScenarioKind::LIFECYCLE {
            if filter.wants_scenario(kind) {
                report
                    .scenarios
                    .push(run_scenario(clients, &admin, kind).await);
            }
        }
    }

    info!(
        passed = report.passed(),
        failed = report.failed(),
        errored = report.errored(),
        skipped = report.skipped(),
        "suite finished"
    );
    report
}
