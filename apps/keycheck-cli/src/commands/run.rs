//! Suite run against a live endpoint, and the report printer shared with selftest.

use keycheck_harness::{
    run_suite, ClientSet, Persona, PersonaProfile, ScenarioKind, SuiteFilter, SuiteReport,
};
use std::path::Path;

use super::load_config;

pub async fn cmd_run(
    config_path: Option<&Path>,
    endpoint: Option<&str>,
    personas: Vec<String>,
    scenarios: Vec<ScenarioKind>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for name in &personas {
        name.parse::<Persona>()?;
    }

    let config = load_config(config_path, endpoint)?;
    let clients = ClientSet::from_config(&config)?;
    let filter = SuiteFilter {
        personas,
        scenarios,
    };

    let report = run_suite(&clients, &PersonaProfile::all(), &filter).await;
    print_report(&report, json)?;
    into_result(&report)
}

pub(crate) fn print_report(
    report: &SuiteReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for scenario in &report.scenarios {
        match scenario.verdict.detail() {
            Some(detail) => println!(
                "{:<5} {:<15} {:<28} {}",
                scenario.verdict.label(),
                scenario.persona,
                scenario.scenario.as_str(),
                detail
            ),
            None => println!(
                "{:<5} {:<15} {}",
                scenario.verdict.label(),
                scenario.persona,
                scenario.scenario.as_str()
            ),
        }
        for (entry, error) in &scenario.cleanup.failed {
            println!(
                "      leaked {} {}: {}",
                entry.resource_type, entry.id, error
            );
        }
    }

    println!(
        "\n{} passed, {} failed, {} errored, {} skipped",
        report.passed(),
        report.failed(),
        report.errored(),
        report.skipped()
    );
    if report.leaked() > 0 {
        println!("{} resource(s) could not be cleaned up", report.leaked());
    }
    Ok(())
}

pub(crate) fn into_result(report: &SuiteReport) -> Result<(), Box<dyn std::error::Error>> {
    if report.success() {
        Ok(())
    } else {
        Err(format!(
            "{} scenario(s) failed, {} errored",
            report.failed(),
            report.errored()
        )
        .into())
    }
}
