//! Run the whole suite against the in-memory service to check the harness itself.

use keycheck_config::Role;
use keycheck_harness::{run_suite, ClientSet, PersonaProfile, SuiteFilter};
use keycheck_memory::MemoryKeyManager;
use std::sync::Arc;
use tracing::info;

use super::run::{into_result, print_report};

pub async fn cmd_selftest(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = MemoryKeyManager::new();
    let clients = Role::ALL
        .into_iter()
        .fold(ClientSet::new(Role::ProjectAdmin), |set, role| {
            set.with_client(role, Arc::new(service.client(role)))
        });

    info!("running suite against the in-memory service");
    let report = run_suite(&clients, &PersonaProfile::all(), &SuiteFilter::default()).await;
    print_report(&report, json)?;
    into_result(&report)?;

    if !service.is_empty() {
        return Err(format!("{} secret(s) left behind after cleanup", service.len()).into());
    }
    Ok(())
}
