use keycheck_client::{HttpSecretClient, Operation, ResponseBody, SecretRef, SecretRequest};
use keycheck_config::Role;
use keycheck_harness::{dispatch, verify, CallResult, Expected};
use std::collections::BTreeMap;
use std::path::Path;

use super::load_config;

pub async fn cmd_call(
    config_path: Option<&Path>,
    endpoint: Option<&str>,
    operation: Operation,
    role: Role,
    expect: Option<Expected>,
    params: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path, endpoint)?;
    config.validate()?;
    let credential = config.credential(role)?;
    let client = HttpSecretClient::from_config(&config, credential)?;

    let params: BTreeMap<String, String> = params.into_iter().collect();
    let request = SecretRequest::from_params(operation, &params)?;
    let expected = expect.unwrap_or(Expected::Status(operation.success_status()));

    let result = dispatch(&client, &request).await?;
    print_result(&result);

    verify(&result, &expected)?;
    println!("✓ {} as {}: {}", operation, role, expected);
    Ok(())
}

fn print_result(result: &CallResult) {
    match result {
        CallResult::Success(resp) => {
            println!("Status: {}", resp.status);
            match &resp.body {
                ResponseBody::Json(value) => {
                    if let Some(secret) = resp.decode::<SecretRef>() {
                        if let Some(id) = secret.id() {
                            println!("Secret ID: {} (not cleaned up)", id);
                        }
                    }
                    match serde_json::to_string_pretty(value) {
                        Ok(text) => println!("{}", text),
                        Err(_) => println!("{}", value),
                    }
                }
                ResponseBody::Bytes(bytes) => {
                    println!(
                        "Payload ({} bytes): {}",
                        bytes.len(),
                        String::from_utf8_lossy(bytes)
                    );
                }
                ResponseBody::Empty => {}
            }
        }
        CallResult::Denied(denial) => {
            println!("Denied: {} (status {})", denial.kind, denial.status);
            if !denial.message.is_empty() {
                println!("{}", denial.message);
            }
        }
    }
}
