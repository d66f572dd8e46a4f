//! `rcall get <path>` – resilient JSON GET.

use anyhow::{Context, Result};
use rcall_core::config::RcallConfig;
use rcall_core::RemoteClient;
use serde_json::Value;

use super::report::{error_json, health_json, print_health};

pub async fn run_get(cfg: &RcallConfig, path: &str, json: bool) -> Result<()> {
    let client = RemoteClient::from_config(cfg)?;
    let outcome = client.get_json::<Value>(path).await;
    let report = client.get_metrics();

    match &outcome {
        Ok(body) => println!("{}", serde_json::to_string_pretty(body)?),
        Err(e) if json => println!("{}", serde_json::to_string_pretty(&error_json(e))?),
        Err(e) => eprintln!("{} (retryable={})", e, e.retryable()),
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&health_json(&report))?);
    } else {
        print_health(&report);
    }

    outcome
        .map(|_| ())
        .with_context(|| format!("GET {} failed", path))
}
