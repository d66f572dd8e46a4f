//! `rcall probe [url]` – single-attempt health check.

use anyhow::{bail, Result};
use rcall_core::config::RcallConfig;
use rcall_core::RemoteClient;

use super::report::print_health;

pub async fn run_probe(cfg: &RcallConfig) -> Result<()> {
    if cfg.base_url.is_none() {
        bail!("no backend URL: pass one or set base_url in config");
    }
    let client = RemoteClient::from_config(cfg)?;
    let up = client.test_connection().await;
    println!(
        "{} {}",
        cfg.base_url.as_deref().unwrap_or_default(),
        if up { "UP" } else { "DOWN" }
    );
    print_health(&client.get_metrics());
    if !up {
        bail!("backend unreachable");
    }
    Ok(())
}
