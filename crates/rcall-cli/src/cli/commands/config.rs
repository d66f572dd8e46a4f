//! `rcall config` – show where config lives and what is in effect.

use anyhow::Result;
use rcall_core::config::{self, RcallConfig};

pub fn run_config(cfg: &RcallConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
