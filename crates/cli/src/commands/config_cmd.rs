//! `sunnyside config` — Configuration management commands.

use anyhow::{Context as _, bail};
use sunnyside_config::AppConfig;

pub fn show() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");

    if !config.has_api_key() {
        eprintln!("  ⚠️  No API key set (set SUNNYSIDE_API_KEY or ANTHROPIC_API_KEY)");
    }
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_path().display());
}

pub fn init(force: bool) -> anyhow::Result<()> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}
