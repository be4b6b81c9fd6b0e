//! `sunnyside tools` — Print the tool schemas sent to the model.

use anyhow::Context as _;

pub fn run() -> anyhow::Result<()> {
    let registry = sunnyside_tools::default_registry()?;
    let json = serde_json::to_string_pretty(&registry.list_schemas())
        .context("Failed to encode tool schemas")?;
    println!("{json}");
    Ok(())
}
