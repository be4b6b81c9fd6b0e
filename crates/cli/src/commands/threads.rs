//! `sunnyside threads` — List stored conversation threads.

use anyhow::Context as _;
use sunnyside_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let memory = sunnyside_memory::build_memory(&config.memory)?;

    if memory.name() == "in_memory" {
        eprintln!("  The in-memory backend keeps no threads between runs.");
        eprintln!("  Set [memory] backend = \"file\" to persist conversations.");
        return Ok(());
    }

    for thread_id in memory.threads().await? {
        let transcript = memory.get(&thread_id).await?;
        println!(
            "{thread_id}\t{} messages\tlast active {}",
            transcript.len(),
            transcript.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
