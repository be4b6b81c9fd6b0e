//! `sunnyside chat` — Interactive or single-message chat mode.

use anyhow::Context as _;
use std::io::Write;
use std::sync::Arc;
use sunnyside_agent::AgentLoop;
use sunnyside_config::AppConfig;
use sunnyside_core::context::Context;
use sunnyside_core::error::ProviderError;
use sunnyside_core::event::DomainEvent;
use sunnyside_core::message::ThreadId;
use sunnyside_core::output::ResponseFormat;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(
    message: Option<String>,
    thread: Option<String>,
    user_id: String,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    let provider = match sunnyside_providers::build_from_config(&config) {
        Ok(provider) => provider,
        Err(ProviderError::NotConfigured(reason)) => {
            print_setup_help();
            anyhow::bail!(reason);
        }
        Err(e) => return Err(e.into()),
    };
    let tools = Arc::new(sunnyside_tools::default_registry()?);
    let memory = sunnyside_memory::build_memory(&config.memory)?;
    let agent = AgentLoop::from_config(&config, provider, tools, memory);

    if verbose {
        spawn_event_logger(&agent);
    }

    let thread_id = thread.map(ThreadId::from).unwrap_or_default();
    let context = Context::new(user_id);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = agent.invoke(&thread_id, msg, &context).await;
        eprint!("\r              \r");
        println!("{}", format_answer(&result?));
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ☀️  Sunnyside — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Strategy:  {}", agent.effective_output_strategy());
    println!("  Thread:    {thread_id}");
    println!("  User:      {}", context.user_id);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        match agent.invoke(&thread_id, line, &context).await {
            Ok(answer) => {
                eprint!("\r     \r");
                println!();
                for out in format_answer(&answer).lines() {
                    println!("  Forecaster > {out}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye, and stay sunny! 👋");
    println!();
    Ok(())
}

fn print_setup_help() {
    eprintln!();
    eprintln!("  ERROR: No usable provider configuration!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    SUNNYSIDE_API_KEY   (generic)");
    eprintln!("    ANTHROPIC_API_KEY   (provider = anthropic, the default)");
    eprintln!("    OPENAI_API_KEY      (provider = openai)");
    eprintln!("    OPENROUTER_API_KEY  (provider = openrouter)");
    eprintln!();
    eprintln!("  Or edit your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
}

/// Log domain events at debug level.
fn spawn_event_logger(agent: &AgentLoop) {
    let mut events = agent.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let thread_id = event.thread_id();
            match event.as_ref() {
                DomainEvent::ResponseGenerated { model, tokens_used, .. } => {
                    debug!(thread_id, model = %model, tokens_used, "Model responded");
                }
                DomainEvent::ToolExecuted {
                    tool_name,
                    success,
                    duration_ms,
                    ..
                } => {
                    debug!(thread_id, tool = %tool_name, success, duration_ms, "Tool executed");
                }
                other => debug!(thread_id, event = ?other, "Agent event"),
            }
        }
    });
}

/// Render an answer for the terminal.
fn format_answer(answer: &ResponseFormat) -> String {
    match &answer.weather_conditions {
        Some(conditions) => format!("{}\nWeather: {conditions}", answer.punny_response),
        None => answer.punny_response.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_with_weather_has_two_lines() {
        let answer = ResponseFormat {
            punny_response: "Florida is sun-sational!".into(),
            weather_conditions: Some("It's always sunny in Florida!".into()),
        };
        assert_eq!(
            format_answer(&answer),
            "Florida is sun-sational!\nWeather: It's always sunny in Florida!"
        );
    }

    #[test]
    fn answer_without_weather_is_just_the_pun() {
        let answer = ResponseFormat {
            punny_response: "You're welcome, have a bright day!".into(),
            weather_conditions: None,
        };
        assert_eq!(format_answer(&answer), "You're welcome, have a bright day!");
    }
}
