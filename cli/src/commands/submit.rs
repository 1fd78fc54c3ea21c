// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use sentinel_sdk::{ActionRequest, SentinelClient};

#[derive(Args)]
pub struct SubmitArgs {
    /// Path to a ProposedAction JSON file
    pub action: PathBuf,

    /// Base URL of the running engine
    #[arg(long, default_value = "http://localhost:8900")]
    pub url: String,

    /// Use tasks/sendMessage instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

pub async fn run(args: SubmitArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.action)
        .with_context(|| format!("reading {}", args.action.display()))?;
    let action: ActionRequest =
        serde_json::from_str(&raw).context("parsing ProposedAction JSON")?;

    let client = SentinelClient::new(&args.url);
    let card = client.fetch_card().await.context("fetching agent card")?;
    println!("{} {} v{}", "connected:".dimmed(), card.name.bold(), card.version);

    let outcome = if args.no_stream {
        client.evaluate(&action).await?
    } else {
        client
            .evaluate_streaming(&action, |progress| {
                println!("  {} {progress}", "›".cyan());
            })
            .await?
    };

    let verdict = outcome.verdict;
    let label = match verdict.decision.as_str() {
        "approved" => verdict.decision.to_uppercase().green().bold(),
        "escalated" => verdict.decision.to_uppercase().yellow().bold(),
        _ => verdict.decision.to_uppercase().red().bold(),
    };
    println!("{label}  composite {:.1}", verdict.sri.composite);
    if !verdict.violations.is_empty() {
        println!("  violations: {}", verdict.violations.join(", ").red());
    }
    println!("  {}", verdict.reason.dimmed());
    Ok(())
}
