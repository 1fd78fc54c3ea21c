// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;

use sentinel_core::domain::action::ProposedAction;
use sentinel_core::domain::verdict::{Decision, GovernanceVerdict};

use super::build_engine;

#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to a ProposedAction JSON file, or `-` to read stdin
    pub action: PathBuf,

    /// Print the raw verdict JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: EvaluateArgs) -> Result<()> {
    let raw = if args.action.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.action)
            .with_context(|| format!("reading {}", args.action.display()))?
    };
    let action: ProposedAction =
        serde_json::from_str(&raw).context("parsing ProposedAction JSON")?;

    let engine = build_engine().await?;
    let verdict = engine.facade.evaluate_action(&action).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
    }
    Ok(())
}

pub fn decision_label(decision: Decision) -> colored::ColoredString {
    match decision {
        Decision::Approved => "APPROVED".green().bold(),
        Decision::Escalated => "ESCALATED".yellow().bold(),
        Decision::Denied => "DENIED".red().bold(),
    }
}

fn print_verdict(verdict: &GovernanceVerdict) {
    println!(
        "{}  composite {:.1}  (action {})",
        decision_label(verdict.decision),
        verdict.sri.composite,
        verdict.action_id
    );
    println!(
        "  infrastructure {:.1} | policy {:.1} | historical {:.1} | cost {:.1}",
        verdict.sri.infrastructure,
        verdict.sri.policy,
        verdict.sri.historical,
        verdict.sri.cost
    );
    if !verdict.violations.is_empty() {
        println!("  violations: {}", verdict.violations.join(", ").red());
    }
    println!("  {}", verdict.reason.dimmed());
}
