// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use sentinel_core::presentation::a2a::build_agent_card;

use super::build_engine;
use super::evaluate::decision_label;

#[derive(Args)]
pub struct DecisionsArgs {
    /// Maximum number of decisions to show (1-100)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Only decisions whose resource id contains this fragment
    #[arg(long)]
    pub resource: Option<String>,
}

pub async fn decisions(args: DecisionsArgs) -> Result<()> {
    let engine = build_engine().await?;
    let decisions = engine
        .facade
        .recent_decisions(args.limit, args.resource.as_deref())
        .await?;

    if decisions.is_empty() {
        println!("{}", "no decisions recorded".dimmed());
        return Ok(());
    }
    for decision in decisions {
        println!(
            "{}  {:>9}  {:5.1}  {}  {}",
            decision.timestamp.format("%Y-%m-%d %H:%M:%S"),
            decision_label(decision.decision),
            decision.sri.composite,
            decision.action_type,
            decision.resource_id.cyan()
        );
        if !decision.violations.is_empty() {
            println!("    violations: {}", decision.violations.join(", ").red());
        }
    }
    Ok(())
}

pub async fn agents() -> Result<()> {
    let engine = build_engine().await?;
    let agents = engine.facade.agents().await?;

    if agents.is_empty() {
        println!("{}", "no agents registered".dimmed());
        return Ok(());
    }
    for agent in agents {
        println!(
            "{}  proposed {}  ({} approved / {} escalated / {} denied)  last seen {}",
            agent.name.bold(),
            agent.total_proposed,
            agent.approved.to_string().green(),
            agent.escalated.to_string().yellow(),
            agent.denied.to_string().red(),
            agent.last_seen.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn card() -> Result<()> {
    let engine = build_engine().await?;
    let card = build_agent_card(&engine.settings.server_url);
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}
