// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Sentinel CLI
//!
//! The `sentinel` binary runs and drives the governance engine:
//!
//! - `sentinel serve` - A2A streaming server + dashboard API
//! - `sentinel stdio` - stdio tool server for tool-protocol clients
//! - `sentinel evaluate` - one-shot in-process evaluation of an action file
//! - `sentinel submit` - send an action to a remote engine over A2A
//! - `sentinel decisions` / `sentinel agents` - audit queries
//! - `sentinel card` - print the agent card

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{evaluate, query, serve, submit};

/// Sentinel governance engine - AI action governance for cloud infrastructure
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the A2A streaming server with the dashboard API
    Serve,
    /// Serve the governance tools over stdin/stdout
    Stdio,
    /// Evaluate one action (JSON file, or `-` for stdin) in-process
    Evaluate(evaluate::EvaluateArgs),
    /// Submit an action to a running engine over the A2A surface
    Submit(submit::SubmitArgs),
    /// List recent governance decisions
    Decisions(query::DecisionsArgs),
    /// List registered agents and their counters
    Agents,
    /// Print the agent card advertised by this engine
    Card,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdio mode owns stdout for the protocol; logs must go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => serve::run_server().await,
        Command::Stdio => serve::run_stdio().await,
        Command::Evaluate(args) => evaluate::run(args).await,
        Command::Submit(args) => submit::run(args).await,
        Command::Decisions(args) => query::decisions(args).await,
        Command::Agents => query::agents().await,
        Command::Card => query::card().await,
    }
}
