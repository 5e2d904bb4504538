// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! aw - Audit WAL CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod error;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use aw_daemon::Config;
use clap::{Parser, Subcommand};
use commands::emit::{EmitArgs, IngestView};
use commands::status::StatusView;
use commands::verify::{self, VerifyArgs};

use crate::client::{timeout_exit, ClientError, DaemonClient};
use crate::error::AwError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "aw", version, about = "Audit WAL - tamper-evident audit log ingestion")]
struct Cli {
    /// Service configuration file used to locate the daemon
    #[arg(long, short, global = true, default_value = "aw.toml")]
    config: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an audit record
    Emit(EmitArgs),
    /// Show daemon status
    Status,
    /// Stop the daemon
    Stop,
    /// Verify a WAL file's encryption and hash chain offline
    Verify(VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AwError>() {
                Some(err) => eprint!("{}", err),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Verify(args) => {
            let view = verify::verify(args)?;
            output::print(&view, cli.output);
        }

        Commands::Emit(args) => {
            // Validate arguments before touching the daemon
            let log = args.into_raw_log()?;
            let client = connect(&cli.config)?;
            let result = client.ingest(log).await?;
            output::print(&IngestView(result), cli.output);
        }

        Commands::Status => {
            let client = connect(&cli.config)?;
            let status = client.status().await?;
            output::print(&StatusView(status), cli.output);
        }

        Commands::Stop => {
            let client = connect(&cli.config)?;
            if !client.stop().await? {
                bail!("daemon did not exit within {:?}", timeout_exit());
            }
            println!("Daemon stopped");
        }
    }

    Ok(())
}

fn connect(config_path: &Path) -> Result<DaemonClient> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    match DaemonClient::connect(&config) {
        Ok(client) => Ok(client),
        Err(ClientError::DaemonNotRunning(socket)) => {
            Err(AwError::daemon_not_running(config_path, &socket).into())
        }
        Err(e) => Err(e.into()),
    }
}
