// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Start, stop or inspect a service described by a YAML file.
//!
//! ```bash
//! dd-svc --config redis.yaml start --timeout 30
//! dd-svc --config redis.yaml status --json
//! dd-svc --config redis.yaml stop
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dd_svc::{CancellationToken, load_service_file};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};

#[derive(Parser, Debug)]
#[command(name = "dd-svc")]
#[command(about = "Manage a local service tracked by a pid file")]
#[command(version)]
struct Args {
    /// Service definition (YAML); the service is named after the file
    #[arg(short, long)]
    config: PathBuf,

    /// Override the service name
    #[arg(short, long)]
    name: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start the service if needed and wait until it is ready
    Start {
        /// Give up after this many seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },
    /// Stop the service and remove its pid file
    Stop,
    /// Report whether the service is running and ready
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()
    {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let (file_name, file) = load_service_file(&args.config)?;
    let name = args.name.unwrap_or(file_name);
    if let Some(description) = &file.description {
        info!("[{name}] {description}");
    }
    let svc = file
        .into_builder(name)
        .build()
        .with_context(|| format!("configuring service from {}", args.config.display()))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        on_signal.cancel();
    });

    match args.command {
        Cmd::Start { timeout } => {
            let ctx = dd_svc::context::with_timeout(&cancel, Duration::from_secs(timeout));
            svc.start(&ctx).await?;
            println!("{}", svc.status(&ctx).await);
        }
        Cmd::Stop => svc.stop(&cancel).await?,
        Cmd::Status { json } => {
            let status = svc.status(&cancel).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{status}");
            }
            if !status.ready() {
                return Ok(ExitCode::from(3));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
