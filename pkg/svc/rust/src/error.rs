// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to write pid file {}: {source}", path.display())]
    PidFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        pid: u32,
        signal: String,
        source: std::io::Error,
    },

    /// The managed process went away while readiness probes were still pending.
    #[error("process {pid} exited before checks were satisfied")]
    ExitedBeforeReady { pid: u32 },

    /// A probe reported a failure that retrying cannot fix.
    #[error("check {probe} failed: {source:#}")]
    Probe {
        probe: String,
        source: anyhow::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
