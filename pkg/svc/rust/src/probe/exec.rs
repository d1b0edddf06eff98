// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use super::{Outcome, Probe};
use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Ready once the command exits with status 0.
#[derive(Debug, Clone)]
pub struct ExecProbe {
    command: String,
    args: Vec<String>,
}

impl ExecProbe {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl Probe for ExecProbe {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("exec {}", self.command)
        } else {
            format!("exec {} {}", self.command, self.args.join(" "))
        }
    }

    async fn probe(&self, cancel: &CancellationToken) -> Outcome {
        let status = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let result = tokio::select! {
            _ = cancel.cancelled() => return Outcome::NotReady,
            result = status => result,
        };
        match result.with_context(|| format!("running {}", self.command)) {
            Ok(status) if status.success() => Outcome::Ready,
            Ok(status) => {
                debug!("{} exited with {status}", self.describe());
                Outcome::NotReady
            }
            Err(e) => Outcome::Failed(e),
        }
    }
}
