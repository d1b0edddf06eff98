// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::{LaunchSpec, ServiceBuilder};
use crate::error::{Error, Result};
use crate::liveness::LivenessResolver;
use crate::pidfile::PidFile;
use crate::probe::{Outcome, ProbeSet};
use crate::process::{LaunchedProcess, ProcessHandle};
use crate::status::Status;
use log::{debug, info, warn};
use nix::sys::signal::Signal;
use scopeguard::defer;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

/// A locally managed service: one command, one pid file, a set of readiness
/// checks.
///
/// A `Service` is meant to be driven by a single task. Nothing prevents two
/// independent invocations from racing to start the same service.
#[derive(Debug)]
pub struct Service {
    pub(crate) name: String,
    pub(crate) pidfile: PidFile,
    pub(crate) launch: LaunchSpec,
    pub(crate) probes: ProbeSet,
    pub(crate) poll_interval: Duration,
    pub(crate) stop_timeout: Duration,
    pub(crate) resolver: LivenessResolver,
}

impl Service {
    pub fn builder(name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pidfile
    }

    pub fn launch(&self) -> &LaunchSpec {
        &self.launch
    }

    pub fn probes(&self) -> &ProbeSet {
        &self.probes
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    fn running_process(&self) -> Option<ProcessHandle> {
        self.resolver.resolve(&self.pidfile.read())
    }

    /// Start the service unless it is already running, then wait until every
    /// check passes.
    ///
    /// Either the service ends up ready with its pid recorded, or the launched
    /// process is killed and no pid file is left behind. A service that was
    /// already running is only re-checked, never relaunched or killed.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<()> {
        if let Some(handle) = self.running_process() {
            info!(
                "[{}] already running (pid={}), waiting for checks",
                self.name,
                handle.pid()
            );
            return self.wait_until_ready(handle, cancel).await;
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut launched = LaunchedProcess::spawn(&self.name, &self.launch)?;
        if let Err(e) = self.pidfile.write(launched.pid()) {
            warn!("[{}] {e}, killing pid {}", self.name, launched.pid());
            launched.terminate();
            return Err(e);
        }
        let handle = launched.release();

        if let Err(e) = self.wait_until_ready(handle, cancel).await {
            warn!("[{}] not ready: {e}", self.name);
            // An exited child has already been reaped and its pid may be reused.
            if !matches!(e, Error::ExitedBeforeReady { .. }) {
                if let Err(kill_err) = handle.kill().await {
                    debug!("[{}] {kill_err}", self.name);
                }
            }
            self.pidfile.remove();
            return Err(e);
        }
        info!("[{}] ready (pid={})", self.name, handle.pid());
        Ok(())
    }

    /// Poll the checks until all of them have passed once while the process
    /// stays alive.
    async fn wait_until_ready(
        &self,
        handle: ProcessHandle,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut pending: Vec<usize> = (0..self.probes.len()).collect();
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !handle.is_alive() {
                return Err(Error::ExitedBeforeReady { pid: handle.pid() });
            }

            let mut unready = Vec::with_capacity(pending.len());
            for index in pending {
                match self.probes.evaluate(index, cancel).await {
                    Outcome::Ready => {
                        debug!("[{}] check {} passed", self.name, self.probes.describe(index))
                    }
                    Outcome::NotReady => unready.push(index),
                    Outcome::Failed(source) => {
                        return Err(Error::Probe {
                            probe: self.probes.describe(index),
                            source,
                        });
                    }
                }
            }
            if unready.is_empty() {
                if !handle.is_alive() {
                    return Err(Error::ExitedBeforeReady { pid: handle.pid() });
                }
                return Ok(());
            }
            pending = unready;

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Stop the service if it is running and remove its pid file.
    ///
    /// Stopping a service that is not running is not an error. After SIGTERM
    /// the process gets `stop_timeout` to exit before it is sent SIGKILL.
    /// If `cancel` fires first the pid file is still removed and
    /// `Error::Cancelled` is returned.
    pub async fn stop(&self, cancel: &CancellationToken) -> Result<()> {
        let Some(handle) = self.running_process() else {
            debug!("[{}] not running", self.name);
            self.pidfile.remove();
            return Ok(());
        };

        info!("[{}] sending SIGTERM (pid={})", self.name, handle.pid());
        handle.signal(Signal::SIGTERM)?;
        let pidfile = &self.pidfile;
        defer! {
            pidfile.remove();
        }

        let exited = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("[{}] cancelled while waiting for pid {} to exit", self.name, handle.pid());
                return Err(Error::Cancelled);
            }
            exited = handle.wait_for_exit(self.stop_timeout) => exited,
        };
        if !exited {
            warn!(
                "[{}] stop timeout ({}s) reached, sending SIGKILL",
                self.name,
                self.stop_timeout.as_secs()
            );
            if let Err(e) = handle.kill().await {
                debug!("[{}] {e}", self.name);
            }
        }
        info!("[{}] stopped", self.name);
        Ok(())
    }

    /// Snapshot of the service. Checks run at most once and only if the
    /// process is alive; the pid file is never touched.
    pub async fn status(&self, cancel: &CancellationToken) -> Status {
        let identity = self.pidfile.read();
        let running = self.resolver.resolve(&identity).is_some();
        let ready = running && self.probes.all_ready(cancel).await;
        Status::new(&self.name, &identity, running, ready)
    }
}
