// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::LaunchSpec;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::process::{Child, Command, Stdio};
use tokio::time::{Duration, Instant, sleep};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const KILL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A reference to an OS process by pid. Dropping it has no effect on the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: Pid,
}

impl ProcessHandle {
    pub(crate) fn from_raw(pid: u32) -> Option<Self> {
        let raw = i32::try_from(pid).ok()?;
        Some(Self {
            pid: Pid::from_raw(raw),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Signal-0 probe. A child of ours that already exited is reaped here and
    /// reported as gone, since an unreaped zombie still accepts signals.
    pub fn is_alive(&self) -> bool {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(WaitStatus::Exited(_, code)) => {
                debug!("pid {} exited with code {code}", self.pid);
                false
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                debug!("pid {} killed by {sig}", self.pid);
                false
            }
            // Not our child, or some other status: ask the kernel directly.
            Ok(_) | Err(_) => signal::kill(self.pid, None).is_ok(),
        }
    }

    pub fn signal(&self, sig: Signal) -> Result<()> {
        signal::kill(self.pid, sig).map_err(|errno| Error::Signal {
            pid: self.pid(),
            signal: sig.to_string(),
            source: errno.into(),
        })?;
        debug!("sent {sig} to pid {}", self.pid);
        Ok(())
    }

    /// Wait up to `timeout` for the process to go away. Returns whether it did.
    ///
    /// Children are reaped with `waitpid`; for anything else (e.g. a process
    /// started by an earlier run) the pid is polled with signal 0.
    pub async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return true,
                Ok(_) => {}
                Err(Errno::ECHILD) => {
                    if signal::kill(self.pid, None).is_err() {
                        return true;
                    }
                }
                Err(e) => {
                    debug!("waitpid({}) failed: {e}", self.pid);
                    if signal::kill(self.pid, None).is_err() {
                        return true;
                    }
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// SIGKILL the process and wait briefly for it to disappear. A process
    /// that is already gone is not signalled.
    pub async fn kill(&self) -> Result<()> {
        if !self.is_alive() {
            debug!("pid {} already gone, not sending SIGKILL", self.pid);
            return Ok(());
        }
        self.signal(Signal::SIGKILL)?;
        if !self.wait_for_exit(KILL_WAIT_TIMEOUT).await {
            warn!("pid {} still present after SIGKILL", self.pid);
        }
        Ok(())
    }
}

/// A freshly spawned process still owned by the caller.
///
/// Until [`LaunchedProcess::release`] is called, dropping this value kills and
/// reaps the process. After release the process runs independently and is only
/// reachable by pid.
#[derive(Debug)]
pub struct LaunchedProcess {
    child: Option<Child>,
    handle: ProcessHandle,
}

impl LaunchedProcess {
    pub fn spawn(name: &str, spec: &LaunchSpec) -> Result<Self> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(ref dir) = spec.working_dir {
            if let Err(e) = DirBuilder::new().recursive(true).mode(0o700).create(dir) {
                warn!("[{name}] cannot create working directory {}: {e}", dir.display());
            }
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| Error::Spawn {
            command: spec.command.clone(),
            source,
        })?;
        let pid = child.id();
        info!("[{name}] spawned (pid={pid}, cmd={})", spec.command);

        Ok(Self {
            child: Some(child),
            handle: ProcessHandle {
                pid: Pid::from_raw(pid as i32),
            },
        })
    }

    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }

    /// Give up ownership: the process keeps running after this value is gone.
    pub fn release(mut self) -> ProcessHandle {
        self.child = None;
        self.handle
    }

    /// Kill and reap the owned child. No-op once released.
    pub fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to kill pid {}: {e}", child.id());
            }
            if let Err(e) = child.wait() {
                debug!("failed to reap pid {}: {e}", child.id());
            }
        }
    }
}

impl Drop for LaunchedProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
