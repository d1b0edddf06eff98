// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Decides whether a recorded pid still names the process we started.
//!
//! A pid file that survived a reboot may point at an unrelated process once
//! pids wrap around, so records older than the system uptime are ignored.
//! Pids 0 and 1 are never resolved.

use crate::pidfile::Identity;
use crate::process::ProcessHandle;
use log::debug;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy)]
enum UptimeSource {
    System,
    Fixed(Duration),
}

#[derive(Debug)]
pub struct LivenessResolver {
    source: UptimeSource,
    uptime: OnceLock<Option<Duration>>,
}

impl Default for LivenessResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessResolver {
    /// Resolver backed by the kernel's uptime, queried once on first use.
    pub fn new() -> Self {
        Self {
            source: UptimeSource::System,
            uptime: OnceLock::new(),
        }
    }

    /// Resolver that pretends the system has been up for `uptime`.
    pub fn with_uptime(uptime: Duration) -> Self {
        Self {
            source: UptimeSource::Fixed(uptime),
            uptime: OnceLock::new(),
        }
    }

    pub fn uptime(&self) -> Option<Duration> {
        *self.uptime.get_or_init(|| match self.source {
            UptimeSource::System => system_uptime(),
            UptimeSource::Fixed(uptime) => Some(uptime),
        })
    }

    pub fn resolve(&self, identity: &Identity) -> Option<ProcessHandle> {
        if identity.pid < 2 {
            return None;
        }

        if let (Some(recorded_at), Some(uptime)) = (identity.recorded_at, self.uptime()) {
            let age = SystemTime::now()
                .duration_since(recorded_at)
                .unwrap_or_default();
            if age > uptime {
                debug!(
                    "pid {} recorded {}s ago but system up for {}s, ignoring",
                    identity.pid,
                    age.as_secs(),
                    uptime.as_secs()
                );
                return None;
            }
        }

        let handle = ProcessHandle::from_raw(identity.pid)?;
        handle.is_alive().then_some(handle)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn system_uptime() -> Option<Duration> {
    match nix::sys::sysinfo::sysinfo() {
        Ok(info) => Some(info.uptime()),
        Err(e) => {
            debug!("sysinfo failed, skipping reboot check: {e}");
            None
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn system_uptime() -> Option<Duration> {
    None
}
