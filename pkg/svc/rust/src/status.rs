// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::pidfile::Identity;
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No usable pid file.
    NotRunning,
    /// A pid was recorded but does not resolve to a live process.
    Stale,
    /// Alive, at least one check not passing.
    Running,
    /// Alive and every check passed.
    Ready,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::NotRunning => write!(f, "not running"),
            State::Stale => write!(f, "stale"),
            State::Running => write!(f, "running"),
            State::Ready => write!(f, "ready"),
        }
    }
}

/// Point-in-time view of a service.
///
/// `ready` implies `running`, which implies a non-zero `pid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    name: String,

    /// Zero if the pid file could not be read.
    #[serde(skip_serializing_if = "is_zero")]
    pid: u32,

    /// When the pid file was written.
    #[serde(
        serialize_with = "time::serde::rfc3339::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    started: Option<OffsetDateTime>,

    #[serde(skip_serializing_if = "is_false")]
    running: bool,

    #[serde(skip_serializing_if = "is_false")]
    ready: bool,
}

fn is_zero(pid: &u32) -> bool {
    *pid == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Status {
    pub fn new(name: impl Into<String>, identity: &Identity, running: bool, ready: bool) -> Self {
        let running = running && identity.is_known();
        Self {
            name: name.into(),
            pid: identity.pid,
            started: identity
                .recorded_at
                .filter(|_| identity.is_known())
                .map(OffsetDateTime::from),
            running,
            ready: ready && running,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started(&self) -> Option<OffsetDateTime> {
        self.started
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn state(&self) -> State {
        match (self.pid, self.running, self.ready) {
            (0, _, _) => State::NotRunning,
            (_, false, _) => State::Stale,
            (_, true, false) => State::Running,
            (_, true, true) => State::Ready,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            State::NotRunning => write!(f, "{} is not running", self.name),
            State::Stale => write!(f, "{} had pid {} and is not running", self.name, self.pid),
            State::Running => write!(
                f,
                "{} has pid {} and is running but not ready",
                self.name, self.pid
            ),
            State::Ready => write!(f, "{} has pid {} and is ready", self.name, self.pid),
        }
    }
}
