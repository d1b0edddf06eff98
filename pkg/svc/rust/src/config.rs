// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use crate::liveness::LivenessResolver;
use crate::pidfile::PidFile;
use crate::probe::{DialProbe, ExecProbe, HttpProbe, Network, Probe, ProbeSet};
use crate::service::Service;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// What to run when the service is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Added on top of the inherited OS environment.
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
}

/// Assembles a [`Service`].
///
/// ```ignore
/// let svc = ServiceBuilder::new("redis")
///     .run("redis-server", ["--port", "6380"])
///     .dir("/tmp/redis")
///     .check(DialProbe::tcp("127.0.0.1:6380"))
///     .build()?;
/// ```
pub struct ServiceBuilder {
    name: String,
    pidfile: Option<PathBuf>,
    run: Option<(String, Vec<String>)>,
    env: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    probes: ProbeSet,
    poll_interval: Duration,
    stop_timeout: Duration,
    resolver: Option<LivenessResolver>,
}

impl ServiceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pidfile: None,
            run: None,
            env: Vec::new(),
            working_dir: None,
            probes: ProbeSet::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            resolver: None,
        }
    }

    /// The command started by `start`.
    ///
    /// # Panics
    ///
    /// A service has exactly one command; calling this twice is a programming
    /// error.
    pub fn run<I, S>(mut self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.run.is_some() {
            panic!("service {} expects exactly one run option", self.name);
        }
        self.run = Some((command.into(), args.into_iter().map(Into::into).collect()));
        self
    }

    /// Overrides the default `<dir>/<name>.pid` location.
    pub fn pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pidfile = Some(path.into());
        self
    }

    /// Working directory of the service, created on start if missing.
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn check(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn check_timeout(mut self, timeout: Duration) -> Self {
        self.probes.set_timeout(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn liveness(mut self, resolver: LivenessResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Service> {
        if self.name.is_empty() {
            return Err(Error::InvalidConfiguration(
                "service name must not be empty".to_string(),
            ));
        }
        let Some((command, args)) = self.run else {
            return Err(Error::InvalidConfiguration(format!(
                "service {} has no command to run",
                self.name
            )));
        };
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfiguration(format!(
                "service {}: poll interval must be positive",
                self.name
            )));
        }

        let pidfile = match (self.pidfile, &self.working_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join(format!("{}.pid", self.name)),
            (None, None) => PathBuf::from(format!("{}.pid", self.name)),
        };

        Ok(Service {
            name: self.name,
            pidfile: PidFile::new(pidfile),
            launch: LaunchSpec {
                command,
                args,
                env: self.env,
                working_dir: self.working_dir,
            },
            probes: self.probes,
            poll_interval: self.poll_interval,
            stop_timeout: self.stop_timeout,
            resolver: self.resolver.unwrap_or_default(),
        })
    }
}

fn default_http_status() -> u16 {
    200
}

/// A service described in YAML.
#[derive(Debug, Deserialize)]
pub struct ServiceFile {
    /// Logged by `dd-svc` before acting on the service.
    #[serde(default)]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub pidfile: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    /// Seconds to wait after SIGTERM before escalating to SIGKILL.
    pub stop_timeout: Option<u64>,
    /// Seconds a single check may take.
    pub check_timeout: Option<u64>,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckConfig {
    Tcp {
        address: String,
    },
    Unix {
        path: String,
    },
    Http {
        url: String,
        #[serde(default = "default_http_status")]
        status: u16,
    },
    Exec {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CheckConfig {
    fn into_probe(self) -> Box<dyn Probe> {
        match self {
            CheckConfig::Tcp { address } => Box::new(DialProbe::new(Network::Tcp, address)),
            CheckConfig::Unix { path } => Box::new(DialProbe::new(Network::Unix, path)),
            CheckConfig::Http { url, status } => Box::new(HttpProbe::new(url, status)),
            CheckConfig::Exec { command, args } => Box::new(ExecProbe::new(command, args)),
        }
    }
}

impl ServiceFile {
    pub fn into_builder(self, name: impl Into<String>) -> ServiceBuilder {
        let mut builder = ServiceBuilder::new(name).run(self.command, self.args);
        for (key, value) in self.env {
            builder = builder.env(key, value);
        }
        if let Some(dir) = self.working_dir {
            builder = builder.dir(dir);
        }
        if let Some(path) = self.pidfile {
            builder = builder.pid_file(path);
        }
        if let Some(ms) = self.poll_interval_ms {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = self.stop_timeout {
            builder = builder.stop_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.check_timeout {
            builder = builder.check_timeout(Duration::from_secs(secs));
        }
        for check in self.checks {
            builder.probes.push(check.into_probe());
        }
        builder
    }
}

/// Parse a service file. The service name is the file name without extension.
pub fn load_service_file(path: &Path) -> anyhow::Result<(String, ServiceFile)> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: ServiceFile =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    Ok((name, file))
}
