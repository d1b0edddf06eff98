// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Readiness probes.
//!
//! A probe answers one question about a running service: is it ready yet?
//! `NotReady` is the expected answer while the service boots and is retried;
//! `Failed` means retrying cannot help and aborts the wait.

mod dial;
mod exec;
mod http;

pub use dial::{DialProbe, Network};
pub use exec::ExecProbe;
pub use http::HttpProbe;

use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::future::Future;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum Outcome {
    Ready,
    NotReady,
    Failed(anyhow::Error),
}

impl Outcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready)
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// Short label used in logs and errors.
    fn describe(&self) -> String;

    async fn probe(&self, cancel: &CancellationToken) -> Outcome;
}

/// Adapts a closure into a [`Probe`]. See [`probe_fn`].
pub struct FnProbe<F> {
    name: String,
    f: F,
}

/// Wrap `f` as a probe. The closure receives a clone of the caller's
/// cancellation token.
pub fn probe_fn<F, Fut>(name: impl Into<String>, f: F) -> FnProbe<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send,
{
    FnProbe {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn probe(&self, cancel: &CancellationToken) -> Outcome {
        (self.f)(cancel.clone()).await
    }
}

/// Ordered readiness probes sharing a per-probe timeout.
pub struct ProbeSet {
    probes: Vec<Box<dyn Probe>>,
    timeout: Duration,
}

impl Default for ProbeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeSet")
            .field("probes", &self.probes.iter().map(|p| p.describe()).collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProbeSet {
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn push(&mut self, probe: Box<dyn Probe>) {
        self.probes.push(probe);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn describe(&self, index: usize) -> String {
        self.probes
            .get(index)
            .map(|p| p.describe())
            .unwrap_or_default()
    }

    /// Run probe `index` once. Elapsing the per-probe timeout or being
    /// cancelled counts as not ready.
    pub async fn evaluate(&self, index: usize, cancel: &CancellationToken) -> Outcome {
        let Some(probe) = self.probes.get(index) else {
            return Outcome::NotReady;
        };
        tokio::select! {
            _ = cancel.cancelled() => Outcome::NotReady,
            result = timeout(self.timeout, probe.probe(cancel)) => match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!("check {} timed out after {:?}", probe.describe(), self.timeout);
                    Outcome::NotReady
                }
            },
        }
    }

    /// Run every probe once and report whether all of them are ready.
    pub async fn all_ready(&self, cancel: &CancellationToken) -> bool {
        for index in 0..self.probes.len() {
            match self.evaluate(index, cancel).await {
                Outcome::Ready => {}
                Outcome::NotReady => return false,
                Outcome::Failed(e) => {
                    debug!("check {} failed: {e:#}", self.describe(index));
                    return false;
                }
            }
        }
        true
    }
}
