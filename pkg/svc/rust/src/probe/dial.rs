// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use super::{Outcome, Probe};
use anyhow::anyhow;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::net::{TcpStream, UnixStream};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Unix,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Unix => write!(f, "unix"),
        }
    }
}

/// Ready once a connection to the address is accepted.
#[derive(Debug, Clone)]
pub struct DialProbe {
    network: Network,
    address: String,
}

impl DialProbe {
    pub fn new(network: Network, address: impl Into<String>) -> Self {
        Self {
            network,
            address: address.into(),
        }
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self::new(Network::Tcp, address)
    }

    pub fn unix(path: impl Into<String>) -> Self {
        Self::new(Network::Unix, path)
    }

    async fn dial_tcp(&self) -> Outcome {
        let (host, port) = match split_host_port(&self.address) {
            Ok(parts) => parts,
            Err(e) => return Outcome::Failed(e),
        };
        match TcpStream::connect((host, port)).await {
            Ok(_stream) => Outcome::Ready,
            Err(e) => {
                debug!("dial tcp {} failed: {e}", self.address);
                Outcome::NotReady
            }
        }
    }

    async fn dial_unix(&self) -> Outcome {
        if self.address.is_empty() {
            return Outcome::Failed(anyhow!("missing unix socket path"));
        }
        match UnixStream::connect(&self.address).await {
            Ok(_stream) => Outcome::Ready,
            Err(e) => {
                debug!("dial unix {} failed: {e}", self.address);
                Outcome::NotReady
            }
        }
    }
}

#[async_trait]
impl Probe for DialProbe {
    fn describe(&self) -> String {
        format!("dial {} {}", self.network, self.address)
    }

    async fn probe(&self, cancel: &CancellationToken) -> Outcome {
        let dial = async {
            match self.network {
                Network::Tcp => self.dial_tcp().await,
                Network::Unix => self.dial_unix().await,
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => Outcome::NotReady,
            outcome = dial => outcome,
        }
    }
}

/// Split `host:port`. An empty host means the local system. Bracketed IPv6
/// literals are accepted.
fn split_host_port(address: &str) -> anyhow::Result<(&str, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("address {address}: missing port"))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| anyhow!("address {address}: invalid port {port:?}"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Ok(("127.0.0.1", port));
    }
    Ok((host, port))
}
