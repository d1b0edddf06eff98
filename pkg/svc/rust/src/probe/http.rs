// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use super::{Outcome, Probe};
use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use tokio_util::sync::CancellationToken;

/// Ready once a GET on `url` answers with `status`.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    status: u16,
    client: Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            client: Client::new(),
        }
    }

    async fn get(&self, url: Url) -> Outcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} failed: {e}", self.url);
                return Outcome::NotReady;
            }
        };
        let status = response.status().as_u16();
        // Drain the body so the connection can be released.
        if let Err(e) = response.bytes().await {
            debug!("GET {}: failed to read body: {e}", self.url);
        }
        if status == self.status {
            Outcome::Ready
        } else {
            debug!("GET {}: expected {}, got {status}", self.url, self.status);
            Outcome::NotReady
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn describe(&self) -> String {
        format!("http {} ({})", self.url, self.status)
    }

    async fn probe(&self, cancel: &CancellationToken) -> Outcome {
        let url = match Url::parse(&self.url).with_context(|| format!("parsing url {}", self.url)) {
            Ok(url) => url,
            Err(e) => return Outcome::Failed(e),
        };
        tokio::select! {
            _ = cancel.cancelled() => Outcome::NotReady,
            outcome = self.get(url) => outcome,
        }
    }
}
