// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

/// Child of `parent` that is also cancelled once `timeout` elapses.
///
/// Must be called from within a tokio runtime.
pub fn with_timeout(parent: &CancellationToken, timeout: Duration) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => {}
            _ = sleep(timeout) => timer.cancel(),
        }
    });
    token
}
