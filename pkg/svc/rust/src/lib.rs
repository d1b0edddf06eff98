// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Start, stop and inspect local services tracked by a pid file.
//!
//! A [`Service`] launches its command when it is not already running, records
//! the pid, and waits until its readiness checks pass. The recorded pid is
//! only trusted while it names a live process that was started after the last
//! boot.

pub mod config;
pub mod context;
pub mod error;
pub mod liveness;
pub mod pidfile;
pub mod probe;
pub mod process;
pub mod service;
pub mod status;

pub use config::{CheckConfig, LaunchSpec, ServiceBuilder, ServiceFile, load_service_file};
pub use error::{Error, Result};
pub use liveness::LivenessResolver;
pub use pidfile::{Identity, PidFile};
pub use probe::{DialProbe, ExecProbe, HttpProbe, Network, Outcome, Probe, ProbeSet, probe_fn};
pub use process::{LaunchedProcess, ProcessHandle};
pub use service::Service;
pub use status::{State, Status};
pub use tokio_util::sync::CancellationToken;
