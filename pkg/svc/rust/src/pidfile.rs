// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Persisted identity of a managed process.
//!
//! The pid file holds the decimal pid and nothing else; its modification time
//! is the moment the identity was recorded. Reading never fails: anything that
//! cannot be understood is treated as "no process".

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs::{self, DirBuilder, File, Permissions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A pid together with the time it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub pid: u32,
    pub recorded_at: Option<SystemTime>,
}

impl Identity {
    pub fn unknown() -> Self {
        Self {
            pid: 0,
            recorded_at: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.pid != 0
    }
}

#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Identity {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!("cannot open pid file {}: {e}", self.path.display());
                }
                return Identity::unknown();
            }
        };
        let recorded_at = match file.metadata().and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!("cannot stat pid file {}: {e}", self.path.display());
                return Identity::unknown();
            }
        };
        let mut contents = String::new();
        if let Err(e) = file.read_to_string(&mut contents) {
            debug!("cannot read pid file {}: {e}", self.path.display());
            return Identity::unknown();
        }
        match contents.trim().parse::<u32>() {
            Ok(pid) => Identity {
                pid,
                recorded_at: Some(recorded_at),
            },
            Err(_) => {
                debug!("garbled pid file {}: {contents:?}", self.path.display());
                Identity::unknown()
            }
        }
    }

    /// Record `pid`, creating parent directories as needed.
    ///
    /// The contents are written to a temporary file next to the target and
    /// renamed into place, so a concurrent reader sees either the old record
    /// or the new one.
    pub fn write(&self, pid: u32) -> Result<()> {
        let write_err = |source| Error::PidFileWrite {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(write_err)?;

        let prefix = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("svc");
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .permissions(Permissions::from_mode(0o600))
            .tempfile_in(dir)
            .map_err(write_err)?;
        file.write_all(pid.to_string().as_bytes())
            .map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("wrote pid {pid} to {}", self.path.display());
        Ok(())
    }

    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed pid file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove pid file {}: {e}", self.path.display()),
        }
    }
}
