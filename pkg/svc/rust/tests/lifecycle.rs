// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

mod helpers;

use dd_svc::context::with_timeout;
use dd_svc::{
    CancellationToken, Error, HttpProbe, LivenessResolver, Outcome, Service, State, probe_fn,
};
use helpers::{POLL, backdate, http_server, pid_is_alive, sleeper, snapshot, wait_for_pid_gone};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// ===========================================================================
// Group 1: Start
// ===========================================================================

#[tokio::test]
async fn test_start_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "sleeper").build().unwrap();
    let cancel = CancellationToken::new();

    svc.start(&cancel).await.unwrap();
    let before = snapshot(svc.pid_file().path()).expect("pid file should exist");
    let pid = svc.status(&cancel).await.pid();
    assert!(pid_is_alive(pid));

    svc.start(&cancel).await.unwrap();
    let after = snapshot(svc.pid_file().path()).expect("pid file should still exist");
    assert_eq!(before, after, "second start must not touch the pid file");
    assert_eq!(svc.status(&cancel).await.pid(), pid);

    svc.stop(&cancel).await.unwrap();
    assert!(wait_for_pid_gone(pid, Duration::from_secs(5)));
}

#[tokio::test]
async fn test_second_start_fails_when_no_longer_ready() {
    let dir = tempfile::tempdir().unwrap();
    let healthy = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&healthy);
    let svc = sleeper(dir.path(), "flaky")
        .check(probe_fn("flag", move |_| {
            let ready = flag.load(Ordering::SeqCst);
            async move {
                if ready {
                    Outcome::Ready
                } else {
                    Outcome::NotReady
                }
            }
        }))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();

    svc.start(&cancel).await.unwrap();
    let pid = svc.status(&cancel).await.pid();

    healthy.store(false, Ordering::SeqCst);
    let ctx = with_timeout(&cancel, Duration::from_millis(500));
    let err = svc.start(&ctx).await.unwrap_err();
    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert!(
        pid_is_alive(pid),
        "a service that was already running is not killed by start"
    );
    assert!(svc.pid_file().path().exists());

    svc.stop(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_process_exits_before_ready() {
    let dir = tempfile::tempdir().unwrap();
    let svc = Service::builder("short-lived")
        .run("/bin/sh", ["-c", "exit 0"])
        .dir(dir.path())
        .poll_interval(POLL)
        .check(probe_fn("never", |_| async { Outcome::NotReady }))
        .build()
        .unwrap();

    let ctx = with_timeout(&CancellationToken::new(), Duration::from_secs(10));
    let err = svc.start(&ctx).await.unwrap_err();
    assert!(
        matches!(err, Error::ExitedBeforeReady { pid } if pid != 0),
        "unexpected error: {err}"
    );
    assert!(
        !svc.pid_file().path().exists(),
        "failed start must not leave a pid file behind"
    );
    assert_eq!(svc.status(&ctx).await.state(), State::NotRunning);
}

#[tokio::test]
async fn test_process_exits_while_checks_pass() {
    let dir = tempfile::tempdir().unwrap();
    let svc = Service::builder("crashy")
        .run("/bin/sh", ["-c", "exit 1"])
        .dir(dir.path())
        .poll_interval(POLL)
        .check(probe_fn("slow-but-fine", |_| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Outcome::Ready
        }))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let err = svc.start(&cancel).await.unwrap_err();
    assert!(
        matches!(err, Error::ExitedBeforeReady { .. }),
        "unexpected error: {err}"
    );
    assert!(!svc.pid_file().path().exists());
    assert_eq!(svc.status(&cancel).await.state(), State::NotRunning);
}

#[tokio::test]
async fn test_ready_after_two_polls() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let svc = sleeper(dir.path(), "warming-up")
        .check(probe_fn("third-time-lucky", move |_| {
            let n = counted.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Outcome::NotReady
                } else {
                    Outcome::Ready
                }
            }
        }))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();

    let started = Instant::now();
    svc.start(&cancel).await.unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed >= POLL * 2,
        "start returned after {elapsed:?}, expected at least two poll intervals"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(svc.status(&cancel).await.state(), State::Ready);

    svc.stop(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_http_check_wrong_status_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let url = http_server("503 Service Unavailable").await;
    let cancel = CancellationToken::new();

    // Plain service sharing the pid file, so there is a live process to inspect.
    let plain = sleeper(dir.path(), "web").build().unwrap();
    let checked = sleeper(dir.path(), "web")
        .check(HttpProbe::new(url, 200))
        .build()
        .unwrap();

    plain.start(&cancel).await.unwrap();
    let status = checked.status(&cancel).await;
    assert!(status.running());
    assert!(!status.ready());
    assert_eq!(
        status.to_string(),
        format!("web has pid {} and is running but not ready", status.pid())
    );

    let ctx = with_timeout(&cancel, Duration::from_millis(800));
    let err = checked.start(&ctx).await.unwrap_err();
    assert!(err.is_cancelled(), "unexpected error: {err}");

    checked.stop(&cancel).await.unwrap();
    assert!(wait_for_pid_gone(status.pid(), Duration::from_secs(5)));
}

#[tokio::test]
async fn test_failed_start_kills_launched_process() {
    let dir = tempfile::tempdir().unwrap();
    let url = http_server("503 Service Unavailable").await;
    let svc = sleeper(dir.path(), "web")
        .check(HttpProbe::new(url, 200))
        .build()
        .unwrap();

    let ctx = with_timeout(&CancellationToken::new(), Duration::from_millis(500));
    assert!(svc.start(&ctx).await.unwrap_err().is_cancelled());
    assert!(!svc.pid_file().path().exists());

    let status = svc.status(&CancellationToken::new()).await;
    assert!(!status.running());
    assert!(!status.ready());
}

#[tokio::test]
async fn test_pid_file_write_failure_aborts_start() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the pid file should be makes the rename fail.
    let pid_path = dir.path().join("svc.pid");
    std::fs::create_dir(&pid_path).unwrap();
    std::fs::write(pid_path.join("keep"), "x").unwrap();

    let svc = sleeper(dir.path(), "svc")
        .pid_file(&pid_path)
        .build()
        .unwrap();
    let err = svc.start(&CancellationToken::new()).await.unwrap_err();
    assert!(
        matches!(err, Error::PidFileWrite { .. }),
        "unexpected error: {err}"
    );
}

// ===========================================================================
// Group 2: Stop
// ===========================================================================

#[tokio::test]
async fn test_stop_without_pid_file_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "idle").build().unwrap();

    svc.stop(&CancellationToken::new()).await.unwrap();
    assert!(!svc.pid_file().path().exists());
}

#[tokio::test]
async fn test_stop_removes_stale_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "stale").build().unwrap();

    let mut child = std::process::Command::new("/bin/true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    svc.pid_file().write(dead_pid).unwrap();

    svc.stop(&CancellationToken::new()).await.unwrap();
    assert!(!svc.pid_file().path().exists());
}

#[tokio::test]
async fn test_stop_process_started_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "orphan").build().unwrap();

    // The backgrounded sleep is reparented away from us once the shell exits.
    let script = format!(
        "sleep 300 >/dev/null 2>&1 & echo $! > {}",
        svc.pid_file().path().display()
    );
    let status = std::process::Command::new("/bin/sh")
        .args(["-c", &script])
        .status()
        .unwrap();
    assert!(status.success());

    let cancel = CancellationToken::new();
    let snapshot = svc.status(&cancel).await;
    assert!(snapshot.running(), "{snapshot}");

    svc.stop(&cancel).await.unwrap();
    assert!(!svc.pid_file().path().exists());
}

// ===========================================================================
// Group 3: Status and identity
// ===========================================================================

#[tokio::test]
async fn test_status_does_not_touch_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "observed").build().unwrap();
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        assert_eq!(svc.status(&cancel).await.state(), State::NotRunning);
    }
    assert!(!svc.pid_file().path().exists());

    svc.start(&cancel).await.unwrap();
    let before = snapshot(svc.pid_file().path());
    for _ in 0..3 {
        assert_eq!(svc.status(&cancel).await.state(), State::Ready);
    }
    assert_eq!(snapshot(svc.pid_file().path()), before);

    svc.stop(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_malformed_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "garbled").build().unwrap();
    std::fs::write(svc.pid_file().path(), "definitely not a pid").unwrap();

    let status = svc.status(&CancellationToken::new()).await;
    assert_eq!(status.pid(), 0);
    assert!(!status.running());
    assert_eq!(status.to_string(), "garbled is not running");
    assert!(svc.pid_file().path().exists(), "status must not clean up");
}

#[tokio::test]
async fn test_record_from_before_boot_is_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "rebooted")
        .liveness(LivenessResolver::with_uptime(Duration::from_secs(60)))
        .build()
        .unwrap();

    // Our own pid is alive but the record predates the simulated boot.
    let me = std::process::id();
    svc.pid_file().write(me).unwrap();
    backdate(svc.pid_file().path(), Duration::from_secs(600));

    let status = svc.status(&CancellationToken::new()).await;
    assert_eq!(status.pid(), me);
    assert!(!status.running());
    assert_eq!(status.state(), State::Stale);

    svc.stop(&CancellationToken::new()).await.unwrap();
    assert!(!svc.pid_file().path().exists());
}

#[tokio::test]
async fn test_pid_zero_and_one_are_never_running() {
    let dir = tempfile::tempdir().unwrap();
    let svc = sleeper(dir.path(), "init").build().unwrap();
    let cancel = CancellationToken::new();

    for pid in ["0", "1"] {
        std::fs::write(svc.pid_file().path(), pid).unwrap();
        let status = svc.status(&cancel).await;
        assert!(!status.running(), "pid {pid} must never resolve");
        assert!(!status.ready());

        svc.stop(&cancel).await.unwrap();
        assert!(!svc.pid_file().path().exists());
    }
}
