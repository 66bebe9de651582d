mod common;
use crate::common::{
    FakeBehaviour, FakeWatcherFactory, Harness, ScriptedPrompter, TestResult, eventually,
    test_config, with_timeout,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use taskchain::{
    Engine, EngineConfig, Execution, Payload, Registry, StepError, StepResult, TaskBuilder,
    TaskchainError,
};

/// Nothing more is reported within a short window.
async fn assert_quiet(execution: &mut Execution) {
    let next = tokio::time::timeout(Duration::from_millis(200), execution.next_run()).await;
    assert!(next.is_err(), "unexpected run: {next:?}");
}

async fn next(execution: &mut Execution) -> StepResult {
    with_timeout(execution.next_run())
        .await
        .expect("run loop ended early")
}

fn watched_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "v1").unwrap();
    (dir, file)
}

fn config_in(dir: &Path) -> EngineConfig {
    EngineConfig {
        base_dir: Some(dir.to_path_buf()),
        ..test_config()
    }
}

fn build(registry: Registry, dir: &Path) -> Harness {
    Harness::with(registry, config_in(dir), ScriptedPrompter::default())
}

#[tokio::test]
async fn task_without_watch_runs_exactly_once() -> TestResult {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("once").exec(["echo", "hi"]).build());
    let h = Harness::new(registry);

    let mut execution = h.engine.execute("once");
    assert!(!execution.is_watching());

    let first = next(&mut execution).await;
    assert_eq!(first.payload.as_text(), Some("hi\n"));
    assert!(with_timeout(execution.next_run()).await.is_none());
    assert!(!execution.request_run());

    let last = with_timeout(execution.wait()).await?;
    assert_eq!(last.payload.as_text(), Some("hi\n"));
    assert!(!h.watchers.is_started());
    Ok(())
}

#[tokio::test]
async fn unmatched_patterns_run_once_without_a_watcher() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["**/*.rs"]).exec(["echo", "x"]).build());
    let h = build(registry, dir.path());

    let mut execution = h.engine.execute("t");

    assert!(execution.watched_files().is_empty());
    next(&mut execution).await;
    assert!(with_timeout(execution.next_run()).await.is_none());
    assert!(!h.watchers.is_started());
    Ok(())
}

#[tokio::test]
async fn initial_run_then_one_run_per_change() -> TestResult {
    let (dir, file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["echo", "built"]).build());
    let h = build(registry, dir.path());

    let mut execution = h.engine.execute("t");
    assert!(execution.is_watching());
    assert_eq!(execution.watched_files(), [file.clone()]);
    assert_eq!(h.watchers.added(), [file.clone()]);
    assert_eq!(h.watchers.started_interval(), Some(Duration::from_millis(10)));

    next(&mut execution).await;
    assert!(h.watchers.change(&file));
    let second = next(&mut execution).await;
    assert_eq!(second.payload.as_text(), Some("built\n"));
    assert_quiet(&mut execution).await;

    execution.stop();
    let last = with_timeout(execution.wait()).await?;
    assert!(!last.is_err());
    assert_eq!(h.echoed(), ["built", "built"]);
    eventually(|| h.watchers.is_closed()).await;
    Ok(())
}

#[tokio::test]
async fn change_burst_coalesces_into_one_run() -> TestResult {
    let (dir, file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["a.txt"]).exec(["echo", "built"]).build());
    let config = EngineConfig {
        debounce: Duration::from_millis(100),
        ..config_in(dir.path())
    };
    let h = Harness::with(registry, config, ScriptedPrompter::default());

    let mut execution = h.engine.execute("t");
    next(&mut execution).await;

    for _ in 0..5 {
        h.watchers.change(&file);
    }
    next(&mut execution).await;
    assert_quiet(&mut execution).await;
    Ok(())
}

#[tokio::test]
async fn requests_while_a_run_is_pending_coalesce() -> TestResult {
    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["slow"]).build());
    let h = build(registry, dir.path());
    h.spawner.script(
        "slow",
        FakeBehaviour::Succeed {
            stdout: String::new(),
            delay: Duration::from_millis(300),
        },
    );

    let mut execution = h.engine.execute("t");
    eventually(|| h.spawner.programs().len() == 1).await;

    assert!(execution.request_run());
    assert!(!execution.request_run());

    next(&mut execution).await;
    next(&mut execution).await;
    assert_quiet(&mut execution).await;
    assert_eq!(h.spawner.programs().len(), 2);
    Ok(())
}

#[tokio::test]
async fn stop_drops_a_pending_run() -> TestResult {
    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["slow"]).build());
    let h = build(registry, dir.path());
    h.spawner.script(
        "slow",
        FakeBehaviour::Succeed {
            stdout: "first".into(),
            delay: Duration::from_millis(200),
        },
    );

    let mut execution = h.engine.execute("t");
    eventually(|| h.spawner.programs().len() == 1).await;
    assert!(execution.request_run());
    execution.stop();

    let last = with_timeout(execution.wait()).await?;
    assert_eq!(last.payload.as_text(), Some("first"));
    assert_eq!(h.spawner.programs().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rerun_kills_running_child_tasks() -> TestResult {
    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry
        .register(TaskBuilder::new("dev").watch(["*.txt"]).run("serve").build())
        .register(TaskBuilder::new("serve").exec(["server"]).build());
    let h = build(registry, dir.path());
    h.spawner.script("server", FakeBehaviour::HangUntilKilled);

    let mut execution = h.engine.execute("dev");
    eventually(|| h.spawner.programs() == ["server"]).await;

    // The next server starts and exits normally.
    h.spawner.script("server", FakeBehaviour::prints("up"));
    assert!(execution.request_run());

    let interrupted = next(&mut execution).await;
    assert!(matches!(interrupted.payload, Payload::Killed));
    assert!(!interrupted.is_err());
    assert_eq!(h.spawner.killed(), ["server"]);

    let rerun = next(&mut execution).await;
    assert_eq!(rerun.payload.as_text(), Some("up"));

    execution.stop();
    let last = with_timeout(execution.wait()).await?;
    assert_eq!(last.payload.as_text(), Some("up"));
    Ok(())
}

#[tokio::test]
async fn watcher_error_ends_the_execution_with_an_error() {
    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["echo", "x"]).build());
    let h = build(registry, dir.path());

    let mut execution = h.engine.execute("t");
    next(&mut execution).await;
    assert!(h.watchers.fail("disk on fire"));

    match with_timeout(execution.wait()).await {
        Err(TaskchainError::WatchError(message)) => assert_eq!(message, "disk on fire"),
        other => panic!("expected a watcher error, got {other:?}"),
    }
    assert!(h.watchers.is_closed());
}

#[tokio::test]
async fn watcher_that_cannot_start_is_reported() {
    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["echo", "x"]).build());
    let engine = Engine::new(Arc::new(registry), config_in(dir.path()))
        .with_watcher_factory(Arc::new(FakeWatcherFactory::failing()));

    let execution = engine.execute("t");

    match with_timeout(execution.wait()).await {
        Err(TaskchainError::WatchError(message)) => {
            assert!(message.contains("fake watcher refused to start"), "{message}")
        }
        other => panic!("expected a watcher error, got {other:?}"),
    }
}

#[tokio::test]
async fn hash_filter_ignores_touches_without_content_changes() -> TestResult {
    let (dir, file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").watch(["*.txt"]).exec(["echo", "x"]).build());
    let config = EngineConfig {
        use_hash: true,
        ..config_in(dir.path())
    };
    let h = Harness::with(registry, config, ScriptedPrompter::default());

    let mut execution = h.engine.execute("t");
    let watched = execution.watched_files()[0].clone();
    next(&mut execution).await;

    h.watchers.change(&watched);
    assert_quiet(&mut execution).await;

    std::fs::write(&file, "v2")?;
    h.watchers.change(&watched);
    next(&mut execution).await;
    Ok(())
}

#[tokio::test]
async fn executing_an_unknown_task_reports_a_lookup_error() -> TestResult {
    let h = Harness::new(Registry::new());

    let mut execution = h.engine.execute("ghost");

    let report = next(&mut execution).await;
    assert_eq!(report.error, Some(StepError::Lookup("ghost".into())));
    let last = with_timeout(execution.wait()).await?;
    assert!(last.is_err());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn task_signal_triggers_a_rerun() -> TestResult {
    use taskchain::SignalName;

    let (dir, _file) = watched_dir();
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .watch(["*.txt"])
            .exec(["echo", "x"])
            .signals([SignalName::Hangup])
            .build(),
    );
    let h = build(registry, dir.path());

    let mut execution = h.engine.execute("t");
    next(&mut execution).await;

    let status = std::process::Command::new("kill")
        .args(["-s", "HUP", &std::process::id().to_string()])
        .status()?;
    assert!(status.success());

    next(&mut execution).await;
    assert_eq!(h.echoed().len(), 2);
    Ok(())
}
