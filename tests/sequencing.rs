mod common;
use crate::common::{FakeBehaviour, Harness, Seen};

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use taskchain::{Payload, Registry, StepError, TaskBuilder};

#[tokio::test]
async fn terminal_result_is_last_step_and_each_step_sees_the_previous() {
    let seen = Seen::default();
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "one"])
            .result(seen.recorder())
            .exec(["echo", "two"])
            .result(seen.recorder())
            .exec(["echo", "three"])
            .build(),
    );
    let h = Harness::new(registry);

    let result = h.run("t").await;

    assert!(!result.is_err());
    assert_eq!(result.payload.as_text(), Some("three\n"));
    assert_eq!(seen.get(), ["one\n", "two\n"]);
    assert_eq!(h.echoed(), ["one", "two", "three"]);
}

#[tokio::test]
async fn catch_recovers_and_execution_resumes_after_it() {
    let caught = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&caught);

    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["broken"])
            .catch(move |c| {
                log.lock().unwrap().push(c.error.to_string());
                Ok(())
            })
            .exec(["echo", "after"])
            .build(),
    );
    let h = Harness::new(registry);
    h.spawner.script("broken", FakeBehaviour::Fail { code: 2 });

    let result = h.run("t").await;

    assert!(!result.is_err());
    assert_eq!(result.payload.as_text(), Some("after\n"));
    assert_eq!(h.spawner.programs(), ["broken", "echo"]);
    assert_eq!(
        caught.lock().unwrap().as_slice(),
        ["'broken' exited with exit status 2"]
    );
}

#[tokio::test]
async fn error_without_catch_aborts_the_run() {
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "before"])
            .exec(["broken"])
            .exec(["echo", "never"])
            .build(),
    );
    let h = Harness::new(registry);
    h.spawner.script("broken", FakeBehaviour::Fail { code: 1 });

    let result = h.run("t").await;

    assert_eq!(
        result.error,
        Some(StepError::Exit {
            program: "broken".into(),
            code: Some(1)
        })
    );
    assert_eq!(h.echoed(), ["before"]);
}

#[tokio::test]
async fn catch_returning_an_error_aborts_with_it() {
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .sleep("soon")
            .catch(|c| Err(StepError::user(format!("giving up: {}", c.error))))
            .exec(["echo", "never"])
            .build(),
    );
    let h = Harness::new(registry);

    let result = h.run("t").await;

    match result.error {
        Some(StepError::User(msg)) => assert!(msg.starts_with("giving up: invalid duration")),
        other => panic!("expected a user error, got {other:?}"),
    }
    assert!(h.echoed().is_empty());
}

#[tokio::test]
async fn catch_only_guards_the_step_right_before_it() {
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "fine"])
            .catch(|_| Ok(()))
            .exec(["broken"])
            .build(),
    );
    let h = Harness::new(registry);
    h.spawner.script("broken", FakeBehaviour::Fail { code: 1 });

    assert!(h.run("t").await.is_err());
}

#[tokio::test]
async fn trailing_catch_leaves_the_run_successful() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").exists("no/such/file").catch(|_| Ok(())).build());
    let h = Harness::new(registry);

    let result = h.run("t").await;

    assert!(!result.is_err());
}

#[tokio::test]
async fn run_step_waits_for_the_child_and_passes_its_result_on() {
    let seen = Seen::default();
    let mut registry = Registry::new();
    registry
        .register(
            TaskBuilder::new("parent")
                .run("child")
                .result(seen.recorder())
                .build(),
        )
        .register(TaskBuilder::new("child").exec(["echo", "from child"]).build());
    let h = Harness::new(registry);

    let result = h.run("parent").await;

    assert!(!result.is_err());
    assert_eq!(seen.get(), ["from child\n"]);
}

#[tokio::test]
async fn unknown_tasks_are_lookup_errors() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("parent").run("ghost").build());
    let h = Harness::new(registry);

    assert_eq!(h.run("nope").await.error, Some(StepError::Lookup("nope".into())));
    assert_eq!(h.run("parent").await.error, Some(StepError::Lookup("ghost".into())));
}

#[tokio::test]
async fn self_invocation_fails_instead_of_hanging() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("loop").exec(["echo", "x"]).run("loop").build());
    let h = Harness::new(registry);

    let result = h.run("loop").await;

    match result.error {
        Some(StepError::Validation(msg)) => {
            assert_eq!(msg, "task \"loop\" invokes itself: loop -> loop")
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(h.echoed(), ["x"]);
}

#[tokio::test]
async fn reference_cycles_through_run_and_parallel_fail() {
    let mut registry = Registry::new();
    registry
        .register(TaskBuilder::new("a").run("b").build())
        .register(TaskBuilder::new("b").parallel(["c"]).build())
        .register(TaskBuilder::new("c").run("a").build());
    let h = Harness::new(registry);

    let result = h.run("a").await;

    assert_eq!(
        result.error,
        Some(StepError::Parallel(
            "c -> task \"a\" invokes itself: a -> b -> c -> a".into()
        ))
    );

    // The same task twice in one Parallel is not a cycle.
    let mut registry = Registry::new();
    registry
        .register(TaskBuilder::new("twice").parallel(["leaf", "leaf"]).build())
        .register(TaskBuilder::new("leaf").exec(["echo", "leaf"]).build());
    let h = Harness::new(registry);
    assert!(!h.run("twice").await.is_err());
    assert_eq!(h.echoed(), ["leaf", "leaf"]);
}

#[tokio::test]
async fn env_additions_reach_exec_and_reset_between_runs() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").env(["K=V"]).exec(["env"]).build());
    let h = Harness::new(registry);

    let first = h.run("t").await;
    let second = h.run("t").await;

    assert_eq!(first.payload.as_text(), Some("K=V\n"));
    assert_eq!(second.payload.as_text(), Some("K=V\n"));
}

#[tokio::test]
async fn chdir_scopes_exec_and_resets_for_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().canonicalize().unwrap();
    let cwd = std::env::current_dir().unwrap();

    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "here"])
            .chdir(&target)
            .exec(["echo", "there"])
            .build(),
    );
    let h = Harness::new(registry);

    h.run("t").await;
    let result = h.run("t").await;

    assert!(!result.is_err());
    let cwds: Vec<_> = h.spawner.spawned().into_iter().map(|s| s.cwd).collect();
    assert_eq!(cwds, [cwd.clone(), target.clone(), cwd, target]);
}

#[tokio::test]
async fn chdir_rejects_missing_paths_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, "x").unwrap();

    let mut registry = Registry::new();
    registry
        .register(TaskBuilder::new("missing").chdir(dir.path().join("nope")).build())
        .register(TaskBuilder::new("file").chdir(&file).build());
    let h = Harness::new(registry);

    match h.run("missing").await.error {
        Some(StepError::Validation(msg)) => assert_eq!(
            msg,
            format!("{} does not exist", dir.path().join("nope").display())
        ),
        other => panic!("expected a validation error, got {other:?}"),
    }
    match h.run("file").await.error {
        Some(StepError::Validation(msg)) => {
            assert_eq!(msg, format!("{} is not a directory", file.display()))
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_chdir_leaves_the_working_directory_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let cwd = std::env::current_dir().unwrap();
    let caught = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&caught);

    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "before"])
            .chdir(&missing)
            .catch(move |c| {
                log.lock().unwrap().push(c.error.to_string());
                Ok(())
            })
            .exec(["echo", "after"])
            .build(),
    );
    let h = Harness::new(registry);

    let result = h.run("t").await;

    assert!(!result.is_err());
    let cwds: Vec<_> = h.spawner.spawned().into_iter().map(|s| s.cwd).collect();
    assert_eq!(cwds, [cwd.clone(), cwd]);
    assert_eq!(
        caught.lock().unwrap().as_slice(),
        [format!("{} does not exist", missing.display())]
    );
}

#[tokio::test]
async fn malformed_env_entry_is_a_validation_error() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").env(["JUSTAKEY"]).build());
    let h = Harness::new(registry);

    assert!(matches!(h.run("t").await.error, Some(StepError::Validation(_))));
}

#[tokio::test]
async fn sleep_rejects_unparseable_durations() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").sleep("forever").build());
    let h = Harness::new(registry);

    assert!(matches!(h.run("t").await.error, Some(StepError::Parse { .. })));
}

#[tokio::test]
async fn sleep_echoes_its_duration() {
    let mut registry = Registry::new();
    registry.register(TaskBuilder::new("t").sleep("5ms").build());
    let h = Harness::new(registry);

    let result = h.run("t").await;

    assert_eq!(result.payload.as_text(), Some("5ms"));
}

#[tokio::test]
async fn exists_reports_metadata_or_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("present.txt");
    std::fs::write(&file, "12345").unwrap();

    let mut registry = Registry::new();
    registry
        .register(TaskBuilder::new("present").exists(&file).build())
        .register(TaskBuilder::new("absent").exists(dir.path().join("absent.txt")).build());
    let h = Harness::new(registry);

    match h.run("present").await.payload {
        Payload::File(info) => {
            assert_eq!(info.len, 5);
            assert!(!info.is_dir);
        }
        other => panic!("expected file info, got {other:?}"),
    }

    match h.run("absent").await.error {
        Some(StepError::Io { path, .. }) => assert_eq!(path, dir.path().join("absent.txt")),
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[tokio::test]
async fn print_yields_an_empty_result() {
    let seen = Seen::default();
    let mut registry = Registry::new();
    registry.register(
        TaskBuilder::new("t")
            .exec(["echo", "hi"])
            .print(Vec::<String>::new())
            .result(seen.recorder())
            .print(["done", "printing"])
            .build(),
    );
    let h = Harness::new(registry);

    let result = h.run("t").await;

    assert!(!result.is_err());
    assert!(result.payload.is_none());
    assert_eq!(seen.get(), ["<none>"]);
}

fn sequencing_task(tokens: &[u8], seen: &Seen) -> TaskBuilder {
    let mut builder = TaskBuilder::new("seq");
    for (i, token) in tokens.iter().enumerate() {
        builder = builder.exec(["echo".to_string(), format!("t{i}-{token}")]);
        if i + 1 < tokens.len() {
            builder = builder.result(seen.recorder());
        }
    }
    builder
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn error_free_sequences_end_with_the_last_step(tokens in prop::collection::vec(any::<u8>(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let seen = Seen::default();
        let mut registry = Registry::new();
        registry.register(sequencing_task(&tokens, &seen).build());
        let h = Harness::new(registry);

        let result = runtime.block_on(h.run("seq"));

        let expected: Vec<String> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| format!("t{i}-{t}"))
            .collect();
        prop_assert!(!result.is_err());
        prop_assert_eq!(h.echoed(), expected.clone());
        let last = format!("{}\n", expected[expected.len() - 1]);
        prop_assert_eq!(result.payload.as_text(), Some(last.as_str()));

        let fed: Vec<String> = expected[..expected.len() - 1]
            .iter()
            .map(|e| format!("{e}\n"))
            .collect();
        prop_assert_eq!(seen.get(), fed);
    }
}
