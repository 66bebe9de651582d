#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use taskchain_test_utils::{
    FakeBehaviour, FakeSpawner, FakeWatcherFactory, ScriptedPrompter, eventually, init_tracing,
    with_timeout,
};

use taskchain::{Engine, EngineConfig, Payload, Registry, StepResult};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Fast intervals, no signal interception.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        poll_interval: Duration::from_millis(10),
        debounce: Duration::from_millis(10),
        signals: Vec::new(),
        ..EngineConfig::default()
    }
}

/// An engine wired to fresh fakes.
pub struct Harness {
    pub engine: Engine,
    pub spawner: FakeSpawner,
    pub watchers: FakeWatcherFactory,
    pub prompter: ScriptedPrompter,
}

impl Harness {
    pub fn new(registry: Registry) -> Self {
        Self::with(registry, test_config(), ScriptedPrompter::default())
    }

    pub fn with(registry: Registry, config: EngineConfig, prompter: ScriptedPrompter) -> Self {
        init_tracing();
        let spawner = FakeSpawner::new();
        let watchers = FakeWatcherFactory::new();
        let engine = Engine::new(Arc::new(registry), config)
            .with_spawner(Arc::new(spawner.clone()))
            .with_watcher_factory(Arc::new(watchers.clone()))
            .with_prompter(Arc::new(prompter.clone()));
        Self {
            engine,
            spawner,
            watchers,
            prompter,
        }
    }

    pub async fn run(&self, name: &str) -> StepResult {
        with_timeout(self.engine.run_task(name)).await
    }

    /// Arguments (after argv[0]) of every spawned `echo`, in order.
    pub fn echoed(&self) -> Vec<String> {
        self.spawner
            .spawned()
            .into_iter()
            .filter(|s| s.program() == "echo")
            .map(|s| s.argv[1..].join(" "))
            .collect()
    }
}

/// Shared log of payloads seen by Result steps.
#[derive(Clone, Default)]
pub struct Seen(Arc<Mutex<Vec<String>>>);

impl Seen {
    pub fn recorder(&self) -> impl Fn(&Payload) + Send + Sync + 'static {
        let log = Arc::clone(&self.0);
        move |payload: &Payload| log.lock().unwrap().push(payload.to_string())
    }

    pub fn get(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
