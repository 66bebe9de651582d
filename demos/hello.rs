// demos/hello.rs
//
// A small host program. Try:
//
//   cargo run --example hello
//   cargo run --example hello -- greet --once
//   cargo run --example hello -- dev

use std::process::ExitCode;

use taskchain::{Payload, Registry, StepError, TaskBuilder};

#[tokio::main]
async fn main() -> ExitCode {
    let mut registry = Registry::new();

    registry
        .register(
            TaskBuilder::new("greet")
                .env(["GREETING=hello"])
                .exec(["sh", "-c", "echo \"$GREETING from $(pwd)\""])
                .result(|payload| {
                    if let Payload::Text(out) = payload {
                        eprintln!("captured {} byte(s)", out.len());
                    }
                })
                .build(),
        )
        .register(
            TaskBuilder::new("flaky")
                .exec(["false"])
                .catch(|caught| {
                    eprintln!("ignoring: {}", caught.error);
                    Ok(())
                })
                .print(["recovered"])
                .build(),
        )
        .register(
            TaskBuilder::new("check")
                .exists("Cargo.toml")
                .chdir("src")
                .exec(["ls"])
                .build(),
        )
        .register(
            TaskBuilder::new("all")
                .parallel(["greet", "flaky", "check"])
                .catch(|caught| Err(StepError::user(format!("some branches failed: {}", caught.error))))
                .build(),
        )
        .register(
            TaskBuilder::new("release")
                .prompt("Tag a release?")
                .yes()
                .print(["tagging"])
                .sleep("500ms")
                .no()
                .print(["skipping"])
                .end()
                .build(),
        )
        .register(
            TaskBuilder::new("dev")
                .watch(["src/**/*.rs", "Cargo.toml"])
                .run("all")
                .build(),
        );

    taskchain::go(registry).await
}
