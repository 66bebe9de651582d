// src/step/duration.rs

//! Duration strings for Sleep steps.
//!
//! Accepts a sequence of decimal numbers, each with an optional fraction and a
//! unit suffix: `"300ms"`, `"1.5h"`, `"2h45m"`. Valid units are `ns`, `us`
//! (or `µs`), `ms`, `s`, `m`, `h`. A bare `"0"` is allowed. A leading `-`
//! yields a zero duration (there is no negative sleep).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::errors::StepError;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h)").expect("static regex is valid")
});

pub fn parse_duration(input: &str) -> Result<Duration, StepError> {
    let err = |message: &str| StepError::Parse {
        input: input.to_string(),
        message: message.to_string(),
    };

    let mut rest = input;
    let negative = match rest.chars().next() {
        Some('-') => {
            rest = &rest[1..];
            true
        }
        Some('+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(err("empty duration"));
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let caps = COMPONENT
            .captures(rest)
            .ok_or_else(|| err("expected <number><unit> with unit one of ns, us, ms, s, m, h"))?;
        let number: f64 = caps[1].parse().map_err(|_| err("invalid number"))?;
        let scale = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(err("unknown unit")),
        };
        total_nanos += number * scale;
        rest = &rest[caps[0].len()..];
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(err("duration out of range"));
    }
    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
