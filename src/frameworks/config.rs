use crate::use_cases::RuntimeSettings;
use std::{env, time::Duration};

// Runtime/server settings read from the environment (not gameplay tuning).

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn http_port() -> u16 {
    parsed("BLOCK_RUNTIME_PORT").unwrap_or(3010)
}

pub fn tick_hz() -> u64 {
    parsed::<u64>("BLOCK_RUNTIME_TICK_HZ")
        .filter(|hz| (1..=1000).contains(hz))
        .unwrap_or(60)
}

pub fn publish_interval() -> Duration {
    let millis = parsed::<u64>("BLOCK_RUNTIME_PUBLISH_MS")
        .filter(|ms| *ms > 0)
        .unwrap_or(50);
    Duration::from_millis(millis)
}

pub fn time_slice() -> Duration {
    let millis = parsed::<u64>("BLOCK_RUNTIME_SLICE_MS")
        .filter(|ms| *ms > 0)
        .unwrap_or(12);
    Duration::from_millis(millis)
}

pub fn effect_capacity() -> usize {
    parsed::<usize>("BLOCK_RUNTIME_EFFECT_CAPACITY")
        .filter(|cap| *cap > 0)
        .unwrap_or(DEFAULT_EFFECT_CAPACITY)
}

pub fn runtime_settings() -> RuntimeSettings {
    RuntimeSettings {
        tick_interval: Duration::from_micros(1_000_000 / tick_hz()),
        publish_interval: publish_interval(),
        time_slice: time_slice(),
    }
}

pub const DEFAULT_EFFECT_CAPACITY: usize = 256;
