//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use keyreplay_rs::config::AppConfig;
use std::time::Duration;

/// Upper bound for waiting on background capture or playback
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Config with no lead-in or pass gap and a short stop-key sequence
pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::immediate();
    config.capture.stop_key_hold_ms = 100;
    config.capture.stop_grace_ms = 50;
    config
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
