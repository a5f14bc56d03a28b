//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::thread;
use std::time::{Duration, Instant};
use visflow::pipeline::{OperationCore, OperationState};

/// Generous upper bound for anything a worker thread should finish
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Polls `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Waits until `op` reports `state`
pub fn wait_for_state(op: &OperationCore, state: OperationState) -> bool {
    wait_until(test_timeout(), || op.state() == state)
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
