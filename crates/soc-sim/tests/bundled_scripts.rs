//! Runs the bundled scripts through the library across upstream latencies.

use env_logger as _;
use log as _;
use serde as _;
use serde_json as _;
use std::fs;
use std::path::Path;
use tempfile as _;
use thiserror as _;

use soc_core::BridgeState;
use soc_sim::{run_script, SimConfig, SimError};

fn load(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scripts")
        .join(name);
    fs::read_to_string(path).expect("bundled script")
}

fn config(latency: u32) -> SimConfig {
    SimConfig {
        latency,
        max_stall: 64,
        ..SimConfig::default()
    }
}

#[test]
fn bundled_scripts_pass_at_every_latency() {
    for name in ["bridge_write.bus", "bridge_read.bus"] {
        let source = load(name);
        for latency in [0, 1, 5, 20] {
            let report = run_script(&source, &config(latency));
            assert!(
                report.outcome.is_ok(),
                "{name} at latency {latency}: {:?}",
                report.outcome
            );
            assert!(report.trace.iter().all(|line| !line.response.nmi));
            assert_eq!(report.faults, 0);
        }
    }
}

#[test]
fn longer_latency_stalls_longer() {
    let source = load("bridge_read.bus");
    let fast = run_script(&source, &config(0)).trace;
    let slow = run_script(&source, &config(10)).trace;
    assert_eq!(slow.len(), fast.len() + 10);
}

#[test]
fn retry_behaves_like_error() {
    let source = load("bridge_read.bus");
    let mut faulting = config(1);
    faulting.retry_addresses = vec![0x2000];

    let report = run_script(&source, &faulting);
    assert!(matches!(
        report.outcome,
        Err(SimError::Mismatch { line: 14, .. })
    ));
    assert_eq!(report.faults, 1);
    assert!(report
        .trace
        .iter()
        .any(|line| line.response.nmi && line.bridge == BridgeState::Reset));
}

#[test]
fn script_errors_surface_before_any_tick() {
    let report = run_script("read 0x0000\nwrite 0x10\n", &SimConfig::default());
    assert!(report.trace.is_empty());
    assert_eq!(
        report.outcome.map_err(|error| error.to_string()),
        Err("line 2: `write` takes 2 operand(s), found 1".to_string())
    );
}
