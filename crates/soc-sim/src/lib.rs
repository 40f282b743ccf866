//! Script-driven testbench for the byte-bus system model.
//!
//! A script is a list of master cycles and checks run against the example
//! system, with an [`soc_core::UpstreamMemory`] answering the bridge.

/// JSON-loadable run configuration.
pub mod config;
pub use config::{SimConfig, DEFAULT_LATENCY, DEFAULT_MAX_STALL};

/// Run failures.
pub mod error;
pub use error::SimError;

/// Script parsing.
pub mod script;
pub use script::{parse_script, Command, ScriptError, Statement};

/// Script execution and tracing.
pub mod runner;
pub use runner::{run_script, RunReport, Simulation, TraceLine};

use env_logger as _;
