//! Failures of a testbench run.

use std::path::PathBuf;

use soc_core::ComposeError;
use thiserror::Error;

use crate::ScriptError;

/// Failure of a testbench run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The script did not parse.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// The system could not be composed.
    #[error("composition failed: {0}")]
    Compose(#[from] ComposeError),
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration did not parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A `hold` exceeded the stall bound.
    #[error("line {line}: bus still stalled after {ticks} ticks")]
    Stalled {
        /// Script line of the `hold`.
        line: usize,
        /// Ticks waited.
        ticks: u32,
    },
    /// An `expect` saw different data.
    #[error("line {line}: expected {expected:#04X}, bus returned {actual:#04X}")]
    Mismatch {
        /// Script line of the `expect`.
        line: usize,
        /// Byte the script expected.
        expected: u8,
        /// Byte on the bus.
        actual: u8,
    },
    /// The bridge region holds no upstream memory bridge.
    #[error("bridge region has no upstream memory attached")]
    MissingBridge,
}
