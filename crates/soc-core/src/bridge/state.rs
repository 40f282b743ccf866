//! States of the bridge's upstream handshake.

use std::fmt;

/// Upstream handshake state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BridgeState {
    /// Clears the upstream strobes and the fault line; always followed by `Idle`.
    #[default]
    Reset,
    /// Waiting for a trigger access from the master.
    Idle,
    /// Upstream read outstanding; master stalled.
    StartRead,
    /// Read acknowledged; latching the result.
    ReadComplete,
    /// Upstream write outstanding; master stalled.
    StartWrite,
    /// Write acknowledged.
    WriteComplete,
}

impl BridgeState {
    /// Returns `true` while an upstream transfer is outstanding.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::StartRead | Self::StartWrite)
    }

    /// Upper-case trace name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Idle => "IDLE",
            Self::StartRead => "START_READ",
            Self::ReadComplete => "READ_COMPLETE",
            Self::StartWrite => "START_WRITE",
            Self::WriteComplete => "WRITE_COMPLETE",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
