//! Errors raised while composing devices onto the fabric.

use thiserror::Error;

/// Failures raised while wiring devices onto the fabric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ComposeError {
    /// Device attached to a region name the map does not define.
    #[error("memory map has no region named `{0}`")]
    UnknownRegion(String),
    /// A second device was attached to an already populated region.
    #[error("region `{0}` already has a device attached")]
    DuplicateDevice(String),
    /// Range overlaps an earlier entry while overlaps are rejected.
    #[error("region `{new}` overlaps earlier region `{existing}`")]
    Overlap {
        /// Region registered first.
        existing: String,
        /// Region being registered.
        new: String,
    },
    /// Range covers no addresses.
    #[error("region `{0}` is empty")]
    EmptyRange(String),
}
