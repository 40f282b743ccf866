//! Lock-step model of a byte-wide bus fabric and its 32-bit upstream bridge.
//!
//! The master presents one [`MasterCycle`] per tick. The [`Fabric`] decodes it
//! against an ordered list of address ranges, clocks every [`BusDevice`], and
//! answers with a [`BusResponse`] whose data and ready lines belong to the
//! previous tick's cycle. The [`ProtocolBridge`] device turns accesses to an
//! 8-byte register window into handshaked transfers on an [`Upstream`]
//! responder.

/// Byte-bus signal bundles and the device contract.
pub mod bus;
pub use bus::{BusDevice, BusResponse, DeviceInputs, DeviceOutputs, MasterCycle};

/// Address ranges, named regions, and the example memory map.
pub mod map;
pub use map::{
    AddressRange, MemoryMap, RegionDescriptor, BRIDGE_BASE, BRIDGE_REGION, BRIDGE_SIZE,
    EXAMPLE_REGIONS, HIGH_OS_ROM_BASE, HIGH_OS_ROM_REGION, HIGH_OS_ROM_SIZE, LOW_OS_ROM_BASE,
    LOW_OS_ROM_REGION, LOW_OS_ROM_SIZE, PAGED_ROM_BASE, PAGED_ROM_REGION, PAGED_ROM_SIZE,
    PAGING_REGISTER_BASE, PAGING_REGISTER_REGION, PAGING_REGISTER_SIZE, RAM_BASE, RAM_REGION,
    RAM_SIZE, RGB_BASE, RGB_REGION, RGB_SIZE,
};

/// Composition failures.
pub mod error;
pub use error::ComposeError;

/// Address decode and output multiplexing.
pub mod fabric;
pub use fabric::{Fabric, OverlapPolicy};

/// Upstream interconnect signals and responder models.
pub mod upstream;
pub use upstream::{
    ExternalUpstream, Unresponsive, Upstream, UpstreamFault, UpstreamMemory, UpstreamRequest,
    UpstreamResponse, BYTE_SELECT_ALL,
};

/// Byte-window bridge onto the upstream interconnect.
pub mod bridge;
pub use bridge::{
    BridgeRegisters, BridgeState, ProtocolBridge, ADDRESS_LSB_OFFSET, DATA_LSB_OFFSET,
    DATA_MSB_OFFSET, WINDOW_SIZE,
};

/// RAM and ROM bus devices.
pub mod memory;
pub use memory::MemoryDevice;

/// System composition.
pub mod soc;
pub use soc::{Soc, SocBuilder, SocConfig};

#[cfg(test)]
use proptest as _;
