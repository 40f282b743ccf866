//! Byte-bus signal bundles and the contract every memory-mapped device implements.

use std::any::Any;

/// One bus cycle as presented by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MasterCycle {
    /// Address lines.
    pub address: u16,
    /// Write data; ignored by devices on reads.
    pub data: u8,
    /// High for a write cycle.
    pub write_enable: bool,
}

impl MasterCycle {
    /// A read of `address`.
    #[must_use]
    pub const fn read(address: u16) -> Self {
        Self {
            address,
            data: 0,
            write_enable: false,
        }
    }

    /// A write of `data` to `address`.
    #[must_use]
    pub const fn write(address: u16, data: u8) -> Self {
        Self {
            address,
            data,
            write_enable: true,
        }
    }
}

/// What the fabric drives back to the master during a tick.
///
/// `data` and `ready` belong to the cycle presented on the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusResponse {
    /// Read data.
    pub data: u8,
    /// Low while the master must hold its cycle.
    pub ready: bool,
    /// Shared maskable interrupt line.
    pub irq: bool,
    /// Shared non-maskable fault line.
    pub nmi: bool,
}

impl Default for BusResponse {
    fn default() -> Self {
        Self {
            data: 0,
            ready: true,
            irq: false,
            nmi: false,
        }
    }
}

/// Inputs the fabric wires into a device for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceInputs {
    /// Address with the device's base already subtracted.
    pub address: u16,
    /// Byte driven by the master.
    pub data_in: u8,
    /// Master write enable.
    pub write_enable: bool,
    /// Range membership of this tick's address.
    pub select: bool,
    /// Range membership of the previous tick's address.
    pub select_registered: bool,
}

/// Registered outputs a device presents to the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceOutputs {
    /// Byte returned to the master when this device holds the registered select.
    pub data_out: u8,
    /// Maskable interrupt request.
    pub irq: bool,
    /// Non-maskable fault request.
    pub nmi: bool,
    /// Deasserted to stall the master.
    pub ready: bool,
}

impl Default for DeviceOutputs {
    fn default() -> Self {
        Self {
            data_out: 0,
            irq: false,
            nmi: false,
            ready: true,
        }
    }
}

/// Contract for every participant on the byte bus.
///
/// A tick first samples [`BusDevice::outputs`] from every device, then calls
/// [`BusDevice::clock`] on each one. `data_out` must come from state latched
/// on an earlier clock so that it lines up with the registered select.
pub trait BusDevice: Any {
    /// Registered outputs visible during the current tick.
    fn outputs(&self) -> DeviceOutputs;

    /// Advances the device by one clock edge.
    fn clock(&mut self, inputs: &DeviceInputs);

    /// Drives the external reset input.
    fn reset(&mut self);

    /// Typed view used to recover the concrete device from the fabric.
    fn as_any(&self) -> &dyn Any;

    /// Mutable typed view used to recover the concrete device from the fabric.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::{BusResponse, DeviceOutputs, MasterCycle};

    #[test]
    fn ready_defaults_to_asserted() {
        assert!(DeviceOutputs::default().ready);
        assert!(BusResponse::default().ready);
        assert_eq!(BusResponse::default().data, 0);
    }

    #[test]
    fn cycle_constructors_set_direction() {
        assert!(!MasterCycle::read(0xFE20).write_enable);
        let write = MasterCycle::write(0xFE23, 0x5A);
        assert!(write.write_enable);
        assert_eq!(write.data, 0x5A);
    }
}
