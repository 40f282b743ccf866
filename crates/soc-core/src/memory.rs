//! Byte-array RAM and ROM devices.

use std::any::Any;

use crate::{BusDevice, DeviceInputs, DeviceOutputs};

/// Memory device with registered read data.
///
/// The addressed byte is latched on every clock and presented on the next
/// tick. Addresses past the end read as zero and ignore writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDevice {
    bytes: Box<[u8]>,
    writable: bool,
    data_out: u8,
}

impl MemoryDevice {
    /// Zero-filled RAM of `size` bytes.
    #[must_use]
    pub fn ram(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
            writable: true,
            data_out: 0,
        }
    }

    /// Read-only memory holding `image`.
    #[must_use]
    pub fn rom(image: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: image.into(),
            writable: false,
            data_out: 0,
        }
    }

    /// Returns `true` when master writes are stored.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    /// Backing bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable backing bytes, for hosts preloading contents.
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl BusDevice for MemoryDevice {
    fn outputs(&self) -> DeviceOutputs {
        DeviceOutputs {
            data_out: self.data_out,
            ..DeviceOutputs::default()
        }
    }

    fn clock(&mut self, inputs: &DeviceInputs) {
        let index = usize::from(inputs.address);
        self.data_out = self.bytes.get(index).copied().unwrap_or(0);
        if self.writable && inputs.select && inputs.write_enable {
            if let Some(byte) = self.bytes.get_mut(index) {
                *byte = inputs.data_in;
            }
        }
    }

    // contents survive reset
    fn reset(&mut self) {
        self.data_out = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
