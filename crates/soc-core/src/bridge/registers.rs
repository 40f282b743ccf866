//! Byte window over the bridge's address and data registers.

/// Number of byte offsets in the register window.
pub const WINDOW_SIZE: u16 = 8;
/// Data register least-significant byte; reading it starts an upstream read.
pub const DATA_LSB_OFFSET: u16 = 0;
/// Data register most-significant byte; writing it starts an upstream write.
pub const DATA_MSB_OFFSET: u16 = 3;
/// Address register least-significant byte.
pub const ADDRESS_LSB_OFFSET: u16 = 4;

/// Data and address registers, little-endian in the window.
///
/// Offsets 0-3 select data register bytes, offsets 4-7 address register
/// bytes. Offsets wrap modulo [`WINDOW_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BridgeRegisters {
    /// Upstream target address.
    pub address_register: u32,
    /// Upstream write data, or the result of the last completed read.
    pub data_register: u32,
}

impl BridgeRegisters {
    /// Reads the byte at window `offset`.
    #[must_use]
    pub const fn read_byte(&self, offset: u16) -> u8 {
        let (word, lane) = self.lane(offset);
        word.to_le_bytes()[lane]
    }

    /// Writes `value` to the byte at window `offset`.
    pub fn write_byte(&mut self, offset: u16, value: u8) {
        let offset = offset % WINDOW_SIZE;
        let word = if offset < ADDRESS_LSB_OFFSET {
            &mut self.data_register
        } else {
            &mut self.address_register
        };
        let mut bytes = word.to_le_bytes();
        bytes[usize::from(offset % 4)] = value;
        *word = u32::from_le_bytes(bytes);
    }

    #[allow(clippy::cast_lossless)]
    const fn lane(&self, offset: u16) -> (u32, usize) {
        let offset = offset % WINDOW_SIZE;
        let word = if offset < ADDRESS_LSB_OFFSET {
            self.data_register
        } else {
            self.address_register
        };
        (word, (offset % 4) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeRegisters, WINDOW_SIZE};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0xEF)]
    #[case(1, 0xBE)]
    #[case(2, 0xAD)]
    #[case(3, 0xDE)]
    #[case(4, 0x00)]
    #[case(5, 0x10)]
    #[case(6, 0x00)]
    #[case(7, 0x00)]
    fn window_layout_is_little_endian(#[case] offset: u16, #[case] expected: u8) {
        let registers = BridgeRegisters {
            address_register: 0x0000_1000,
            data_register: 0xDEAD_BEEF,
        };
        assert_eq!(registers.read_byte(offset), expected);
    }

    #[test]
    fn byte_writes_assemble_both_registers() {
        let mut registers = BridgeRegisters::default();
        for (offset, byte) in (0..WINDOW_SIZE).zip([0x78, 0x56, 0x34, 0x12, 0x00, 0x10, 0x00, 0x80]) {
            registers.write_byte(offset, byte);
        }
        assert_eq!(registers.data_register, 0x1234_5678);
        assert_eq!(registers.address_register, 0x8000_1000);
    }

    #[test]
    fn offsets_wrap_modulo_window() {
        let mut registers = BridgeRegisters::default();
        registers.write_byte(WINDOW_SIZE + 4, 0xAA);
        assert_eq!(registers.address_register, 0xAA);
        assert_eq!(registers.read_byte(WINDOW_SIZE + 4), 0xAA);
    }
}
