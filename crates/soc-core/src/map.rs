//! Address ranges, named regions, and the example memory map.

use std::fmt;

/// Base address of the RAM region.
pub const RAM_BASE: u32 = 0x0000;
/// Size in bytes of the RAM region.
pub const RAM_SIZE: u32 = 0x8000;
/// Base address of the paged ROM region.
pub const PAGED_ROM_BASE: u32 = 0x8000;
/// Size in bytes of the paged ROM region.
pub const PAGED_ROM_SIZE: u32 = 0x4000;
/// Base address of the low OS ROM region.
pub const LOW_OS_ROM_BASE: u32 = 0xC000;
/// Size in bytes of the low OS ROM region.
pub const LOW_OS_ROM_SIZE: u32 = 0x3C00;
/// Base address of the RGB indicator register block.
pub const RGB_BASE: u32 = 0xFE00;
/// Size in bytes of the RGB indicator register block.
pub const RGB_SIZE: u32 = 0x10;
/// Base address of the upstream bridge register window.
pub const BRIDGE_BASE: u32 = 0xFE20;
/// Size in bytes of the upstream bridge register window.
pub const BRIDGE_SIZE: u32 = 0x08;
/// Base address of the paging register block.
pub const PAGING_REGISTER_BASE: u32 = 0xFE30;
/// Size in bytes of the paging register block.
pub const PAGING_REGISTER_SIZE: u32 = 0x10;
/// Base address of the high OS ROM region.
pub const HIGH_OS_ROM_BASE: u32 = 0xFF00;
/// Size in bytes of the high OS ROM region.
pub const HIGH_OS_ROM_SIZE: u32 = 0xFF;

/// Half-open address interval `start..start + size` on the master's bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressRange {
    /// First address inside the range.
    pub start: u32,
    /// Number of addresses covered.
    pub size: u32,
}

impl AddressRange {
    /// Creates a range covering `size` addresses from `start`.
    #[must_use]
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }

    /// Exclusive end of the range, widened so `start + size` never wraps.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn end(self) -> u64 {
        self.start as u64 + self.size as u64
    }

    /// Returns `true` when `addr` falls inside the range.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn contains(self, addr: u32) -> bool {
        addr >= self.start && (addr as u64) < self.end()
    }

    /// Returns `true` when the two ranges share at least one address.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn overlaps(self, other: Self) -> bool {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        (self.start as u64) < other.end() && (other.start as u64) < self.end()
    }

    /// Translates a bus address into the device-local frame.
    ///
    /// The result is truncated to the 16-bit local address lines.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn local(self, addr: u32) -> u16 {
        addr.wrapping_sub(self.start) as u16
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}+{:#X}", self.start, self.size)
    }
}

/// Named region of a memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Region name devices are attached by.
    pub name: &'static str,
    /// Bus addresses claimed by the region.
    pub range: AddressRange,
}

impl RegionDescriptor {
    /// Creates a named region.
    #[must_use]
    pub const fn new(name: &'static str, start: u32, size: u32) -> Self {
        Self {
            name,
            range: AddressRange::new(start, size),
        }
    }
}

/// Region name of the RAM.
pub const RAM_REGION: &str = "ram";
/// Region name of the paged ROM.
pub const PAGED_ROM_REGION: &str = "paged_rom";
/// Region name of the low OS ROM.
pub const LOW_OS_ROM_REGION: &str = "low_os_rom";
/// Region name of the RGB indicator.
pub const RGB_REGION: &str = "rgb";
/// Region name of the upstream bridge.
pub const BRIDGE_REGION: &str = "bridge";
/// Region name of the paging register.
pub const PAGING_REGISTER_REGION: &str = "paging_register";
/// Region name of the high OS ROM.
pub const HIGH_OS_ROM_REGION: &str = "high_os_rom";

/// Example map in registration order.
pub const EXAMPLE_REGIONS: [RegionDescriptor; 7] = [
    RegionDescriptor::new(RAM_REGION, RAM_BASE, RAM_SIZE),
    RegionDescriptor::new(PAGED_ROM_REGION, PAGED_ROM_BASE, PAGED_ROM_SIZE),
    RegionDescriptor::new(LOW_OS_ROM_REGION, LOW_OS_ROM_BASE, LOW_OS_ROM_SIZE),
    RegionDescriptor::new(RGB_REGION, RGB_BASE, RGB_SIZE),
    RegionDescriptor::new(BRIDGE_REGION, BRIDGE_BASE, BRIDGE_SIZE),
    RegionDescriptor::new(PAGING_REGISTER_REGION, PAGING_REGISTER_BASE, PAGING_REGISTER_SIZE),
    RegionDescriptor::new(HIGH_OS_ROM_REGION, HIGH_OS_ROM_BASE, HIGH_OS_ROM_SIZE),
];

const _: () = assert_example_layout();

const fn assert_example_layout() {
    let mut index = 0;
    while index < EXAMPLE_REGIONS.len() {
        let region = EXAMPLE_REGIONS[index];
        assert!(region.range.size > 0, "example regions must not be empty");
        assert!(
            region.range.end() <= 0x1_0000,
            "example regions must fit the 16-bit bus"
        );

        let mut other = index + 1;
        while other < EXAMPLE_REGIONS.len() {
            assert!(
                !region.range.overlaps(EXAMPLE_REGIONS[other].range),
                "example regions must not overlap"
            );
            other += 1;
        }

        index += 1;
    }
}

/// Ordered set of named regions. Registration order is mux precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryMap {
    regions: Vec<RegionDescriptor>,
}

impl MemoryMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// The example map with every region of [`EXAMPLE_REGIONS`].
    #[must_use]
    pub fn example() -> Self {
        Self {
            regions: EXAMPLE_REGIONS.to_vec(),
        }
    }

    /// Appends a region after every region registered so far.
    #[must_use]
    pub fn with_region(mut self, name: &'static str, range: AddressRange) -> Self {
        self.regions.push(RegionDescriptor { name, range });
        self
    }

    /// Looks up a region by name.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<&RegionDescriptor> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// Regions in registration order.
    #[must_use]
    pub fn regions(&self) -> &[RegionDescriptor] {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AddressRange, MemoryMap, BRIDGE_BASE, BRIDGE_REGION, BRIDGE_SIZE, EXAMPLE_REGIONS,
        HIGH_OS_ROM_BASE, HIGH_OS_ROM_REGION,
    };
    use rstest::rstest;

    #[rstest]
    #[case(0xFE1F, false)]
    #[case(0xFE20, true)]
    #[case(0xFE27, true)]
    #[case(0xFE28, false)]
    fn bridge_range_membership_is_half_open(#[case] addr: u32, #[case] inside: bool) {
        let range = AddressRange::new(BRIDGE_BASE, BRIDGE_SIZE);
        assert_eq!(range.contains(addr), inside);
    }

    #[test]
    fn range_end_does_not_wrap_at_top_of_u32() {
        let range = AddressRange::new(u32::MAX, 1);
        assert!(range.contains(u32::MAX));
        assert!(!range.contains(0));
        assert_eq!(range.end(), 1 << 32);
    }

    #[test]
    fn local_address_is_base_subtracted() {
        let range = AddressRange::new(BRIDGE_BASE, BRIDGE_SIZE);
        assert_eq!(range.local(0xFE23), 3);
        assert_eq!(range.local(0xFE27), 7);
    }

    #[test]
    fn overlap_detection_ignores_touching_and_empty_ranges() {
        let low = AddressRange::new(0x0000, 0x8000);
        let high = AddressRange::new(0x8000, 0x4000);
        assert!(!low.overlaps(high));
        assert!(low.overlaps(AddressRange::new(0x7FFF, 2)));
        assert!(!low.overlaps(AddressRange::new(0x10, 0)));
    }

    #[test]
    fn example_map_keeps_registration_order() {
        let map = MemoryMap::example();
        assert_eq!(map.regions(), &EXAMPLE_REGIONS);
        assert_eq!(map.regions()[4].name, BRIDGE_REGION);
        assert_eq!(
            map.region(HIGH_OS_ROM_REGION).map(|r| r.range.start),
            Some(HIGH_OS_ROM_BASE)
        );
        assert!(map.region("usb").is_none());
    }

    #[test]
    fn high_os_rom_leaves_top_byte_unmapped() {
        let map = MemoryMap::example();
        assert!(map
            .regions()
            .iter()
            .all(|region| !region.range.contains(0xFFFF)));
    }
}
