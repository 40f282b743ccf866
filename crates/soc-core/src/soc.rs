//! Composition of named devices onto a memory map.

use log::warn;

use crate::{
    BusDevice, BusResponse, ComposeError, Fabric, MasterCycle, MemoryDevice, MemoryMap,
    OverlapPolicy, ProtocolBridge, Upstream, BRIDGE_REGION, HIGH_OS_ROM_REGION, RAM_REGION,
    RAM_SIZE,
};

/// Top-level immutable configuration for a composed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SocConfig {
    /// Treatment of overlapping regions at composition time.
    pub overlap_policy: OverlapPolicy,
}

/// Collects devices by region name before wiring them in map order.
pub struct SocBuilder {
    map: MemoryMap,
    config: SocConfig,
    devices: Vec<(String, Box<dyn BusDevice>)>,
}

impl SocBuilder {
    /// Starts composing against `map`.
    #[must_use]
    pub const fn new(map: MemoryMap, config: SocConfig) -> Self {
        Self {
            map,
            config,
            devices: Vec::new(),
        }
    }

    /// Attaches `device` to the region called `region`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownRegion`] when the map has no such region
    /// and [`ComposeError::DuplicateDevice`] when it is already populated.
    pub fn attach(mut self, region: &str, device: impl BusDevice) -> Result<Self, ComposeError> {
        if self.map.region(region).is_none() {
            return Err(ComposeError::UnknownRegion(region.to_string()));
        }
        if self.devices.iter().any(|(name, _)| name == region) {
            return Err(ComposeError::DuplicateDevice(region.to_string()));
        }
        self.devices.push((region.to_string(), Box::new(device)));
        Ok(self)
    }

    /// Wires every attached device in map registration order.
    ///
    /// Regions left without a device are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Propagates [`Fabric::attach`] failures.
    pub fn build(mut self) -> Result<Soc, ComposeError> {
        let mut fabric = Fabric::new(self.config.overlap_policy);

        for region in self.map.regions() {
            let Some(index) = self.devices.iter().position(|(name, _)| name == region.name) else {
                warn!(
                    "memory map defines `{}` at {} but no device is attached",
                    region.name, region.range
                );
                continue;
            };
            let (name, device) = self.devices.swap_remove(index);
            fabric.attach(name, region.range, device)?;
        }

        Ok(Soc { fabric, ticks: 0 })
    }
}

/// Composed system: the fabric plus a tick counter.
#[derive(Debug)]
pub struct Soc {
    fabric: Fabric,
    ticks: u64,
}

impl Soc {
    /// Builds the example map with RAM, a boot ROM holding `boot_image` in
    /// the high OS ROM region, and a bridge talking to `upstream`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError`] if the example map cannot be wired.
    #[allow(clippy::cast_possible_truncation)]
    pub fn example<U: Upstream + 'static>(
        config: SocConfig,
        upstream: U,
        boot_image: &[u8],
    ) -> Result<Self, ComposeError> {
        SocBuilder::new(MemoryMap::example(), config)
            .attach(RAM_REGION, MemoryDevice::ram(RAM_SIZE as usize))?
            .attach(HIGH_OS_ROM_REGION, MemoryDevice::rom(boot_image))?
            .attach(BRIDGE_REGION, ProtocolBridge::new(upstream))?
            .build()
    }

    /// Runs one tick with `cycle` on the bus; see [`Fabric::tick`].
    ///
    /// Decide whether to hold `cycle` from [`Soc::response`] after the tick,
    /// not from the value returned here.
    pub fn tick(&mut self, cycle: MasterCycle) -> BusResponse {
        self.ticks += 1;
        self.fabric.tick(&cycle)
    }

    /// Response driven on the bus this tick.
    #[must_use]
    pub fn response(&self) -> BusResponse {
        self.fabric.response()
    }

    /// Pulses the external reset input.
    pub fn reset(&mut self) {
        self.fabric.reset();
    }

    /// Ticks run since construction.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Shared interrupt line.
    #[must_use]
    pub fn irq(&self) -> bool {
        self.response().irq
    }

    /// Shared fault line.
    #[must_use]
    pub fn nmi(&self) -> bool {
        self.response().nmi
    }

    /// Underlying fabric.
    #[must_use]
    pub const fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    /// Concrete device attached to `region`.
    #[must_use]
    pub fn device<T: BusDevice>(&self, region: &str) -> Option<&T> {
        self.fabric.device(region)
    }

    /// Mutable concrete device attached to `region`.
    #[must_use]
    pub fn device_mut<T: BusDevice>(&mut self, region: &str) -> Option<&mut T> {
        self.fabric.device_mut(region)
    }

    /// Bridge attached to the bridge region, if its responder has type `U`.
    #[must_use]
    pub fn bridge<U: Upstream + 'static>(&self) -> Option<&ProtocolBridge<U>> {
        self.device(BRIDGE_REGION)
    }

    /// Mutable bridge attached to the bridge region.
    #[must_use]
    pub fn bridge_mut<U: Upstream + 'static>(&mut self) -> Option<&mut ProtocolBridge<U>> {
        self.device_mut(BRIDGE_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::{Soc, SocBuilder, SocConfig};
    use crate::{
        AddressRange, ComposeError, ExternalUpstream, MasterCycle, MemoryDevice, MemoryMap,
        OverlapPolicy, Unresponsive, BRIDGE_REGION, HIGH_OS_ROM_BASE, RAM_REGION,
    };

    #[test]
    fn example_wires_only_populated_regions_in_map_order() {
        let soc = Soc::example(SocConfig::default(), Unresponsive, &[0xEA; 4]).expect("compose");
        let names: Vec<_> = soc.fabric().names().collect();
        assert_eq!(names, vec!["ram", "bridge", "high_os_rom"]);
        assert!(soc.bridge::<Unresponsive>().is_some());
        assert!(soc.bridge::<ExternalUpstream>().is_none());
    }

    #[test]
    fn attach_to_unknown_region_fails() {
        let error = SocBuilder::new(MemoryMap::example(), SocConfig::default())
            .attach("usb", MemoryDevice::ram(1))
            .err();
        assert_eq!(error, Some(ComposeError::UnknownRegion("usb".to_string())));
    }

    #[test]
    fn attach_twice_fails() {
        let error = SocBuilder::new(MemoryMap::example(), SocConfig::default())
            .attach(RAM_REGION, MemoryDevice::ram(1))
            .and_then(|builder| builder.attach(RAM_REGION, MemoryDevice::ram(1)))
            .err();
        assert_eq!(
            error,
            Some(ComposeError::DuplicateDevice(RAM_REGION.to_string()))
        );
    }

    #[test]
    fn reject_policy_surfaces_overlap_at_build() {
        let map = MemoryMap::new()
            .with_region("low", AddressRange::new(0, 0x100))
            .with_region("mirror", AddressRange::new(0x80, 0x100));
        let config = SocConfig {
            overlap_policy: OverlapPolicy::Reject,
        };
        let error = SocBuilder::new(map, config)
            .attach("low", MemoryDevice::ram(0x100))
            .and_then(|builder| builder.attach("mirror", MemoryDevice::ram(0x100)))
            .and_then(SocBuilder::build)
            .err();
        assert!(matches!(error, Some(ComposeError::Overlap { .. })));
    }

    #[test]
    fn boot_rom_is_readable_through_the_bus() {
        let mut soc =
            Soc::example(SocConfig::default(), Unresponsive, &[0xA9, 0x80]).expect("compose");
        let base = u16::try_from(HIGH_OS_ROM_BASE).expect("fits the bus");
        soc.tick(MasterCycle::read(base + 1));
        assert_eq!(soc.tick(MasterCycle::read(base)).data, 0x80);
        assert_eq!(soc.response().data, 0xA9);
        assert_eq!(soc.ticks(), 2);
    }

    #[test]
    fn bridge_region_lookup_matches_device_lookup() {
        let soc = Soc::example(SocConfig::default(), ExternalUpstream::new(), &[])
            .expect("compose");
        assert!(soc
            .device::<crate::ProtocolBridge<ExternalUpstream>>(BRIDGE_REGION)
            .is_some());
        assert!(!soc.irq());
        assert!(!soc.nmi());
    }
}
