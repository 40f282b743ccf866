//! Address decode, select registration, and the output multiplexers.
//!
//! Every tick runs in three fixed phases:
//! 1. Sample each device's registered outputs and fold them into the response
//! 2. Clock each device with this tick's fast select and last tick's select
//! 3. Commit the new registered selects
//!
//! No device sees another device's half-updated state.

use log::{info, trace, warn};

use crate::{AddressRange, BusDevice, BusResponse, ComposeError, DeviceInputs, MasterCycle};

/// How the fabric treats a range overlapping an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OverlapPolicy {
    /// Accept the overlap; the later-registered device wins the muxes.
    #[default]
    LastWins,
    /// Refuse the attach with [`ComposeError::Overlap`].
    Reject,
}

struct Entry {
    name: String,
    range: AddressRange,
    device: Box<dyn BusDevice>,
    select_registered: bool,
}

/// Ordered list of `(range, device)` pairs plus the shared select/mux network.
pub struct Fabric {
    entries: Vec<Entry>,
    policy: OverlapPolicy,
}

impl Default for Fabric {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

impl std::fmt::Debug for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("policy", &self.policy)
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|entry| (entry.name.as_str(), entry.range))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Fabric {
    /// Creates an empty fabric.
    #[must_use]
    pub const fn new(policy: OverlapPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// Registers `device` for `range` after every device registered so far.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::EmptyRange`] for a zero-sized range,
    /// [`ComposeError::DuplicateDevice`] when `name` is already registered, and
    /// [`ComposeError::Overlap`] when the range overlaps an earlier one under
    /// [`OverlapPolicy::Reject`].
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        range: AddressRange,
        device: Box<dyn BusDevice>,
    ) -> Result<(), ComposeError> {
        let name = name.into();
        if range.size == 0 {
            return Err(ComposeError::EmptyRange(name));
        }
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(ComposeError::DuplicateDevice(name));
        }

        if let Some(existing) = self.entries.iter().find(|entry| entry.range.overlaps(range)) {
            match self.policy {
                OverlapPolicy::Reject => {
                    return Err(ComposeError::Overlap {
                        existing: existing.name.clone(),
                        new: name,
                    });
                }
                OverlapPolicy::LastWins => {
                    warn!(
                        "region `{name}` at {range} overlaps `{}` at {}; `{name}` wins the data mux",
                        existing.name, existing.range
                    );
                }
            }
        }

        info!("connected device `{name}` at {range}");
        self.entries.push(Entry {
            name,
            range,
            device,
            select_registered: false,
        });
        Ok(())
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Device names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// The entry that owns the data and ready muxes this tick, if any.
    ///
    /// Later registrations take precedence.
    fn mux_owner(&self) -> Option<&Entry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.select_registered)
    }

    /// Response the master sees this tick, computed from registered state only.
    #[must_use]
    pub fn response(&self) -> BusResponse {
        let (data, ready) = self.mux_owner().map_or((0, true), |entry| {
            let outputs = entry.device.outputs();
            (outputs.data_out, outputs.ready)
        });

        let mut irq = false;
        let mut nmi = false;
        for entry in &self.entries {
            let outputs = entry.device.outputs();
            irq |= outputs.irq;
            nmi |= outputs.nmi;
        }

        BusResponse {
            data,
            ready,
            irq,
            nmi,
        }
    }

    /// Runs one lock-step tick with `cycle` on the bus.
    ///
    /// Returns the response driven during this tick, which answers the cycle
    /// presented on the previous tick. A host deciding whether to hold its
    /// cycle must check [`Fabric::response`] after the tick instead: holding
    /// until this return value shows `ready` presents the cycle once more after
    /// the device released it, which re-triggers side-effecting offsets such
    /// as the bridge's read trigger.
    pub fn tick(&mut self, cycle: &MasterCycle) -> BusResponse {
        let response = self.response();
        let address = u32::from(cycle.address);

        let mut mapped = false;
        for entry in &mut self.entries {
            let select = entry.range.contains(address);
            mapped |= select;

            entry.device.clock(&DeviceInputs {
                address: entry.range.local(address),
                data_in: cycle.data,
                write_enable: cycle.write_enable,
                select,
                select_registered: entry.select_registered,
            });
            // commit
            entry.select_registered = select;
        }

        if !mapped {
            trace!("unmapped access at {address:#06X}");
        }

        response
    }

    /// Drives the external reset input of every device and clears the registered selects.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.device.reset();
            entry.select_registered = false;
        }
    }

    /// Combinational select of each device for `address`, in registration order.
    #[must_use]
    pub fn selects(&self, address: u16) -> Vec<bool> {
        self.entries
            .iter()
            .map(|entry| entry.range.contains(u32::from(address)))
            .collect()
    }

    /// Registered select of each device, in registration order.
    #[must_use]
    pub fn registered_selects(&self) -> Vec<bool> {
        self.entries
            .iter()
            .map(|entry| entry.select_registered)
            .collect()
    }

    /// Pairs of registered names whose ranges overlap, earlier name first.
    #[must_use]
    pub fn overlaps(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (index, first) in self.entries.iter().enumerate() {
            for second in &self.entries[index + 1..] {
                if first.range.overlaps(second.range) {
                    pairs.push((first.name.as_str(), second.name.as_str()));
                }
            }
        }
        pairs
    }

    /// Range registered under `name`.
    #[must_use]
    pub fn range(&self, name: &str) -> Option<AddressRange> {
        self.entry(name).map(|entry| entry.range)
    }

    /// Concrete device registered under `name`, if it has type `T`.
    #[must_use]
    pub fn device<T: BusDevice>(&self, name: &str) -> Option<&T> {
        self.entry(name)
            .and_then(|entry| entry.device.as_any().downcast_ref::<T>())
    }

    /// Mutable concrete device registered under `name`, if it has type `T`.
    #[must_use]
    pub fn device_mut<T: BusDevice>(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.device.as_any_mut().downcast_mut::<T>())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}
