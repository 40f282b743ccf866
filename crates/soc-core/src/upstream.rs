//! Upstream interconnect signals and the responders that answer them.
//!
//! The bridge is the only master on this side. It holds `cycle` and `strobe`
//! until the responder returns exactly one of `ack`, `error`, or `retry`.

use std::collections::{BTreeMap, BTreeSet};

/// Byte-lane select for whole-word transfers.
pub const BYTE_SELECT_ALL: u8 = 0b1111;

/// Registered outputs the bridge drives onto the upstream interconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UpstreamRequest {
    /// Target address.
    pub address: u32,
    /// Write data.
    pub data_out: u32,
    /// High for a write cycle.
    pub write_enable: bool,
    /// Bus cycle in progress.
    pub cycle: bool,
    /// Valid transfer on this tick.
    pub strobe: bool,
    /// Active byte lanes.
    pub byte_select: u8,
}

impl Default for UpstreamRequest {
    fn default() -> Self {
        Self {
            address: 0,
            data_out: 0,
            write_enable: false,
            cycle: false,
            strobe: false,
            byte_select: BYTE_SELECT_ALL,
        }
    }
}

impl UpstreamRequest {
    /// Returns `true` while a transfer is outstanding.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cycle && self.strobe
    }
}

/// Lines driven back to the bridge by the upstream responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UpstreamResponse {
    /// Read data.
    pub data_in: u32,
    /// Transfer completed.
    pub ack: bool,
    /// Transfer failed.
    pub error: bool,
    /// Responder asks for the transfer to be retried.
    pub retry: bool,
}

impl UpstreamResponse {
    /// Successful completion carrying `data_in`.
    #[must_use]
    pub const fn ack(data_in: u32) -> Self {
        Self {
            data_in,
            ack: true,
            error: false,
            retry: false,
        }
    }

    /// Failed completion.
    #[must_use]
    pub const fn error() -> Self {
        Self {
            data_in: 0,
            ack: false,
            error: true,
            retry: false,
        }
    }

    /// Retry request.
    #[must_use]
    pub const fn retry() -> Self {
        Self {
            data_in: 0,
            ack: false,
            error: false,
            retry: true,
        }
    }

    /// `error` and `retry` are handled identically by the bridge.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        self.error || self.retry
    }
}

/// Responder on the upstream interconnect.
///
/// Called once per tick with the bridge's registered request; the returned
/// lines are sampled on the same clock edge.
pub trait Upstream {
    /// Drives the response lines for this tick.
    fn respond(&mut self, request: &UpstreamRequest) -> UpstreamResponse;
}

/// Response lines held at whatever level the host last drove.
#[derive(Debug, Clone, Default)]
pub struct ExternalUpstream {
    lines: UpstreamResponse,
    last_request: Option<UpstreamRequest>,
}

impl ExternalUpstream {
    /// Creates a responder with every line low.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives the response lines until the next call.
    pub fn drive(&mut self, lines: UpstreamResponse) {
        self.lines = lines;
    }

    /// Drops `ack`, `error`, and `retry` while keeping `data_in` on the bus.
    pub fn release(&mut self) {
        self.lines = UpstreamResponse {
            data_in: self.lines.data_in,
            ..UpstreamResponse::default()
        };
    }

    /// Lines currently driven.
    #[must_use]
    pub const fn lines(&self) -> UpstreamResponse {
        self.lines
    }

    /// Request sampled on the most recent tick.
    #[must_use]
    pub const fn last_request(&self) -> Option<UpstreamRequest> {
        self.last_request
    }
}

impl Upstream for ExternalUpstream {
    fn respond(&mut self, request: &UpstreamRequest) -> UpstreamResponse {
        self.last_request = Some(*request);
        self.lines
    }
}

/// Responder that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unresponsive;

impl Upstream for Unresponsive {
    fn respond(&mut self, _request: &UpstreamRequest) -> UpstreamResponse {
        UpstreamResponse::default()
    }
}

/// Fault a [`UpstreamMemory`] address answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum UpstreamFault {
    /// Answer with `error`.
    Error,
    /// Answer with `retry`.
    Retry,
}

/// Sparse word memory behind the upstream interconnect.
///
/// Each transfer is answered once, after `latency` ticks of an active
/// request. `data_in` keeps the last word read between transfers.
#[derive(Debug, Clone, Default)]
pub struct UpstreamMemory {
    words: BTreeMap<u32, u32>,
    faults: BTreeMap<u32, UpstreamFault>,
    latency: u32,
    waited: u32,
    answered: bool,
    data_in: u32,
    transfers: u64,
}

impl UpstreamMemory {
    /// Creates an empty memory answering after `latency` wait ticks.
    #[must_use]
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Stores `value` at `address`.
    pub fn load(&mut self, address: u32, value: u32) {
        self.words.insert(address, value);
    }

    /// Word at `address`; unwritten words read as zero.
    #[must_use]
    pub fn word(&self, address: u32) -> u32 {
        self.words.get(&address).copied().unwrap_or(0)
    }

    /// Makes every transfer to `address` fail with `fault`.
    pub fn fail_at(&mut self, address: u32, fault: UpstreamFault) {
        self.faults.insert(address, fault);
    }

    /// Addresses configured to fail.
    #[must_use]
    pub fn fault_addresses(&self) -> BTreeSet<u32> {
        self.faults.keys().copied().collect()
    }

    /// Number of transfers answered, including faulted ones.
    #[must_use]
    pub const fn transfers(&self) -> u64 {
        self.transfers
    }

    fn idle_lines(&self) -> UpstreamResponse {
        UpstreamResponse {
            data_in: self.data_in,
            ..UpstreamResponse::default()
        }
    }
}

impl Upstream for UpstreamMemory {
    fn respond(&mut self, request: &UpstreamRequest) -> UpstreamResponse {
        if !request.is_active() {
            self.waited = 0;
            self.answered = false;
            return self.idle_lines();
        }
        if self.answered {
            return self.idle_lines();
        }
        if self.waited < self.latency {
            self.waited += 1;
            return self.idle_lines();
        }

        self.answered = true;
        self.transfers += 1;

        match self.faults.get(&request.address) {
            Some(UpstreamFault::Error) => return UpstreamResponse::error(),
            Some(UpstreamFault::Retry) => return UpstreamResponse::retry(),
            None => {}
        }

        if request.write_enable {
            self.words.insert(request.address, request.data_out);
        } else {
            self.data_in = self.word(request.address);
        }
        UpstreamResponse::ack(self.data_in)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ExternalUpstream, Unresponsive, Upstream, UpstreamFault, UpstreamMemory,
        UpstreamRequest, UpstreamResponse,
    };

    fn active_read(address: u32) -> UpstreamRequest {
        UpstreamRequest {
            address,
            cycle: true,
            strobe: true,
            ..UpstreamRequest::default()
        }
    }

    #[test]
    fn memory_answers_after_latency_and_only_once() {
        let mut memory = UpstreamMemory::new(2);
        memory.load(0x1000, 0xCAFE_F00D);
        let request = active_read(0x1000);

        assert!(!memory.respond(&request).ack);
        assert!(!memory.respond(&request).ack);
        assert_eq!(memory.respond(&request), UpstreamResponse::ack(0xCAFE_F00D));
        assert!(!memory.respond(&request).ack);
        assert_eq!(memory.transfers(), 1);

        let idle = memory.respond(&UpstreamRequest::default());
        assert!(!idle.ack);
        assert_eq!(idle.data_in, 0xCAFE_F00D);
    }

    #[test]
    fn memory_stores_writes() {
        let mut memory = UpstreamMemory::new(0);
        let request = UpstreamRequest {
            data_out: 0x1234_5678,
            write_enable: true,
            ..active_read(0x20)
        };
        assert!(memory.respond(&request).ack);
        assert_eq!(memory.word(0x20), 0x1234_5678);
    }

    #[test]
    fn memory_faults_configured_addresses() {
        let mut memory = UpstreamMemory::new(0);
        memory.fail_at(0xDEAD, UpstreamFault::Retry);
        memory.fail_at(0xBEEF, UpstreamFault::Error);
        assert_eq!(memory.respond(&active_read(0xDEAD)), UpstreamResponse::retry());
        memory.respond(&UpstreamRequest::default());
        assert_eq!(memory.respond(&active_read(0xBEEF)), UpstreamResponse::error());
        assert_eq!(memory.fault_addresses().len(), 2);
    }

    #[test]
    fn external_lines_hold_until_released() {
        let mut upstream = ExternalUpstream::new();
        upstream.drive(UpstreamResponse::ack(7));
        let request = active_read(4);
        assert!(upstream.respond(&request).ack);
        assert!(upstream.respond(&request).ack);
        upstream.release();
        let lines = upstream.respond(&request);
        assert!(!lines.ack);
        assert_eq!(lines.data_in, 7);
        assert_eq!(upstream.last_request(), Some(request));
    }

    #[test]
    fn unresponsive_never_answers() {
        let mut upstream = Unresponsive;
        let lines = upstream.respond(&active_read(0));
        assert!(!lines.ack && !lines.is_fault());
    }
}
