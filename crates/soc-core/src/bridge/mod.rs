//! Bus device that turns byte accesses to an 8-byte window into handshaked
//! 32-bit transfers on the upstream interconnect.
//!
//! Stage the address (offsets 4-7) and the low data bytes (0-2), then write
//! offset 3 to start an upstream write. Reading offset 0 starts an upstream
//! read; read offsets 3, 2, 1 of the result before offset 0, because every
//! read of offset 0 while idle starts another read.
//!
//! An `error` or `retry` from upstream aborts the transfer, raises `nmi`,
//! and sends the state machine through `Reset`.

/// Register window layout and byte access.
pub mod registers;
/// Handshake state machine states.
pub mod state;

pub use registers::{
    BridgeRegisters, ADDRESS_LSB_OFFSET, DATA_LSB_OFFSET, DATA_MSB_OFFSET, WINDOW_SIZE,
};
pub use state::BridgeState;

use std::any::Any;

use log::{debug, warn};

use crate::{BusDevice, DeviceInputs, DeviceOutputs, Upstream, UpstreamRequest, UpstreamResponse};

/// Everything the bridge latches on a clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Latches {
    state: BridgeState,
    registers: BridgeRegisters,
    request: UpstreamRequest,
    data_out: u8,
    ready: bool,
    nmi: bool,
}

impl Default for Latches {
    fn default() -> Self {
        Self {
            state: BridgeState::Reset,
            registers: BridgeRegisters::default(),
            request: UpstreamRequest::default(),
            data_out: 0,
            ready: true,
            nmi: false,
        }
    }
}

impl Latches {
    /// Upstream request; the address follows the address register combinationally.
    const fn request(&self) -> UpstreamRequest {
        UpstreamRequest {
            address: self.registers.address_register,
            ..self.request
        }
    }

    /// Next-state function of the current latches, this tick's bus inputs,
    /// and the upstream lines.
    fn next(&self, inputs: &DeviceInputs, lines: &UpstreamResponse) -> Self {
        let mut next = *self;
        let offset = inputs.address % WINDOW_SIZE;

        next.data_out = self.registers.read_byte(offset);
        if inputs.select && inputs.write_enable {
            next.registers.write_byte(offset, inputs.data_in);
        }

        let read_trigger = inputs.select && !inputs.write_enable && offset == DATA_LSB_OFFSET;
        let write_trigger = inputs.select && inputs.write_enable && offset == DATA_MSB_OFFSET;

        match self.state {
            BridgeState::Reset => {
                next.request.cycle = false;
                next.request.strobe = false;
                next.nmi = false;
                next.state = BridgeState::Idle;
            }
            BridgeState::Idle => {
                if read_trigger {
                    next.begin(false);
                } else if write_trigger {
                    next.begin(true);
                }
            }
            BridgeState::StartRead | BridgeState::StartWrite => {
                if lines.is_fault() {
                    next.abort();
                } else if lines.ack {
                    next.state = if self.state == BridgeState::StartRead {
                        BridgeState::ReadComplete
                    } else {
                        BridgeState::WriteComplete
                    };
                }
            }
            BridgeState::ReadComplete => {
                next.registers.data_register = lines.data_in;
                next.finish();
            }
            BridgeState::WriteComplete => next.finish(),
        }

        next
    }

    /// Opens an upstream cycle and stalls the master. Called on the latches
    /// being built, so a write carries the byte stored on the trigger edge.
    fn begin(&mut self, write: bool) {
        self.state = if write {
            BridgeState::StartWrite
        } else {
            BridgeState::StartRead
        };
        self.ready = false;
        self.request.cycle = true;
        self.request.strobe = true;
        self.request.write_enable = write;
        if write {
            self.request.data_out = self.registers.data_register;
        }
    }

    fn finish(&mut self) {
        self.ready = true;
        self.request.cycle = false;
        self.request.strobe = false;
        self.state = BridgeState::Idle;
    }

    fn abort(&mut self) {
        self.nmi = true;
        self.ready = true;
        self.request.cycle = false;
        self.request.strobe = false;
        self.state = BridgeState::Reset;
    }
}

/// Upstream bridge peripheral.
#[derive(Debug)]
pub struct ProtocolBridge<U> {
    latches: Latches,
    upstream: U,
    fault_count: u32,
}

impl<U: Default> Default for ProtocolBridge<U> {
    fn default() -> Self {
        Self::new(U::default())
    }
}

impl<U> ProtocolBridge<U> {
    /// Creates a bridge in `Reset` talking to `upstream`.
    #[must_use]
    pub fn new(upstream: U) -> Self {
        Self {
            latches: Latches::default(),
            upstream,
            fault_count: 0,
        }
    }

    /// Current handshake state.
    #[must_use]
    pub const fn state(&self) -> BridgeState {
        self.latches.state
    }

    /// Current register contents.
    #[must_use]
    pub const fn registers(&self) -> BridgeRegisters {
        self.latches.registers
    }

    /// Request currently driven upstream.
    #[must_use]
    pub const fn request(&self) -> UpstreamRequest {
        self.latches.request()
    }

    /// Ready line driven to the fabric.
    #[must_use]
    pub const fn ready(&self) -> bool {
        self.latches.ready
    }

    /// Fault line driven to the fabric.
    #[must_use]
    pub const fn nmi(&self) -> bool {
        self.latches.nmi
    }

    /// Saturating count of transfers aborted by `error` or `retry`.
    ///
    /// Host-side diagnostic; survives external reset.
    #[must_use]
    pub const fn fault_count(&self) -> u32 {
        self.fault_count
    }

    /// Upstream responder.
    #[must_use]
    pub const fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Mutable upstream responder, for hosts driving the response lines.
    #[must_use]
    pub fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }
}

impl<U: Upstream + 'static> BusDevice for ProtocolBridge<U> {
    fn outputs(&self) -> DeviceOutputs {
        DeviceOutputs {
            data_out: self.latches.data_out,
            irq: false,
            nmi: self.latches.nmi,
            ready: self.latches.ready,
        }
    }

    fn clock(&mut self, inputs: &DeviceInputs) {
        let request = self.latches.request();
        let lines = self.upstream.respond(&request);
        let next = self.latches.next(inputs, &lines);

        let current = self.latches.state;
        if next.state != current {
            debug!("bridge {current} -> {}", next.state);
            if current.is_busy() && next.state == BridgeState::Reset {
                self.fault_count = self.fault_count.saturating_add(1);
                warn!(
                    "upstream {} at {:#010X} aborted by {}; raising nmi",
                    if request.write_enable { "write" } else { "read" },
                    request.address,
                    if lines.error { "error" } else { "retry" },
                );
            }
        }

        self.latches = next;
    }

    fn reset(&mut self) {
        self.latches = Latches::default();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
