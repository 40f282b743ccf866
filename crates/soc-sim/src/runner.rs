//! Executes parsed scripts against the example system.

use std::fmt;

use log::{debug, info};
use soc_core::{
    BridgeState, BusResponse, MasterCycle, ProtocolBridge, Soc, SocConfig, UpstreamMemory,
};

use crate::{parse_script, Command, SimConfig, SimError, Statement};

/// Cycle presented by `idle` when nothing has been presented yet.
const PARK: MasterCycle = MasterCycle::read(0x0000);

/// What the bus looked like after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Cycle the master presented.
    pub cycle: MasterCycle,
    /// Response answering that cycle.
    pub response: BusResponse,
    /// Bridge state after the edge.
    pub bridge: BridgeState,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.cycle.write_enable { 'W' } else { 'R' };
        write!(
            f,
            "{:>6}  {direction} {:04X} {:02X}  data={:02X} ready={} nmi={} bridge={}",
            self.tick,
            self.cycle.address,
            self.cycle.data,
            self.response.data,
            u8::from(self.response.ready),
            u8::from(self.response.nmi),
            self.bridge,
        )
    }
}

/// Example system driven by a script.
#[derive(Debug)]
pub struct Simulation {
    soc: Soc,
    max_stall: u32,
    previous: Option<MasterCycle>,
    trace: Vec<TraceLine>,
}

impl Simulation {
    /// Composes the example system with an upstream memory built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Compose`] if the example map cannot be wired.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let soc = Soc::example(SocConfig::default(), config.upstream(), &[])?;
        Ok(Self {
            soc,
            max_stall: config.max_stall,
            previous: None,
            trace: Vec::new(),
        })
    }

    /// Runs `statements` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Stalled`] when a `hold` exceeds the stall bound and
    /// [`SimError::Mismatch`] when an `expect` fails.
    pub fn run(&mut self, statements: &[Statement]) -> Result<(), SimError> {
        for statement in statements {
            debug!("line {}: {:?}", statement.line, statement.command);
            self.execute(statement)?;
        }
        info!(
            "script finished after {} ticks with {} upstream faults",
            self.soc.ticks(),
            self.faults()
        );
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), SimError> {
        match statement.command {
            Command::Write { address, data } => self.step(MasterCycle::write(address, data)),
            Command::Read { address } => self.step(MasterCycle::read(address)),
            Command::Hold => self.hold(statement.line)?,
            Command::Idle(count) => {
                let cycle = self.previous.unwrap_or(PARK);
                for _ in 0..count {
                    self.step(cycle);
                }
            }
            Command::Expect(expected) => {
                let actual = self.soc.response().data;
                if actual != expected {
                    return Err(SimError::Mismatch {
                        line: statement.line,
                        expected,
                        actual,
                    });
                }
            }
            Command::Upstream { address, word } => {
                self.bridge_mut()?.upstream_mut().load(address, word);
            }
            Command::Reset => {
                self.soc.reset();
                self.previous = None;
            }
        }
        Ok(())
    }

    fn hold(&mut self, line: usize) -> Result<(), SimError> {
        let cycle = self.previous.unwrap_or(PARK);
        let mut ticks = 0;
        while !self.soc.response().ready {
            if ticks >= self.max_stall {
                return Err(SimError::Stalled { line, ticks });
            }
            self.step(cycle);
            ticks += 1;
        }
        Ok(())
    }

    fn step(&mut self, cycle: MasterCycle) {
        self.soc.tick(cycle);
        self.previous = Some(cycle);
        let bridge = self
            .soc
            .bridge::<UpstreamMemory>()
            .map_or(BridgeState::Reset, ProtocolBridge::state);
        self.trace.push(TraceLine {
            tick: self.soc.ticks(),
            cycle,
            response: self.soc.response(),
            bridge,
        });
    }

    fn bridge_mut(&mut self) -> Result<&mut ProtocolBridge<UpstreamMemory>, SimError> {
        self.soc
            .bridge_mut::<UpstreamMemory>()
            .ok_or(SimError::MissingBridge)
    }

    /// Ticks recorded so far.
    #[must_use]
    pub fn trace(&self) -> &[TraceLine] {
        &self.trace
    }

    /// Upstream transfers aborted by `error` or `retry`.
    #[must_use]
    pub fn faults(&self) -> u32 {
        self.soc
            .bridge::<UpstreamMemory>()
            .map_or(0, ProtocolBridge::fault_count)
    }

    /// The simulated system.
    #[must_use]
    pub const fn soc(&self) -> &Soc {
        &self.soc
    }
}

/// What a run left behind, whether or not it succeeded.
#[derive(Debug)]
pub struct RunReport {
    /// Ticks executed before the run ended.
    pub trace: Vec<TraceLine>,
    /// Upstream transfers the bridge aborted.
    pub faults: u32,
    /// First failure, if any.
    pub outcome: Result<(), SimError>,
}

impl RunReport {
    fn failed(error: SimError) -> Self {
        Self {
            trace: Vec::new(),
            faults: 0,
            outcome: Err(error),
        }
    }
}

/// Parses and runs `source` on a fresh system.
///
/// The bridge leaves `Reset` on the first tick, so a script's first cycle
/// never starts an upstream transfer.
#[must_use]
pub fn run_script(source: &str, config: &SimConfig) -> RunReport {
    let statements = match parse_script(source) {
        Ok(statements) => statements,
        Err(error) => return RunReport::failed(error.into()),
    };
    let mut simulation = match Simulation::new(config) {
        Ok(simulation) => simulation,
        Err(error) => return RunReport::failed(error),
    };
    let outcome = simulation.run(&statements);
    RunReport {
        faults: simulation.faults(),
        trace: simulation.trace,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use soc_core::{BridgeState, MasterCycle};

    use super::{run_script, Simulation, TraceLine};
    use crate::{parse_script, SimConfig, SimError};

    fn fast() -> SimConfig {
        SimConfig {
            latency: 1,
            max_stall: 8,
            ..SimConfig::default()
        }
    }

    #[test]
    fn ram_write_then_read_back() {
        let report = run_script("write 0x0010 0x5A\nread 0x0010\nexpect 0x5A\n", &fast());
        report.outcome.expect("script passes");
        assert_eq!(report.trace.len(), 2);
        assert_eq!(report.trace[1].response.data, 0x5A);
        assert_eq!(report.faults, 0);
    }

    #[test]
    fn hold_waits_out_upstream_latency() {
        let source = "\
upstream 0x0 0x11223344
idle 1
read 0xFE20
hold
read 0xFE23
expect 0x11
";
        let report = run_script(source, &fast());
        report.outcome.expect("script passes");
        assert!(report
            .trace
            .iter()
            .any(|line| line.bridge == BridgeState::ReadComplete));
    }

    #[test]
    fn stall_bound_is_enforced() {
        let config = SimConfig {
            latency: 50,
            max_stall: 4,
            ..SimConfig::default()
        };
        let report = run_script("idle 1\nread 0xFE20\nhold\n", &config);
        assert!(matches!(
            report.outcome,
            Err(SimError::Stalled { line: 3, ticks: 4 })
        ));
    }

    #[test]
    fn expect_mismatch_reports_line() {
        let report = run_script("read 0x0000\n\nexpect 0x01\n", &fast());
        assert!(matches!(
            report.outcome,
            Err(SimError::Mismatch {
                line: 3,
                expected: 0x01,
                actual: 0x00
            })
        ));
    }

    #[test]
    fn faulting_address_raises_nmi_and_counts() {
        let config = SimConfig {
            error_addresses: vec![0x0000_0040],
            ..fast()
        };
        let statements =
            parse_script("write 0xFE24 0x40\nread 0xFE20\nhold\n").expect("valid script");
        let mut simulation = Simulation::new(&config).expect("compose");
        simulation.run(&statements).expect("runs");
        assert_eq!(simulation.faults(), 1);
        assert!(simulation.trace().iter().any(|line| line.response.nmi));
        assert_eq!(
            simulation.trace().last().map(|line| line.bridge),
            Some(BridgeState::Reset)
        );
    }

    #[test]
    fn report_counts_every_aborted_transfer() {
        let config = SimConfig {
            retry_addresses: vec![0x0000_0040],
            ..fast()
        };
        let source = "\
write 0xFE24 0x40
read 0xFE20
hold
idle 1
read 0xFE20
hold
";
        let report = run_script(source, &config);
        report.outcome.expect("script passes");
        assert_eq!(report.faults, 2);
    }

    #[test]
    fn idle_before_any_cycle_parks_on_ram() {
        let report = run_script("idle 2\n", &fast());
        report.outcome.expect("script passes");
        assert!(report
            .trace
            .iter()
            .all(|line| line.cycle == MasterCycle::read(0x0000)));
    }

    #[test]
    fn trace_line_format() {
        let line = TraceLine {
            tick: 7,
            cycle: MasterCycle::write(0xFE23, 0x12),
            response: soc_core::BusResponse {
                ready: false,
                ..soc_core::BusResponse::default()
            },
            bridge: BridgeState::StartWrite,
        };
        assert_eq!(
            line.to_string(),
            "     7  W FE23 12  data=00 ready=0 nmi=0 bridge=START_WRITE"
        );
    }
}
