//! Output fault injection
//!
//! Wraps any runtime and corrupts named outputs after every evaluation.
//! Used to check that a testbench actually notices a broken DUT.

use crate::simulator::{
    PortDirection, PortSpec, SimulationError, SimulationResult, SimulationRuntime,
};
use crate::state::SignalState;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// Output stuck at logic 0
    StuckAt0,
    /// Output stuck at all ones
    StuckAt1,
    /// Output off by a constant (wrapping at the port width)
    AddOffset(u128),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub signal: String,
    pub fault_type: FaultType,
}

impl Fault {
    pub fn new(signal: &str, fault_type: FaultType) -> Self {
        Fault {
            signal: signal.to_string(),
            fault_type,
        }
    }

    fn apply(&self, value: u128) -> u128 {
        match self.fault_type {
            FaultType::StuckAt0 => 0,
            FaultType::StuckAt1 => u128::MAX,
            FaultType::AddOffset(offset) => value.wrapping_add(offset),
        }
    }
}

pub struct FaultInjector<R> {
    inner: R,
    faults: Vec<Fault>,
}

impl<R: SimulationRuntime> FaultInjector<R> {
    pub fn new(inner: R) -> Self {
        FaultInjector {
            inner,
            faults: Vec::new(),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

}

#[async_trait]
impl<R: SimulationRuntime> SimulationRuntime for FaultInjector<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ports(&self) -> Vec<PortSpec> {
        self.inner.ports()
    }

    async fn clock_edge(&mut self, clock: &str, signals: &SignalState) -> SimulationResult<()> {
        self.inner.clock_edge(clock, signals).await
    }

    async fn evaluate(&mut self, signals: &mut SignalState) -> SimulationResult<()> {
        self.inner.evaluate(signals).await?;

        for fault in &self.faults {
            let signal = signals.signal(&fault.signal)?;
            if signal.direction != PortDirection::Output {
                return Err(SimulationError::InvalidInput(format!(
                    "fault target '{}' is not an output",
                    fault.signal
                )));
            }
            let corrupted = fault.apply(signal.as_u128());
            signals.drive_u128(&fault.signal, corrupted)?;
        }
        Ok(())
    }
}
