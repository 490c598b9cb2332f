//! Simulation kernel
//!
//! A small discrete-event kernel. Signal writes are queued and only take
//! effect at the next time advance, clock edges are detected on inputs whose
//! name marks them as clocks, and the attached runtime is evaluated after
//! every advance. The advance is the only place the kernel yields to the
//! executor.

use crate::clock_manager::{ClockEdge, ClockManager};
use crate::event::{EventQueue, SimEvent};
use crate::state::SignalState;
use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),
    #[error("Signal '{0}' is an output and cannot be driven")]
    ReadOnlySignal(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Simulation timeout")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Unit attached to a time-advance request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Ps,
    #[default]
    Ns,
    Us,
}

impl TimeUnit {
    /// Convert an amount in this unit to picoseconds
    pub fn to_ps(self, amount: u64) -> u64 {
        let scale = match self {
            TimeUnit::Ps => 1,
            TimeUnit::Ns => 1_000,
            TimeUnit::Us => 1_000_000,
        };
        amount.saturating_mul(scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// A named port on the DUT boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub width: usize,
    pub direction: PortDirection,
}

impl PortSpec {
    pub fn input(name: &str, width: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            direction: PortDirection::Input,
        }
    }

    pub fn output(name: &str, width: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
            direction: PortDirection::Output,
        }
    }
}

/// Configuration for simulation
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Record a snapshot of every signal after each time advance
    pub capture_trace: bool,
    /// Unit used by testbench delays
    pub time_unit: TimeUnit,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            capture_trace: false,
            time_unit: TimeUnit::Ns,
        }
    }
}

/// Snapshot of simulation state after a time advance
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub time_ps: u64,
    pub cycle: u64,
    pub signals: IndexMap<String, Vec<u8>>,
}

/// Trait for DUT models driven by the kernel
///
/// A runtime declares its ports once, samples its inputs on every rising
/// clock edge, and drives its outputs from register state.
#[async_trait]
pub trait SimulationRuntime: Send + Sync {
    /// Name of the modelled design, used in logs and waveform scopes
    fn name(&self) -> &str;

    /// Ports exposed on the DUT boundary
    fn ports(&self) -> Vec<PortSpec>;

    /// React to a rising edge on `clock`
    async fn clock_edge(&mut self, clock: &str, signals: &SignalState) -> SimulationResult<()>;

    /// Drive output ports from the current register state
    async fn evaluate(&mut self, signals: &mut SignalState) -> SimulationResult<()>;
}

/// Discrete-event simulator owning one DUT runtime
pub struct Simulator {
    config: SimulationConfig,
    runtime: Box<dyn SimulationRuntime>,
    signals: SignalState,
    clock_manager: ClockManager,
    pending: EventQueue,
    current_time_ps: u64,
    history: Vec<SimulationState>,
}

impl Simulator {
    pub async fn new(
        config: SimulationConfig,
        mut runtime: Box<dyn SimulationRuntime>,
    ) -> SimulationResult<Self> {
        let ports = runtime.ports();
        let mut signals = SignalState::from_ports(&ports)?;

        let mut clock_manager = ClockManager::new();
        for port in ports.iter().filter(|p| p.direction == PortDirection::Input) {
            if ClockManager::is_clock_name(&port.name) {
                clock_manager.add_clock(port.name.clone());
            }
        }

        runtime.evaluate(&mut signals).await?;

        Ok(Simulator {
            config,
            runtime,
            signals,
            clock_manager,
            pending: EventQueue::new(),
            current_time_ps: 0,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Queue a write to an input; it becomes visible at the next advance
    pub async fn set_input(&mut self, name: &str, value: Vec<u8>) -> SimulationResult<()> {
        let signal = self.signals.signal(name)?;
        if signal.direction == PortDirection::Output {
            return Err(SimulationError::ReadOnlySignal(name.to_string()));
        }

        self.pending.add_event(SimEvent {
            time: self.current_time_ps,
            signal: name.to_string(),
            value,
        });
        Ok(())
    }

    /// Current value of any signal
    pub async fn get_output(&self, name: &str) -> SimulationResult<Vec<u8>> {
        self.signals.get(name).map(|v| v.to_vec())
    }

    /// Apply queued writes, fire clock edges, evaluate the DUT and move time
    /// forward by `amount` units
    pub async fn advance(&mut self, amount: u64, unit: TimeUnit) -> SimulationResult<()> {
        while let Some(event) = self.pending.pop_due(self.current_time_ps) {
            self.signals.drive(&event.signal, &event.value)?;
        }

        for clock in self.clock_manager.clock_names() {
            let level = self.signals.is_high(&clock)?;
            if self.clock_manager.set_clock(&clock, level) == Some(ClockEdge::Rising) {
                trace!(clock = %clock, time_ps = self.current_time_ps, "rising edge");
                self.runtime.clock_edge(&clock, &self.signals).await?;
            }
        }

        self.runtime.evaluate(&mut self.signals).await?;
        self.signals.clear_changed_signals();
        self.current_time_ps = self.current_time_ps.saturating_add(unit.to_ps(amount));

        if self.config.capture_trace {
            self.history.push(SimulationState {
                time_ps: self.current_time_ps,
                cycle: self.cycles(),
                signals: self.signals.snapshot(),
            });
        }

        tokio::task::yield_now().await;
        Ok(())
    }

    pub fn time_ps(&self) -> u64 {
        self.current_time_ps
    }

    /// Rising edges seen on the first registered clock
    pub fn cycles(&self) -> u64 {
        self.clock_manager
            .clock_names()
            .first()
            .map(|name| self.clock_manager.rising_edges(name))
            .unwrap_or(0)
    }

    pub fn signals(&self) -> &SignalState {
        &self.signals
    }

    pub fn signal_widths(&self) -> IndexMap<String, usize> {
        self.signals
            .iter()
            .map(|(name, signal)| (name.clone(), signal.width))
            .collect()
    }

    pub fn history(&self) -> &[SimulationState] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Registered counter: `count_o` increments on every rising edge
    struct Counter {
        count: u128,
    }

    #[async_trait]
    impl SimulationRuntime for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn ports(&self) -> Vec<PortSpec> {
            vec![
                PortSpec::input("clk", 1),
                PortSpec::input("en", 1),
                PortSpec::output("count_o", 8),
            ]
        }

        async fn clock_edge(
            &mut self,
            _clock: &str,
            signals: &SignalState,
        ) -> SimulationResult<()> {
            if signals.is_high("en")? {
                self.count += 1;
            }
            Ok(())
        }

        async fn evaluate(&mut self, signals: &mut SignalState) -> SimulationResult<()> {
            signals.drive_u128("count_o", self.count)?;
            Ok(())
        }
    }

    async fn counter_sim(capture_trace: bool) -> Simulator {
        let config = SimulationConfig {
            capture_trace,
            ..Default::default()
        };
        Simulator::new(config, Box::new(Counter { count: 0 }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_deferred_until_advance() {
        let mut sim = counter_sim(false).await;
        sim.set_input("en", vec![1]).await.unwrap();
        assert_eq!(sim.signals().get_u128("en").unwrap(), 0);

        sim.advance(1, TimeUnit::Ns).await.unwrap();
        assert_eq!(sim.signals().get_u128("en").unwrap(), 1);
        assert_eq!(sim.time_ps(), 1_000);
    }

    #[tokio::test]
    async fn test_rising_edge_drives_runtime() {
        let mut sim = counter_sim(false).await;
        sim.set_input("en", vec![1]).await.unwrap();
        for _ in 0..3 {
            sim.set_input("clk", vec![1]).await.unwrap();
            sim.advance(1, TimeUnit::Ns).await.unwrap();
            sim.set_input("clk", vec![0]).await.unwrap();
            sim.advance(1, TimeUnit::Ns).await.unwrap();
        }

        assert_eq!(sim.get_output("count_o").await.unwrap(), vec![3]);
        assert_eq!(sim.cycles(), 3);
    }

    #[tokio::test]
    async fn test_holding_clock_high_is_one_edge() {
        let mut sim = counter_sim(false).await;
        sim.set_input("en", vec![1]).await.unwrap();
        sim.set_input("clk", vec![1]).await.unwrap();
        sim.advance(1, TimeUnit::Ns).await.unwrap();
        sim.advance(1, TimeUnit::Ns).await.unwrap();

        assert_eq!(sim.signals().get_u128("count_o").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_outputs_are_read_only() {
        let mut sim = counter_sim(false).await;
        let err = sim.set_input("count_o", vec![5]).await.unwrap_err();
        assert!(matches!(err, SimulationError::ReadOnlySignal(name) if name == "count_o"));

        let err = sim.set_input("nope", vec![5]).await.unwrap_err();
        assert!(matches!(err, SimulationError::UnknownSignal(_)));
    }

    #[tokio::test]
    async fn test_trace_records_every_advance() {
        let mut sim = counter_sim(true).await;
        sim.advance(2, TimeUnit::Ps).await.unwrap();
        sim.advance(3, TimeUnit::Ps).await.unwrap();

        let times: Vec<u64> = sim.history().iter().map(|s| s.time_ps).collect();
        assert_eq!(times, vec![2, 5]);
        assert!(sim.history()[0].signals.contains_key("count_o"));
    }

    #[test]
    fn test_time_unit_scaling() {
        assert_eq!(TimeUnit::Ps.to_ps(7), 7);
        assert_eq!(TimeUnit::Ns.to_ps(7), 7_000);
        assert_eq!(TimeUnit::Us.to_ps(2), 2_000_000);
        assert_eq!(TimeUnit::Us.to_ps(u64::MAX), u64::MAX);
    }
}
