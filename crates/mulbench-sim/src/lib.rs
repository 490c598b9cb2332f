//! Simulation kernel for mulbench
//!
//! - `simulator`: the discrete-event kernel and the `SimulationRuntime` trait
//!   that DUT models implement
//! - `multiplier`: behavioral model of the iterative multiplier
//! - `fault`: output fault injection around any runtime
//! - `waveform`: trace capture and VCD export

pub mod clock_manager;
pub mod event;
pub mod fault;
pub mod multiplier;
pub mod simulator;
pub mod state;
pub mod waveform;

pub use clock_manager::{ClockEdge, ClockInfo, ClockManager};
pub use event::{EventQueue, SimEvent};
pub use fault::{Fault, FaultInjector, FaultType};
pub use multiplier::IterativeMultiplier;
pub use simulator::{
    PortDirection, PortSpec, SimulationConfig, SimulationError, SimulationResult,
    SimulationRuntime, SimulationState, Simulator, TimeUnit,
};
pub use state::{Signal, SignalState};
pub use waveform::{Signal as WaveformSignal, Waveform};
