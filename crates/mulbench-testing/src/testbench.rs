//! Ergonomic testbench API over the simulation kernel
//!
//! Writes are staged with `set` and flushed at the next `timer`/`tick`, so a
//! read always observes the DUT as it was after the latest time advance.
//!
//! # Example
//! ```rust,no_run
//! use mulbench_sim::IterativeMultiplier;
//! use mulbench_testing::Testbench;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut tb = Testbench::new(Box::new(IterativeMultiplier::new())).await?;
//! tb.set("opA_i", 6u64).set("opB_i", 7u64).set("v_i", 1u8);
//! tb.timer(1).await?;
//! tb.tick().await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use indexmap::IndexMap;
use mulbench_sim::multiplier::CLK;
use mulbench_sim::{SimulationConfig, SimulationRuntime, Simulator, TimeUnit};
use tracing::info;

/// High-level testbench for clocked designs
pub struct Testbench {
    sim: Simulator,
    pending_inputs: IndexMap<String, Vec<u8>>,
    half_period: u64,
    time_unit: TimeUnit,
    cycle_count: u64,
}

impl Testbench {
    /// Create a testbench with the default simulation config
    pub async fn new(runtime: Box<dyn SimulationRuntime>) -> Result<Self> {
        Self::with_config(runtime, SimulationConfig::default()).await
    }

    pub async fn with_config(
        runtime: Box<dyn SimulationRuntime>,
        config: SimulationConfig,
    ) -> Result<Self> {
        let time_unit = config.time_unit;
        let sim = Simulator::new(config, runtime).await?;
        info!(design = sim.runtime_name(), "testbench ready");

        Ok(Self {
            sim,
            pending_inputs: IndexMap::new(),
            half_period: 1,
            time_unit,
            cycle_count: 0,
        })
    }

    pub fn set_half_period(&mut self, half_period: u64) {
        self.half_period = half_period;
    }

    /// Stage an input value (chainable)
    pub fn set(&mut self, signal: &str, value: impl IntoSignalValue) -> &mut Self {
        // a later write in the same step replaces the earlier one
        self.pending_inputs.shift_remove(signal);
        self.pending_inputs.insert(signal.to_string(), value.into_bytes());
        self
    }

    async fn apply_pending(&mut self) -> Result<()> {
        for (signal, value) in self.pending_inputs.drain(..) {
            self.sim.set_input(&signal, value).await?;
        }
        Ok(())
    }

    /// Flush staged inputs and advance simulated time by `amount` units
    pub async fn timer(&mut self, amount: u64) -> Result<&mut Self> {
        self.apply_pending().await?;
        self.sim.advance(amount, self.time_unit).await?;
        Ok(self)
    }

    /// One full clock pulse: high for a half period, then low for a half period
    pub async fn tick(&mut self) -> Result<&mut Self> {
        let half_period = self.half_period;
        self.set(CLK, 1u8);
        self.timer(half_period).await?;
        self.set(CLK, 0u8);
        self.timer(half_period).await?;
        self.cycle_count += 1;
        Ok(self)
    }

    /// Run `cycles` clock pulses
    pub async fn clock(&mut self, cycles: usize) -> Result<&mut Self> {
        for _ in 0..cycles {
            self.tick().await?;
        }
        Ok(self)
    }

    /// Current value of a signal as of the last time advance
    pub async fn get(&self, signal: &str) -> Result<Vec<u8>> {
        Ok(self.sim.get_output(signal).await?)
    }

    pub async fn get_as<T: FromSignalValue>(&self, signal: &str) -> Result<T> {
        let bytes = self.get(signal).await?;
        Ok(T::from_bytes(&bytes))
    }

    /// Fail if a signal does not hold the expected value
    pub async fn expect(&self, signal: &str, expected: impl IntoSignalValue) -> Result<&Self> {
        let actual = self.get_as::<u128>(signal).await?;
        let expected = u128::from_bytes(&expected.into_bytes());
        if actual != expected {
            bail!(
                "Signal '{}' mismatch at cycle {}: expected {:#x}, got {:#x}",
                signal, self.cycle_count, expected, actual
            );
        }
        Ok(self)
    }

    /// Clock pulses issued through this testbench
    pub fn cycles(&self) -> u64 {
        self.cycle_count
    }

    pub fn time_ps(&self) -> u64 {
        self.sim.time_ps()
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }
}

/// Trait for converting Rust types to signal byte values
pub trait IntoSignalValue {
    fn into_bytes(self) -> Vec<u8>;
}

impl IntoSignalValue for bool {
    fn into_bytes(self) -> Vec<u8> {
        vec![self as u8]
    }
}

impl IntoSignalValue for u8 {
    fn into_bytes(self) -> Vec<u8> {
        vec![self]
    }
}

impl IntoSignalValue for u64 {
    fn into_bytes(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

impl IntoSignalValue for u128 {
    fn into_bytes(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

impl IntoSignalValue for Vec<u8> {
    fn into_bytes(self) -> Vec<u8> {
        self
    }
}

impl IntoSignalValue for &[u8] {
    fn into_bytes(self) -> Vec<u8> {
        self.to_vec()
    }
}

/// Trait for converting signal byte values to Rust types
///
/// Short values are zero-extended; long values are truncated.
pub trait FromSignalValue {
    fn from_bytes(bytes: &[u8]) -> Self;
}

impl FromSignalValue for bool {
    fn from_bytes(bytes: &[u8]) -> Self {
        bytes.first().is_some_and(|b| b & 1 == 1)
    }
}

impl FromSignalValue for u8 {
    fn from_bytes(bytes: &[u8]) -> Self {
        bytes.first().copied().unwrap_or(0)
    }
}

impl FromSignalValue for u64 {
    fn from_bytes(bytes: &[u8]) -> Self {
        u128::from_bytes(bytes) as u64
    }
}

impl FromSignalValue for u128 {
    fn from_bytes(bytes: &[u8]) -> Self {
        mulbench_sim::state::bytes_to_u128(bytes)
    }
}

impl FromSignalValue for Vec<u8> {
    fn from_bytes(bytes: &[u8]) -> Self {
        bytes.to_vec()
    }
}
