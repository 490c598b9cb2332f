//! Randomized verifier for the iterative multiplier
//!
//! Sequences one reset, then drives each stimulus through the valid/yumi
//! handshake and checks `result_o` against the reference product. Exactly
//! one request is in flight at a time, and the first mismatch halts the run.
//!
//! Each iteration walks an explicit phase machine:
//!
//! ```text
//! Idle -> Presented -> Waiting(n) -> Captured -> Compared -> (Idle | halt)
//! ```
//!
//! `Waiting` advances by one clock pulse per step until `v_o` is observed.
//! There is no bound on the wait unless `max_wait_cycles` is configured.

use crate::reference::{expected_product, interpret_result, Product};
use crate::stimulus::{RandomStimulus, StimulusSource, StimulusVector};
use crate::testbench::Testbench;
use mulbench_sim::multiplier::{CLK, OP_A, OP_B, RESET, RESULT, SIGNED, V_I, V_O, YUMI};
use mulbench_sim::SimulationError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Number of stimulus vectors to check
    pub iterations: usize,
    /// Seed for the random stimulus; drawn from entropy when unset. Only read
    /// by `MultiplierVerifier::random`, a source passed to `new` keeps its own.
    pub seed: Option<u64>,
    /// Clock pulses to wait for `v_o` before giving up. `None` waits forever.
    pub max_wait_cycles: Option<u64>,
    /// Delay between driving inputs and the next clock edge or sample
    pub settle_delay: u64,
    /// Duration of each clock phase
    pub half_period: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            max_wait_cycles: None,
            settle_delay: 1,
            half_period: 1,
        }
    }
}

impl VerifierConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_wait_cycles(mut self, max_wait_cycles: Option<u64>) -> Self {
        self.max_wait_cycles = max_wait_cycles;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Passed,
    HaltedOnMismatch,
    /// Stopped by the watchdog, a timeout or a simulation error
    Aborted,
}

/// Outcome of one request/response exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub raw: u128,
    pub observed: Product,
    pub expected: Product,
    pub wait_cycles: u64,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.observed == self.expected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Presented,
    Waiting { cycles: u64 },
    Captured { raw: u128, wait_cycles: u64 },
    Compared(Comparison),
}

/// Diagnostic dump for the first mismatching iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchReport {
    /// 1-based iteration number
    pub iteration: usize,
    pub stimulus: StimulusVector,
    pub raw_result: u128,
    pub observed: Product,
    pub expected: Product,
    pub wait_cycles: u64,
    pub time_ps: u64,
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Mismatched result at iteration {} (t = {} ps, {} wait cycles)",
            self.iteration, self.time_ps, self.wait_cycles
        )?;
        writeln!(f, "  signed:   {}", self.stimulus.signed as u8)?;
        writeln!(
            f,
            "  result:   {} (raw {:#034x})",
            self.observed, self.raw_result
        )?;
        if self.stimulus.signed {
            let (a, b) = self.stimulus.signed_operands();
            writeln!(f, "  opA:      {a}")?;
            writeln!(f, "  opB:      {b}")?;
        } else {
            writeln!(f, "  opA:      {}", self.stimulus.op_a)?;
            writeln!(f, "  opB:      {}", self.stimulus.op_b)?;
        }
        write!(f, "  expected: {}", self.expected)
    }
}

/// Summary of a passing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub iterations: usize,
    pub seed: Option<u64>,
    pub total_wait_cycles: u64,
    pub min_wait_cycles: u64,
    pub max_wait_cycles: u64,
    pub clock_cycles: u64,
    pub sim_time_ps: u64,
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pass! {} iterations", self.iterations)?;
        if let Some(seed) = self.seed {
            write!(f, " (seed {seed})")?;
        }
        writeln!(f)?;
        if self.iterations > 0 {
            let mean = self.total_wait_cycles as f64 / self.iterations as f64;
            writeln!(
                f,
                "  wait cycles: min {} / mean {:.1} / max {}",
                self.min_wait_cycles, mean, self.max_wait_cycles
            )?;
        }
        write!(
            f,
            "  {} clock cycles, {} ps simulated",
            self.clock_cycles, self.sim_time_ps
        )
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{0}")]
    ResultMismatch(Box<MismatchReport>),
    #[error("v_o not asserted within {cycles} cycles at iteration {iteration}")]
    WatchdogExpired { iteration: usize, cycles: u64 },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Harness(#[from] anyhow::Error),
}

#[derive(Debug, Default)]
struct WaitStats {
    total: u64,
    min: Option<u64>,
    max: u64,
}

impl WaitStats {
    fn record(&mut self, cycles: u64) {
        self.total += cycles;
        self.min = Some(self.min.map_or(cycles, |m| m.min(cycles)));
        self.max = self.max.max(cycles);
    }
}

pub struct MultiplierVerifier<S> {
    tb: Testbench,
    source: S,
    config: VerifierConfig,
    state: RunState,
}

impl MultiplierVerifier<RandomStimulus> {
    /// Verifier over uniform random stimulus seeded from `config.seed`
    pub fn random(tb: Testbench, config: VerifierConfig) -> Self {
        let source = match config.seed {
            Some(seed) => RandomStimulus::from_seed(seed),
            None => RandomStimulus::from_entropy(),
        };
        Self::new(tb, source, config)
    }
}

impl<S: StimulusSource> MultiplierVerifier<S> {
    /// Verifier over an explicit stimulus source; `config.seed` is not used
    pub fn new(mut tb: Testbench, source: S, config: VerifierConfig) -> Self {
        tb.set_half_period(config.half_period);
        MultiplierVerifier {
            tb,
            source,
            config,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn testbench(&self) -> &Testbench {
        &self.tb
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drive every input to its idle value with `yumi_i` high, then hold
    /// `reset_i` across exactly one rising edge
    pub async fn reset(&mut self) -> Result<(), VerifyError> {
        let settle = self.config.settle_delay;
        let half_period = self.config.half_period;

        self.tb
            .set(CLK, 0u8)
            .set(RESET, 0u8)
            .set(OP_A, 0u64)
            .set(OP_B, 0u64)
            .set(SIGNED, 0u8)
            .set(V_I, 0u8)
            .set(YUMI, 1u8);
        self.tb.timer(settle).await?;

        self.tb.set(RESET, 1u8);
        self.tb.timer(settle).await?;
        self.tb.set(CLK, 1u8);
        self.tb.timer(half_period).await?;
        self.tb.set(RESET, 0u8).set(CLK, 0u8);
        self.tb.timer(half_period).await?;
        Ok(())
    }

    pub async fn run(&mut self) -> Result<VerificationReport, VerifyError> {
        self.state = RunState::Running;
        let result = self.run_inner().await;
        if result.is_err() && self.state == RunState::Running {
            self.state = RunState::Aborted;
        }
        result
    }

    /// Run with a wall-clock limit; the limit is checked at every time advance
    pub async fn run_with_timeout(
        &mut self,
        limit: Duration,
    ) -> Result<VerificationReport, VerifyError> {
        match timeout(limit, self.run()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    limit_ms = limit.as_millis() as u64,
                    "verification timed out"
                );
                self.state = RunState::Aborted;
                Err(SimulationError::Timeout.into())
            }
        }
    }

    async fn run_inner(&mut self) -> Result<VerificationReport, VerifyError> {
        let seed = self.source.seed();
        info!(
            design = self.tb.simulator().runtime_name(),
            iterations = self.config.iterations,
            seed = ?seed,
            "starting multiplier verification"
        );

        self.reset().await?;

        let mut stats = WaitStats::default();
        let mut completed = 0;
        for iteration in 1..=self.config.iterations {
            let Some(stimulus) = self.source.next_vector() else {
                debug!(completed, "stimulus source exhausted");
                break;
            };

            let comparison = self.run_iteration(iteration, stimulus).await?;
            if !comparison.is_match() {
                let report = MismatchReport {
                    iteration,
                    stimulus,
                    raw_result: comparison.raw,
                    observed: comparison.observed,
                    expected: comparison.expected,
                    wait_cycles: comparison.wait_cycles,
                    time_ps: self.tb.time_ps(),
                };
                error!(
                    iteration,
                    signed = stimulus.signed,
                    op_a = stimulus.op_a,
                    op_b = stimulus.op_b,
                    result = %comparison.observed,
                    expected = %comparison.expected,
                    "Mismatched result!"
                );
                self.state = RunState::HaltedOnMismatch;
                return Err(VerifyError::ResultMismatch(Box::new(report)));
            }

            debug!(
                iteration,
                wait_cycles = comparison.wait_cycles,
                "iteration passed"
            );
            stats.record(comparison.wait_cycles);
            completed += 1;
        }

        // the DUT ignores signed_i while idle
        self.tb.set(SIGNED, 1u8);
        self.tb.timer(self.config.settle_delay).await?;

        self.state = RunState::Passed;
        info!(iterations = completed, "Pass!");

        Ok(VerificationReport {
            iterations: completed,
            seed,
            total_wait_cycles: stats.total,
            min_wait_cycles: stats.min.unwrap_or(0),
            max_wait_cycles: stats.max,
            clock_cycles: self.tb.simulator().cycles(),
            sim_time_ps: self.tb.time_ps(),
        })
    }

    async fn run_iteration(
        &mut self,
        iteration: usize,
        stimulus: StimulusVector,
    ) -> Result<Comparison, VerifyError> {
        let settle = self.config.settle_delay;
        let half_period = self.config.half_period;
        let max_wait = self.config.max_wait_cycles;

        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => {
                    self.tb
                        .set(SIGNED, stimulus.signed)
                        .set(OP_A, stimulus.op_a)
                        .set(OP_B, stimulus.op_b)
                        .set(V_I, 1u8);
                    self.tb.timer(settle).await?;
                    Phase::Presented
                }
                Phase::Presented => {
                    // the DUT latches the request on this edge
                    self.tb.set(CLK, 1u8);
                    self.tb.timer(half_period).await?;
                    self.tb.set(V_I, 0u8).set(CLK, 0u8);
                    self.tb.timer(half_period).await?;
                    Phase::Waiting { cycles: 0 }
                }
                Phase::Waiting { cycles } => {
                    if self.tb.get_as::<bool>(V_O).await? {
                        self.tb.timer(settle).await?;
                        let raw = self.tb.get_as::<u128>(RESULT).await?;
                        // yumi_i is held high, so this edge retires the result
                        self.tb.tick().await?;
                        Phase::Captured {
                            raw,
                            wait_cycles: cycles,
                        }
                    } else {
                        if max_wait.is_some_and(|limit| cycles >= limit) {
                            warn!(iteration, cycles, "watchdog expired waiting for v_o");
                            return Err(VerifyError::WatchdogExpired { iteration, cycles });
                        }
                        self.tb.tick().await?;
                        Phase::Waiting { cycles: cycles + 1 }
                    }
                }
                Phase::Captured { raw, wait_cycles } => Phase::Compared(Comparison {
                    raw,
                    observed: interpret_result(raw, stimulus.signed),
                    expected: expected_product(&stimulus),
                    wait_cycles,
                }),
                Phase::Compared(comparison) => return Ok(comparison),
            };
        }
    }
}
