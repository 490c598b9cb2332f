//! Behavioral model of an iterative 64x64 -> 128 multiplier
//!
//! Shift-and-add datapath with a valid/yumi handshake:
//!
//! - a request is latched on the rising edge where `v_i` is high and the unit
//!   is idle (`ready_o` high)
//! - every following edge consumes `stride` bits of the multiplier operand
//! - once all 64 bits are consumed `v_o` rises and `result_o` holds the
//!   product until the next product completes
//! - the result is retired on a rising edge with `yumi_i` high
//!
//! Signed requests multiply the operand magnitudes and negate the 128-bit
//! product when the operand signs differ.

use crate::simulator::{PortSpec, SimulationError, SimulationResult, SimulationRuntime};
use crate::state::SignalState;
use async_trait::async_trait;
use tracing::trace;

pub const CLK: &str = "clk_i";
pub const RESET: &str = "reset_i";
pub const OP_A: &str = "opA_i";
pub const OP_B: &str = "opB_i";
pub const SIGNED: &str = "signed_i";
pub const V_I: &str = "v_i";
pub const YUMI: &str = "yumi_i";
pub const READY: &str = "ready_o";
pub const V_O: &str = "v_o";
pub const RESULT: &str = "result_o";

pub const OPERAND_WIDTH: usize = 64;
pub const RESULT_WIDTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MulState {
    Idle,
    Busy {
        multiplicand: u128,
        multiplier: u64,
        acc: u128,
        bits_left: u32,
        negate: bool,
    },
    Done,
}

#[derive(Debug, Clone)]
pub struct IterativeMultiplier {
    stride: u32,
    state: MulState,
    result: u128,
}

impl Default for IterativeMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl IterativeMultiplier {
    /// One multiplier bit per cycle
    pub fn new() -> Self {
        IterativeMultiplier {
            stride: 1,
            state: MulState::Idle,
            result: 0,
        }
    }

    /// Consume `stride` multiplier bits per cycle (1..=64)
    pub fn with_stride(stride: u32) -> SimulationResult<Self> {
        if stride == 0 || stride as usize > OPERAND_WIDTH {
            return Err(SimulationError::InvalidInput(format!(
                "stride must be within 1..={OPERAND_WIDTH}, got {stride}"
            )));
        }
        Ok(IterativeMultiplier {
            stride,
            ..Self::new()
        })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Cycles between the request edge and `v_o`
    pub fn latency(&self) -> u32 {
        (OPERAND_WIDTH as u32).div_ceil(self.stride)
    }

    fn latch(&mut self, op_a: u64, op_b: u64, signed: bool) {
        let (a_mag, a_neg) = magnitude(op_a, signed);
        let (b_mag, b_neg) = magnitude(op_b, signed);
        self.state = MulState::Busy {
            multiplicand: a_mag as u128,
            multiplier: b_mag,
            acc: 0,
            bits_left: OPERAND_WIDTH as u32,
            negate: a_neg != b_neg,
        };
    }

    fn iterate(&mut self) {
        let MulState::Busy {
            mut multiplicand,
            mut multiplier,
            mut acc,
            bits_left,
            negate,
        } = self.state
        else {
            return;
        };

        let steps = self.stride.min(bits_left);
        for _ in 0..steps {
            if multiplier & 1 == 1 {
                acc += multiplicand;
            }
            multiplicand <<= 1;
            multiplier >>= 1;
        }

        let bits_left = bits_left - steps;
        if bits_left == 0 {
            self.result = if negate { acc.wrapping_neg() } else { acc };
            self.state = MulState::Done;
        } else {
            self.state = MulState::Busy {
                multiplicand,
                multiplier,
                acc,
                bits_left,
                negate,
            };
        }
    }
}

/// Magnitude of a 64-bit operand and whether it reads as negative
fn magnitude(op: u64, signed: bool) -> (u64, bool) {
    if signed && op >> 63 == 1 {
        // two's complement negation; i64::MIN maps to 2^63
        (op.wrapping_neg(), true)
    } else {
        (op, false)
    }
}

#[async_trait]
impl SimulationRuntime for IterativeMultiplier {
    fn name(&self) -> &str {
        "bsg_mul_iterative"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input(CLK, 1),
            PortSpec::input(RESET, 1),
            PortSpec::input(OP_A, OPERAND_WIDTH),
            PortSpec::input(OP_B, OPERAND_WIDTH),
            PortSpec::input(SIGNED, 1),
            PortSpec::input(V_I, 1),
            PortSpec::input(YUMI, 1),
            PortSpec::output(READY, 1),
            PortSpec::output(V_O, 1),
            PortSpec::output(RESULT, RESULT_WIDTH),
        ]
    }

    async fn clock_edge(&mut self, _clock: &str, signals: &SignalState) -> SimulationResult<()> {
        if signals.is_high(RESET)? {
            self.state = MulState::Idle;
            return Ok(());
        }

        match self.state {
            MulState::Idle => {
                if signals.is_high(V_I)? {
                    let op_a = signals.get_u64(OP_A)?;
                    let op_b = signals.get_u64(OP_B)?;
                    let signed = signals.is_high(SIGNED)?;
                    trace!(op_a, op_b, signed, "request latched");
                    self.latch(op_a, op_b, signed);
                }
            }
            MulState::Busy { .. } => self.iterate(),
            MulState::Done => {
                if signals.is_high(YUMI)? {
                    self.state = MulState::Idle;
                }
            }
        }
        Ok(())
    }

    async fn evaluate(&mut self, signals: &mut SignalState) -> SimulationResult<()> {
        signals.drive_bool(READY, self.state == MulState::Idle)?;
        signals.drive_bool(V_O, self.state == MulState::Done)?;
        signals.drive_u128(RESULT, self.result)?;
        Ok(())
    }
}
