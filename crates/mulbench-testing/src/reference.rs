//! Reference arithmetic for the multiplier contract
//!
//! The expected product is derived from the operand bit patterns alone,
//! never from the DUT. 128 bits hold every 64x64 product exactly in either
//! mode.

use crate::stimulus::StimulusVector;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Unsigned(u128),
    Signed(i128),
}

impl Product {
    /// Two's-complement bit pattern of the product
    pub fn to_bits(self) -> u128 {
        match self {
            Product::Unsigned(v) => v,
            Product::Signed(v) => v as u128,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Unsigned(v) => write!(f, "{v}"),
            Product::Signed(v) => write!(f, "{v}"),
        }
    }
}

pub fn expected_product(stimulus: &StimulusVector) -> Product {
    if stimulus.signed {
        let (a, b) = stimulus.signed_operands();
        Product::Signed(a as i128 * b as i128)
    } else {
        Product::Unsigned(stimulus.op_a as u128 * stimulus.op_b as u128)
    }
}

/// Read a raw `result_o` value in the request's mode
pub fn interpret_result(raw: u128, signed: bool) -> Product {
    if signed {
        // only a set bit 127 changes the value
        Product::Signed(raw as i128)
    } else {
        Product::Unsigned(raw)
    }
}
