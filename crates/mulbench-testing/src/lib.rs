//! mulbench testing framework
//!
//! This crate provides:
//! - an ergonomic testbench API over the simulation kernel
//! - stimulus sources (seeded random and directed)
//! - reference arithmetic for the multiplier contract
//! - the randomized handshake verifier

pub mod reference;
pub mod stimulus;
pub mod testbench;
pub mod verifier;

pub use reference::{expected_product, interpret_result, Product};
pub use stimulus::{DirectedStimulus, RandomStimulus, StimulusSource, StimulusVector};
pub use testbench::{FromSignalValue, IntoSignalValue, Testbench};
pub use verifier::{
    MismatchReport, MultiplierVerifier, RunState, VerificationReport, VerifierConfig, VerifyError,
    DEFAULT_ITERATIONS,
};
