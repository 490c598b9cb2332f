//! Stimulus generation
//!
//! A `StimulusSource` hands the verifier one operand pair per iteration.
//! `RandomStimulus` draws uniformly from a seeded generator so any run can be
//! replayed; `DirectedStimulus` replays a fixed list.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// One request presented to the multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StimulusVector {
    pub op_a: u64,
    pub op_b: u64,
    pub signed: bool,
}

impl StimulusVector {
    pub fn unsigned(op_a: u64, op_b: u64) -> Self {
        StimulusVector {
            op_a,
            op_b,
            signed: false,
        }
    }

    pub fn signed(op_a: u64, op_b: u64) -> Self {
        StimulusVector {
            op_a,
            op_b,
            signed: true,
        }
    }

    /// Operand bit patterns read as two's-complement
    pub fn signed_operands(&self) -> (i64, i64) {
        (self.op_a as i64, self.op_b as i64)
    }
}

pub trait StimulusSource {
    /// Next vector, or `None` once a finite source is exhausted
    fn next_vector(&mut self) -> Option<StimulusVector>;

    /// Seed that reproduces this source, if it has one
    fn seed(&self) -> Option<u64> {
        None
    }
}

impl<S: StimulusSource + ?Sized> StimulusSource for Box<S> {
    fn next_vector(&mut self) -> Option<StimulusVector> {
        (**self).next_vector()
    }

    fn seed(&self) -> Option<u64> {
        (**self).seed()
    }
}

/// Uniform random operands and signedness
#[derive(Debug, Clone)]
pub struct RandomStimulus {
    rng: StdRng,
    seed: u64,
}

impl RandomStimulus {
    pub fn from_seed(seed: u64) -> Self {
        RandomStimulus {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Draw a fresh seed; it is still reported through `seed()`
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn generate(&mut self) -> StimulusVector {
        let signed = self.rng.gen::<bool>();
        let op_a = self.rng.gen::<u64>();
        let op_b = self.rng.gen::<u64>();
        StimulusVector { op_a, op_b, signed }
    }
}

impl StimulusSource for RandomStimulus {
    fn next_vector(&mut self) -> Option<StimulusVector> {
        Some(self.generate())
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

/// Fixed list of vectors, replayed in order
#[derive(Debug, Clone, Default)]
pub struct DirectedStimulus {
    vectors: VecDeque<StimulusVector>,
}

impl DirectedStimulus {
    pub fn new(vectors: impl IntoIterator<Item = StimulusVector>) -> Self {
        DirectedStimulus {
            vectors: vectors.into_iter().collect(),
        }
    }

    /// Corner cases of the 64-bit operand space in both modes
    pub fn boundary_cases() -> Self {
        let min_signed = 1u64 << 63;
        Self::new([
            StimulusVector::unsigned(0, 0),
            StimulusVector::signed(0, 0),
            StimulusVector::unsigned(u64::MAX, u64::MAX),
            StimulusVector::signed(u64::MAX, u64::MAX),
            StimulusVector::signed(min_signed, min_signed),
            StimulusVector::unsigned(min_signed, min_signed),
            StimulusVector::signed(min_signed, u64::MAX),
            StimulusVector::signed(min_signed, 1),
            StimulusVector::unsigned(1, u64::MAX),
            StimulusVector::signed(1, u64::MAX),
            StimulusVector::unsigned(6, 7),
            StimulusVector::signed(u64::MAX, 2),
            StimulusVector::signed(i64::MAX as u64, i64::MAX as u64),
            StimulusVector::signed(i64::MAX as u64, min_signed),
        ])
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl StimulusSource for DirectedStimulus {
    fn next_vector(&mut self) -> Option<StimulusVector> {
        self.vectors.pop_front()
    }
}
