//! Seeded shuffle and proportional train / validation / test partition.
//!
//! The plan is a single permutation of `[0, n)` plus three contiguous,
//! disjoint blocks of positions in that shuffled order:
//!
//! ```text
//! position:  0 ........ t | t ...... t+v | t+v .... t+v+s | leftover
//!            └── train ──┘ └ validation ┘ └─── test ────┘
//! ```
//!
//! Block sizes are `floor(w_i / Σw × n)`; positions past the last block
//! belong to no split.

use spektra_core::{Error, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Default relative split sizes (train, validation, test).
pub const DEFAULT_SPLIT_WEIGHTS: [f64; 3] = [1200.0, 500.0, 1000.0];

/// Which split a bundle, mask or objective refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Validation,
    Test,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Train, Mode::Validation, Mode::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Train => 0,
            Self::Validation => 1,
            Self::Test => 2,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown mode `{s}`")))
    }
}

/// A shuffled order of all nodes and the split blocks within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// `permutation[k]` is the original node id at shuffled position `k`.
    pub permutation: Vec<usize>,
    pub train: Range<usize>,
    pub validation: Range<usize>,
    pub test: Range<usize>,
}

impl SplitPlan {
    pub fn node_count(&self) -> usize {
        self.permutation.len()
    }

    /// Shuffled positions belonging to `mode`.
    pub fn indices(&self, mode: Mode) -> Range<usize> {
        match mode {
            Mode::Train => self.train.clone(),
            Mode::Validation => self.validation.clone(),
            Mode::Test => self.test.clone(),
        }
    }

    /// Original node ids belonging to `mode`, in shuffled order.
    pub fn nodes(&self, mode: Mode) -> &[usize] {
        &self.permutation[self.indices(mode)]
    }

    /// Shuffled positions in no split.
    pub fn leftover(&self) -> Range<usize> {
        self.test.end..self.permutation.len()
    }

    /// `inverse[node] = position`; undoes the shuffle.
    pub fn inverse_permutation(&self) -> Vec<usize> {
        spektra_core::sparse::invert_permutation(&self.permutation)
    }

    /// Full-length mask with 1.0 at the positions of `mode`.
    pub fn mask(&self, mode: Mode) -> Vec<f32> {
        let mut mask = vec![0.0; self.permutation.len()];
        for position in self.indices(mode) {
            mask[position] = 1.0;
        }
        mask
    }

    pub fn split_sizes(&self) -> [usize; 3] {
        Mode::ALL.map(|m| self.indices(m).len())
    }
}

/// Validated split weights plus an optional seed.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlanner {
    proportions: [f64; 3],
    seed: Option<u64>,
}

impl Default for SplitPlanner {
    fn default() -> Self {
        let total: f64 = DEFAULT_SPLIT_WEIGHTS.iter().sum();
        Self {
            proportions: DEFAULT_SPLIT_WEIGHTS.map(|w| w / total),
            seed: None,
        }
    }
}

impl SplitPlanner {
    /// Normalize `weights` into proportions.
    ///
    /// Weights must be finite and non-negative with a positive sum.
    pub fn new(weights: [f64; 3]) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Configuration(format!(
                "split weights must be finite and non-negative, got {weights:?}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::Configuration(format!(
                "split weights must have a positive sum, got {weights:?}"
            )));
        }
        Ok(Self { proportions: weights.map(|w| w / total), seed: None })
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn proportions(&self) -> [f64; 3] {
        self.proportions
    }

    /// Block sizes for `node_count` nodes.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sizes(&self, node_count: usize) -> [usize; 3] {
        let n = node_count as f64;
        let mut remaining = node_count;
        self.proportions.map(|p| {
            // The epsilon absorbs rounding in `p * n` for exact splits.
            let size = ((p * n) + 1e-9).floor() as usize;
            let size = size.min(remaining);
            remaining -= size;
            size
        })
    }

    /// Shuffle `[0, node_count)` and carve the split blocks.
    pub fn plan(&self, node_count: usize) -> SplitPlan {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut permutation: Vec<usize> = (0..node_count).collect();
        permutation.shuffle(&mut rng);

        let [train, validation, test] = self.sizes(node_count);
        let plan = SplitPlan {
            permutation,
            train: 0..train,
            validation: train..train + validation,
            test: train + validation..train + validation + test,
        };
        tracing::debug!(
            train,
            validation,
            test,
            leftover = plan.leftover().len(),
            "split plan"
        );
        plan
    }
}

/// One-shot planning: validate `weights`, then shuffle and partition.
pub fn plan(node_count: usize, weights: [f64; 3], seed: Option<u64>) -> Result<SplitPlan> {
    Ok(SplitPlanner::new(weights)?.with_seed(seed).plan(node_count))
}
