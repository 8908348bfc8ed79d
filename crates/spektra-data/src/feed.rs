//! Per-split input bundles.
//!
//! The assembler applies the plan's permutation once to every node-indexed
//! tensor, so row `i` of the features, the targets, every support and every
//! mask refers to the same node. Supports are permuted on both axes
//! (`P S Pᵀ`).

use crate::split::{Mode, SplitPlan};
use ndarray::{Array1, Array2, Axis};
use spektra_core::sparse::{for_each_entry, permute_rows_f32, permute_symmetric};
use spektra_core::{Error, Features, GraphStore, ModelKind, Result, SparseTensor};
use sprs::CsMat;
use std::sync::Arc;

/// Named input a model reads from a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Features,
    Labels,
    Support(usize),
    Mask,
    Dropout,
    Mode,
}

/// Borrowed value of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotValue<'a> {
    Features(&'a FeatureTensor),
    Labels(&'a Array2<f32>),
    Support(&'a SparseTensor),
    Mask(&'a Array1<f32>),
    Dropout(f32),
    Mode(Mode),
}

/// Shuffled node features in the form the model consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTensor {
    Dense(Array2<f32>),
    Sparse(SparseTensor),
}

impl FeatureTensor {
    pub fn rows(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            Self::Sparse(t) => t.shape[0],
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Dense(m) => m.ncols(),
            Self::Sparse(t) => t.shape[1],
        }
    }
}

/// What the model is asked to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targets {
    /// k-hot node labels.
    Labels,
    /// Binary `A + I`, one row per node, for the autoencoder.
    Reconstruction,
}

impl Targets {
    pub fn for_model(kind: ModelKind) -> Self {
        if kind.is_autoencoder() {
            Self::Reconstruction
        } else {
            Self::Labels
        }
    }
}

/// Shapes and constants shared by all three bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSchema {
    pub node_count: usize,
    pub feature_size: usize,
    pub label_size: usize,
    pub support_size: usize,
    pub sparse_features: bool,
    /// Stored feature entries when features are sparse, else 0.
    pub num_elements: usize,
    /// Weight on positive targets in the cross-entropy.
    pub positive_sample_weight: f32,
    /// Factor the loss is multiplied by.
    pub normalisation_constant: f32,
    pub targets: Targets,
}

impl InputSchema {
    /// Slots every bundle provides, supports in order.
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots = vec![Slot::Features, Slot::Labels];
        slots.extend((0..self.support_size).map(Slot::Support));
        slots.extend([Slot::Mask, Slot::Dropout, Slot::Mode]);
        slots
    }
}

/// Inputs for one split.
#[derive(Debug, Clone)]
pub struct FeedBundle {
    mode: Mode,
    features: Arc<FeatureTensor>,
    labels: Arc<Array2<f32>>,
    supports: Arc<Vec<SparseTensor>>,
    mask: Array1<f32>,
    dropout: f32,
}

impl FeedBundle {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn features(&self) -> &FeatureTensor {
        &self.features
    }

    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    pub fn supports(&self) -> &[SparseTensor] {
        &self.supports
    }

    pub fn mask(&self) -> &Array1<f32> {
        &self.mask
    }

    pub fn mask_sum(&self) -> f32 {
        self.mask.sum()
    }

    pub fn dropout(&self) -> f32 {
        self.dropout
    }

    /// Typed lookup; `None` for a support index past the last support.
    pub fn slot(&self, slot: Slot) -> Option<SlotValue<'_>> {
        Some(match slot {
            Slot::Features => SlotValue::Features(&self.features),
            Slot::Labels => SlotValue::Labels(&self.labels),
            Slot::Support(k) => SlotValue::Support(self.supports.get(k)?),
            Slot::Mask => SlotValue::Mask(&self.mask),
            Slot::Dropout => SlotValue::Dropout(self.dropout),
            Slot::Mode => SlotValue::Mode(self.mode),
        })
    }

    /// Whether two bundles share the same feature, label and support buffers.
    pub fn shares_inputs_with(&self, other: &FeedBundle) -> bool {
        Arc::ptr_eq(&self.features, &other.features)
            && Arc::ptr_eq(&self.labels, &other.labels)
            && Arc::ptr_eq(&self.supports, &other.supports)
    }
}

/// The three bundles, their schema and the plan that produced them.
#[derive(Debug, Clone)]
pub struct FeedAssembler {
    bundles: [FeedBundle; 3],
    schema: InputSchema,
    plan: SplitPlan,
}

impl FeedAssembler {
    /// Shuffle, mask and package the store's data for every split.
    ///
    /// Fails with [`Error::EmptySplit`] if any split would hold no nodes.
    pub fn assemble(
        store: &GraphStore,
        supports: &[CsMat<f64>],
        plan: SplitPlan,
        dropout: f32,
        targets: Targets,
    ) -> Result<Self> {
        let n = store.node_count();
        if plan.node_count() != n {
            return Err(Error::DataIntegrity(format!(
                "split plan covers {} nodes, store has {n}",
                plan.node_count()
            )));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::Configuration(format!("dropout must be in [0, 1), got {dropout}")));
        }
        if supports.is_empty() {
            return Err(Error::Configuration("at least one support is required".into()));
        }
        if let Some(bad) = supports.iter().find(|s| s.rows() != n || s.cols() != n) {
            return Err(Error::DataIntegrity(format!(
                "support is {}x{}, expected {n}x{n}",
                bad.rows(),
                bad.cols()
            )));
        }
        for mode in Mode::ALL {
            if plan.indices(mode).is_empty() {
                return Err(Error::EmptySplit(format!("{mode} split has no nodes")));
            }
        }

        let permutation = &plan.permutation;
        let features = match store.features() {
            Features::Dense(m) => FeatureTensor::Dense(m.select(Axis(0), permutation)),
            Features::Sparse(m) => FeatureTensor::Sparse(SparseTensor::from(&permute_rows_f32(m, permutation))),
        };

        let (labels, positive_sample_weight, normalisation_constant) = match targets {
            Targets::Labels => (store.labels().select(Axis(0), permutation), 1.0, 1.0),
            Targets::Reconstruction => {
                let target = reconstruction_target(&permute_symmetric(store.adjacency(), permutation));
                let (pos_weight, norm) = reconstruction_weights(&target)?;
                (target, pos_weight, norm)
            }
        };

        let supports: Vec<SparseTensor> = supports
            .iter()
            .map(|s| SparseTensor::from(&permute_symmetric(s, permutation)))
            .collect();

        let schema = InputSchema {
            node_count: n,
            feature_size: features.cols(),
            label_size: labels.ncols(),
            support_size: supports.len(),
            sparse_features: store.features().is_sparse(),
            num_elements: if store.features().is_sparse() { store.features().num_elements() } else { 0 },
            positive_sample_weight,
            normalisation_constant,
            targets,
        };

        let features = Arc::new(features);
        let labels = Arc::new(labels);
        let supports = Arc::new(supports);
        let bundles = Mode::ALL.map(|mode| FeedBundle {
            mode,
            features: Arc::clone(&features),
            labels: Arc::clone(&labels),
            supports: Arc::clone(&supports),
            mask: Array1::from(plan.mask(mode)),
            dropout: if mode == Mode::Train { dropout } else { 0.0 },
        });

        let [train, validation, test] = plan.split_sizes();
        tracing::info!(train, validation, test, supports = schema.support_size, "feed bundles assembled");

        Ok(Self { bundles, schema, plan })
    }

    /// Bundle for `mode`.
    pub fn feed(&self, mode: Mode) -> &FeedBundle {
        &self.bundles[mode.index()]
    }

    /// Shapes, slot list and loss constants.
    pub fn input_slots(&self) -> &InputSchema {
        &self.schema
    }

    pub fn plan(&self) -> &SplitPlan {
        &self.plan
    }
}

/// Dense binary `A + I`: 1.0 where an edge or the diagonal is.
fn reconstruction_target(adj: &CsMat<f64>) -> Array2<f32> {
    let n = adj.rows();
    let mut target = Array2::eye(n);
    for_each_entry(adj, |r, c, v| {
        if v != 0.0 {
            target[[r, c]] = 1.0;
        }
    });
    target
}

/// `(pos_weight, norm)` balancing the rare positive entries of a reconstruction target.
fn reconstruction_weights(target: &Array2<f32>) -> Result<(f32, f32)> {
    let total = target.len() as f64;
    let positives = f64::from(target.sum());
    let negatives = total - positives;
    if negatives <= 0.0 {
        return Err(Error::DataIntegrity(
            "reconstruction target has no negative entries (complete graph)".into(),
        ));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(((negatives / positives) as f32, (total / (2.0 * negatives)) as f32))
}
