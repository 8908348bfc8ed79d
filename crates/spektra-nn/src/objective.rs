//! Masked loss, accuracy and AUC.
//!
//! One objective serves every split. Its mode is fixed at construction:
//!
//! | Mode | Loss / accuracy | AUC weights |
//! |------|-----------------|-------------|
//! | `Train` | mean over all nodes | 1 for every element |
//! | `Eval` | `Σ(v_i · m_i) / Σ m_i` | `m_i` on every element of row `i` |
//!
//! The per-element loss is the weighted sigmoid cross-entropy with logits:
//!
//! ```text
//! ℓ(x, z) = (1 - z) x + (1 + (q - 1) z) (log(1 + e^{-|x|}) + max(-x, 0))
//! ```
//!
//! which equals `-q z log σ(x) - (1 - z) log(1 - σ(x))` without overflowing
//! for large `|x|`. Per-node values are means over the target columns, and
//! the final loss is scaled by the normalisation constant.

use crate::error::{Error, Result};
use crate::tensor::array1_to_tensor;
use candle_core::{DType, Tensor, D};
use spektra_data::{FeedBundle, InputSchema, Mode};
use std::fmt;

/// How per-node values are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveMode {
    /// Full-batch mean.
    Train,
    /// Mask-normalized sum.
    Eval,
}

impl From<Mode> for ObjectiveMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Train => Self::Train,
            Mode::Validation | Mode::Test => Self::Eval,
        }
    }
}

/// Scalar results of one objective evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub loss: f32,
    pub accuracy: f32,
    /// `None` when the weighted targets hold only one class (for example a
    /// single-label dataset), where ROC AUC is undefined.
    pub auc: Option<f32>,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loss={:.5} accuracy={:.5} auc=", self.loss, self.accuracy)?;
        match self.auc {
            Some(auc) => write!(f, "{auc:.5}"),
            None => f.write_str("n/a"),
        }
    }
}

/// Loss and metrics under a fixed [`ObjectiveMode`].
#[derive(Debug, Clone)]
pub struct MaskedObjective {
    mode: ObjectiveMode,
    /// Present in eval mode only, with its (positive) sum.
    mask: Option<(Tensor, f32)>,
    positive_sample_weight: f32,
    normalisation_constant: f32,
}

impl MaskedObjective {
    /// Full-batch objective.
    pub fn train(positive_sample_weight: f32, normalisation_constant: f32) -> Self {
        Self {
            mode: ObjectiveMode::Train,
            mask: None,
            positive_sample_weight,
            normalisation_constant,
        }
    }

    /// Mask-normalized objective. An all-zero mask is an empty split.
    pub fn eval(mask: Tensor, positive_sample_weight: f32, normalisation_constant: f32) -> Result<Self> {
        let mask = mask.to_dtype(DType::F32)?;
        let sum = mask.sum_all()?.to_scalar::<f32>()?;
        if sum <= 0.0 {
            return Err(Error::Data(spektra_core::Error::EmptySplit(
                "mask selects no nodes".into(),
            )));
        }
        Ok(Self {
            mode: ObjectiveMode::Eval,
            mask: Some((mask, sum)),
            positive_sample_weight,
            normalisation_constant,
        })
    }

    /// Objective matching a bundle's mode, with constants from the schema.
    pub fn for_bundle(bundle: &FeedBundle, schema: &InputSchema, device: &candle_core::Device) -> Result<Self> {
        let (q, norm) = (schema.positive_sample_weight, schema.normalisation_constant);
        match ObjectiveMode::from(bundle.mode()) {
            ObjectiveMode::Train => Ok(Self::train(q, norm)),
            ObjectiveMode::Eval => Self::eval(array1_to_tensor(bundle.mask(), device)?, q, norm),
        }
    }

    pub fn mode(&self) -> ObjectiveMode {
        self.mode
    }

    fn check(&self, logits: &Tensor, targets: &Tensor) -> Result<()> {
        if logits.dims() != targets.dims() || logits.rank() != 2 {
            return Err(Error::dims(format!("{:?} 2-d logits", targets.dims()), format!("{:?}", logits.dims())));
        }
        if let Some((mask, _)) = &self.mask {
            if mask.dims() != [logits.dims()[0]] {
                return Err(Error::dims(format!("mask of {} rows", logits.dims()[0]), format!("{:?}", mask.dims())));
            }
        }
        Ok(())
    }

    /// Reduce per-node values (N) to a scalar according to the mode.
    fn reduce(&self, per_node: &Tensor) -> Result<Tensor> {
        Ok(match &self.mask {
            None => per_node.mean_all()?,
            Some((mask, sum)) => (per_node * mask)?.sum_all()?.affine(1.0 / f64::from(*sum), 0.0)?,
        })
    }

    /// Elementwise weighted sigmoid cross-entropy (N x C).
    pub fn elementwise_loss(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        self.check(logits, targets)?;
        let q = f64::from(self.positive_sample_weight);
        let log_weight = targets.affine(q - 1.0, 1.0)?;
        let softplus = ((logits.abs()?.neg()?.exp()? + 1.0)?.log()? + logits.neg()?.relu()?)?;
        let loss = ((targets.affine(-1.0, 1.0)? * logits)? + (log_weight * softplus)?)?;
        Ok(loss)
    }

    /// Scalar loss tensor.
    pub fn loss(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let per_node = self.elementwise_loss(logits, targets)?.mean(D::Minus1)?;
        Ok(self.reduce(&per_node)?.affine(f64::from(self.normalisation_constant), 0.0)?)
    }

    /// Scalar accuracy tensor: per-node fraction of exact column matches.
    pub fn accuracy(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        self.check(logits, targets)?;
        // σ(x) ≥ 0.5 ⇔ x ≥ 0
        let predictions = logits.ge(0f32)?.to_dtype(DType::F32)?;
        let correct = predictions.eq(targets)?.to_dtype(DType::F32)?;
        self.reduce(&correct.mean(D::Minus1)?)
    }

    /// Exact ROC AUC of `σ(logits)` against binary targets.
    pub fn auc(&self, logits: &Tensor, targets: &Tensor) -> Result<f32> {
        self.check(logits, targets)?;
        let scores = candle_nn::ops::sigmoid(logits)?.to_vec2::<f32>()?;
        let labels = targets.to_vec2::<f32>()?;
        let row_weights = match &self.mask {
            None => vec![1.0; scores.len()],
            Some((mask, _)) => mask.to_vec1::<f32>()?,
        };

        let samples = scores
            .iter()
            .zip(&labels)
            .zip(&row_weights)
            .flat_map(|((s, l), &w)| s.iter().zip(l).map(move |(&s, &l)| (s, l >= 0.5, w)));
        Ok(weighted_auc(samples)?)
    }

    /// Loss, accuracy and AUC in one call.
    ///
    /// A split whose targets hold a single class still reports loss and
    /// accuracy; only its AUC is `None`.
    pub fn evaluate(&self, logits: &Tensor, targets: &Tensor) -> Result<Metrics> {
        let loss = self.loss(logits, targets)?.to_scalar::<f32>()?;
        let accuracy = self.accuracy(logits, targets)?.to_scalar::<f32>()?;
        let auc = match self.auc(logits, targets) {
            Ok(auc) => Some(auc),
            Err(Error::Data(spektra_core::Error::EmptySplit(reason))) => {
                tracing::debug!(%reason, "AUC undefined");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Metrics { loss, accuracy, auc })
    }
}

/// Weighted ROC AUC over `(score, is_positive, weight)` samples.
///
/// Trapezoidal area under the curve swept from the highest score down; tied
/// scores move the curve diagonally, so ties count as half-correct.
pub fn weighted_auc(samples: impl IntoIterator<Item = (f32, bool, f32)>) -> spektra_core::Result<f32> {
    let mut samples: Vec<_> = samples.into_iter().filter(|&(_, _, w)| w > 0.0).collect();
    samples.sort_by(|a, b| b.0.total_cmp(&a.0));

    let positive: f64 = samples.iter().filter(|s| s.1).map(|s| f64::from(s.2)).sum();
    let negative: f64 = samples.iter().filter(|s| !s.1).map(|s| f64::from(s.2)).sum();
    if positive <= 0.0 || negative <= 0.0 {
        return Err(spektra_core::Error::EmptySplit(
            "AUC needs weighted positives and negatives".into(),
        ));
    }

    let (mut tp, mut fp, mut area) = (0.0f64, 0.0f64, 0.0f64);
    let mut i = 0;
    while i < samples.len() {
        let score = samples[i].0;
        let (tp_before, fp_before) = (tp, fp);
        while i < samples.len() && samples[i].0 == score {
            let (_, is_positive, w) = samples[i];
            if is_positive {
                tp += f64::from(w);
            } else {
                fp += f64::from(w);
            }
            i += 1;
        }
        area += (fp - fp_before) * (tp + tp_before) / 2.0;
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok((area / (positive * negative)) as f32)
}
