//! Support selection: which propagation operators a model kind receives.
//!
//! | Kind | Supports |
//! |------|----------|
//! | `gcn`, `gcn_ae` | `[D̃^{-1/2} (A + I) D̃^{-1/2}]` |
//! | `gcn_poly` | `[T_0, ..., T_{K-1}]`, K = `support_size` |

use crate::eigen::EigenConfig;
use crate::error::{Error, Result};
use crate::transform::{chebyshev_basis_with, transform_with, Normalization};
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use std::fmt;
use std::str::FromStr;

/// Model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// First-order GCN for node classification.
    #[default]
    Gcn,
    /// Chebyshev-polynomial GCN.
    GcnPoly,
    /// GCN autoencoder for link prediction.
    GcnAe,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Gcn, ModelKind::GcnPoly, ModelKind::GcnAe];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gcn => "gcn",
            Self::GcnPoly => "gcn_poly",
            Self::GcnAe => "gcn_ae",
        }
    }

    /// Whether the model reconstructs the adjacency instead of predicting labels.
    pub fn is_autoencoder(self) -> bool {
        self == Self::GcnAe
    }

    /// Resolve the support strategy for this kind.
    ///
    /// `support_size` is only read for the polynomial kind, where it must be
    /// at least 1 (a basis of degree `support_size - 1`).
    pub fn support_strategy(self, support_size: usize) -> Result<SupportStrategy> {
        match self {
            Self::GcnPoly if support_size == 0 => Err(Error::Configuration(
                "gcn_poly needs support_size >= 1".into(),
            )),
            Self::GcnPoly => Ok(SupportStrategy::Chebyshev { degree: support_size - 1 }),
            Self::Gcn | Self::GcnAe => Ok(SupportStrategy::FirstOrder),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown model kind `{s}`")))
    }
}

/// How supports are derived from the adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStrategy {
    /// Single renormalized adjacency with self-loops.
    FirstOrder,
    /// Chebyshev basis `[T_0, ..., T_degree]`.
    Chebyshev { degree: usize },
}

impl SupportStrategy {
    /// Number of support matrices this strategy yields.
    pub fn support_count(self) -> usize {
        match self {
            Self::FirstOrder => 1,
            Self::Chebyshev { degree } => degree + 1,
        }
    }

    pub fn compute(
        self,
        adj: &CsMat<f64>,
        normalization: Normalization,
        config: &EigenConfig,
    ) -> Result<Vec<CsMat<f64>>> {
        let supports = match self {
            Self::FirstOrder => vec![transform_with(adj, normalization)?],
            Self::Chebyshev { degree } => chebyshev_basis_with(adj, degree, normalization, config)?,
        };
        tracing::debug!(strategy = ?self, count = supports.len(), "supports computed");
        Ok(supports)
    }
}

/// Supports for `kind` with default normalization and solver settings.
pub fn compute_supports(adj: &CsMat<f64>, kind: ModelKind, support_size: usize) -> Result<Vec<CsMat<f64>>> {
    kind.support_strategy(support_size)?
        .compute(adj, Normalization::Symmetric, &EigenConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::from_triplets;

    fn triangle() -> CsMat<f64> {
        from_triplets(
            (3, 3),
            [(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0), (0, 2, 1.0), (2, 0, 1.0)],
        )
    }

    #[test]
    fn test_model_kind_parse_and_display() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>().unwrap(), kind);
        }
        assert!(matches!("gcn_cheby".parse::<ModelKind>(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_strategy_resolution() {
        assert_eq!(ModelKind::Gcn.support_strategy(7).unwrap(), SupportStrategy::FirstOrder);
        assert_eq!(ModelKind::GcnAe.support_strategy(0).unwrap(), SupportStrategy::FirstOrder);
        assert_eq!(
            ModelKind::GcnPoly.support_strategy(3).unwrap(),
            SupportStrategy::Chebyshev { degree: 2 }
        );
        assert!(ModelKind::GcnPoly.support_strategy(0).is_err());
    }

    #[test]
    fn test_compute_supports_lengths() {
        let adj = triangle();
        assert_eq!(compute_supports(&adj, ModelKind::Gcn, 3).unwrap().len(), 1);
        assert_eq!(compute_supports(&adj, ModelKind::GcnPoly, 3).unwrap().len(), 3);
        assert_eq!(compute_supports(&adj, ModelKind::GcnPoly, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_poly_supports_on_long_rings() {
        for n in [200, 400, 1000] {
            let ring = from_triplets(
                (n, n),
                (0..n).flat_map(|i| [(i, (i + 1) % n, 1.0), ((i + 1) % n, i, 1.0)]),
            );
            let supports = compute_supports(&ring, ModelKind::GcnPoly, 3).unwrap();
            assert_eq!(supports.len(), 3);
            // λ_max = 2 for an even ring, so T_1 = -D^{-1/2} A D^{-1/2}.
            assert!((supports[1].get(0, 1).copied().unwrap_or(0.0) + 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_random_walk_fails_fast() {
        let err = SupportStrategy::FirstOrder
            .compute(&triangle(), Normalization::RandomWalk, &EigenConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_support_count_matches_output() {
        let adj = triangle();
        for size in 1..4 {
            let strategy = ModelKind::GcnPoly.support_strategy(size).unwrap();
            let supports = strategy.compute(&adj, Normalization::Symmetric, &EigenConfig::default()).unwrap();
            assert_eq!(supports.len(), strategy.support_count());
        }
    }
}
