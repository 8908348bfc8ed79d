//! Adjacency transforms: symmetrization, renormalization, Chebyshev bases.
//!
//! All functions are pure: they take a CSR matrix and return a new one.
//!
//! # Renormalization
//!
//! ```text
//! d_i = Σ_j A_ij
//! Â   = D^{-1/2} A D^{-1/2}
//! ```
//!
//! Isolated nodes (d_i = 0) get `d_i^{-1/2} := 0`, so their rows and columns
//! stay empty instead of turning into infinities.
//!
//! # Reference
//!
//! Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
//! Networks", ICLR 2017, section 2.

use crate::eigen::{largest_eigenvalue, EigenConfig};
use crate::error::{Error, Result};
use crate::sparse::{for_each_entry, from_triplets, identity, row_sums, scale};
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use std::collections::BTreeSet;

/// Degree normalization scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `D^{-1/2} A D^{-1/2}`.
    #[default]
    Symmetric,
    /// `D^{-1} A`. Not supported; requesting it is a configuration error.
    RandomWalk,
}

/// Elementwise maximum of `adj` and its transpose.
///
/// Equivalent to `adj + adjᵀ·[adjᵀ > adj] − adj·[adjᵀ > adj]`: a max-merge,
/// not a sum. Only positions stored in `adj` or `adjᵀ` are visited; missing
/// entries count as zero.
pub fn symmetrize(adj: &CsMat<f64>) -> CsMat<f64> {
    let mut positions = BTreeSet::new();
    for_each_entry(adj, |r, c, _| {
        positions.insert((r, c));
        positions.insert((c, r));
    });

    let value = |r: usize, c: usize| adj.get(r, c).copied().unwrap_or(0.0);
    let triplets = positions.into_iter().filter_map(|(r, c)| {
        let v = value(r, c).max(value(c, r));
        (v != 0.0).then_some((r, c, v))
    });
    from_triplets((adj.rows(), adj.cols()), triplets)
}

/// `adj + I`.
pub fn add_self_loops(adj: &CsMat<f64>) -> CsMat<f64> {
    &identity(adj.rows()) + adj
}

/// Degree-renormalize `adj` without adding self-loops.
pub fn renormalize(adj: &CsMat<f64>, normalization: Normalization) -> Result<CsMat<f64>> {
    if normalization != Normalization::Symmetric {
        return Err(Error::Configuration(format!(
            "{normalization:?} normalization is not supported; use symmetric"
        )));
    }
    if adj.rows() != adj.cols() {
        return Err(Error::Configuration(format!(
            "adjacency must be square, got {}x{}",
            adj.rows(),
            adj.cols()
        )));
    }

    let inv_sqrt = row_sums(adj)
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            if !d.is_finite() || d < 0.0 {
                Err(Error::Numerical(format!("node {i} has invalid degree {d}")))
            } else if d == 0.0 {
                Ok(0.0)
            } else {
                Ok(d.powf(-0.5))
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut triplets = Vec::with_capacity(adj.nnz());
    for_each_entry(adj, |r, c, v| triplets.push((r, c, v * inv_sqrt[r] * inv_sqrt[c])));
    Ok(from_triplets((adj.rows(), adj.cols()), triplets))
}

/// First-order GCN support: `D̃^{-1/2} (A + I) D̃^{-1/2}`.
pub fn transform(adj: &CsMat<f64>) -> Result<CsMat<f64>> {
    transform_with(adj, Normalization::Symmetric)
}

/// [`transform`] with an explicit normalization scheme.
pub fn transform_with(adj: &CsMat<f64>, normalization: Normalization) -> Result<CsMat<f64>> {
    renormalize(&add_self_loops(adj), normalization)
}

/// Normalized Laplacian `I - D^{-1/2} A D^{-1/2}`.
pub fn laplacian(adj: &CsMat<f64>, normalization: Normalization) -> Result<CsMat<f64>> {
    let normalized = renormalize(adj, normalization)?;
    Ok(&identity(adj.rows()) - &normalized)
}

/// Laplacian rescaled into [-1, 1]: `2L / λ_max - I`.
pub fn scaled_laplacian(
    adj: &CsMat<f64>,
    normalization: Normalization,
    config: &EigenConfig,
) -> Result<CsMat<f64>> {
    let lap = laplacian(adj, normalization)?;
    let lambda_max = largest_eigenvalue(&lap, config)?;
    if !lambda_max.is_finite() || lambda_max <= 0.0 {
        return Err(Error::Numerical(format!(
            "largest Laplacian eigenvalue must be positive, got {lambda_max}"
        )));
    }
    tracing::debug!(lambda_max, "scaled Laplacian");
    Ok(&scale(&lap, 2.0 / lambda_max) - &identity(adj.rows()))
}

/// Chebyshev polynomial basis `[T_0, ..., T_degree]` of the scaled Laplacian.
///
/// `degree = 0` yields `[I]` and skips the eigenvalue computation.
pub fn chebyshev_basis(adj: &CsMat<f64>, degree: usize) -> Result<Vec<CsMat<f64>>> {
    chebyshev_basis_with(adj, degree, Normalization::Symmetric, &EigenConfig::default())
}

/// [`chebyshev_basis`] with explicit normalization and solver settings.
pub fn chebyshev_basis_with(
    adj: &CsMat<f64>,
    degree: usize,
    normalization: Normalization,
    config: &EigenConfig,
) -> Result<Vec<CsMat<f64>>> {
    let n = adj.rows();
    let mut basis = Vec::with_capacity(degree + 1);
    basis.push(identity(n));
    if degree == 0 {
        return Ok(basis);
    }

    let scaled = scaled_laplacian(adj, normalization, config)?;
    basis.push(scaled.clone());

    for k in 2..=degree {
        // T_k = 2 L̃ T_{k-1} - T_{k-2}
        let doubled = scale(&(&scaled * &basis[k - 1]), 2.0);
        let next = &doubled - &basis[k - 2];
        basis.push(next);
    }

    Ok(basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::{max_abs_diff, to_dense};
    use approx::assert_relative_eq;

    fn path4() -> CsMat<f64> {
        from_triplets(
            (4, 4),
            [(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 3, 1.0), (3, 2, 1.0)],
        )
    }

    #[test]
    fn test_symmetrize_takes_max() {
        let adj = from_triplets((2, 2), [(0, 1, 2.0), (1, 0, 1.0)]);
        let sym = symmetrize(&adj);
        assert_eq!(sym.get(0, 1), Some(&2.0));
        assert_eq!(sym.get(1, 0), Some(&2.0));
    }

    #[test]
    fn test_symmetrize_directed_edge() {
        let adj = from_triplets((3, 3), [(0, 2, 0.5), (1, 1, 4.0)]);
        let sym = symmetrize(&adj);
        assert_eq!(sym.get(2, 0), Some(&0.5));
        assert_eq!(sym.get(1, 1), Some(&4.0));
        assert_eq!(sym.nnz(), 3);
    }

    #[test]
    fn test_symmetrize_negative_weight_against_missing() {
        // max(-1, 0) = 0: the entry disappears.
        let adj = from_triplets((2, 2), [(0, 1, -1.0)]);
        let sym = symmetrize(&adj);
        assert_eq!(sym.nnz(), 0);
    }

    #[test]
    fn test_transform_path() {
        let support = transform(&path4()).unwrap();
        // Degrees with self-loops: 2, 3, 3, 2.
        assert_relative_eq!(*support.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(*support.get(0, 1).unwrap(), 1.0 / 6f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(*support.get(1, 2).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(support.get(0, 2), None);
    }

    #[test]
    fn test_renormalize_isolated_node_guard() {
        let adj = from_triplets((3, 3), [(0, 1, 1.0), (1, 0, 1.0)]);
        let normalized = renormalize(&adj, Normalization::Symmetric).unwrap();
        let dense = to_dense(&normalized);
        assert!(dense.iter().all(|v| v.is_finite()));
        assert_eq!(dense.row(2).sum(), 0.0);
    }

    #[test]
    fn test_renormalize_random_walk_rejected() {
        let err = renormalize(&path4(), Normalization::RandomWalk).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_renormalize_negative_degree() {
        let adj = from_triplets((2, 2), [(0, 1, -1.0), (1, 0, -1.0)]);
        assert!(matches!(
            renormalize(&adj, Normalization::Symmetric),
            Err(Error::Numerical(_))
        ));
    }

    #[test]
    fn test_chebyshev_degree_zero_and_one() {
        let adj = path4();
        let t0 = chebyshev_basis(&adj, 0).unwrap();
        assert_eq!(t0.len(), 1);
        assert_eq!(max_abs_diff(&t0[0], &identity(4)), 0.0);

        let t1 = chebyshev_basis(&adj, 1).unwrap();
        assert_eq!(t1.len(), 2);
        // Path Laplacian has λ_max = 2, so L̃ = L - I = -D^{-1/2} A D^{-1/2}.
        let expected = scale(&renormalize(&adj, Normalization::Symmetric).unwrap(), -1.0);
        assert!(max_abs_diff(&t1[1], &expected) < 1e-6);
    }

    #[test]
    fn test_chebyshev_recurrence() {
        let basis = chebyshev_basis(&path4(), 4).unwrap();
        assert_eq!(basis.len(), 5);
        let x = to_dense(&basis[1]);
        for k in 2..basis.len() {
            let expected = 2.0 * x.dot(&to_dense(&basis[k - 1])) - to_dense(&basis[k - 2]);
            let actual = to_dense(&basis[k]);
            let diff = (&actual - &expected).iter().fold(0.0f64, |m, v| m.max(v.abs()));
            assert!(diff < 1e-9, "T_{k} violates the recurrence by {diff}");
        }
    }

    #[test]
    fn test_chebyshev_empty_graph_fails() {
        let empty = from_triplets((0, 0), std::iter::empty());
        assert!(chebyshev_basis(&empty, 2).is_err());
    }
}
