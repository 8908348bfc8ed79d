//! Largest-magnitude eigenvalue of a sparse symmetric matrix.
//!
//! # Algorithm: Explicitly Restarted Lanczos
//!
//! 1. Start from a seeded pseudo-random unit vector v
//! 2. Build an orthonormal Krylov basis `V = [v, Mv, M²v, ...]` of at most
//!    `krylov_dim` vectors, with full reorthogonalization, and the projected
//!    tridiagonal matrix `T = Vᵀ M V`
//! 3. Take the Ritz pair (θ, y = V s) of `T` with the largest |θ|
//! 4. Stop when the residual `||M y - θ y||` is below `tolerance × max(|θ|, 1)`;
//!    otherwise restart from y
//!
//! The residual bounds the eigenvalue error: some eigenvalue of M lies within
//! `||M y - θ y||` of θ. Extremal Ritz values converge at a rate governed by
//! the square root of the relative spectral gap, so rings, long paths and
//! grids (whose top Laplacian eigenvalues cluster) converge in a few restarts
//! where power iteration stalls.
//!
//! The normalized Laplacian I - D^{-1/2} A D^{-1/2} is positive
//! semi-definite with spectrum in [0, 2], so its largest-magnitude eigenvalue
//! is also its largest one.
//!
//! # Reference
//!
//! Lehoucq, Sorensen & Yang, "ARPACK Users' Guide", SIAM 1998, chapter 4.

use crate::error::{Error, Result};
use crate::sparse::matvec;
use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use sprs::CsMat;

/// Relative size of a Lanczos residual below which the Krylov space is invariant.
const BREAKDOWN: f64 = 1e-12;

/// Configuration for the eigen solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenConfig {
    /// Maximum Lanczos steps (matrix-vector products) over all restarts.
    pub max_iterations: usize,
    /// Relative residual tolerance `||M y - θ y|| / max(|θ|, 1)`.
    pub tolerance: f64,
    /// Seed for the start vector.
    pub seed: u64,
    /// Krylov basis size per restart; memory is `n × krylov_dim` values.
    pub krylov_dim: usize,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-8,
            seed: 42,
            krylov_dim: 128,
        }
    }
}

impl EigenConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_krylov_dim(mut self, krylov_dim: usize) -> Self {
        self.krylov_dim = krylov_dim;
        self
    }
}

fn apply(m: &CsMat<f64>, x: &DVector<f64>) -> DVector<f64> {
    DVector::from_vec(matvec(m, x.as_slice()))
}

/// Orthonormal Krylov basis and the tridiagonal projection of M onto it.
struct Krylov {
    basis: Vec<DVector<f64>>,
    /// Diagonal of T.
    alpha: Vec<f64>,
    /// Off-diagonal of T; one shorter than `alpha`.
    beta: Vec<f64>,
}

impl Krylov {
    fn is_finite(&self) -> bool {
        self.alpha.iter().chain(&self.beta).all(|v| v.is_finite())
    }

    /// Ritz pair with the largest |θ|; the Ritz vector is unit length.
    fn dominant_ritz(&self) -> (f64, DVector<f64>) {
        let size = self.alpha.len();
        let mut t = DMatrix::zeros(size, size);
        for (i, &a) in self.alpha.iter().enumerate() {
            t[(i, i)] = a;
        }
        for (i, &b) in self.beta.iter().enumerate() {
            t[(i, i + 1)] = b;
            t[(i + 1, i)] = b;
        }

        let eig = t.symmetric_eigen();
        let idx = eig.eigenvalues.iamax();
        let mut ritz = DVector::zeros(self.basis[0].len());
        for (q, &s) in self.basis.iter().zip(eig.eigenvectors.column(idx).iter()) {
            ritz.axpy(s, q, 1.0);
        }
        let norm = ritz.norm();
        if norm > 0.0 {
            ritz /= norm;
        }
        (eig.eigenvalues[idx], ritz)
    }
}

/// Run up to `steps` Lanczos steps from the unit vector `start`.
///
/// Stops early when the Krylov space becomes invariant under M.
fn lanczos(m: &CsMat<f64>, start: &DVector<f64>, steps: usize) -> Krylov {
    let mut basis = vec![start.clone()];
    let mut alpha = Vec::with_capacity(steps);
    let mut beta: Vec<f64> = Vec::with_capacity(steps);

    loop {
        let mut w = apply(m, &basis[basis.len() - 1]);
        let a = basis[basis.len() - 1].dot(&w);
        alpha.push(a);
        if alpha.len() >= steps || !a.is_finite() {
            break;
        }

        // Full Gram-Schmidt, twice; this also removes the α and β terms.
        for _ in 0..2 {
            for q in &basis {
                let c = q.dot(&w);
                w.axpy(-c, q, 1.0);
            }
        }

        let b = w.norm();
        let scale = a.abs() + beta.last().copied().unwrap_or(0.0);
        if !b.is_finite() || b <= BREAKDOWN * scale.max(1.0) {
            break;
        }
        beta.push(b);
        basis.push(w / b);
    }

    Krylov { basis, alpha, beta }
}

/// Largest-magnitude eigenvalue of a square, symmetric sparse matrix.
///
/// Returns `0.0` for the zero matrix. Fails with [`Error::Numerical`] when the
/// matrix is empty or not square, when it produces non-finite values, or
/// when the residual has not dropped below the tolerance within
/// `config.max_iterations` Lanczos steps.
///
/// # Complexity
///
/// - Time: O((nnz + n·k) × steps), k = `krylov_dim`
/// - Space: O(n·k)
pub fn largest_eigenvalue(m: &CsMat<f64>, config: &EigenConfig) -> Result<f64> {
    let n = m.rows();
    if n == 0 || m.cols() != n {
        return Err(Error::Numerical(format!(
            "eigenvalue of a {}x{} matrix is undefined",
            m.rows(),
            m.cols()
        )));
    }

    let mut rng = XorShiftRng::seed_from_u64(config.seed);
    let mut start: DVector<f64> = DVector::from_fn(n, |_, _| rng.gen::<f64>() - 0.5);
    let start_norm = start.norm();
    if start_norm == 0.0 {
        return Err(Error::Numerical("degenerate start vector".into()));
    }
    start /= start_norm;

    let dim = config.krylov_dim.clamp(1, n);
    let mut steps = 0;
    let mut restarts = 0usize;
    while steps < config.max_iterations {
        let krylov = lanczos(m, &start, dim.min(config.max_iterations - steps));
        steps += krylov.alpha.len();
        if !krylov.is_finite() {
            return Err(Error::Numerical(format!(
                "Lanczos produced non-finite values after {steps} steps"
            )));
        }

        let (theta, ritz) = krylov.dominant_ritz();
        let residual = (apply(m, &ritz) - theta * &ritz).norm();
        if residual <= config.tolerance * theta.abs().max(1.0) {
            tracing::debug!(steps, restarts, lambda = theta, residual, "Lanczos converged");
            return Ok(theta);
        }
        start = ritz;
        restarts += 1;
    }

    Err(Error::Numerical(format!(
        "Lanczos did not converge within {} steps",
        config.max_iterations
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::from_triplets;
    use crate::transform::{laplacian, Normalization};
    use approx::assert_relative_eq;

    fn ring(n: usize) -> CsMat<f64> {
        from_triplets(
            (n, n),
            (0..n).flat_map(|i| [(i, (i + 1) % n, 1.0), ((i + 1) % n, i, 1.0)]),
        )
    }

    fn path(n: usize) -> CsMat<f64> {
        from_triplets(
            (n, n),
            (1..n).flat_map(|i| [(i - 1, i, 1.0), (i, i - 1, 1.0)]),
        )
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = from_triplets((3, 3), [(0, 0, 1.0), (1, 1, 3.0), (2, 2, 2.0)]);
        let lambda = largest_eigenvalue(&m, &EigenConfig::default()).unwrap();
        assert_relative_eq!(lambda, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_dominant_eigenvalue() {
        let m = from_triplets((2, 2), [(0, 0, -4.0), (1, 1, 1.0)]);
        let lambda = largest_eigenvalue(&m, &EigenConfig::default()).unwrap();
        assert_relative_eq!(lambda, -4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_path_laplacian_reaches_two() {
        // Normalized Laplacian of the path a-b-c-d: spectrum {0, 0.5, 1.5, 2}.
        let s = 1.0 / 2f64.sqrt();
        let m = from_triplets(
            (4, 4),
            [
                (0, 0, 1.0), (0, 1, -s),
                (1, 0, -s), (1, 1, 1.0), (1, 2, -0.5),
                (2, 1, -0.5), (2, 2, 1.0), (2, 3, -s),
                (3, 2, -s), (3, 3, 1.0),
            ],
        );
        let lambda = largest_eigenvalue(&m, &EigenConfig::default()).unwrap();
        assert_relative_eq!(lambda, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_small_gap_laplacians_converge() {
        // Top eigenvalues of even rings and paths cluster near 2.
        for adj in [ring(200), ring(1000), path(300)] {
            let lap = laplacian(&adj, Normalization::Symmetric).unwrap();
            let lambda = largest_eigenvalue(&lap, &EigenConfig::default()).unwrap();
            assert_relative_eq!(lambda, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_odd_ring_degenerate_top_eigenvalue() {
        // n = 201: λ_max = 1 - cos(200π/201) has multiplicity two.
        let lap = laplacian(&ring(201), Normalization::Symmetric).unwrap();
        let expected = 1.0 - (200.0 * std::f64::consts::PI / 201.0).cos();
        let lambda = largest_eigenvalue(&lap, &EigenConfig::default()).unwrap();
        assert_relative_eq!(lambda, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_matrix() {
        let m = from_triplets((3, 3), std::iter::empty());
        assert_eq!(largest_eigenvalue(&m, &EigenConfig::default()).unwrap(), 0.0);
    }

    #[test]
    fn test_iteration_limit_exhausted() {
        let m = from_triplets((2, 2), [(0, 0, 1.0), (1, 1, 0.999)]);
        let config = EigenConfig::default().with_max_iterations(1);
        assert!(matches!(largest_eigenvalue(&m, &config), Err(Error::Numerical(_))));
    }

    #[test]
    fn test_non_finite_entries_rejected() {
        let m = from_triplets((2, 2), [(0, 0, f64::NAN), (1, 1, 1.0)]);
        assert!(matches!(
            largest_eigenvalue(&m, &EigenConfig::default()),
            Err(Error::Numerical(_))
        ));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let m = from_triplets((0, 0), std::iter::empty());
        assert!(largest_eigenvalue(&m, &EigenConfig::default()).is_err());
    }
}
