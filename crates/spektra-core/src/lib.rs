// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

//! Graph store and spectral preprocessing for Graph Convolutional Networks.
//!
//! This crate turns flat text datasets (edges, labels, features) into the
//! sparse operators a GCN consumes:
//!
//! - [`GraphStore`] - node/label id maps, k-hot labels, features, adjacency
//! - [`transform`] - symmetrization, self-loops, the renormalization trick,
//!   Chebyshev bases of the scaled Laplacian
//! - [`eigen`] - largest-magnitude eigenvalue of a sparse symmetric matrix
//! - [`support`] - model-kind dispatch to the support list a model receives
//!
//! # The Renormalization Trick
//!
//! Kipf & Welling replace the spectral filter with a first-order
//! approximation and renormalize the propagation operator:
//!
//! ```text
//! Â = D̃^{-1/2} (A + I) D̃^{-1/2},    D̃_ii = Σ_j (A + I)_ij
//! ```
//!
//! Self-loops keep each node's own features in the aggregation; the symmetric
//! scaling keeps repeated propagation numerically stable (eigenvalues of Â lie
//! in (-1, 1]).
//!
//! # Chebyshev Supports
//!
//! ChebNet (Defferrard et al., 2016) keeps K polynomial terms instead:
//!
//! ```text
//! L  = I - D^{-1/2} A D^{-1/2}
//! L̃  = 2L / λ_max - I
//! T_0 = I,  T_1 = L̃,  T_k = 2 L̃ T_{k-1} - T_{k-2}
//! ```
//!
//! # Dataset Layout
//!
//! ```text
//! <data_dir>/<dataset>/label.txt     node label         (one pair per line)
//! <data_dir>/<dataset>/feature.txt   node f1 f2 ... fd  (optional)
//! <data_dir>/<dataset>/network.txt   node_a node_b [w]
//! ```
//!
//! # Example
//!
//! ```rust
//! use spektra_core::formats::{EdgeRecord, LabelRecord};
//! use spektra_core::{transform, GraphOptions, GraphStore};
//!
//! let labels = [LabelRecord::new("a", "x"), LabelRecord::new("b", "x"), LabelRecord::new("c", "y")];
//! let edges = [EdgeRecord::new("a", "b"), EdgeRecord::new("b", "c")];
//! let store = GraphStore::from_records(&labels, None, &edges, &GraphOptions::default()).unwrap();
//!
//! assert_eq!(store.node_count(), 3);
//! let support = transform::transform(store.adjacency()).unwrap();
//! assert_eq!(support.rows(), 3);
//! ```

pub mod eigen;
mod error;
pub mod formats;
mod graph;
pub mod sparse;
pub mod support;
pub mod transform;

pub use eigen::EigenConfig;
pub use error::{Error, Result};
pub use graph::{
    generate_features, load_features, load_labels, load_network, FeatureAlignment, Features,
    GraphOptions, GraphStore, IdMap, LabelIndex, Network,
};
pub use sparse::SparseTensor;
pub use support::{compute_supports, ModelKind, SupportStrategy};
pub use transform::Normalization;
