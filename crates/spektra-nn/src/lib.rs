#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

//! Forward-only GCN layers and masked objectives over spektra feed bundles.
//!
//! - [`layers`]: [`GraphConv`] (one weight per support) and
//!   [`InnerProductDecoder`]
//! - [`model`]: [`GcnModel`] for `gcn`, `gcn_poly` and `gcn_ae`
//! - [`objective`]: [`MaskedObjective`] with train / eval reduction and
//!   exact weighted AUC
//!
//! There is no optimizer here; models are evaluated with whatever weights
//! their `VarBuilder` provides.

mod error;
pub mod layers;
pub mod model;
pub mod objective;
pub mod tensor;

pub use error::{Error, Result};
pub use layers::{Activation, GraphConv, InnerProductDecoder};
pub use model::GcnModel;
pub use objective::{weighted_auc, MaskedObjective, Metrics, ObjectiveMode};
pub use tensor::BundleTensors;
