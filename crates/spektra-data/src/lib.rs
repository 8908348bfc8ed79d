#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

//! Split planning and per-split feed bundles for GCN training.
//!
//! Given a [`GraphStore`](spektra_core::GraphStore) and its supports, this
//! crate shuffles the nodes once, carves the shuffled order into
//! train / validation / test blocks and packages everything a model needs
//! into one [`FeedBundle`] per split.
//!
//! ```text
//! GraphStore ──▶ supports ──┐
//!      │                    ▼
//!      └──▶ SplitPlanner ─▶ FeedAssembler ─▶ FeedBundle { Train | Validation | Test }
//!                                          └▶ InputSchema
//! ```
//!
//! The three bundles share features, labels and supports; only the mask, the
//! dropout rate and the mode differ.
//!
//! # Example
//!
//! ```rust
//! use spektra_core::formats::{EdgeRecord, LabelRecord};
//! use spektra_core::{GraphOptions, GraphStore};
//! use spektra_data::{DataPipeline, Mode, ModelParams};
//!
//! let labels: Vec<_> = (0..10).map(|i| LabelRecord::new(format!("n{i}"), if i % 2 == 0 { "even" } else { "odd" })).collect();
//! let edges: Vec<_> = (0..9).map(|i| EdgeRecord::new(format!("n{i}"), format!("n{}", i + 1))).collect();
//! let store = GraphStore::from_records(&labels, None, &edges, &GraphOptions::default()).unwrap();
//!
//! let params = ModelParams::default().with_split_weights([6.0, 2.0, 2.0]).with_seed(7);
//! let pipeline = DataPipeline::from_store(store, params).unwrap();
//! assert_eq!(pipeline.feed(Mode::Train).mask_sum(), 6.0);
//! ```

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod split;

pub use config::ModelParams;
pub use feed::{FeatureTensor, FeedAssembler, FeedBundle, InputSchema, Slot, SlotValue, Targets};
pub use pipeline::DataPipeline;
pub use split::{plan, Mode, SplitPlan, SplitPlanner, DEFAULT_SPLIT_WEIGHTS};
