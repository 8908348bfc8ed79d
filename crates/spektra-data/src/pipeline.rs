//! Load → supports → plan → assemble, driven by [`ModelParams`].

use crate::config::ModelParams;
use crate::feed::{FeedAssembler, FeedBundle, InputSchema, Targets};
use crate::split::{Mode, SplitPlan};
use spektra_core::{GraphStore, Result};
use std::path::Path;

/// A loaded graph and its three feed bundles, built once.
#[derive(Debug, Clone)]
pub struct DataPipeline {
    store: GraphStore,
    params: ModelParams,
    feeds: FeedAssembler,
}

impl DataPipeline {
    /// Read `<data_dir>/<dataset_name>/` and prepare the bundles.
    pub fn new(params: ModelParams, data_dir: impl AsRef<Path>, dataset_name: &str) -> Result<Self> {
        params.validate()?;
        let store = GraphStore::load(data_dir, dataset_name, &params.graph_options())?;
        Self::from_store(store, params)
    }

    /// Prepare bundles for an already loaded store.
    pub fn from_store(store: GraphStore, params: ModelParams) -> Result<Self> {
        params.validate()?;
        let strategy = params.support_strategy()?;
        let supports = strategy.compute(store.adjacency(), params.normalization, &params.eigen)?;
        let plan = params.split_planner()?.plan(store.node_count());
        let feeds = FeedAssembler::assemble(
            &store,
            &supports,
            plan,
            params.dropout,
            Targets::for_model(params.model_kind),
        )?;
        Ok(Self { store, params, feeds })
    }

    pub fn feed(&self, mode: Mode) -> &FeedBundle {
        self.feeds.feed(mode)
    }

    pub fn input_slots(&self) -> &InputSchema {
        self.feeds.input_slots()
    }

    pub fn plan(&self) -> &SplitPlan {
        self.feeds.plan()
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }
}
