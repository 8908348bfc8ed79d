//! Model and pipeline parameters.

use crate::split::{SplitPlanner, DEFAULT_SPLIT_WEIGHTS};
use serde::{Deserialize, Serialize};
use spektra_core::{
    EigenConfig, Error, FeatureAlignment, GraphOptions, ModelKind, Normalization, Result,
    SupportStrategy,
};
use std::path::Path;

/// Everything needed to turn a dataset into feed bundles and size a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub model_kind: ModelKind,
    /// Number of Chebyshev terms for `gcn_poly`; ignored otherwise.
    pub support_size: usize,
    /// Dropout rate for the train bundle, in `[0, 1)`.
    pub dropout: f32,
    pub sparse_features: bool,
    pub one_hot_features: bool,
    pub feature_dim: usize,
    pub feature_alignment: FeatureAlignment,
    pub hidden_layer1_size: usize,
    pub hidden_layer2_size: usize,
    pub split_weights: [f64; 3],
    /// Seed for the split shuffle and generated features.
    pub seed: Option<u64>,
    pub normalization: Normalization,
    pub eigen: EigenConfig,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::Gcn,
            support_size: 1,
            dropout: 0.5,
            sparse_features: true,
            one_hot_features: true,
            feature_dim: 100,
            feature_alignment: FeatureAlignment::Strict,
            hidden_layer1_size: 16,
            hidden_layer2_size: 16,
            split_weights: DEFAULT_SPLIT_WEIGHTS,
            seed: None,
            normalization: Normalization::Symmetric,
            eigen: EigenConfig::default(),
        }
    }
}

impl ModelParams {
    /// Read parameters from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = spektra_core::formats::read_text(path)?;
        let params: Self = serde_json::from_str(&text).map_err(|e| Error::Parse {
            origin: path.display().to_string(),
            line: e.line(),
            message: e.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Pretty-printed JSON accepted by [`ModelParams::from_json_file`].
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("failed to serialize parameters: {e}")))
    }

    pub fn with_model_kind(mut self, kind: ModelKind) -> Self {
        self.model_kind = kind;
        self
    }

    pub fn with_support_size(mut self, support_size: usize) -> Self {
        self.support_size = support_size;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_sparse_features(mut self, sparse: bool) -> Self {
        self.sparse_features = sparse;
        self
    }

    pub fn with_one_hot_features(mut self, one_hot: bool) -> Self {
        self.one_hot_features = one_hot;
        self
    }

    pub fn with_feature_dim(mut self, dim: usize) -> Self {
        self.feature_dim = dim;
        self
    }

    pub fn with_hidden_sizes(mut self, layer1: usize, layer2: usize) -> Self {
        self.hidden_layer1_size = layer1;
        self.hidden_layer2_size = layer2;
        self
    }

    pub fn with_split_weights(mut self, weights: [f64; 3]) -> Self {
        self.split_weights = weights;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Reject combinations no pipeline stage could honour.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::Configuration(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.hidden_layer1_size == 0 || self.hidden_layer2_size == 0 {
            return Err(Error::Configuration("hidden layer sizes must be positive".into()));
        }
        if !self.one_hot_features && self.feature_dim == 0 {
            return Err(Error::Configuration(
                "feature_dim must be positive when random features are generated".into(),
            ));
        }
        if self.normalization != Normalization::Symmetric {
            return Err(Error::Configuration(format!(
                "{:?} normalization is not supported",
                self.normalization
            )));
        }
        self.support_strategy()?;
        self.split_planner()?;
        Ok(())
    }

    pub fn support_strategy(&self) -> Result<SupportStrategy> {
        self.model_kind.support_strategy(self.support_size)
    }

    pub fn split_planner(&self) -> Result<SplitPlanner> {
        Ok(SplitPlanner::new(self.split_weights)?.with_seed(self.seed))
    }

    /// Options for loading the graph store under these parameters.
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            sparse_features: self.sparse_features,
            one_hot_features: self.one_hot_features,
            feature_dim: self.feature_dim,
            feature_alignment: self.feature_alignment,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        ModelParams::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_dropout() {
        let params = ModelParams::default().with_dropout(1.0);
        assert!(matches!(params.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_poly_requires_support_size() {
        let params = ModelParams::default()
            .with_model_kind(ModelKind::GcnPoly)
            .with_support_size(0);
        assert!(params.validate().is_err());
        assert_eq!(
            params.with_support_size(3).support_strategy().unwrap(),
            SupportStrategy::Chebyshev { degree: 2 }
        );
    }

    #[test]
    fn test_json_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model_kind": "gcn_ae", "dropout": 0.1, "seed": 5 }}"#).unwrap();
        let params = ModelParams::from_json_file(file.path()).unwrap();
        assert_eq!(params.model_kind, ModelKind::GcnAe);
        assert_eq!(params.seed, Some(5));
        assert_eq!(params.hidden_layer1_size, 16);
    }

    #[test]
    fn test_json_roundtrip_and_errors() {
        let params = ModelParams::default().with_seed(3).with_hidden_sizes(8, 4);
        let json = params.to_json().unwrap();
        assert!(json.contains("\"hidden_layer2_size\": 4"));
        let back: ModelParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);

        let mut saved = tempfile::NamedTempFile::new().unwrap();
        saved.write_all(json.as_bytes()).unwrap();
        assert_eq!(ModelParams::from_json_file(saved.path()).unwrap(), params);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"model_kind\": \"gcn_cheby\" }}").unwrap();
        assert!(matches!(ModelParams::from_json_file(file.path()), Err(Error::Parse { .. })));
    }
}
