//! Node-attributed graph loaded from label, feature and edge files.
//!
//! Loading is staged so the type system enforces the order the data depends
//! on: labels define the node id space, features and edges are resolved
//! against it.
//!
//! ```text
//! label.txt   ──▶ LabelIndex (node ids, label ids, k-hot matrix)
//! feature.txt ──▶ Features   (rows aligned to node ids)
//! network.txt ──▶ Network    (symmetric weighted adjacency)
//!                     │
//!                     ▼
//!                 GraphStore
//! ```

use crate::error::{Error, Result};
use crate::formats::{self, EdgeRecord, FeatureRecord, LabelRecord};
use crate::sparse::from_triplets;
use crate::transform::symmetrize;
use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Bidirectional map between raw string identifiers and dense ids.
///
/// Ids are assigned in ascending lexicographic order of the raw strings, so
/// the same input always yields the same ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    to_id: HashMap<String, usize>,
    to_raw: Vec<String>,
}

impl IdMap {
    /// Build from any collection of strings; duplicates collapse.
    pub fn from_distinct<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
        let to_raw: Vec<String> = sorted.into_iter().collect();
        let to_id = to_raw.iter().enumerate().map(|(id, raw)| (raw.clone(), id)).collect();
        Self { to_id, to_raw }
    }

    pub fn id(&self, raw: &str) -> Option<usize> {
        self.to_id.get(raw).copied()
    }

    pub fn raw(&self, id: usize) -> Option<&str> {
        self.to_raw.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_raw.is_empty()
    }

    /// `(id, raw)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.to_raw.iter().enumerate().map(|(id, raw)| (id, raw.as_str()))
    }
}

/// How rows of a feature file are matched to node ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureAlignment {
    /// Row `r` must belong to node id `r`; any other order is rejected.
    #[default]
    Strict,
    /// Each row is placed at its node's id; file order is free.
    ByNodeId,
}

/// Options for building a [`GraphStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Store features in CSR form.
    pub sparse_features: bool,
    /// Without a feature file: identity features instead of random ones.
    pub one_hot_features: bool,
    /// Without a feature file and without one-hot: random feature width.
    pub feature_dim: usize,
    /// Feature row alignment policy.
    pub feature_alignment: FeatureAlignment,
    /// Seed for generated random features (entropy when `None`).
    pub seed: Option<u64>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            sparse_features: true,
            one_hot_features: true,
            feature_dim: 100,
            feature_alignment: FeatureAlignment::Strict,
            seed: None,
        }
    }
}

impl GraphOptions {
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

    pub fn with_feature_alignment(mut self, alignment: FeatureAlignment) -> Self {
        self.feature_alignment = alignment;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Node features, dense or CSR.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    Dense(Array2<f32>),
    Sparse(CsMat<f32>),
}

impl Features {
    pub fn rows(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            Self::Sparse(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Dense(m) => m.ncols(),
            Self::Sparse(m) => m.cols(),
        }
    }

    /// Stored entries: all cells for dense features, nnz for sparse ones.
    pub fn num_elements(&self) -> usize {
        match self {
            Self::Dense(m) => m.len(),
            Self::Sparse(m) => m.nnz(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Dense copy.
    pub fn to_dense(&self) -> Array2<f32> {
        match self {
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => {
                let mut dense = Array2::zeros((m.rows(), m.cols()));
                crate::sparse::for_each_entry(m, |r, c, v| dense[[r, c]] = v);
                dense
            }
        }
    }

    fn from_dense(dense: Array2<f32>, sparse: bool) -> Self {
        if !sparse {
            return Self::Dense(dense);
        }
        let mut tri: TriMat<f32> = TriMat::new(dense.dim());
        for ((r, c), &v) in dense.indexed_iter() {
            if v != 0.0 {
                tri.add_triplet(r, c, v);
            }
        }
        Self::Sparse(tri.to_csr())
    }
}

/// Node and label id spaces plus the k-hot label matrix.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    nodes: IdMap,
    labels: IdMap,
    node_labels: Vec<Vec<usize>>,
    label_nodes: Vec<Vec<usize>>,
    matrix: Array2<f32>,
}

impl LabelIndex {
    /// Build id maps and the k-hot matrix from `(node, label)` records.
    pub fn from_records(records: &[LabelRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::DataIntegrity("label data contains no records".into()));
        }

        let nodes = IdMap::from_distinct(records.iter().map(|r| r.node.as_str()));
        let labels = IdMap::from_distinct(records.iter().map(|r| r.label.as_str()));

        let mut node_sets = vec![BTreeSet::new(); nodes.len()];
        let mut label_sets = vec![BTreeSet::new(); labels.len()];
        for record in records {
            let (Some(node), Some(label)) = (nodes.id(&record.node), labels.id(&record.label)) else {
                return Err(Error::DataIntegrity(format!(
                    "label record ({}, {}) missing from id maps",
                    record.node, record.label
                )));
            };
            node_sets[node].insert(label);
            label_sets[label].insert(node);
        }

        let labelled_nodes = node_sets.iter().filter(|s| !s.is_empty()).count();
        if labelled_nodes != nodes.len() {
            return Err(Error::DataIntegrity(format!(
                "{} nodes have ids but only {labelled_nodes} carry labels",
                nodes.len()
            )));
        }
        let used_labels = label_sets.iter().filter(|s| !s.is_empty()).count();
        if used_labels != labels.len() {
            return Err(Error::DataIntegrity(format!(
                "{} labels have ids but only {used_labels} are assigned to nodes",
                labels.len()
            )));
        }

        let mut matrix = Array2::zeros((nodes.len(), labels.len()));
        for (node, set) in node_sets.iter().enumerate() {
            for &label in set {
                matrix[[node, label]] = 1.0;
            }
        }

        Ok(Self {
            nodes,
            labels,
            node_labels: node_sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            label_nodes: label_sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            matrix,
        })
    }

    pub fn nodes(&self) -> &IdMap {
        &self.nodes
    }

    pub fn labels(&self) -> &IdMap {
        &self.labels
    }

    /// k-hot label matrix, one row per node id.
    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }
}

/// Symmetric weighted adjacency and the number of edge records it came from.
#[derive(Debug, Clone)]
pub struct Network {
    pub adjacency: CsMat<f64>,
    pub edge_count: usize,
}

impl Network {
    /// Resolve edge endpoints against `nodes` and symmetrize by max-merge.
    ///
    /// Repeated records for the same ordered pair are summed first.
    pub fn from_records(records: &[EdgeRecord], nodes: &IdMap) -> Result<Self> {
        let resolve = |raw: &str| {
            nodes
                .id(raw)
                .ok_or_else(|| Error::DataIntegrity(format!("edge references unknown node `{raw}`")))
        };

        let triplets = records
            .iter()
            .map(|e| Ok((resolve(&e.source)?, resolve(&e.target)?, e.value())))
            .collect::<Result<Vec<_>>>()?;

        let n = nodes.len();
        let raw = from_triplets((n, n), triplets);
        Ok(Self { adjacency: symmetrize(&raw), edge_count: records.len() })
    }
}

/// Parse `label.txt` into a [`LabelIndex`].
pub fn load_labels(path: &Path) -> Result<LabelIndex> {
    tracing::debug!(path = %path.display(), "reading labels");
    let index = LabelIndex::from_records(&formats::read_labels(path)?)?;
    tracing::info!("{} nodes read", index.nodes.len());
    tracing::info!("{} labels read", index.labels.len());
    Ok(index)
}

/// Load `feature.txt`, or generate features when `path` is `None`.
pub fn load_features(path: Option<&Path>, nodes: &IdMap, options: &GraphOptions) -> Result<Features> {
    let features = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "reading features");
            features_from_records(&formats::read_features(path)?, nodes, options)?
        }
        None => generate_features(nodes.len(), options)?,
    };
    tracing::info!("{} features read for each node", features.cols());
    Ok(features)
}

/// Parse `network.txt` into a symmetric adjacency.
pub fn load_network(path: &Path, nodes: &IdMap) -> Result<Network> {
    tracing::debug!(path = %path.display(), "reading network");
    let network = Network::from_records(&formats::read_edges(path)?, nodes)?;
    tracing::info!("{} edges read", network.edge_count);
    Ok(network)
}

/// Align parsed feature rows to node ids according to `options.feature_alignment`.
pub fn features_from_records(
    records: &[FeatureRecord],
    nodes: &IdMap,
    options: &GraphOptions,
) -> Result<Features> {
    let n = nodes.len();
    if records.len() != n {
        return Err(Error::DataIntegrity(format!(
            "missing features for some nodes: {} rows for {n} nodes",
            records.len()
        )));
    }
    let dim = records.first().map_or(0, |r| r.values.len());
    if let Some(bad) = records.iter().find(|r| r.values.len() != dim) {
        return Err(Error::DataIntegrity(format!(
            "feature row for `{}` has {} values, expected {dim}",
            bad.node,
            bad.values.len()
        )));
    }

    let mut dense = Array2::zeros((n, dim));
    let mut seen = vec![false; n];
    for (row, record) in records.iter().enumerate() {
        let id = nodes.id(&record.node).ok_or_else(|| {
            Error::DataIntegrity(format!("feature row {row} references unknown node `{}`", record.node))
        })?;
        let target = match options.feature_alignment {
            FeatureAlignment::Strict if id != row => {
                return Err(Error::DataIntegrity(format!(
                    "feature row {row} belongs to `{}` but node id {row} is `{}`",
                    record.node,
                    nodes.raw(row).unwrap_or("?")
                )));
            }
            FeatureAlignment::Strict => row,
            FeatureAlignment::ByNodeId => id,
        };
        if std::mem::replace(&mut seen[target], true) {
            return Err(Error::DataIntegrity(format!(
                "duplicate feature row for node `{}`",
                record.node
            )));
        }
        for (col, &v) in record.values.iter().enumerate() {
            dense[[target, col]] = v;
        }
    }

    Ok(Features::from_dense(dense, options.sparse_features))
}

/// Identity features (`one_hot_features`) or uniform random values in `[0, 0.5)`.
pub fn generate_features(node_count: usize, options: &GraphOptions) -> Result<Features> {
    if options.one_hot_features {
        if node_count == 0 {
            return Err(Error::DataIntegrity("one-hot features need at least one node".into()));
        }
        return Ok(if options.sparse_features {
            Features::Sparse(CsMat::eye(node_count))
        } else {
            Features::Dense(Array2::eye(node_count))
        });
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let dense = Array2::from_shape_fn((node_count, options.feature_dim), |_| rng.gen_range(0.0f32..0.5));
    Ok(Features::from_dense(dense, options.sparse_features))
}

/// Immutable, fully indexed graph dataset.
///
/// Owns plain data only, so it is `Send + Sync` and can be shared read-only.
#[derive(Debug, Clone)]
pub struct GraphStore {
    index: LabelIndex,
    features: Features,
    network: Network,
}

impl GraphStore {
    /// Load `<data_dir>/<dataset_name>/{label,feature,network}.txt`.
    ///
    /// `feature.txt` is optional; when absent, features are generated.
    pub fn load(data_dir: impl AsRef<Path>, dataset_name: &str, options: &GraphOptions) -> Result<Self> {
        let root = data_dir.as_ref().join(dataset_name);
        tracing::info!(path = %root.display(), "reading dataset");

        let index = load_labels(&root.join("label.txt"))?;
        let feature_path = root.join("feature.txt");
        let feature_path = feature_path.is_file().then_some(feature_path.as_path());
        let features = load_features(feature_path, &index.nodes, options)?;
        let network = load_network(&root.join("network.txt"), &index.nodes)?;

        Self::from_parts(index, features, network)
    }

    /// Build from in-memory records with the same validation as [`GraphStore::load`].
    pub fn from_records(
        labels: &[LabelRecord],
        features: Option<&[FeatureRecord]>,
        edges: &[EdgeRecord],
        options: &GraphOptions,
    ) -> Result<Self> {
        let index = LabelIndex::from_records(labels)?;
        let features = match features {
            Some(rows) => features_from_records(rows, &index.nodes, options)?,
            None => generate_features(index.nodes.len(), options)?,
        };
        let network = Network::from_records(edges, &index.nodes)?;
        Self::from_parts(index, features, network)
    }

    /// Assemble validated parts.
    pub fn from_parts(index: LabelIndex, features: Features, network: Network) -> Result<Self> {
        let n = index.nodes.len();
        if features.rows() != n {
            return Err(Error::DataIntegrity(format!(
                "missing features for some nodes: {} rows for {n} nodes",
                features.rows()
            )));
        }
        if network.adjacency.rows() != n || network.adjacency.cols() != n {
            return Err(Error::DataIntegrity(format!(
                "adjacency is {}x{} for {n} nodes",
                network.adjacency.rows(),
                network.adjacency.cols()
            )));
        }
        Ok(Self { index, features, network })
    }

    pub fn node_count(&self) -> usize {
        self.index.nodes.len()
    }

    pub fn label_count(&self) -> usize {
        self.index.labels.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.features.cols()
    }

    /// Number of edge records read (before symmetrization).
    pub fn edge_count(&self) -> usize {
        self.network.edge_count
    }

    pub fn node_ids(&self) -> &IdMap {
        &self.index.nodes
    }

    pub fn label_ids(&self) -> &IdMap {
        &self.index.labels
    }

    /// Label ids held by `node`, ascending.
    pub fn labels_of(&self, node: usize) -> &[usize] {
        self.index.node_labels.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node ids holding `label`, ascending.
    pub fn nodes_with_label(&self, label: usize) -> &[usize] {
        self.index.label_nodes.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// k-hot label matrix (`node_count x label_count`).
    pub fn labels(&self) -> &Array2<f32> {
        &self.index.matrix
    }

    /// Symmetric weighted adjacency (`node_count x node_count`).
    pub fn adjacency(&self) -> &CsMat<f64> {
        &self.network.adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Vec<LabelRecord> {
        pairs.iter().map(|(n, l)| LabelRecord::new(*n, *l)).collect()
    }

    #[test]
    fn test_id_map_sorted_and_deduplicated() {
        let map = IdMap::from_distinct(["c", "a", "b", "a"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.id("a"), Some(0));
        assert_eq!(map.id("c"), Some(2));
        assert_eq!(map.raw(1), Some("b"));
        assert_eq!(map.id("z"), None);
    }

    #[test]
    fn test_multi_label_k_hot() {
        let index = LabelIndex::from_records(&labels(&[("n1", "x"), ("n1", "y"), ("n2", "y")])).unwrap();
        let m = index.matrix();
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m.row(0).to_vec(), vec![1.0, 1.0]);
        assert_eq!(m.row(1).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_empty_labels_rejected() {
        assert!(matches!(LabelIndex::from_records(&[]), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_strict_feature_alignment() {
        let nodes = IdMap::from_distinct(["a", "b"]);
        let options = GraphOptions::default().with_sparse_features(false);
        let ordered = [FeatureRecord::new("a", vec![1.0]), FeatureRecord::new("b", vec![2.0])];
        let features = features_from_records(&ordered, &nodes, &options).unwrap();
        assert_eq!(features.to_dense()[[1, 0]], 2.0);

        let swapped = [FeatureRecord::new("b", vec![2.0]), FeatureRecord::new("a", vec![1.0])];
        assert!(matches!(
            features_from_records(&swapped, &nodes, &options),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_by_node_id_alignment() {
        let nodes = IdMap::from_distinct(["a", "b"]);
        let options = GraphOptions::default().with_feature_alignment(FeatureAlignment::ByNodeId);
        let swapped = [FeatureRecord::new("b", vec![2.0, 0.0]), FeatureRecord::new("a", vec![1.0, 0.0])];
        let features = features_from_records(&swapped, &nodes, &options).unwrap();
        assert!(features.is_sparse());
        assert_eq!(features.num_elements(), 2);
        assert_eq!(features.to_dense()[[0, 0]], 1.0);

        let duplicated = [FeatureRecord::new("a", vec![1.0, 0.0]), FeatureRecord::new("a", vec![1.0, 0.0])];
        assert!(features_from_records(&duplicated, &nodes, &options).is_err());
    }

    #[test]
    fn test_feature_row_count_mismatch() {
        let nodes = IdMap::from_distinct(["a", "b"]);
        let rows = [FeatureRecord::new("a", vec![1.0])];
        assert!(matches!(
            features_from_records(&rows, &nodes, &GraphOptions::default()),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_generated_random_features() {
        let options = GraphOptions::default()
            .with_one_hot_features(false)
            .with_sparse_features(false)
            .with_feature_dim(7)
            .with_seed(3);
        let features = generate_features(5, &options).unwrap();
        assert_eq!((features.rows(), features.cols()), (5, 7));
        assert!(features.to_dense().iter().all(|&v| (0.0..0.5).contains(&v)));
        assert_eq!(features, generate_features(5, &options).unwrap());
    }

    #[test]
    fn test_one_hot_requires_nodes() {
        assert!(generate_features(0, &GraphOptions::default()).is_err());
    }

    #[test]
    fn test_unknown_edge_endpoint() {
        let nodes = IdMap::from_distinct(["a", "b"]);
        let edges = [EdgeRecord::new("a", "ghost")];
        assert!(matches!(Network::from_records(&edges, &nodes), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_weighted_network_max_merge() {
        let nodes = IdMap::from_distinct(["a", "b", "c"]);
        let edges = [
            EdgeRecord::weighted("a", "b", 0.5),
            EdgeRecord::weighted("b", "a", 2.0),
            EdgeRecord::weighted("b", "c", 1.5),
        ];
        let network = Network::from_records(&edges, &nodes).unwrap();
        assert_eq!(network.edge_count, 3);
        assert_eq!(network.adjacency.get(0, 1), Some(&2.0));
        assert_eq!(network.adjacency.get(1, 0), Some(&2.0));
        assert_eq!(network.adjacency.get(2, 1), Some(&1.5));
    }

    #[test]
    fn test_store_accessors() {
        let store = GraphStore::from_records(
            &labels(&[("a", "x"), ("b", "x"), ("b", "y")]),
            None,
            &[EdgeRecord::new("a", "b")],
            &GraphOptions::default(),
        )
        .unwrap();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.label_count(), 2);
        assert_eq!(store.feature_dim(), 2);
        assert_eq!(store.labels_of(1), &[0, 1]);
        assert_eq!(store.nodes_with_label(0), &[0, 1]);
        assert!(store.labels_of(9).is_empty());
    }
}
