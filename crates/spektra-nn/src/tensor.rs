//! Conversions from feed bundle values to candle tensors.
//!
//! Candle has no sparse storage, so coordinate-list tensors are expanded to
//! dense `rows x cols` buffers here.

use candle_core::{Device, Result, Tensor};
use ndarray::{Array1, Array2};
use spektra_core::SparseTensor;
use spektra_data::{FeatureTensor, FeedBundle};

pub fn sparse_to_tensor(t: &SparseTensor, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(t.to_dense_vec(), (t.shape[0], t.shape[1]), device)
}

pub fn array2_to_tensor(m: &Array2<f32>, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(m.iter().copied().collect::<Vec<_>>(), m.dim(), device)
}

pub fn array1_to_tensor(v: &Array1<f32>, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(v.to_vec(), v.len(), device)
}

pub fn features_to_tensor(features: &FeatureTensor, device: &Device) -> Result<Tensor> {
    match features {
        FeatureTensor::Dense(m) => array2_to_tensor(m, device),
        FeatureTensor::Sparse(t) => sparse_to_tensor(t, device),
    }
}

/// One bundle's inputs on a device.
#[derive(Debug, Clone)]
pub struct BundleTensors {
    pub features: Tensor,
    pub labels: Tensor,
    pub supports: Vec<Tensor>,
    pub mask: Tensor,
    pub dropout: f32,
}

impl BundleTensors {
    pub fn from_bundle(bundle: &FeedBundle, device: &Device) -> Result<Self> {
        Ok(Self {
            features: features_to_tensor(bundle.features(), device)?,
            labels: array2_to_tensor(bundle.labels(), device)?,
            supports: bundle
                .supports()
                .iter()
                .map(|s| sparse_to_tensor(s, device))
                .collect::<Result<_>>()?,
            mask: array1_to_tensor(bundle.mask(), device)?,
            dropout: bundle.dropout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_to_dense_tensor() {
        let t = SparseTensor { indices: vec![[0, 1], [1, 0]], values: vec![2.0, 3.0], shape: [2, 3] };
        let dense = sparse_to_tensor(&t, &Device::Cpu).unwrap();
        assert_eq!(dense.to_vec2::<f32>().unwrap(), vec![vec![0.0, 2.0, 0.0], vec![3.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_array_layout_preserved() {
        let m = Array2::from_shape_vec((2, 2), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let t = array2_to_tensor(&m.t().to_owned(), &Device::Cpu).unwrap();
        assert_eq!(t.to_vec2::<f32>().unwrap(), vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }
}
