//! Graph convolution and decoder layers.
//!
//! - [`GraphConv`]: multi-support graph convolution (Kipf & Welling, 2017;
//!   Defferrard et al., 2016)
//! - [`InnerProductDecoder`]: edge logits from node embeddings (Kipf &
//!   Welling, "Variational Graph Auto-Encoders", 2016)
//!
//! ```text
//! GraphConv:            H' = σ( Σ_k S_k · drop(H) · W_k + b )
//! InnerProductDecoder:  Â  = σ( drop(Z) · drop(Z)ᵀ )
//! ```
//!
//! With a single renormalized support this is the first-order GCN layer;
//! with the Chebyshev basis `[T_0 .. T_{K-1}]` it is a ChebNet layer of
//! order K.

use crate::error::{Error, Result};
use candle_core::Tensor;
use candle_nn::{linear_no_bias, Linear, Module, VarBuilder};

/// Elementwise nonlinearity applied after aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Identity,
    Relu,
}

impl Activation {
    pub fn apply(self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Identity => Ok(x.clone()),
            Self::Relu => x.relu(),
        }
    }
}

fn apply_dropout(x: &Tensor, rate: f32) -> candle_core::Result<Tensor> {
    if rate > 0.0 {
        candle_nn::ops::dropout(x, rate)
    } else {
        Ok(x.clone())
    }
}

/// Graph convolution over a fixed number of supports.
#[derive(Debug, Clone)]
pub struct GraphConv {
    weights: Vec<Linear>,
    bias: Option<Tensor>,
    activation: Activation,
    in_features: usize,
    out_features: usize,
}

impl GraphConv {
    /// Create a layer with one weight matrix per support.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `support_count`: Number of supports the forward pass receives
    /// - `bias`: Whether to add a learned bias
    /// - `activation`: Nonlinearity applied to the aggregated output
    /// - `vb`: Variable builder for parameter initialization
    pub fn new(
        in_features: usize,
        out_features: usize,
        support_count: usize,
        bias: bool,
        activation: Activation,
        vb: VarBuilder,
    ) -> Result<Self> {
        if support_count == 0 {
            return Err(Error::dims("at least one support", 0));
        }
        let weights = (0..support_count)
            .map(|k| linear_no_bias(in_features, out_features, vb.pp(format!("support_{k}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let bias = if bias {
            Some(vb.get_with_hints(out_features, "bias", candle_nn::Init::Const(0.0))?)
        } else {
            None
        };
        Ok(Self { weights, bias, activation, in_features, out_features })
    }

    pub fn support_count(&self) -> usize {
        self.weights.len()
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `supports`: `support_count` propagation operators (N x N)
    /// - `dropout`: Rate applied to `x`; 0.0 disables it
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, x: &Tensor, supports: &[Tensor], dropout: f32) -> Result<Tensor> {
        if supports.len() != self.weights.len() {
            return Err(Error::dims(
                format!("{} supports", self.weights.len()),
                format!("{} supports", supports.len()),
            ));
        }
        let (n, d) = x.dims2()?;
        if d != self.in_features {
            return Err(Error::dims(format!("{} input features", self.in_features), format!("{d}")));
        }

        let x = apply_dropout(x, dropout)?;
        let mut out = Tensor::zeros((n, self.out_features), x.dtype(), x.device())?;
        for (support, weight) in supports.iter().zip(&self.weights) {
            // S_k · (X W_k)
            let h = weight.forward(&x)?;
            out = (out + support.matmul(&h)?)?;
        }
        if let Some(bias) = &self.bias {
            out = out.broadcast_add(bias)?;
        }
        Ok(self.activation.apply(&out)?)
    }
}

/// Reconstructs adjacency logits as `Z Zᵀ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerProductDecoder {
    activation: Activation,
}

impl InnerProductDecoder {
    pub fn new(activation: Activation) -> Self {
        Self { activation }
    }

    /// `z`: node embeddings (N x d). Returns N x N logits.
    pub fn forward(&self, z: &Tensor, dropout: f32) -> Result<Tensor> {
        let z = apply_dropout(z, dropout)?;
        let logits = z.matmul(&z.t()?.contiguous()?)?;
        Ok(self.activation.apply(&logits)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_graph_conv_forward_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = GraphConv::new(8, 4, 2, true, Activation::Relu, vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (5, 8), &device).unwrap();
        let supports = vec![Tensor::eye(5, DType::F32, &device).unwrap(); 2];

        let out = conv.forward(&x, &supports, 0.0).unwrap();
        assert_eq!(out.dims(), &[5, 4]);
        let values = out.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_graph_conv_support_count_mismatch() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = GraphConv::new(3, 2, 3, false, Activation::Identity, vb).unwrap();
        let x = Tensor::ones((4, 3), DType::F32, &device).unwrap();
        let supports = vec![Tensor::eye(4, DType::F32, &device).unwrap()];
        assert!(matches!(
            conv.forward(&x, &supports, 0.0),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_support_aggregates_nothing() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = GraphConv::new(3, 2, 1, false, Activation::Identity, vb).unwrap();
        let x = Tensor::ones((4, 3), DType::F32, &device).unwrap();
        let zero = Tensor::zeros((4, 4), DType::F32, &device).unwrap();
        let out = conv.forward(&x, &[zero], 0.0).unwrap();
        let sum = out.abs().unwrap().sum_all().unwrap().to_scalar::<f32>().unwrap();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn test_inner_product_decoder_is_symmetric() {
        let device = Device::Cpu;
        let z = Tensor::randn(0f32, 1f32, (6, 3), &device).unwrap();
        let logits = InnerProductDecoder::default().forward(&z, 0.0).unwrap();
        assert_eq!(logits.dims(), &[6, 6]);
        let m = logits.to_vec2::<f32>().unwrap();
        for i in 0..6 {
            for j in 0..6 {
                assert!((m[i][j] - m[j][i]).abs() < 1e-5);
            }
        }
    }
}
