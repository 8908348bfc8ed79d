//! Two-layer GCN models over feed bundles.
//!
//! | Kind | Layers | Output |
//! |------|--------|--------|
//! | `gcn`, `gcn_poly` | conv(relu) → conv | label logits (N x C) |
//! | `gcn_ae` | conv(relu) → conv → inner product | adjacency logits (N x N) |

use crate::error::{Error, Result};
use crate::layers::{Activation, GraphConv, InnerProductDecoder};
use crate::objective::{MaskedObjective, Metrics};
use crate::tensor::BundleTensors;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use spektra_core::ModelKind;
use spektra_data::{FeedBundle, InputSchema, ModelParams};

/// Forward-only GCN, Chebyshev GCN or GCN autoencoder.
#[derive(Debug, Clone)]
pub struct GcnModel {
    kind: ModelKind,
    conv1: GraphConv,
    conv2: GraphConv,
    decoder: Option<InnerProductDecoder>,
    schema: InputSchema,
}

impl GcnModel {
    /// Build layers sized from the schema and hidden sizes from `params`.
    pub fn new(params: &ModelParams, schema: &InputSchema, vb: VarBuilder) -> Result<Self> {
        let supports = schema.support_size;
        let conv1 = GraphConv::new(
            schema.feature_size,
            params.hidden_layer1_size,
            supports,
            true,
            Activation::Relu,
            vb.pp("conv1"),
        )?;

        let (conv2_out, decoder) = if params.model_kind.is_autoencoder() {
            (params.hidden_layer2_size, Some(InnerProductDecoder::new(Activation::Identity)))
        } else {
            (schema.label_size, None)
        };
        let conv2 = GraphConv::new(
            params.hidden_layer1_size,
            conv2_out,
            supports,
            !params.model_kind.is_autoencoder(),
            Activation::Identity,
            vb.pp("conv2"),
        )?;

        tracing::debug!(
            kind = %params.model_kind,
            input = schema.feature_size,
            hidden = params.hidden_layer1_size,
            output = conv2_out,
            supports,
            "model built"
        );
        Ok(Self { kind: params.model_kind, conv1, conv2, decoder, schema: schema.clone() })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Output of the last graph convolution (node embeddings for the autoencoder).
    pub fn embeddings(&self, inputs: &BundleTensors) -> Result<Tensor> {
        let h = self.conv1.forward(&inputs.features, &inputs.supports, inputs.dropout)?;
        self.conv2.forward(&h, &inputs.supports, inputs.dropout)
    }

    /// Logits with the same shape as the bundle's targets.
    pub fn forward(&self, inputs: &BundleTensors) -> Result<Tensor> {
        let z = self.embeddings(inputs)?;
        let logits = match &self.decoder {
            Some(decoder) => decoder.forward(&z, inputs.dropout)?,
            None => z,
        };
        if logits.dims() != inputs.labels.dims() {
            return Err(Error::dims(format!("{:?}", inputs.labels.dims()), format!("{:?}", logits.dims())));
        }
        Ok(logits)
    }

    /// Forward pass plus the bundle's masked objective.
    pub fn evaluate(&self, bundle: &FeedBundle, device: &Device) -> Result<Metrics> {
        let inputs = BundleTensors::from_bundle(bundle, device)?;
        let logits = self.forward(&inputs)?;
        let objective = MaskedObjective::for_bundle(bundle, &self.schema, device)?;
        let metrics = objective.evaluate(&logits, &inputs.labels)?;
        tracing::debug!(mode = %bundle.mode(), %metrics, "evaluated");
        Ok(metrics)
    }
}
