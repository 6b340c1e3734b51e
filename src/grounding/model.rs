//! The grounding network and the seam the engine drives it through.

use std::path::{Path, PathBuf};

use candle_core::{D, DType, Device, Result, Tensor};
use candle_nn::{LayerNorm, Linear, Module, VarBuilder, layer_norm, linear};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::GroundingError;
use super::types::{GroundingInput, GroundingTensors};
use crate::constants::{CLIP_EMBEDDING_DIM, TEF_CHANNELS};

const MASK_PENALTY: f64 = 1e4;

/// A trained grounding model. Implementations must not mutate parameters in
/// `forward`; the engine shares one instance across all requests.
pub trait GroundingModel: Send + Sync {
    fn forward(&self, input: &GroundingInput) -> Result<GroundingTensors>;

    /// Device inputs must be placed on.
    fn device(&self) -> &Device;

    /// Feature dimension expected for video rows (before TEF) and text.
    fn input_dim(&self) -> usize;
}

/// Network dimensions, read from `config.json` next to the checkpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroundingNetConfig {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub layer_norm_eps: f64,
}

impl Default for GroundingNetConfig {
    fn default() -> Self {
        Self {
            input_dim: CLIP_EMBEDDING_DIM,
            hidden_dim: 256,
            layer_norm_eps: 1e-5,
        }
    }
}

impl GroundingNetConfig {
    /// Reads `config.json` beside `checkpoint`, or defaults when absent.
    pub fn for_checkpoint(checkpoint: &Path) -> std::result::Result<Self, GroundingError> {
        let path = config_path_for(checkpoint);
        if !path.is_file() {
            debug!(path = %path.display(), "No network config found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| GroundingError::ModelLoadFailed {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;
        serde_json::from_str(&content).map_err(|e| GroundingError::ModelLoadFailed {
            reason: format!("failed to parse {}: {}", path.display(), e),
        })
    }
}

fn config_path_for(checkpoint: &Path) -> PathBuf {
    checkpoint
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("config.json")
}

struct InputProjection {
    norm: LayerNorm,
    proj: Linear,
}

impl InputProjection {
    fn load(in_dim: usize, out_dim: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            norm: layer_norm(in_dim, eps, vb.pp("norm"))?,
            proj: linear(in_dim, out_dim, vb.pp("proj"))?,
        })
    }
}

impl Module for InputProjection {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.proj.forward(&self.norm.forward(xs)?)?.relu()
    }
}

struct Mlp {
    layers: Vec<Linear>,
}

impl Mlp {
    fn load(dims: &[usize], vb: VarBuilder) -> Result<Self> {
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| linear(w[0], w[1], vb.pp(format!("layers.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layers })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let last = self.layers.len().saturating_sub(1);
        let mut xs = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i < last {
                xs = xs.relu()?;
            }
        }
        Ok(xs)
    }
}

/// Single-layer query-conditioned grounding network.
///
/// Video clips attend to the query, then three heads read the fused clip
/// features: a span confidence per clip, a `(start, end)` offset pair around
/// the clip center, and a saliency score against the pooled query.
///
/// This is its own architecture. Checkpoints must be safetensors files whose
/// tensor names match [`GroundingNet::new`] (`vid_proj.*`, `txt_proj.*`,
/// `cross_attn.*`, `fuse_norm.*`, `class_head.*`, `span_head.*`,
/// `saliency_vid.*`, `saliency_txt.*`). PyTorch `.ckpt` files and UniVTG
/// weights are not loadable; a checkpoint missing any expected tensor fails
/// [`GroundingNet::load`] with `ModelLoadFailed`.
pub struct GroundingNet {
    vid_proj: InputProjection,
    txt_proj: InputProjection,
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    fuse_norm: LayerNorm,
    class_head: Linear,
    span_head: Mlp,
    saliency_vid: Linear,
    saliency_txt: Linear,
    span_sign: Tensor,
    config: GroundingNetConfig,
    device: Device,
}

impl std::fmt::Debug for GroundingNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundingNet")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish()
    }
}

impl GroundingNet {
    pub fn new(vb: VarBuilder, config: GroundingNetConfig) -> Result<Self> {
        let h = config.hidden_dim;
        let eps = config.layer_norm_eps;
        let device = vb.device().clone();

        Ok(Self {
            vid_proj: InputProjection::load(
                config.input_dim + TEF_CHANNELS,
                h,
                eps,
                vb.pp("vid_proj"),
            )?,
            txt_proj: InputProjection::load(config.input_dim, h, eps, vb.pp("txt_proj"))?,
            q_proj: linear(h, h, vb.pp("cross_attn.q_proj"))?,
            k_proj: linear(h, h, vb.pp("cross_attn.k_proj"))?,
            v_proj: linear(h, h, vb.pp("cross_attn.v_proj"))?,
            out_proj: linear(h, h, vb.pp("cross_attn.out_proj"))?,
            fuse_norm: layer_norm(h, eps, vb.pp("fuse_norm"))?,
            class_head: linear(h, 1, vb.pp("class_head"))?,
            span_head: Mlp::load(&[h, h, h, 2], vb.pp("span_head"))?,
            saliency_vid: linear(h, h, vb.pp("saliency_vid"))?,
            saliency_txt: linear(h, h, vb.pp("saliency_txt"))?,
            span_sign: Tensor::new(&[-1f32, 1f32], &device)?,
            config,
            device,
        })
    }

    /// Loads weights from a safetensors checkpoint onto `device`.
    pub fn load(checkpoint: &Path, device: &Device) -> std::result::Result<Self, GroundingError> {
        let config = GroundingNetConfig::for_checkpoint(checkpoint)?;

        // SAFETY: the checkpoint is opened read-only and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[checkpoint.to_path_buf()], DType::F32, device)
        }
        .map_err(|e| GroundingError::ModelLoadFailed {
            reason: format!("failed to map {}: {}", checkpoint.display(), e),
        })?;

        let net = Self::new(vb, config).map_err(|e| GroundingError::ModelLoadFailed {
            reason: format!("failed to build network from {}: {}", checkpoint.display(), e),
        })?;

        info!(
            checkpoint = %checkpoint.display(),
            input_dim = net.config.input_dim,
            hidden_dim = net.config.hidden_dim,
            "Grounding network loaded"
        );
        Ok(net)
    }

    pub fn config(&self) -> &GroundingNetConfig {
        &self.config
    }
}

impl GroundingModel for GroundingNet {
    fn forward(&self, input: &GroundingInput) -> Result<GroundingTensors> {
        let scale = (self.config.hidden_dim as f64).sqrt();

        let vid = self.vid_proj.forward(&input.video)?;
        let txt = self.txt_proj.forward(&input.text)?;

        let q = self.q_proj.forward(&vid)?;
        let k = self.k_proj.forward(&txt)?;
        let v = self.v_proj.forward(&txt)?;

        let scores = (q.matmul(&k.transpose(1, 2)?.contiguous()?)? / scale)?;
        let bias = ((input.text_mask.to_dtype(DType::F32)? - 1.0)? * MASK_PENALTY)?.unsqueeze(1)?;
        let attn = candle_nn::ops::softmax_last_dim(&scores.broadcast_add(&bias)?)?;
        let attended = self.out_proj.forward(&attn.matmul(&v)?)?;

        let video_mask = input.video_mask.to_dtype(DType::F32)?.unsqueeze(D::Minus1)?;
        let fused = self
            .fuse_norm
            .forward(&(vid + attended)?)?
            .broadcast_mul(&video_mask)?;

        let logits = self.class_head.forward(&fused)?.squeeze(D::Minus1)?;

        let spans = candle_nn::ops::sigmoid(&self.span_head.forward(&fused)?)?
            .broadcast_mul(&self.span_sign)?;

        let pooled = txt.mean_keepdim(1)?;
        let sal_txt = self.saliency_txt.forward(&pooled)?;
        let sal_vid = self.saliency_vid.forward(&fused)?;
        let saliency = (sal_vid.broadcast_mul(&sal_txt)?.sum(D::Minus1)? / scale)?;

        Ok(GroundingTensors {
            logits,
            spans,
            saliency,
        })
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn input_dim(&self) -> usize {
        self.config.input_dim
    }
}
