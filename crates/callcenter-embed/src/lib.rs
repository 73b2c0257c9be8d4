//! Sentence embeddings for the dataset and chunk lookups.
//!
//! `MiniLmEmbedder` runs a sentence-transformers BERT checkpoint
//! (all-MiniLM-L6-v2 by default) with masked mean pooling and L2
//! normalization. `FakeEmbedder` hashes tokens into a fixed-size vector and
//! is selected with `APP_USE_FAKE_EMBEDDINGS=1` for tests and development.

use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use callcenter_core::traits::Embedder;

pub mod device;
pub mod encode;
pub mod pool;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use encode::{encode_text, EncodedText};

pub const FAKE_EMBEDDING_DIM: usize = 384;
const DEFAULT_MAX_LEN: usize = 256;

#[derive(Deserialize)]
struct ModelShape {
    hidden_size: usize,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl MiniLmEmbedder {
    /// Load `config.json`, `tokenizer.json` and the weights
    /// (`model.safetensors`, or `pytorch_model.bin`) from `model_dir`.
    pub fn new(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let shape: ModelShape = serde_json::from_str(&raw_config)?;
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let max_len = shape.max_position_embeddings.unwrap_or(DEFAULT_MAX_LEN).min(DEFAULT_MAX_LEN);
        tracing::info!(dim = shape.hidden_size, max_len, "sentence embedding model ready");
        Ok(Self { model, tokenizer, device, dim: shape.hidden_size, max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let enc = encode_text(&self.tokenizer, text, self.max_len, &self.device)?;
        if enc.dropped > 0 {
            tracing::debug!(dropped = enc.dropped, max_len = self.max_len, "input truncated");
        }
        let token_type_ids = enc.input_ids.zeros_like()?;
        let hidden = self.model.forward(&enc.input_ids, &token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != self.dim {
            return Err(anyhow!("embedding has {} dims, model reports {}", v.len(), self.dim));
        }
        Ok(v)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device)? };
        return Ok(vb);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights_map, DTYPE, device));
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin under {}", model_dir.display()))
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// Bag-of-tokens hashing embedder. Identical texts map to identical unit
/// vectors and texts sharing words land close together.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        callcenter_core::similarity::normalized(v)
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// The embedder used at runtime: the BERT model under `model_dir`, unless
/// `APP_USE_FAKE_EMBEDDINGS` is set.
pub fn get_default_embedder(model_dir: &Path) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake { tracing::warn!("using FakeEmbedder"); return Ok(Box::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM))); }
    Ok(Box::new(MiniLmEmbedder::new(&resolve_model_dir(model_dir)?)?))
}

fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { tracing::info!(dir = %p.display(), "using APP_MODEL_DIR"); return Ok(p); } }
    if configured.exists() { return Ok(configured.to_path_buf()); }
    Err(anyhow!("Could not locate embedding model directory {}", configured.display()))
}
