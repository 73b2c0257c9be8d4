//! Fine-tuned TinyLlama chat model behind [`GenerativeModel`].
//!
//! Decoding is greedy: the same prompt always yields the same answer.
//! A repetition penalty over every token seen so far keeps the small model
//! from looping. The LoRA adapter is expected to be merged into the
//! safetensors weights before they reach this crate.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig};
use candle_transformers::utils::apply_repeat_penalty;
use tokenizers::Tokenizer;

use callcenter_core::traits::GenerativeModel;
use callcenter_core::types::GenerationParams;
use callcenter_embed::select_device;

const EOS_TOKEN: &str = "</s>";
const DTYPE: DType = DType::F32;

pub struct TinyLlamaGenerator { model: Llama, config: Config, tokenizer: Tokenizer, device: Device, eos_token_id: Option<u32> }

impl TinyLlamaGenerator {
    /// Load `config.json`, `tokenizer.json` and every `*.safetensors` shard
    /// under `model_dir`.
    pub fn new(model_dir: &Path) -> Result<Self> {
        if !model_dir.exists() {
            return Err(callcenter_core::Error::NotFound(format!("generator model directory {}", model_dir.display())).into());
        }
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading generator");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let llama_config: LlamaConfig = serde_json::from_slice(&std::fs::read(&config_path)?)?;
        let config = llama_config.into_config(false);
        let weights = weight_files(model_dir)?;
        // SAFETY: the shards are opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DTYPE, &device)? };
        let model = Llama::load(vb, &config)?;
        let eos_token_id = tokenizer.token_to_id(EOS_TOKEN);
        if eos_token_id.is_none() {
            tracing::warn!("tokenizer has no {EOS_TOKEN}; generation will always run to the token budget");
        }
        tracing::info!(shards = weights.len(), "generator ready");
        Ok(Self { model, config, tokenizer, device, eos_token_id })
    }
}

/// Safetensors shards under `dir`, in name order.
pub fn weight_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("safetensors"))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(callcenter_core::Error::NotFound(format!("*.safetensors under {}", dir.display())).into());
    }
    Ok(files)
}

/// Fails when the prompt plus the generation budget would run past the
/// model's position table.
pub fn check_context_budget(prompt_len: usize, max_new_tokens: usize, max_positions: usize) -> Result<()> {
    if prompt_len + max_new_tokens > max_positions {
        return Err(anyhow!(
            "prompt is {prompt_len} tokens; with {max_new_tokens} new tokens it exceeds the model context of {max_positions}"
        ));
    }
    Ok(())
}

impl GenerativeModel for TinyLlamaGenerator {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?
            .get_ids()
            .to_vec();
        let prompt_len = tokens.len();
        check_context_budget(prompt_len, params.max_new_tokens, self.config.max_position_embeddings)?;
        let mut cache = Cache::new(true, DTYPE, &self.config, &self.device)?;
        let mut logits_processor = LogitsProcessor::from_sampling(0, Sampling::ArgMax);
        let mut index_pos = 0usize;

        for step in 0..params.max_new_tokens {
            let context_size = if step > 0 { 1 } else { tokens.len() };
            let ctxt = &tokens[tokens.len().saturating_sub(context_size)..];
            let input = Tensor::new(ctxt, &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, index_pos, &mut cache)?;
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = if (params.repetition_penalty - 1.0).abs() < f32::EPSILON {
                logits
            } else {
                apply_repeat_penalty(&logits, params.repetition_penalty, &tokens)?
            };
            index_pos += ctxt.len();

            let next = logits_processor.sample(&logits)?;
            if Some(next) == self.eos_token_id {
                break;
            }
            tokens.push(next);
        }
        tracing::debug!(prompt_tokens = prompt_len, new_tokens = tokens.len() - prompt_len, "generation finished");

        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow!("Detokenization failed: {}", e))
    }
}
