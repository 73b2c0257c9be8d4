use anyhow::{anyhow, ensure, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Model inputs for one text, both shaped `[1, T]`.
pub struct EncodedText {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    /// Tokens dropped to fit `max_len`.
    pub dropped: usize,
}

/// Tokenize with special tokens and keep at most `max_len` of them. No
/// padding: one text is encoded at a time.
pub fn encode_text(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<EncodedText> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let keep = enc.len().min(max_len);
    ensure!(keep > 0, "tokenizer produced no tokens");
    let input_ids = Tensor::new(&enc.get_ids()[..keep], device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(&enc.get_attention_mask()[..keep], device)?.unsqueeze(0)?;
    Ok(EncodedText { input_ids, attention_mask, dropped: enc.len() - keep })
}
