use anyhow::{ensure, Result};
use candle_core::Tensor;

/// Sentence vector from token states: the mean over positions whose mask is
/// set, scaled to unit length. `[B, T, H]` states and a `[B, T]` mask give
/// `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, _) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, tokens],
        "mask shape {:?} does not match hidden states [{batch}, {tokens}, _]",
        attention_mask.dims()
    );
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.maximum(1.0)?;
    let mean = summed.broadcast_div(&counts)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12)?;
    Ok(mean.broadcast_div(&norm)?)
}
