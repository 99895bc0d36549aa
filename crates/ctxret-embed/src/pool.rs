use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states of `[B,T,H]`, L2-normalised to `[B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _time, hidden_dim) = hidden.dims3().map_err(|e| anyhow!("hidden shape must be [B,T,H]: {}", e))?;

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = mask_3d.broadcast_as(hidden.shape()).or_else(|_| mask_3d.repeat((1, 1, hidden_dim)))?;
    let masked = (hidden * &mask_broadcast)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mut mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = norm.broadcast_add(&eps)?;
    mean = mean.broadcast_div(&norm)?;
    if mean.dims() != [batch, hidden_dim] {
        return Err(anyhow!("pooled shape {:?} != [{}, {}]", mean.dims(), batch, hidden_dim));
    }
    Ok(mean)
}
