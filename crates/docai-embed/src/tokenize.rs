use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// XLM-RoBERTa `<pad>` id.
const PAD_ID: u32 = 1;

/// Encode `texts` as `[B,T]` id and attention-mask tensors, truncated to
/// `max_len` and right-padded to the longest encoding in the batch.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut ids_flat = Vec::with_capacity(rows.len() * width);
    let mut mask_flat = Vec::with_capacity(rows.len() * width);
    for (ids, mask) in rows {
        let pad = width - ids.len();
        ids_flat.extend(ids.into_iter().chain(std::iter::repeat(PAD_ID).take(pad)));
        mask_flat.extend(mask.into_iter().chain(std::iter::repeat(0).take(pad)));
    }
    let input_ids = Tensor::from_vec(ids_flat, (texts.len(), width), device)?;
    let attention_mask = Tensor::from_vec(mask_flat, (texts.len(), width), device)?;
    Ok((input_ids, attention_mask))
}
