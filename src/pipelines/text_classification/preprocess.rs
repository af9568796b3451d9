use burn::data::dataset::{Dataset, InMemDataset};
use derive_new::new;
use tokenizers::{Tokenizer, TruncationParams};

use super::Item;

/// Number of rows tokenized per `encode_batch` call
pub static MAP_BATCH_SIZE: usize = 1_000;

/// A tokenized example: token ids truncated to the model's context window, with the
/// attention mask left implicit until batches are padded
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct Encoded {
    /// Token ids, special tokens included
    pub input_ids: Vec<u32>,

    /// The class id
    pub label: usize,
}

/// Maps raw text to token ids. This is the only place truncation is decided: sequences
/// longer than `max_length` silently lose their trailing tokens.
#[derive(Clone)]
pub struct Preprocessor {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl Preprocessor {
    /// Configure a tokenizer to truncate to `max_length` tokens without padding
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> anyhow::Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Unable to configure truncation: {}", e))?;

        // Padding happens per batch in the batcher
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    /// Load the tokenizer for a model from the Hugging Face Hub
    pub fn from_pretrained(model_name: &str, max_length: usize) -> anyhow::Result<Self> {
        let tokenizer = Tokenizer::from_pretrained(model_name, None)
            .map_err(|e| anyhow!("Unable to load the tokenizer for {}: {}", model_name, e))?;

        Self::new(tokenizer, max_length)
    }

    /// The maximum number of tokens per sequence
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// The id of the padding token, if the tokenizer's vocabulary defines one
    pub fn pad_token_id(&self) -> Option<u32> {
        ["[PAD]", "<pad>"]
            .into_iter()
            .find_map(|token| self.tokenizer.token_to_id(token))
    }

    /// Tokenize a batch of texts, adding the model's special tokens
    pub fn encode_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<u32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(|e| anyhow!("Unable to encode: {}", e))?;

        Ok(encodings
            .into_iter()
            .map(|encoding| encoding.get_ids().to_vec())
            .collect())
    }
}

/// Tokenize every row of a dataset in batches, caching the result in memory
pub fn tokenize<I, D>(preprocessor: &Preprocessor, dataset: &D) -> anyhow::Result<InMemDataset<Encoded>>
where
    I: Item,
    D: Dataset<I>,
{
    let mut encoded = Vec::with_capacity(dataset.len());
    let mut batch: Vec<I> = Vec::with_capacity(MAP_BATCH_SIZE);

    for item in dataset.iter() {
        batch.push(item);

        if batch.len() == MAP_BATCH_SIZE {
            encoded.extend(encode_items(preprocessor, &batch)?);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        encoded.extend(encode_items(preprocessor, &batch)?);
    }

    log::debug!(
        "Tokenized {} rows (max length {})",
        encoded.len(),
        preprocessor.max_length()
    );

    Ok(InMemDataset::new(encoded))
}

fn encode_items<I: Item>(preprocessor: &Preprocessor, items: &[I]) -> anyhow::Result<Vec<Encoded>> {
    let texts = items.iter().map(|item| item.input().to_string()).collect();

    let ids = preprocessor.encode_batch(texts)?;

    Ok(ids
        .into_iter()
        .zip(items)
        .map(|(input_ids, item)| Encoded::new(input_ids, item.class_id()))
        .collect())
}
