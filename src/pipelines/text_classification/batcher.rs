use burn::{
    data::dataloader,
    nn::attention::generate_padding_mask,
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors::class_ids;

use super::preprocess::{Encoded, Preprocessor};

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Tokenized text as 2D tensor: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask for the tokenized text containing booleans for padding locations
    pub mask_pad: Tensor<B, 2, Bool>,
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Collates tokenized examples into padded batches
#[derive(Clone, new)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for converting raw text to token IDs at inference time
    preprocessor: Preprocessor,

    /// ID of the padding token
    pad_token_id: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Pad token id sequences to the longest sequence in the batch
    fn pad(&self, token_ids_list: Vec<Vec<u32>>) -> Infer<B> {
        let token_ids_list = token_ids_list
            .into_iter()
            .map(|ids| ids.into_iter().map(|id| id as usize).collect())
            .collect();

        let padding = generate_padding_mask(
            self.pad_token_id,
            token_ids_list,
            Some(self.preprocessor.max_length()),
            &self.device,
        );

        Infer {
            tokens: padding.tensor,
            mask_pad: padding.mask,
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Tokenizes raw text and collects it into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        let token_ids_list = self
            .preprocessor
            .encode_batch(items)
            .expect("unable to encode");

        self.pad(token_ids_list)
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend> dataloader::batcher::Batcher<Encoded, Train<B>> for Batcher<B> {
    /// Collects tokenized examples into a training batch
    fn batch(&self, items: Vec<Encoded>) -> Train<B> {
        let targets: Vec<usize> = items.iter().map(|item| item.label).collect();

        let input = self.pad(items.into_iter().map(|item| item.input_ids).collect());

        Train {
            input,
            targets: class_ids(&targets, &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::dataloader::batcher::Batcher as _,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        pipelines::text_classification::preprocess::testing::{tokenizer, CLS, PAD, SEP},
        utils::tensors::to_class_ids,
    };

    type TestBackend = NdArray;

    fn batcher(max_length: usize) -> Batcher<TestBackend> {
        let preprocessor = Preprocessor::new(tokenizer(), max_length).unwrap();

        Batcher::new(preprocessor, PAD as usize, NdArrayDevice::Cpu)
    }

    #[test]
    fn test_pads_to_longest_sequence() {
        let batch: Train<TestBackend> = batcher(512).batch(vec![
            Encoded::new(vec![CLS, 9, 10, SEP], 1),
            Encoded::new(vec![CLS, 4, 5, 6, 7, 8, SEP], 2),
        ]);

        assert_eq!(batch.input.tokens.dims(), [2, 7]);

        let tokens: Vec<i64> = batch.input.tokens.into_data().convert::<i64>().value;
        assert_eq!(
            tokens,
            vec![1, 9, 10, 2, 0, 0, 0, 1, 4, 5, 6, 7, 8, 2]
        );

        let mask: Vec<bool> = batch.input.mask_pad.into_data().value;
        assert_eq!(
            mask,
            vec![
                false, false, false, false, true, true, true, //
                false, false, false, false, false, false, false,
            ]
        );

        assert_eq!(to_class_ids(batch.targets), vec![1, 2]);
    }

    #[test]
    fn test_inference_batch_truncates() {
        let batch: Infer<TestBackend> = batcher(4).batch(vec![
            "stocks rally on wall street".to_string(),
            "team".to_string(),
        ]);

        assert_eq!(batch.tokens.dims(), [2, 4]);

        let tokens: Vec<i64> = batch.tokens.into_data().convert::<i64>().value;
        assert_eq!(tokens, vec![1, 4, 5, 2, 1, 9, 2, 0]);
    }
}
