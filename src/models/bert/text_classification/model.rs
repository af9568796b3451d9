use std::path::PathBuf;

use bert_burn::{
    data::BertInferenceBatch,
    model::{BertModel, BertModelOutput},
};
use burn::{
    module::Module,
    nn::{loss::CrossEntropyLossConfig, Dropout, Linear},
    tensor::{
        activation::softmax,
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    train::ClassificationOutput,
};

use crate::pipelines::text_classification::{self, batcher};

use super::Config;

/// A BERT encoder with a dropout and linear classification head on the pooled output
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// The base BERT model
    pub model: BertModel<B>,

    /// Dropout applied to the pooled output during training
    pub dropout: Dropout,

    /// Linear layer for text classification
    pub output: Linear<B>,

    /// Total number of classes
    pub n_classes: usize,
}

impl<B: Backend> Model<B> {
    /// Run the encoder and project the pooled representation onto the classes
    fn logits(&self, input: batcher::Infer<B>, dropout: bool) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = input.tokens.dims();

        let BertModelOutput {
            hidden_states,
            pooled_output,
        } = self.model.forward(BertInferenceBatch {
            tokens: input.tokens,
            mask_pad: input.mask_pad,
        });

        let pooled = pooled_output.unwrap_or(hidden_states);
        let pooled = if dropout {
            self.dropout.forward(pooled)
        } else {
            pooled
        };

        // Only the first position carries the sequence representation
        self.output
            .forward(pooled)
            .slice([0..batch_size, 0..1])
            .reshape([batch_size, self.n_classes])
    }

    /// Compute logits and cross entropy loss against the batch targets
    pub fn forward_classification(&self, item: batcher::Train<B>) -> ClassificationOutput<B> {
        let output = self.logits(item.input, true);
        let targets = item.targets.to_device(&output.device());

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }

    /// Class probabilities for each sequence in the batch
    pub fn probabilities(&self, input: batcher::Infer<B>) -> Tensor<B, 2> {
        softmax(self.logits(input, false), 1)
    }
}

impl<B: AutodiffBackend> text_classification::Model<B> for Model<B> {
    type Config = Config;

    fn forward(&self, item: batcher::Train<B>) -> ClassificationOutput<B> {
        self.forward_classification(item)
    }

    fn infer(&self, input: batcher::Infer<B>) -> Tensor<B, 2> {
        self.probabilities(input)
    }

    fn load_from_safetensors(
        device: &B::Device,
        model_file: PathBuf,
        config: Config,
    ) -> anyhow::Result<Self> {
        if config.id2label.is_empty() {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        let record = BertModel::from_safetensors(model_file, device, config.model.clone());

        let Model {
            model,
            dropout,
            output,
            n_classes,
        } = config.init(device);

        Ok(Model {
            model: model.load_record(record),
            dropout,
            output,
            n_classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::{Bool, Data, Int},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{datasets::ag_news, models::bert::text_classification::config::tests::tiny_bert};

    type TestBackend = NdArray;

    fn model() -> Model<TestBackend> {
        Config::new_with_labels(tiny_bert(), &ag_news::labels()).init(&NdArrayDevice::Cpu)
    }

    fn input() -> batcher::Infer<TestBackend> {
        let device = NdArrayDevice::Cpu;

        batcher::Infer::new(
            Tensor::<TestBackend, 2, Int>::from_data(
                Data::from([[1, 4, 5, 2], [1, 9, 2, 0]]).convert::<i64>(),
                &device,
            ),
            Tensor::<TestBackend, 2, Bool>::from_data(
                Data::from([[false, false, false, false], [false, false, false, true]]),
                &device,
            ),
        )
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let probabilities = model().probabilities(input());

        assert_eq!(probabilities.dims(), [2, 4]);

        let sums: Vec<f32> = probabilities.sum_dim(1).into_data().convert::<f32>().value;
        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-4, "row sums to {}", sum);
        }
    }

    #[test]
    fn test_classification_loss() {
        let device = NdArrayDevice::Cpu;
        let targets = crate::utils::tensors::class_ids(&[0, 3], &device);

        let output = model().forward_classification(batcher::Train::new(input(), targets));

        assert_eq!(output.output.dims(), [2, 4]);

        let loss: f32 = output.loss.into_scalar();
        assert!(loss.is_finite() && loss > 0.0);
    }
}
