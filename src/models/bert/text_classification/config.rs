//! Adapt Bert for Sequence Classification to the Text Classification pipeline

use std::{collections::BTreeMap, path::PathBuf};

use bert_burn::model::BertModelConfig;
use burn::{
    config::Config as _,
    nn::{DropoutConfig, Initializer, LinearConfig},
    tensor::backend::{AutodiffBackend, Backend},
};

use crate::{pipelines::text_classification, utils::classes::ClassLabels};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The base BERT config
    pub model: BertModelConfig,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// Standard deviation of the normal initializer for the classification head
    #[config(default = 0.02)]
    pub initializer_range: f64,
}

impl Config {
    /// Build the configuration for a particular set of class labels
    pub fn new_with_labels(model: BertModelConfig, labels: &ClassLabels) -> Self {
        Config::new(model, labels.id2label().clone())
    }

    /// Initialize the model, with a randomly initialized classification head
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let model = self.model.init(device);

        let n_classes = self.id2label.len();

        let dropout = DropoutConfig::new(self.model.hidden_dropout_prob).init();

        let output = LinearConfig::new(self.model.hidden_size, n_classes)
            .with_initializer(Initializer::Normal {
                mean: 0.0,
                std: self.initializer_range,
            })
            .init(device);

        Model {
            model,
            dropout,
            output,
            n_classes,
        }
    }
}

impl text_classification::ModelConfig for Config {
    /// Initialize the model
    fn init<B: AutodiffBackend>(&self, device: &B::Device) -> impl text_classification::Model<B> {
        self.init::<B>(device)
    }

    /// Load a pretrained model configuration
    async fn load_pretrained(
        config_file: PathBuf,
        labels: &ClassLabels,
        hidden_dropout_prob: f64,
    ) -> anyhow::Result<Self> {
        let mut bert_config = BertModelConfig::load(config_file)
            .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?;

        // Enable the pooling layer for sequence classification
        bert_config.with_pooling_layer = Some(true);
        bert_config.hidden_dropout_prob = hidden_dropout_prob;

        if labels.is_empty() {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        Ok(Config::new_with_labels(bert_config, labels))
    }

    fn get_config(&self) -> text_classification::Config {
        text_classification::Config {
            pad_token_id: self.model.pad_token_id,
            max_position_embeddings: self.model.max_position_embeddings,
            hidden_size: self.model.hidden_size,
            max_seq_len: self.model.max_seq_len,
            hidden_dropout_prob: self.model.hidden_dropout_prob,
            model_type: self.model.model_type.clone(),
            id2label: self.id2label.clone(),
        }
    }
}
