use std::{fmt::Display, path::PathBuf};

use burn::{
    module::AutodiffModule,
    tensor::{backend::AutodiffBackend, Tensor},
    train::{ClassificationOutput, TrainStep},
};

use crate::utils::classes::ClassLabels;

use super::{
    batcher::{Infer, Train},
    Config,
};

/// A trait for models that can be used for Text Classification
pub trait Model<B>:
    AutodiffModule<B> + TrainStep<Train<B>, ClassificationOutput<B>> + Display
where
    B: AutodiffBackend,
{
    /// The model configuration
    type Config: ModelConfig;

    /// Perform a forward pass
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B>;

    /// Defines forward pass for inference, returning class probabilities
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// Load the pretrained base weights from a file and attach a freshly initialized
    /// classification head
    fn load_from_safetensors(
        device: &B::Device,
        model_file: PathBuf,
        config: Self::Config,
    ) -> anyhow::Result<Self>;
}

/// A trait for configs that can be used for Text Classification models
pub trait ModelConfig: burn::config::Config + Clone {
    /// Initialize the model
    fn init<B: AutodiffBackend>(&self, device: &B::Device) -> impl Model<B>;

    /// Load a pretrained model configuration and size the classification head for `labels`
    fn load_pretrained(
        config_file: PathBuf,
        labels: &ClassLabels,
        hidden_dropout_prob: f64,
    ) -> impl std::future::Future<Output = anyhow::Result<Self>> + Send;

    /// Return the Config needed for the text classification pipeline
    fn get_config(&self) -> Config;
}
