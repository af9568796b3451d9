use burn::{
    config::Config as _,
    data::dataloader::batcher::Batcher as _,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::{backend::AutodiffBackend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::utils::classes::ClassLabels;

use super::{config::Training, Batcher, Model, ModelConfig, Preprocessor};

/// The predicted class for a single input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The name of the predicted class
    pub label: String,

    /// The id of the predicted class
    pub class_id: usize,

    /// The probability of the predicted class
    pub score: f32,

    /// Probabilities for every class, ordered by class id
    pub probabilities: Vec<f32>,
}

/// Define inference function
pub fn infer<B: AutodiffBackend, M: Model<B> + 'static>(
    device: B::Device,    // Device on which to perform computation (e.g., CPU or CUDA device)
    artifact_dir: &str,   // Directory containing model and config files
    samples: Vec<String>, // Text samples for inference
) -> anyhow::Result<Vec<Prediction>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    // Load experiment configuration
    let training = Training::load(format!("{artifact_dir}/training_config.json"))
        .map_err(|e| anyhow!("Unable to load training config file: {}", e))?;

    let config = M::Config::load(format!("{artifact_dir}/config.json").as_str())
        .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

    let pipeline_config = config.get_config();
    let labels = ClassLabels::from_id2label(pipeline_config.id2label.clone());

    // Initialize tokenizer with the truncation used for training
    let preprocessor = Preprocessor::from_pretrained(
        &training.model_name,
        pipeline_config.max_input_len(training.max_seq_len),
    )?;

    let batcher = Batcher::<B>::new(preprocessor, pipeline_config.pad_token_id, device.clone());

    // Load pre-trained model weights
    log::info!("Loading weights from {}...", artifact_dir);

    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), &device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    let model = config.init::<B>(&device).load_record(record);

    // Run inference on the given text samples
    log::info!("Running inference on {} samples...", samples.len());

    let probabilities = model.infer(batcher.batch(samples));

    Ok(predictions(probabilities, &labels))
}

/// Pick the most probable class for each row of a `[batch_size, n_classes]` probability tensor
pub fn predictions<B: burn::tensor::backend::Backend>(
    probabilities: Tensor<B, 2>,
    labels: &ClassLabels,
) -> Vec<Prediction> {
    let [_batch_size, n_classes] = probabilities.dims();

    let values: Vec<f32> = probabilities.into_data().convert::<f32>().value;

    values
        .chunks(n_classes.max(1))
        .map(|row| {
            let (class_id, score) = row
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
                    if p > best.1 {
                        (i, p)
                    } else {
                        best
                    }
                });

            Prediction {
                label: labels.name(class_id).unwrap_or("UNK").to_string(),
                class_id,
                score,
                probabilities: row.to_vec(),
            }
        })
        .collect()
}
