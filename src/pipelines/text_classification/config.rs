use std::{collections::BTreeMap, fmt, str::FromStr};

use burn::LearningRate;
use serde::{Deserialize, Serialize};

use super::metric::Average;

/// The common model configuration properties needed for the pipeline
#[derive(Clone, Debug)]
pub struct Config {
    /// The padding token ID
    pub pad_token_id: usize,

    /// The max position embeddings
    pub max_position_embeddings: usize,

    /// The size of the hidden state
    pub hidden_size: usize,

    /// An optional max sequence length, if different from max position embeddings
    pub max_seq_len: Option<usize>,

    /// The hidden dropout probability
    pub hidden_dropout_prob: f64,

    /// The base model type (e.g., "bert" or "roberta")
    pub model_type: String,

    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,
}

impl Config {
    /// The longest token sequence the model accepts, optionally capped further by `limit`
    pub fn max_input_len(&self, limit: Option<usize>) -> usize {
        // RoBERTa reserves two position embeddings past the padding index
        let context = if self.model_type == "roberta" {
            self.max_position_embeddings.saturating_sub(2)
        } else {
            self.max_position_embeddings
        };

        [Some(context), self.max_seq_len, limit]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(context)
    }
}

/// When the trainer evaluates or saves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalStrategy {
    /// Never
    No,

    /// At the end of every epoch
    Epoch,
}

impl FromStr for IntervalStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "no" => Ok(IntervalStrategy::No),
            "epoch" => Ok(IntervalStrategy::Epoch),
            _ => Err(ConfigError::UnknownOption(value.to_string())),
        }
    }
}

impl fmt::Display for IntervalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalStrategy::No => write!(f, "no"),
            IntervalStrategy::Epoch => write!(f, "epoch"),
        }
    }
}

/// The validation metric used to select the best checkpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestModelMetric {
    /// Lowest validation loss
    Loss,

    /// Highest validation F1 score
    F1,
}

impl FromStr for BestModelMetric {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "loss" => Ok(BestModelMetric::Loss),
            "f1" => Ok(BestModelMetric::F1),
            _ => Err(ConfigError::UnknownOption(value.to_string())),
        }
    }
}

impl fmt::Display for BestModelMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BestModelMetric::Loss => write!(f, "loss"),
            BestModelMetric::F1 => write!(f, "f1"),
        }
    }
}

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Model name (e.g., "bert-base-uncased")
    #[config(default = "\"bert-base-uncased\".to_string()")]
    pub model_name: String,

    /// The Dataset to use (e.g., "ag_news")
    #[config(default = "\"ag_news\".to_string()")]
    pub dataset_name: String,

    /// Split expression for the training rows
    #[config(default = "\"train[:10%]\".to_string()")]
    pub train_split: String,

    /// Split expression for the evaluation rows
    #[config(default = "\"test\".to_string()")]
    pub eval_split: String,

    /// Where checkpoints and artifacts land. This depends on the execution environment.
    #[config(default = "\"output\".to_string()")]
    pub output_dir: String,

    /// Peak learning rate, decayed linearly to zero
    #[config(default = 5e-5)]
    pub learning_rate: LearningRate,

    /// Training batch size per device
    #[config(default = 16)]
    pub train_batch_size: usize,

    /// Evaluation batch size per device
    #[config(default = 16)]
    pub eval_batch_size: usize,

    /// Number of epochs
    #[config(default = 2)]
    pub num_epochs: usize,

    /// Decoupled weight decay for AdamW
    #[config(default = 0.01)]
    pub weight_decay: f32,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// Evaluation cadence
    #[config(default = "IntervalStrategy::Epoch")]
    pub eval_strategy: IntervalStrategy,

    /// Checkpoint cadence
    #[config(default = "IntervalStrategy::Epoch")]
    pub save_strategy: IntervalStrategy,

    /// Retain only the best checkpoint and restore it once training ends
    #[config(default = true)]
    pub load_best_model_at_end: bool,

    /// The metric used to pick the best checkpoint
    #[config(default = "BestModelMetric::Loss")]
    pub metric_for_best_model: BestModelMetric,

    /// When not keeping the best model, how many of the most recent checkpoints to retain
    pub save_total_limit: Option<usize>,

    /// How per-class F1 scores are averaged
    #[config(default = "Average::Weighted")]
    pub f1_average: Average,

    /// Seed for shuffling the training rows
    #[config(default = 42)]
    pub seed: u64,

    /// An optional cap on tokenized length below the model's context window
    pub max_seq_len: Option<usize>,

    /// Dropout rate
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Data loader workers, defaulting to the available parallelism
    pub num_workers: Option<usize>,

    /// Class labels for the selected dataset
    pub labels: Vec<String>,
}

impl Training {
    /// Check that the hyperparameters are usable together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }

        if self.train_batch_size == 0 || self.eval_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        if self.num_epochs == 0 {
            return Err(ConfigError::ZeroEpochs);
        }

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }

        if !(0.0..=1.0).contains(&self.hidden_dropout_prob) {
            return Err(ConfigError::InvalidDropout(self.hidden_dropout_prob));
        }

        if self.load_best_model_at_end
            && (self.eval_strategy != self.save_strategy
                || self.save_strategy == IntervalStrategy::No)
        {
            return Err(ConfigError::BestModelStrategies {
                eval: self.eval_strategy,
                save: self.save_strategy,
            });
        }

        Ok(())
    }

    /// Number of optimizer steps over the whole run, for a training split of `n_items` rows
    pub fn total_steps(&self, n_items: usize, n_devices: usize) -> usize {
        let per_step = self.train_batch_size * n_devices.max(1);

        n_items.div_ceil(per_step).max(1) * self.num_epochs
    }
}

/// Config Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    /// No classes to train on
    #[error("no class labels are defined")]
    NoLabels,

    /// A batch size of zero
    #[error("batch sizes must be greater than zero")]
    ZeroBatchSize,

    /// No epochs to run
    #[error("the number of epochs must be greater than zero")]
    ZeroEpochs,

    /// A learning rate outside of (0, 1]
    #[error("learning rate must be greater than 0 and at most 1, got {0}")]
    InvalidLearningRate(LearningRate),

    /// A dropout probability outside of [0, 1]
    #[error("hidden_dropout_prob must be between 0 and 1, got {0}")]
    InvalidDropout(f64),

    /// Best-model selection needs a checkpoint for every evaluation
    #[error("load_best_model_at_end requires matching eval and save strategies other than \"no\" (eval: {eval}, save: {save})")]
    BestModelStrategies {
        /// The configured evaluation cadence
        eval: IntervalStrategy,
        /// The configured checkpoint cadence
        save: IntervalStrategy,
    },

    /// An option value that isn't recognized
    #[error("unknown option value: {0}")]
    UnknownOption(String),
}
