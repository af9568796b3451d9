/// Common model traits for text classification
pub mod model;

/// Pipeline and training configuration
pub mod config;

/// Tokenization and truncation
pub mod preprocess;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// F1 score and the confusion matrix behind it
pub mod metric;

/// Checkpoint retention during training
pub mod checkpointing;

/// Final evaluation report
pub mod evaluation;

/// Model card
pub mod card;

/// Training
pub mod training;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use config::{Config, Training};
pub use evaluation::EvalReport;
pub use inference::{infer, Prediction};
pub use item::Item;
pub use metric::{compute_metrics, Average, F1ScoreMetric};
pub use model::{Model, ModelConfig};
pub use preprocess::Preprocessor;
pub use training::train;

/// The unique string token that identifies this pipeline
pub static PIPELINE: &str = "text-classification";
