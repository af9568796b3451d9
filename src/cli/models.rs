use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

use super::pipelines::Pipeline;

/// bert-base-uncased
pub static BERT_BASE_UNCASED: &str = "bert-base-uncased";

/// bert-base-cased
pub static BERT_BASE_CASED: &str = "bert-base-cased";

/// roberta-base
pub static ROBERTA_BASE: &str = "roberta-base";

/// All available models of the BERT family
pub static ALL_MODELS: &[&str; 3] = &[BERT_BASE_UNCASED, BERT_BASE_CASED, ROBERTA_BASE];

/// The default model to use for text classification
pub static DEFAULT_TEXT_CLASSIFICATION_MODEL: &str = BERT_BASE_UNCASED;

lazy_static! {
    /// Available models for each pipeline
    pub static ref MODELS_BY_PIPELINE: HashMap<Pipeline, &'static [&'static str; 3]> =
        [(Pipeline::TextClassification, ALL_MODELS)]
            .iter()
            .copied()
            .collect();
}

/// Available Models
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Model {
    /// The BERT family of models, with the specific model name contained within
    Bert(String),
}

impl Model {
    /// Get the model type
    pub fn model_type(&self) -> &str {
        match self {
            Model::Bert(name) if name.starts_with("roberta") => "roberta",
            Model::Bert(_) => "bert",
        }
    }

    /// Check if the model is valid for the given pipeline
    pub fn is_supported(&self, pipeline: &Pipeline) -> bool {
        let Model::Bert(name) = self;

        MODELS_BY_PIPELINE
            .get(pipeline)
            .is_some_and(|models| models.contains(&name.as_str()))
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Model::Bert(name) = self;

        write!(f, "{}", name)
    }
}

impl TryFrom<&str> for Model {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if ALL_MODELS.contains(&value) {
            Ok(Model::Bert(value.to_string()))
        } else {
            Err(ModelError::Unknown(value.to_string()))
        }
    }
}

/// Model Error
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// No model found for the given string
    #[error("no model found for {0}")]
    Unknown(String),
}
