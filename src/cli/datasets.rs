use std::fmt::Display;

use crate::datasets::ag_news;

/// The Dataset enum
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Dataset {
    /// AG News topic classification
    AgNews,
}

impl TryFrom<&str> for Dataset {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.to_lowercase().replace('-', "_");

        if normalized == ag_news::DATASET {
            Ok(Dataset::AgNews)
        } else {
            Err(Self::Error::Unknown(value.to_string()))
        }
    }
}

impl Dataset {
    /// The hub id the dataset is downloaded from
    pub fn hub_id(&self) -> &'static str {
        match self {
            Dataset::AgNews => ag_news::DATASET,
        }
    }

    /// Check that a training config's `dataset_name` names this dataset
    pub fn check_configured(&self, dataset_name: &str) -> Result<(), DatasetError> {
        match Dataset::try_from(dataset_name) {
            Ok(configured) if configured == *self => Ok(()),
            _ => Err(DatasetError::Mismatch {
                requested: self.to_string(),
                configured: dataset_name.to_string(),
            }),
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hub_id())
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),

    /// The training config was written for another dataset
    #[error("dataset {requested} does not match the configured dataset {configured}")]
    Mismatch {
        /// The dataset given on the command line
        requested: String,

        /// The `dataset_name` from the training config
        configured: String,
    },
}
