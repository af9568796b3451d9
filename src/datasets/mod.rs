use std::path::PathBuf;

use async_trait::async_trait;

///  The AG News dataset
pub mod ag_news;

/// Split expressions (e.g., `train[:10%]`)
pub mod split;

pub use split::{Split, SplitError};

/// Where the rows of a dataset are read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// The Hugging Face dataset hub, by dataset identifier (e.g., "ag_news")
    Hub(String),

    /// A local directory containing one `{split}.csv` file per split
    Local(PathBuf),
}

/// A dataset which can be loaded
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the rows selected by a split expression
    async fn load(source: &Source, split: &Split) -> anyhow::Result<Self>
    where
        Self: std::marker::Sized;
}
