use burn::data::dataset::{
    self, source::huggingface::HuggingfaceDatasetLoader, Dataset as _, InMemDataset,
};
use derive_new::new;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{pipelines::text_classification, utils::classes::ClassLabels};

use super::{LoadableDataset, Source, Split};

/// The name of the AG News dataset
pub static DATASET: &str = "ag_news";

/// The topic labels, where the position is the class id
pub static LABELS: [&str; 4] = ["World", "Sports", "Business", "Sci/Tech"];

/// The default training split: a 10% sample of "train"
pub static TRAIN_SPLIT: &str = "train[:10%]";

/// The default evaluation split: the full "test" split
pub static TEST_SPLIT: &str = "test";

/// The label schema for AG News
pub fn labels() -> ClassLabels {
    ClassLabels::new(&LABELS)
}

/// A news article paired with its topic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The text for classification
    pub text: String,

    /// The topic class id of the text
    pub label: usize,
}

impl text_classification::Item for Item {
    fn input(&self) -> &str {
        &self.text
    }

    fn class_id(&self) -> usize {
        self.label
    }
}

/// Struct for the AG News dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

/// Implement the Dataset trait for the AG News dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

#[async_trait::async_trait]
impl LoadableDataset<Item> for Dataset {
    async fn load(source: &Source, split: &Split) -> anyhow::Result<Self> {
        let source = source.clone();
        let split = split.clone();

        // Both importers block on disk (and, for the hub, on a Python subprocess)
        let items = tokio::task::spawn_blocking(move || select(&source, &split)).await??;

        log::info!("Loaded {} rows of {}", items.len(), DATASET);

        Ok(Self {
            dataset: InMemDataset::new(items),
        })
    }
}

impl Dataset {
    /// Load the default training split
    pub async fn train(source: &Source) -> anyhow::Result<Self> {
        Self::load(source, &TRAIN_SPLIT.parse::<Split>()?).await
    }

    /// Load the default evaluation split
    pub async fn test(source: &Source) -> anyhow::Result<Self> {
        Self::load(source, &TEST_SPLIT.parse::<Split>()?).await
    }

    /// Returns random samples from the dataset, paired with their label names
    pub fn get_samples(&self, count: usize) -> Vec<(String, String)> {
        let labels = labels();
        let mut rng = rand::thread_rng();

        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut rng);

        indices
            .into_iter()
            .take(count)
            .filter_map(|i| self.get(i))
            .map(|item| {
                let label = labels.name(item.label).unwrap_or("UNK").to_string();
                (item.text, label)
            })
            .collect()
    }
}

/// Read the rows of a split from the source, keeping only those the expression selects
fn select(source: &Source, split: &Split) -> anyhow::Result<Vec<Item>> {
    match source {
        Source::Hub(dataset_id) => {
            let dataset = HuggingfaceDatasetLoader::new(dataset_id)
                .dataset::<Item>(&split.name)
                .map_err(|e| anyhow!("Unable to load {} split {}: {}", dataset_id, split, e))?;

            Ok(slice(&dataset, split))
        }
        Source::Local(dir) => {
            let path = dir.join(format!("{}.csv", split.name));
            let reader = csv::ReaderBuilder::new();

            let dataset: InMemDataset<Item> = InMemDataset::from_csv(&path, &reader)
                .map_err(|e| anyhow!("Unable to read {}: {}", path.display(), e))?;

            Ok(slice(&dataset, split))
        }
    }
}

fn slice<D: dataset::Dataset<Item>>(dataset: &D, split: &Split) -> Vec<Item> {
    split
        .resolve(dataset.len())
        .filter_map(|i| dataset.get(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn fixtures() -> Source {
        Source::Local(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/ag_news"))
    }

    #[tokio::test]
    async fn test_load_full_split() -> anyhow::Result<()> {
        let test = Dataset::test(&fixtures()).await?;

        assert_eq!(test.len(), 8);
        assert_eq!(
            test.get(0),
            Some(Item::new(
                "Fears for T N pension after talks. Unions representing workers at Turner Newall say they are disappointed after talks with stricken parent firm Federal Mogul.".to_string(),
                2
            ))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_load_percent_slice() -> anyhow::Result<()> {
        let train = Dataset::train(&fixtures()).await?;

        // 10% of the 20 fixture rows
        assert_eq!(train.len(), 2);
        assert_eq!(train.get(0).map(|item| item.label), Some(2));

        let tail = Dataset::load(&fixtures(), &"train[-5:]".parse::<Split>()?).await?;
        assert_eq!(tail.len(), 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_split() {
        let result = Dataset::load(&fixtures(), &Split::full("validation")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_labels_are_in_range() -> anyhow::Result<()> {
        let train = Dataset::load(&fixtures(), &Split::full("train")).await?;

        assert_eq!(train.len(), 20);
        assert!(train.iter().all(|item| item.label < LABELS.len()));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_samples() -> anyhow::Result<()> {
        let test = Dataset::test(&fixtures()).await?;
        let samples = test.get_samples(3);

        assert_eq!(samples.len(), 3);
        assert!(samples
            .iter()
            .all(|(_, label)| LABELS.contains(&label.as_str())));

        Ok(())
    }

    #[test]
    fn test_label_schema_round_trip() {
        let labels = labels();

        for name in LABELS {
            assert_eq!(labels.name(labels.id(name).unwrap()), Some(name));
        }

        assert_eq!(labels.name(3), Some("Sci/Tech"));
    }
}
