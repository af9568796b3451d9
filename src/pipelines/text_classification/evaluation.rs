use std::{path::Path, sync::Arc, time::Instant};

use burn::{
    data::dataloader::DataLoader,
    tensor::{backend::Backend, ElementConversion},
    train::{ClassificationOutput, ValidStep},
};
use serde::{Deserialize, Serialize};

use crate::utils::{
    classes::ClassLabels,
    tensors::{argmax_classes, to_class_ids},
};

use super::{
    batcher::Train,
    metric::{Average, ConfusionMatrix},
};

/// Precision, recall and F1 for a single class
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    /// The class name
    pub label: String,

    /// Precision (0.0-1.0)
    pub precision: f64,

    /// Recall (0.0-1.0)
    pub recall: f64,

    /// F1 score (0.0-1.0)
    pub f1: f64,

    /// Number of references with this class
    pub support: usize,
}

/// The final evaluation of a fine-tuned model, written to `eval_results.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    /// F1 score with the configured averaging
    pub f1: f64,

    /// How per-class F1 scores were combined
    pub average: Average,

    /// Overall accuracy (0.0-1.0)
    pub accuracy: f64,

    /// Mean cross entropy loss per example
    pub avg_loss: f64,

    /// Number of examples evaluated
    pub total: usize,

    /// Per-class metrics, ordered by class id
    pub per_class: Vec<ClassReport>,

    /// Confusion matrix: `confusion_matrix[reference][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,

    /// Evaluation wall-clock time in milliseconds
    pub eval_time_ms: u64,
}

impl EvalReport {
    /// Summarize a confusion matrix
    pub fn new(
        matrix: &ConfusionMatrix,
        labels: &ClassLabels,
        average: Average,
        avg_loss: f64,
        eval_time_ms: u64,
    ) -> Self {
        let per_class = (0..matrix.n_classes())
            .map(|class| ClassReport {
                label: labels
                    .name(class)
                    .map_or_else(|| format!("class_{class}"), str::to_string),
                precision: matrix.precision(class),
                recall: matrix.recall(class),
                f1: matrix.class_f1(class),
                support: matrix.support(class),
            })
            .collect();

        Self {
            f1: matrix.f1(average),
            average,
            accuracy: matrix.accuracy(),
            avg_loss,
            total: matrix.total(),
            per_class,
            confusion_matrix: matrix.matrix().to_vec(),
            eval_time_ms,
        }
    }

    /// Format as a human-readable classification report
    pub fn to_report(&self) -> String {
        let rule = "-".repeat(62);
        let mut out = String::new();

        out.push_str(&format!(
            "{:>18} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        out.push_str(&format!("{rule}\n"));

        for class in &self.per_class {
            out.push_str(&format!(
                "{:>18} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
                class.label, class.precision, class.recall, class.f1, class.support
            ));
        }

        out.push_str(&format!("{rule}\n"));
        out.push_str(&format!("F1 ({}): {:.4}\n", self.average, self.f1));
        out.push_str(&format!("Accuracy: {:.4}\n", self.accuracy));
        out.push_str(&format!("Avg loss: {:.4}\n", self.avg_loss));
        out.push_str(&format!("Samples:  {}\n", self.total));
        out.push_str(&format!("Time:     {}ms\n", self.eval_time_ms));

        out
    }

    /// Write the report as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        std::fs::write(path, json)?;

        Ok(())
    }

    /// Read a report written by [`EvalReport::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;

        Ok(serde_json::from_str(&json)?)
    }
}

/// Run a model over every batch of a data loader, accumulating a confusion matrix and the
/// example-weighted mean loss
pub fn evaluate<B, M>(
    model: &M,
    dataloader: Arc<dyn DataLoader<Train<B>>>,
    n_classes: usize,
) -> (ConfusionMatrix, f64)
where
    B: Backend,
    M: ValidStep<Train<B>, ClassificationOutput<B>>,
{
    let mut matrix = ConfusionMatrix::new(n_classes);
    let mut total_loss = 0.0;

    for batch in dataloader.iter() {
        let output = model.step(batch);

        let references = to_class_ids(output.targets);
        let predictions = argmax_classes(output.output);
        let loss: f64 = output.loss.into_scalar().elem();

        total_loss += loss * references.len() as f64;
        matrix.update(&predictions, &references);
    }

    let avg_loss = if matrix.total() > 0 {
        total_loss / matrix.total() as f64
    } else {
        0.0
    };

    (matrix, avg_loss)
}

/// Evaluate and summarize in one pass, timing the evaluation
pub fn evaluate_report<B, M>(
    model: &M,
    dataloader: Arc<dyn DataLoader<Train<B>>>,
    labels: &ClassLabels,
    average: Average,
) -> EvalReport
where
    B: Backend,
    M: ValidStep<Train<B>, ClassificationOutput<B>>,
{
    let started = Instant::now();

    let (matrix, avg_loss) = evaluate(model, dataloader, labels.len());

    EvalReport::new(
        &matrix,
        labels,
        average,
        avg_loss,
        started.elapsed().as_millis() as u64,
    )
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
        tensor::{Data, Tensor},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        datasets::ag_news,
        pipelines::text_classification::{
            batcher::Batcher,
            preprocess::{testing::tokenizer, Encoded, Preprocessor},
        },
    };

    type TestBackend = NdArray;

    /// Always predicts Sports, with a constant loss
    struct Sports;

    impl ValidStep<Train<TestBackend>, ClassificationOutput<TestBackend>> for Sports {
        fn step(&self, item: Train<TestBackend>) -> ClassificationOutput<TestBackend> {
            let device = NdArrayDevice::Cpu;
            let [batch_size] = item.targets.dims();

            let row = [0.0, 1.0, 0.0, 0.0];
            let rows: Vec<f32> = row.iter().cycle().take(batch_size * 4).copied().collect();
            let output = Tensor::<TestBackend, 1>::from_data(Data::from(rows.as_slice()), &device)
                .reshape([batch_size, 4]);

            ClassificationOutput {
                loss: Tensor::from_data(Data::from([0.5f32]), &device),
                output,
                targets: item.targets,
            }
        }
    }

    fn report() -> EvalReport {
        let preprocessor = Preprocessor::new(tokenizer(), 8).unwrap();
        let batcher = Batcher::<TestBackend>::new(preprocessor, 0, NdArrayDevice::Cpu);

        let dataset = InMemDataset::new(vec![
            Encoded::new(vec![1, 9, 10, 2], 1),
            Encoded::new(vec![1, 9, 2], 1),
            Encoded::new(vec![1, 4, 5, 2], 2),
        ]);

        let dataloader = DataLoaderBuilder::new(batcher).batch_size(2).build(dataset);

        evaluate_report(&Sports, dataloader, &ag_news::labels(), Average::Micro)
    }

    #[test]
    fn test_evaluate() {
        let report = report();

        assert_eq!(report.total, 3);
        assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.f1 - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.avg_loss - 0.5).abs() < 1e-6);
        assert_eq!(report.confusion_matrix[1], vec![0, 2, 0, 0]);
        assert_eq!(report.confusion_matrix[2], vec![0, 1, 0, 0]);

        assert_eq!(report.per_class[1].label, "Sports");
        assert_eq!(report.per_class[1].support, 2);
        assert_eq!(report.per_class[2].recall, 0.0);
    }

    #[test]
    fn test_to_report() {
        let text = report().to_report();

        assert!(text.contains("Sci/Tech"));
        assert!(text.contains("F1 (micro): 0.6667"));
        assert!(text.contains("Samples:  3"));
    }

    #[test]
    fn test_save_and_load() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!(
            "burn-agnews-eval-results-{}.json",
            std::process::id()
        ));

        let report = report();
        report.save(&path)?;

        let loaded = EvalReport::load(&path)?;
        std::fs::remove_file(&path)?;

        assert_eq!(loaded, report);

        Ok(())
    }

    #[test]
    fn test_empty_loader() {
        let preprocessor = Preprocessor::new(tokenizer(), 8).unwrap();
        let batcher = Batcher::<TestBackend>::new(preprocessor, 0, NdArrayDevice::Cpu);
        let dataloader = DataLoaderBuilder::new(batcher)
            .batch_size(2)
            .build(InMemDataset::<Encoded>::new(Vec::new()));

        let (matrix, avg_loss) = evaluate(&Sports, dataloader, 4);

        assert_eq!(matrix.total(), 0);
        assert_eq!(avg_loss, 0.0);
    }
}
