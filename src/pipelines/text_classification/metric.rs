//! F1 score over arg-max predictions, both as a plain function for evaluation and as a
//! Burn [`Metric`] for the learner.

use std::{fmt, marker::PhantomData, str::FromStr};

use burn::{
    tensor::{backend::Backend, Int, Tensor},
    train::{
        metric::{Adaptor, Metric, MetricEntry, MetricMetadata, Numeric},
        ClassificationOutput,
    },
};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::tensors::{argmax_classes, to_class_ids};

/// Averaging strategy for multi-class F1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Unweighted mean of the per-class scores
    Macro,
    /// Global score from the total true positives, false positives and false negatives
    Micro,
    /// Mean of the per-class scores weighted by support
    Weighted,
}

impl FromStr for Average {
    type Err = MetricError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "macro" => Ok(Average::Macro),
            "micro" => Ok(Average::Micro),
            "weighted" => Ok(Average::Weighted),
            _ => Err(MetricError::UnknownAverage(value.to_string())),
        }
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Average::Macro => "macro",
            Average::Micro => "micro",
            Average::Weighted => "weighted",
        };

        write!(f, "{}", name)
    }
}

/// Metric Error
#[derive(thiserror::Error, Debug)]
pub enum MetricError {
    /// No averaging strategy found for the given string
    #[error("no averaging strategy found for {0}")]
    UnknownAverage(String),
}

/// Confusion matrix for multi-class classification, where `matrix[reference][prediction]`
/// counts the examples of class `reference` predicted as `prediction`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// An empty matrix sized for `n_classes`
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
        }
    }

    /// Build a matrix from paired predictions and references
    pub fn from_predictions(n_classes: usize, predictions: &[usize], references: &[usize]) -> Self {
        let mut matrix = Self::new(n_classes);
        matrix.update(predictions, references);
        matrix
    }

    /// Count paired predictions and references, growing the matrix if a class is unseen
    pub fn update(&mut self, predictions: &[usize], references: &[usize]) {
        for (&prediction, &reference) in predictions.iter().zip(references) {
            self.grow(prediction.max(reference) + 1);
            self.matrix[reference][prediction] += 1;
        }
    }

    fn grow(&mut self, n_classes: usize) {
        if n_classes <= self.n_classes() {
            return;
        }

        for row in self.matrix.iter_mut() {
            row.resize(n_classes, 0);
        }

        self.matrix.resize(n_classes, vec![0; n_classes]);
    }

    /// The raw counts
    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }

    /// Total number of counted examples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Examples of `class` predicted as `class`
    pub fn true_positives(&self, class: usize) -> usize {
        self.matrix[class][class]
    }

    /// Examples predicted as `class` that belong to another class
    pub fn false_positives(&self, class: usize) -> usize {
        self.predicted(class) - self.true_positives(class)
    }

    /// Examples of `class` predicted as another class
    pub fn false_negatives(&self, class: usize) -> usize {
        self.support(class) - self.true_positives(class)
    }

    /// Number of examples whose reference is `class`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Number of examples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Fraction of examples predicted correctly
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }

        let correct: usize = (0..self.n_classes()).map(|c| self.true_positives(c)).sum();

        correct as f64 / total as f64
    }

    /// Precision for one class, 0 when nothing was predicted as that class
    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.predicted(class))
    }

    /// Recall for one class, 0 when the class has no support
    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.support(class))
    }

    /// F1 for one class: the harmonic mean of precision and recall
    pub fn class_f1(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);

        ratio(
            2 * tp,
            2 * tp + self.false_positives(class) + self.false_negatives(class),
        )
    }

    /// F1 averaged over classes
    pub fn f1(&self, average: Average) -> f64 {
        let n_classes = self.n_classes();

        match average {
            Average::Macro => {
                // Only classes seen in either the references or the predictions take part
                let present: Vec<usize> = (0..n_classes)
                    .filter(|&c| self.support(c) + self.predicted(c) > 0)
                    .collect();

                if present.is_empty() {
                    return 0.0;
                }

                present.iter().map(|&c| self.class_f1(c)).sum::<f64>() / present.len() as f64
            }
            Average::Micro => {
                let tp: usize = (0..n_classes).map(|c| self.true_positives(c)).sum();
                let fp: usize = (0..n_classes).map(|c| self.false_positives(c)).sum();
                let fn_: usize = (0..n_classes).map(|c| self.false_negatives(c)).sum();

                ratio(2 * tp, 2 * tp + fp + fn_)
            }
            Average::Weighted => {
                let total = self.total();
                if total == 0 {
                    return 0.0;
                }

                (0..n_classes)
                    .map(|c| self.class_f1(c) * self.support(c) as f64)
                    .sum::<f64>()
                    / total as f64
            }
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Compute F1 for an evaluation batch: arg-max over the class axis of `logits`, then F1
/// against `references`
pub fn compute_metrics<B: Backend>(
    logits: Tensor<B, 2>,
    references: Tensor<B, 1, Int>,
    average: Average,
) -> f64 {
    let [_batch_size, n_classes] = logits.dims();

    let predictions = argmax_classes(logits);
    let references = to_class_ids(references);

    ConfusionMatrix::from_predictions(n_classes, &predictions, &references).f1(average)
}

/// The input for the [`F1ScoreMetric`]
#[derive(new)]
pub struct F1Input<B: Backend> {
    /// Raw class scores: [batch_size, n_classes]
    pub outputs: Tensor<B, 2>,

    /// Reference class ids: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Adaptor<F1Input<B>> for ClassificationOutput<B> {
    fn adapt(&self) -> F1Input<B> {
        F1Input::new(self.output.clone(), self.targets.clone())
    }
}

/// Epoch-to-date F1 score. Counts accumulate across batches until the learner clears the
/// metric at the end of an epoch, so every entry displays F1 over all batches seen so far.
///
/// The learner aggregates an epoch as the mean of the serialized entries. Batch `k` therefore
/// serializes `k * f1_k - (k - 1) * f1_{k-1}`, which makes the mean over `n` batches equal to
/// the F1 over the whole epoch.
pub struct F1ScoreMetric<B: Backend> {
    average: Average,
    matrix: ConfusionMatrix,
    batches: usize,
    running: f64,
    _backend: PhantomData<B>,
}

impl<B: Backend> F1ScoreMetric<B> {
    /// Create the metric with the given averaging strategy
    pub fn new(average: Average) -> Self {
        Self {
            average,
            matrix: ConfusionMatrix::default(),
            batches: 0,
            running: 0.0,
            _backend: PhantomData,
        }
    }

    /// Count a batch. Returns the F1 over everything seen since the last clear, and the value
    /// to serialize for this batch.
    fn record(&mut self, input: &F1Input<B>) -> (f64, f64) {
        let predictions = argmax_classes(input.outputs.clone());
        let references = to_class_ids(input.targets.clone());

        self.matrix.update(&predictions, &references);

        let previous = self.running;
        let k = self.batches as f64;

        self.batches += 1;
        self.running = self.matrix.f1(self.average);

        (self.running, (k + 1.0) * self.running - k * previous)
    }
}

impl<B: Backend> Default for F1ScoreMetric<B> {
    fn default() -> Self {
        Self::new(Average::Weighted)
    }
}

impl<B: Backend> Metric for F1ScoreMetric<B> {
    const NAME: &'static str = "F1 Score";

    type Input = F1Input<B>;

    fn update(&mut self, input: &F1Input<B>, _metadata: &MetricMetadata) -> MetricEntry {
        let (running, serialized) = self.record(input);

        MetricEntry::new(
            Self::NAME.to_string(),
            format!("{} ({}): {:.4}", Self::NAME, self.average, running),
            serialized.to_string(),
        )
    }

    fn clear(&mut self) {
        self.matrix = ConfusionMatrix::default();
        self.batches = 0;
        self.running = 0.0;
    }
}

impl<B: Backend> Numeric for F1ScoreMetric<B> {
    fn value(&self) -> f64 {
        self.matrix.f1(self.average)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::{Data, Shape},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::tensors::class_ids;

    type TestBackend = NdArray;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_perfect_predictions() {
        let matrix = ConfusionMatrix::from_predictions(4, &[0, 1, 2, 3, 1], &[0, 1, 2, 3, 1]);

        assert_close(matrix.accuracy(), 1.0);
        assert_close(matrix.f1(Average::Macro), 1.0);
        assert_close(matrix.f1(Average::Micro), 1.0);
        assert_close(matrix.f1(Average::Weighted), 1.0);
    }

    #[test]
    fn test_f1_averages() {
        // references: 0 0 0 1 1 2
        // predictions: 0 0 1 1 2 2
        let matrix =
            ConfusionMatrix::from_predictions(3, &[0, 0, 1, 1, 2, 2], &[0, 0, 0, 1, 1, 2]);

        assert_eq!(matrix.matrix(), &[vec![2, 1, 0], vec![0, 1, 1], vec![0, 0, 1]]);

        // class 0: p = 1, r = 2/3, f1 = 0.8
        // class 1: p = 1/2, r = 1/2, f1 = 0.5
        // class 2: p = 1/2, r = 1, f1 = 2/3
        assert_close(matrix.class_f1(0), 0.8);
        assert_close(matrix.class_f1(1), 0.5);
        assert_close(matrix.class_f1(2), 2.0 / 3.0);

        assert_close(matrix.f1(Average::Macro), (0.8 + 0.5 + 2.0 / 3.0) / 3.0);
        assert_close(matrix.f1(Average::Micro), 4.0 / 6.0);
        assert_close(
            matrix.f1(Average::Weighted),
            (0.8 * 3.0 + 0.5 * 2.0 + 2.0 / 3.0) / 6.0,
        );
        assert_close(matrix.accuracy(), 4.0 / 6.0);
    }

    #[test]
    fn test_absent_classes_do_not_divide_by_zero() {
        let matrix = ConfusionMatrix::from_predictions(4, &[0, 0], &[0, 1]);

        assert_close(matrix.precision(3), 0.0);
        assert_close(matrix.recall(3), 0.0);
        assert_close(matrix.class_f1(3), 0.0);

        // Classes 2 and 3 are neither referenced nor predicted
        assert_close(matrix.f1(Average::Macro), (2.0 / 3.0 + 0.0) / 2.0);

        let empty = ConfusionMatrix::new(4);
        assert_close(empty.f1(Average::Macro), 0.0);
        assert_close(empty.f1(Average::Weighted), 0.0);
        assert_close(empty.f1(Average::Micro), 0.0);
        assert_close(empty.accuracy(), 0.0);
    }

    #[test]
    fn test_matrix_grows_for_unseen_classes() {
        let mut matrix = ConfusionMatrix::default();
        matrix.update(&[2], &[0]);
        matrix.update(&[1], &[3]);

        assert_eq!(matrix.n_classes(), 4);
        assert_eq!(matrix.total(), 2);
        assert_eq!(matrix.support(3), 1);
        assert_eq!(matrix.predicted(2), 1);
    }

    #[test]
    fn test_average_from_str() {
        assert_eq!("macro".parse::<Average>().unwrap(), Average::Macro);
        assert_eq!("Weighted".parse::<Average>().unwrap(), Average::Weighted);
        assert!("mean".parse::<Average>().is_err());
    }

    #[test]
    fn test_compute_metrics() {
        let device = NdArrayDevice::Cpu;
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [
                [3.0, 0.1, 0.1, 0.1],
                [0.1, 3.0, 0.1, 0.1],
                [0.1, 0.1, 0.1, 3.0],
                [0.1, 0.1, 3.0, 0.1],
            ],
            &device,
        );
        let references = class_ids::<TestBackend>(&[0, 1, 2, 2], &device);

        // predictions 0 1 3 2 -> class 2: p = 1, r = 1/2; class 3: p = 0
        let f1 = compute_metrics(logits, references, Average::Micro);

        assert_close(f1, 0.75);
    }

    #[test]
    fn test_metric_accumulates_until_cleared() {
        let device = NdArrayDevice::Cpu;
        let mut metric = F1ScoreMetric::<TestBackend>::new(Average::Micro);

        let first = F1Input::new(
            Tensor::from_floats([[1.0, 0.0], [1.0, 0.0]], &device),
            class_ids(&[0, 0], &device),
        );
        let second = F1Input::new(
            Tensor::from_floats([[1.0, 0.0], [1.0, 0.0]], &device),
            class_ids(&[1, 1], &device),
        );

        assert_close(metric.record(&first).0, 1.0);
        assert_close(metric.value(), 1.0);

        assert_close(metric.record(&second).0, 0.5);
        assert_close(metric.value(), 0.5);

        metric.clear();
        assert_close(metric.value(), 0.0);

        // A cleared metric starts a new epoch
        assert_close(metric.record(&second).1, 0.0);
    }

    #[test]
    fn test_mean_of_serialized_entries_is_epoch_f1() {
        let device = NdArrayDevice::Cpu;
        let batches: [(Vec<[f32; 3]>, Vec<usize>); 3] = [
            // all correct
            (vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![0, 1]),
            // all wrong
            (vec![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]], vec![1, 2]),
            (vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]], vec![2, 2, 0]),
        ];

        let scores = |rows: &[[f32; 3]]| {
            let values: Vec<f32> = rows.iter().flatten().copied().collect();

            Tensor::<TestBackend, 2>::from_data(Data::new(values, Shape::new([rows.len(), 3])), &device)
        };

        for average in [Average::Micro, Average::Macro, Average::Weighted] {
            let mut metric = F1ScoreMetric::<TestBackend>::new(average);
            let mut matrix = ConfusionMatrix::new(3);
            let mut serialized = Vec::new();

            for (rows, targets) in &batches {
                let input = F1Input::new(scores(rows), class_ids(targets, &device));

                let predictions = argmax_classes(input.outputs.clone());
                matrix.update(&predictions, targets);

                serialized.push(metric.record(&input).1);

                let mean = serialized.iter().sum::<f64>() / serialized.len() as f64;
                assert_close(mean, matrix.f1(average));
            }
        }
    }

    #[test]
    fn test_epoch_f1_is_not_a_mean_of_running_values() {
        let device = NdArrayDevice::Cpu;
        let mut metric = F1ScoreMetric::<TestBackend>::new(Average::Micro);

        let correct = F1Input::new(
            Tensor::from_floats([[1.0, 0.0], [1.0, 0.0]], &device),
            class_ids(&[0, 0], &device),
        );
        let wrong = F1Input::new(
            Tensor::from_floats([[1.0, 0.0], [1.0, 0.0]], &device),
            class_ids(&[1, 1], &device),
        );

        let (_, first) = metric.record(&correct);
        let (running, second) = metric.record(&wrong);

        assert_close(first, 1.0);
        assert_close(second, 0.0);
        assert_close((first + second) / 2.0, 0.5);
        assert_close(running, 0.5);
    }
}
