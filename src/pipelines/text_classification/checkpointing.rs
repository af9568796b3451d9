use burn::{
    tensor::backend::Backend,
    train::{
        checkpoint::{
            CheckpointingAction, CheckpointingStrategy, KeepLastNCheckpoints,
            MetricCheckpointingStrategy,
        },
        metric::{
            store::{Aggregate, Direction, EventStoreClient, Split},
            LossMetric,
        },
    },
};

use super::{
    config::{BestModelMetric, IntervalStrategy, Training},
    metric::F1ScoreMetric,
};

/// Which learner checkpoints survive each epoch
pub enum Checkpointing {
    /// Keep only the checkpoint with the best validation metric
    Best(MetricCheckpointingStrategy),

    /// Keep the most recent checkpoints
    LastN(KeepLastNCheckpoints),

    /// Never write checkpoints
    Never,
}

impl Checkpointing {
    /// Select the strategy implied by the training configuration
    pub fn from_config<B: Backend>(config: &Training) -> Self {
        if config.save_strategy == IntervalStrategy::No {
            return Checkpointing::Never;
        }

        if config.load_best_model_at_end {
            let strategy = match config.metric_for_best_model {
                BestModelMetric::Loss => MetricCheckpointingStrategy::new::<LossMetric<B>>(
                    Aggregate::Mean,
                    Direction::Lowest,
                    Split::Valid,
                ),
                BestModelMetric::F1 => MetricCheckpointingStrategy::new::<F1ScoreMetric<B>>(
                    Aggregate::Mean,
                    Direction::Highest,
                    Split::Valid,
                ),
            };

            return Checkpointing::Best(strategy);
        }

        let keep = config.save_total_limit.unwrap_or(config.num_epochs).max(1);

        Checkpointing::LastN(KeepLastNCheckpoints::new(keep))
    }

    /// Whether any checkpoint is written to disk
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Checkpointing::Never)
    }
}

impl CheckpointingStrategy for Checkpointing {
    fn checkpointing(
        &mut self,
        epoch: usize,
        collector: &EventStoreClient,
    ) -> Vec<CheckpointingAction> {
        match self {
            Checkpointing::Best(strategy) => strategy.checkpointing(epoch, collector),
            Checkpointing::LastN(strategy) => strategy.checkpointing(epoch, collector),
            Checkpointing::Never => Vec::new(),
        }
    }
}
