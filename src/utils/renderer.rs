use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};
use derive_new::new;

/// A simple renderer for TUI-disabled modes, forwarding learner progress to the log
#[derive(new)]
pub struct Simple {}

impl Simple {
    fn log_state(split: &str, state: MetricState) {
        match state {
            MetricState::Numeric(entry, value) => {
                log::debug!("[{}] {}: {:.4}", split, entry.name, value)
            }
            MetricState::Generic(entry) => {
                log::debug!("[{}] {}: {}", split, entry.name, entry.formatted)
            }
        }
    }

    fn log_progress(split: &str, item: TrainingProgress) {
        log::info!(
            "[{}] epoch {}/{} - iteration {} ({}/{} items)",
            split,
            item.epoch,
            item.epoch_total,
            item.iteration,
            item.progress.items_processed,
            item.progress.items_total
        );
    }
}

impl MetricsRenderer for Simple {
    fn update_train(&mut self, state: MetricState) {
        Self::log_state("train", state);
    }

    fn update_valid(&mut self, state: MetricState) {
        Self::log_state("valid", state);
    }

    fn render_train(&mut self, item: TrainingProgress) {
        Self::log_progress("train", item);
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        Self::log_progress("valid", item);
    }
}
