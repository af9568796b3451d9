//! Command line tool to fine-tune a model for news topic classification

use std::path::PathBuf;

use anyhow::anyhow;
use burn::{
    backend::{Autodiff, LibTorch},
    config::Config as _,
    LearningRate,
};
use burn_agnews::{
    cli::{datasets::Dataset, models::Model, pipelines::Pipeline, reject_unexpected},
    datasets::{ag_news, LoadableDataset, Source, Split},
    models::bert,
    pipelines::text_classification::{self, Training},
    utils::devices::libtorch_devices,
};
use pico_args::Arguments;

/// Overrides the default output location when `-o` is not given
const OUTPUT_DIR_ENV: &str = "AGNEWS_OUTPUT_DIR";

const HELP: &str = "\
Usage: train [PIPELINE] [DATASET] [OPTIONS]

Arguments:
  PIPELINE               The pipeline to use (defaults to 'text-classification')
  DATASET                The dataset to use (defaults to 'ag_news')

Options:
  -h, --help             Print help
  --config               A training config JSON file to start from
  -m, --model            The model to use (e.g., 'bert-base-uncased')
  -n, --num-epochs       Number of epochs to train for
  -b, --batch-size       Batch size for training and evaluation
  -l, --learning-rate    Peak learning rate
  -o, --output-dir       Where checkpoints and the final model are written
  -d, --data-dir         Read {split}.csv files from this directory instead of the hub
  --train-split          Training split expression (e.g., 'train[:10%]')
  --eval-split           Evaluation split expression (e.g., 'test')
  --no-tui               Log progress instead of rendering the dashboard

Environment:
  AGNEWS_OUTPUT_DIR      Default output directory
  RUST_LOG               Log level (defaults to 'info')
";

#[derive(Debug)]
struct Args {
    pipeline: Option<String>,
    dataset: Option<String>,
    config: Option<PathBuf>,
    model: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<LearningRate>,
    output_dir: Option<String>,
    data_dir: Option<PathBuf>,
    train_split: Option<String>,
    eval_split: Option<String>,
    use_tui: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs.opt_value_from_str("--config")?,
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            learning_rate: pargs.opt_value_from_str(["-l", "--learning-rate"])?,
            output_dir: pargs.opt_value_from_str(["-o", "--output-dir"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            train_split: pargs.opt_value_from_str("--train-split")?,
            eval_split: pargs.opt_value_from_str("--eval-split")?,
            use_tui: !(pargs.contains("--no-tui")),
            pipeline: pargs.opt_free_from_str()?,
            dataset: pargs.opt_free_from_str()?,
        };

        reject_unexpected(pargs.finish())?;

        Ok(Some(args))
    }

    /// Build the training config from an optional file, the environment, and the flags
    fn training_config(&self, model: &Model) -> anyhow::Result<Training> {
        let mut config = match &self.config {
            Some(path) => Training::load(path)
                .map_err(|e| anyhow!("Unable to load training config {:?}: {}", path, e))?,
            None => Training::new(ag_news::labels().names()),
        };

        config.model_name = model.to_string();

        if let Ok(output_dir) = std::env::var(OUTPUT_DIR_ENV) {
            config.output_dir = output_dir;
        }

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }

        if let Some(num_epochs) = self.num_epochs {
            config.num_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.train_batch_size = batch_size;
            config.eval_batch_size = batch_size;
        }

        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }

        if let Some(train_split) = &self.train_split {
            config.train_split = train_split.clone();
        }

        if let Some(eval_split) = &self.eval_split {
            config.eval_split = eval_split.clone();
        }

        config.validate()?;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let pipeline = match &args.pipeline {
        Some(pipeline) => Pipeline::try_from(pipeline.as_str())?,
        None => Pipeline::TextClassification,
    };

    let model = match &args.model {
        Some(model) => Model::try_from(model.as_str())?,
        None => pipeline.default_model(),
    };

    if !model.is_supported(&pipeline) {
        return Err(anyhow!("{} does not support the {} pipeline", model, pipeline));
    }

    let dataset = match &args.dataset {
        Some(dataset) => Dataset::try_from(dataset.as_str())?,
        None => Dataset::AgNews,
    };

    match pipeline {
        Pipeline::TextClassification => handle_text_classification(&dataset, &model, &args).await,
    }
}

async fn handle_text_classification(
    dataset: &Dataset,
    model: &Model,
    args: &Args,
) -> anyhow::Result<()> {
    type Backend = Autodiff<LibTorch>;

    let config = args.training_config(model)?;
    dataset.check_configured(&config.dataset_name)?;

    let source = match &args.data_dir {
        Some(dir) => Source::Local(dir.clone()),
        None => Source::Hub(dataset.hub_id().to_string()),
    };

    match dataset {
        Dataset::AgNews => {
            let train = ag_news::Dataset::load(&source, &config.train_split.parse::<Split>()?).await?;
            let eval = ag_news::Dataset::load(&source, &config.eval_split.parse::<Split>()?).await?;

            let devices = libtorch_devices();
            log::info!("Training {} on {:?}", model, devices);

            let output_dir = config.output_dir.clone();

            let report = text_classification::train::<
                Backend,
                bert::text_classification::Model<Backend>,
                ag_news::Item,
                ag_news::Dataset,
            >(devices, train, eval, config, args.use_tui)
            .await?;

            log::info!(
                "Saved the fine-tuned model to {} (F1 {:.4}, accuracy {:.4})",
                output_dir,
                report.f1,
                report.accuracy
            );
        }
    }

    Ok(())
}
