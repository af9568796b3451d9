use std::{path::Path, sync::Arc};

use burn::{
    config::Config as _,
    data::{
        dataloader::DataLoaderBuilder,
        dataset::{Dataset, InMemDataset},
    },
    lr_scheduler::linear::LinearLrSchedulerConfig,
    module::{AutodiffModule, Module},
    optim::AdamWConfig,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
    train::{
        metric::{AccuracyMetric, CudaMetric, LearningRateMetric, LossMetric},
        ClassificationOutput, LearnerBuilder, ValidStep,
    },
};

use crate::utils::{
    checkpoint::{best_retained_epoch, clear_checkpoints, model_checkpoint},
    classes::ClassLabels,
    hugging_face::download_hf_model,
    renderer::Simple,
};

use super::{
    batcher::Train,
    card,
    checkpointing::Checkpointing,
    config::{IntervalStrategy, Training},
    evaluation::{evaluate_report, EvalReport},
    metric::F1ScoreMetric,
    preprocess::{tokenize, Encoded, Preprocessor},
    Batcher, Item, Model, ModelConfig,
};

/// Fine-tune a pretrained model on a training split, evaluating on the eval split, and write
/// the best model with its configs, evaluation results and model card to the output dir
pub async fn train<B, M, I, D>(
    devices: Vec<B::Device>, // Devices on which to perform computation (e.g., CPU or CUDA devices)
    dataset_train: D,        // Training dataset
    dataset_eval: D,         // Evaluation dataset
    config: Training,        // Experiment configuration
    use_tui: bool,           // Render progress with the terminal dashboard instead of the log
) -> anyhow::Result<EvalReport>
where
    B: AutodiffBackend,
    M: Model<B> + 'static,
    I: Item + 'static,
    D: Dataset<I> + 'static,
    M::InnerModule: ValidStep<
        Train<<B as AutodiffBackend>::InnerBackend>,
        ClassificationOutput<<B as AutodiffBackend>::InnerBackend>,
    >,
{
    config.validate()?;

    let device = devices
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("At least one device is required for training"))?;

    let artifact_dir = config.output_dir.clone();
    std::fs::create_dir_all(&artifact_dir)?;
    clear_checkpoints(&artifact_dir)?;

    config.save(format!("{artifact_dir}/training_config.json"))?;

    let labels = ClassLabels::new(&config.labels);

    let (config_file, model_file) = download_hf_model(&config.model_name).await?;

    let model_config =
        M::Config::load_pretrained(config_file, &labels, config.hidden_dropout_prob).await?;

    let model = M::load_from_safetensors(&device, model_file, model_config.clone())?;

    let pipeline_config = model_config.get_config();
    let max_length = pipeline_config.max_input_len(config.max_seq_len);

    // Initialize tokenizer
    let preprocessor = Preprocessor::from_pretrained(&config.model_name, max_length)?;

    let pad_token_id = pipeline_config.pad_token_id;
    if let Some(id) = preprocessor.pad_token_id() {
        if id as usize != pad_token_id {
            log::warn!(
                "Tokenizer pad token {} differs from the model's pad token {}",
                id,
                pad_token_id
            );
        }
    }

    log::info!("Tokenizing {} training rows...", dataset_train.len());
    let encoded_train = tokenize(&preprocessor, &dataset_train)?;

    log::info!("Tokenizing {} evaluation rows...", dataset_eval.len());
    let encoded_eval = Arc::new(tokenize(&preprocessor, &dataset_eval)?);

    let num_workers = config.num_workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let total_steps = config.total_steps(encoded_train.len(), devices.len());

    // Initialize batchers for training and evaluation data
    let batcher_train = Batcher::<B>::new(preprocessor.clone(), pad_token_id, device.clone());
    let batcher_eval =
        Batcher::<B::InnerBackend>::new(preprocessor, pad_token_id, device.clone());

    // Initialize data loaders for training and evaluation data
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.train_batch_size)
        .shuffle(config.seed)
        .num_workers(num_workers)
        .build(encoded_train);

    let dataloader_valid = if config.eval_strategy == IntervalStrategy::No {
        DataLoaderBuilder::new(batcher_eval.clone())
            .batch_size(config.eval_batch_size)
            .build(InMemDataset::<Encoded>::new(Vec::new()))
    } else {
        DataLoaderBuilder::new(batcher_eval.clone())
            .batch_size(config.eval_batch_size)
            .num_workers(num_workers)
            .build(encoded_eval.clone())
    };

    // Initialize optimizer
    let optimizer = AdamWConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_weight_decay(config.weight_decay)
        .init();

    // Linear decay from the peak learning rate to zero over the whole run
    let lr_scheduler = LinearLrSchedulerConfig::new(config.learning_rate, 0.0, total_steps).init();

    let checkpointing = Checkpointing::from_config::<B>(&config);
    let checkpoints_enabled = checkpointing.is_enabled();

    // Initialize learner
    let builder = LearnerBuilder::new(&artifact_dir)
        .metric_train(CudaMetric::new())
        .metric_valid(CudaMetric::new())
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_train_numeric(F1ScoreMetric::new(config.f1_average))
        .metric_valid_numeric(F1ScoreMetric::new(config.f1_average))
        .metric_train_numeric(LearningRateMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .with_checkpointing_strategy(checkpointing)
        .with_application_logger(None)
        .devices(devices.clone())
        .num_epochs(config.num_epochs)
        .summary();

    let builder = if use_tui {
        builder
    } else {
        builder.renderer(Simple::new())
    };

    let learner = builder.build(model, optimizer, lr_scheduler);

    log::info!(
        "Fine-tuning {} for {} epochs ({} steps)...",
        config.model_name,
        config.num_epochs,
        total_steps
    );

    // Train the model
    let mut model_trained = learner.fit(dataloader_train, dataloader_valid);

    if config.load_best_model_at_end && checkpoints_enabled {
        model_trained = restore_best::<B, M>(model_trained, &artifact_dir, &device)?;
    }

    // Save the configuration and the trained model
    model_config
        .save(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to save the model config: {}", e))?;

    CompactRecorder::new()
        .record(
            model_trained.clone().into_record(),
            format!("{artifact_dir}/model").into(),
        )
        .map_err(|e| anyhow!("Unable to save trained model weights: {}", e))?;

    log::info!("Evaluating on {}...", config.eval_split);

    let dataloader_eval = DataLoaderBuilder::new(batcher_eval)
        .batch_size(config.eval_batch_size)
        .num_workers(num_workers)
        .build(encoded_eval);

    let report = evaluate_report(
        &model_trained.valid(),
        dataloader_eval,
        &labels,
        config.f1_average,
    );

    log::info!("Evaluation results:\n{}", report.to_report());

    report.save(format!("{artifact_dir}/eval_results.json"))?;

    let model_id = Path::new(&artifact_dir)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&config.model_name)
        .to_string();

    std::fs::write(
        format!("{artifact_dir}/README.md"),
        card::render(&model_id, &config, &report)?,
    )?;

    Ok(report)
}

/// Load the single checkpoint kept by the best-model strategy back into the model
fn restore_best<B, M>(model: M, artifact_dir: &str, device: &B::Device) -> anyhow::Result<M>
where
    B: AutodiffBackend,
    M: Model<B>,
{
    let Some(best) = best_retained_epoch(artifact_dir)? else {
        log::warn!("No checkpoint was retained, keeping the final weights");

        return Ok(model);
    };

    log::info!("Restoring the best checkpoint from epoch {}", best);

    let record = CompactRecorder::new()
        .load(model_checkpoint(artifact_dir, best), device)
        .map_err(|e| anyhow!("Unable to load checkpoint for epoch {}: {}", best, e))?;

    Ok(model.load_record(record))
}
