//! Command line tool to classify news headlines with a fine-tuned model

use std::path::PathBuf;

use anyhow::anyhow;
use burn::backend::{Autodiff, LibTorch};
use burn_agnews::{
    cli::reject_unexpected,
    datasets::{ag_news, LoadableDataset, Source, Split},
    models::bert,
    pipelines::text_classification::{self, infer},
    utils::devices::libtorch_devices,
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: infer [PIPELINE] [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use (defaults to 'text-classification')

Options:
  -h, --help           Print help
  -o, --output-dir     The directory the fine-tuned model was written to
  -n, --num-samples    Classify this many random rows of the test split instead of the built-in headlines
  -d, --data-dir       Read test.csv from this directory instead of the hub

Environment:
  AGNEWS_OUTPUT_DIR    Default model directory
";

#[derive(Debug)]
struct Args {
    pipeline: Option<String>,
    output_dir: Option<String>,
    num_samples: Option<usize>,
    data_dir: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let args = Args {
        output_dir: pargs.opt_value_from_str(["-o", "--output-dir"])?,
        num_samples: pargs.opt_value_from_str(["-n", "--num-samples"])?,
        data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
        pipeline: pargs.opt_free_from_str()?,
    };

    reject_unexpected(pargs.finish())?;

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = parse_args()? else {
        println!("{}", HELP);
        return Ok(());
    };

    if let Some(pipeline) = &args.pipeline {
        if pipeline != text_classification::PIPELINE {
            return Err(anyhow!("Unsupported pipeline: {}", pipeline));
        }
    }

    let artifact_dir = args
        .output_dir
        .clone()
        .or_else(|| std::env::var("AGNEWS_OUTPUT_DIR").ok())
        .unwrap_or_else(|| "output".to_string());

    let device = libtorch_devices()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No device available"))?;

    let samples: Vec<(String, String)> = match args.num_samples {
        Some(count) => {
            let source = match &args.data_dir {
                Some(dir) => Source::Local(dir.clone()),
                None => Source::Hub(ag_news::DATASET.to_string()),
            };

            ag_news::Dataset::load(&source, &ag_news::TEST_SPLIT.parse::<Split>()?)
                .await?
                .get_samples(count)
        }
        None => [
            ("Wall St. Bears Claw Back Into the Black as tech stocks rally", "Business"),
            ("Federer cruises into the semifinals after a straight-sets win", "Sports"),
            ("UN envoy urges talks as fighting spreads across the region", "World"),
            ("New chip promises faster graphics for laptops and phones", "Sci/Tech"),
            ("Oil prices climb as supply worries weigh on markets", "Business"),
            ("Scientists map the genome of a drought-resistant wheat", "Sci/Tech"),
        ]
        .into_iter()
        .map(|(text, label)| (text.to_string(), label.to_string()))
        .collect(),
    };

    let input: Vec<String> = samples.iter().map(|(text, _)| text.clone()).collect();

    // Get model predictions
    let predictions = infer::<
        Autodiff<LibTorch>,
        bert::text_classification::Model<Autodiff<LibTorch>>,
    >(device, &artifact_dir, input)?;

    // Print out predictions for each sample
    for (i, ((text, expected), prediction)) in samples.into_iter().zip(predictions).enumerate() {
        println!(
            "\n=== Item {i} ===\
             \n- Text: {text}\
             \n- Class: {} ({:.3})\
             \n- Expected: {expected}\
             \n================",
            prediction.label, prediction.score
        );
    }

    Ok(())
}
