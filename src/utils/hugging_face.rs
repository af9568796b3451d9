use std::path::PathBuf;

use hf_hub::api::tokio::Api;

/// Download model config and weights from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<(PathBuf, PathBuf)> {
    let api = Api::new().map_err(|e| anyhow!("Unable to reach the Hugging Face Hub: {}", e))?;
    let repo = api.model(model_name.to_string());

    log::info!("Fetching {} from the Hugging Face Hub...", model_name);

    let (config_filepath, model_filepath) =
        futures::try_join!(repo.get("config.json"), repo.get("model.safetensors")).map_err(
            |e| {
                anyhow!(
                    "Failed to download config.json and model.safetensors for {}: {}",
                    model_name,
                    e
                )
            },
        )?;

    Ok((config_filepath, model_filepath))
}
