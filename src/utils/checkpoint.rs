use std::{
    io,
    path::{Path, PathBuf},
};

/// The directory the learner's file checkpointer writes into
pub fn checkpoint_dir(artifact_dir: &str) -> PathBuf {
    Path::new(artifact_dir).join("checkpoint")
}

/// The path of a model checkpoint for the given epoch, without the recorder's file extension
pub fn model_checkpoint(artifact_dir: &str, epoch: usize) -> PathBuf {
    checkpoint_dir(artifact_dir).join(format!("model-{epoch}"))
}

/// List the epochs that still have a model checkpoint on disk, in ascending order
pub fn retained_epochs(artifact_dir: &str) -> io::Result<Vec<usize>> {
    let dir = checkpoint_dir(artifact_dir);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut epochs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let file_name = entry?.file_name();

        if let Some(epoch) = file_name.to_str().and_then(parse_model_epoch) {
            epochs.push(epoch);
        }
    }

    epochs.sort_unstable();

    Ok(epochs)
}

/// Remove every checkpoint left in the artifact dir, so a new run starts from an empty
/// checkpoint directory
pub fn clear_checkpoints(artifact_dir: &str) -> io::Result<()> {
    let dir = checkpoint_dir(artifact_dir);

    if dir.exists() {
        log::info!("Removing stale checkpoints from {}", dir.display());

        std::fs::remove_dir_all(dir)?;
    }

    Ok(())
}

/// The epoch of the single model checkpoint kept by a best-only run, if any
pub fn best_retained_epoch(artifact_dir: &str) -> io::Result<Option<usize>> {
    match retained_epochs(artifact_dir)?.as_slice() {
        [] => Ok(None),
        [epoch] => Ok(Some(*epoch)),
        epochs => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Expected a single best checkpoint in {}, found epochs {:?}",
                checkpoint_dir(artifact_dir).display(),
                epochs
            ),
        )),
    }
}

/// Parse the epoch out of a model checkpoint file name such as `model-3.mpk`
fn parse_model_epoch(file_name: &str) -> Option<usize> {
    let stem = file_name.strip_prefix("model-")?;
    let epoch = stem.split_once('.').map_or(stem, |(epoch, _ext)| epoch);

    epoch.parse().ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_model_epoch() {
        assert_eq!(parse_model_epoch("model-3.mpk"), Some(3));
        assert_eq!(parse_model_epoch("model-12.mpk.gz"), Some(12));
        assert_eq!(parse_model_epoch("optim-3.mpk"), None);
        assert_eq!(parse_model_epoch("scheduler-1.mpk"), None);
        assert_eq!(parse_model_epoch("model-final.mpk"), None);
    }

    fn temp_artifact_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("burn-agnews-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_retained_epochs() -> io::Result<()> {
        let artifact_dir = temp_artifact_dir("checkpoints");
        let dir = checkpoint_dir(artifact_dir.to_str().unwrap());
        std::fs::create_dir_all(&dir)?;

        for name in ["model-2.mpk", "optim-2.mpk", "scheduler-2.mpk", "model-1.mpk"] {
            std::fs::write(dir.join(name), b"")?;
        }

        let epochs = retained_epochs(artifact_dir.to_str().unwrap())?;
        std::fs::remove_dir_all(&artifact_dir)?;

        assert_eq!(epochs, vec![1, 2]);

        Ok(())
    }

    #[test]
    fn test_retained_epochs_without_checkpoints() -> io::Result<()> {
        assert_eq!(retained_epochs("/nonexistent/burn-agnews")?, Vec::<usize>::new());

        Ok(())
    }

    #[test]
    fn test_stale_checkpoints_are_not_restored() -> io::Result<()> {
        let artifact_dir = temp_artifact_dir("reused-output");
        let artifact = artifact_dir.to_str().unwrap();
        let dir = checkpoint_dir(artifact);

        // A previous, longer run left its best checkpoint behind
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("model-5.mpk"), b"")?;
        std::fs::write(dir.join("optim-5.mpk"), b"")?;

        clear_checkpoints(artifact)?;
        assert!(!dir.exists());
        assert_eq!(best_retained_epoch(artifact)?, None);

        // The current run keeps its best epoch
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("model-1.mpk"), b"")?;

        let best = best_retained_epoch(artifact);
        std::fs::remove_dir_all(&artifact_dir)?;

        assert_eq!(best?, Some(1));

        Ok(())
    }

    #[test]
    fn test_best_retained_epoch_rejects_ambiguous_checkpoints() -> io::Result<()> {
        let artifact_dir = temp_artifact_dir("ambiguous");
        let artifact = artifact_dir.to_str().unwrap();
        let dir = checkpoint_dir(artifact);

        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("model-5.mpk"), b"")?;
        std::fs::write(dir.join("model-1.mpk"), b"")?;

        let best = best_retained_epoch(artifact);
        std::fs::remove_dir_all(&artifact_dir)?;

        assert_eq!(best.map_err(|e| e.kind()), Err(io::ErrorKind::InvalidData));

        Ok(())
    }

    #[test]
    fn test_clear_checkpoints_without_checkpoints() -> io::Result<()> {
        clear_checkpoints("/nonexistent/burn-agnews")
    }
}
