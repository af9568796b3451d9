use std::ffi::OsString;

/// CLI Indexes: Datasets
pub mod datasets;

/// CLI Indexes: Models
pub mod models;

/// CLI Indexes: Pipelines
pub mod pipelines;

/// Fail on any arguments the parser did not consume
pub fn reject_unexpected(remaining: Vec<OsString>) -> anyhow::Result<()> {
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Unexpected arguments: {:?}", remaining))
    }
}
