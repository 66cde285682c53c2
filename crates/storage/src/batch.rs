use chrono::{DateTime, Utc};
use ledgersort_core::TransactionBatch;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed batch file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `transactions-YYYYMMDD-HHMMSS.json`, from the batch's creation time.
pub fn batch_file_name(created: DateTime<Utc>) -> String {
    format!("transactions-{}.json", created.format("%Y%m%d-%H%M%S"))
}

/// Writes the batch as pretty JSON, creating parent directories as needed.
pub fn save_batch(path: &Path, batch: &TransactionBatch) -> Result<(), BatchError> {
    let io_err = |source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(batch).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)?;

    tracing::info!("Saved {} transactions to {}", batch.transactions.len(), path.display());
    Ok(())
}

pub fn load_batch(path: &Path) -> Result<TransactionBatch, BatchError> {
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })
}
