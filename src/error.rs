use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by the metadata codec, the batch processor and the table export.
///
/// Per-item variants (`UnsupportedFormat`, `Decode`, `Encode`) are caught by the
/// batch layer and turned into per-record status. Only [`MetaError::Export`]
/// is meant to reach the user directly.
#[derive(Error, Debug)]
pub enum MetaError {
    #[error("unsupported image format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to read metadata from {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("failed to write metadata to {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("failed to export table {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl MetaError {
    pub(crate) fn decode(path: &Path, err: anyhow::Error) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn encode(path: &Path, err: anyhow::Error) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn export(path: &Path, source: impl Into<csv::Error>) -> Self {
        Self::Export {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetaError>;
