use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::{self, ContainerFormat};

/// The three descriptive fields shared by every supported container.
///
/// Absent values are empty strings, never `None`, so editing stays uniform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFields {
    pub title: String,
    pub description: String,
    /// Comma-joined tags, kept in insertion order.
    pub keywords: String,
}

/// Fields supplied for a record when writing copies.
pub type EditedFields = CanonicalFields;

impl CanonicalFields {
    pub fn title_chars(&self) -> usize {
        self.title.chars().count()
    }

    pub fn description_chars(&self) -> usize {
        self.description.chars().count()
    }

    /// Non-empty, trimmed entries of the comma-separated keyword list.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// One image in a batch.
///
/// Created at extract time; `source_path` is never written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub source_path: PathBuf,
    /// Base name of `source_path`, for display, export and output naming.
    pub filename: String,
    #[serde(flatten)]
    pub fields: CanonicalFields,
    pub format: ContainerFormat,
    /// Set when the file could not be opened or its metadata container parsed.
    pub decode_failed: bool,
}

impl MetadataRecord {
    /// Classify and decode one path. Never fails; problems end up in `decode_failed`.
    pub fn from_path(path: &Path) -> Self {
        let format = codec::classify(path);
        let decoded = codec::decode(path);
        Self {
            source_path: path.to_path_buf(),
            filename: filename_of(path),
            fields: decoded.fields,
            format,
            decode_failed: decoded.decode_failed,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.format != ContainerFormat::Unsupported
    }

    /// Short status for listings.
    pub fn status(&self) -> &'static str {
        if self.decode_failed {
            "unreadable"
        } else if !self.is_supported() {
            "unsupported"
        } else {
            "ok"
        }
    }
}

pub fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
