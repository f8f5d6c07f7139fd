use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::codec::{self, is_supported_image};
use crate::config::{Config, PngTextMode};
use crate::error::MetaError;
use crate::events::{BatchEvent, BatchObserver, LogObserver};
use crate::record::{EditedFields, MetadataRecord};

/// Default cap on the number of inputs in one batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Outcome of [`BatchProcessor::apply_edits_and_write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failure_count: usize,
    /// `(source_path, reason)` for every failed record.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    fn fail(&mut self, source: &Path, reason: String) {
        self.failure_count += 1;
        self.failures.push((source.to_path_buf(), reason));
    }
}

/// Collect image files from the given paths.
///
/// Plain file arguments are kept as given (unsupported ones included, so that
/// they show up as `UNSUPPORTED` records). Directories are walked recursively
/// in sorted order and only files with supported extensions are kept.
///
/// ```rust,no_run
/// use image_meta_batch::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./photos/"),        // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            if !path.exists() {
                log::warn!("Path does not exist: {}", path.display());
            }
            images.push(path.clone());
        }
    }

    images
}

/// Runs extraction and write-back over a bounded, ordered batch.
///
/// Items are processed one after another; a failure on one item never stops
/// the others.
///
/// ```rust,no_run
/// use image_meta_batch::config::Config;
/// use image_meta_batch::pipeline::BatchProcessor;
/// use std::path::PathBuf;
///
/// let config = Config::default();
/// let processor = BatchProcessor::from_config(&config);
///
/// let mut records = processor.extract(&[PathBuf::from("photo.jpg")]);
/// records[0].fields.title = "Summer Trip".into();
///
/// let edits: Vec<_> = records.iter().map(|r| r.fields.clone()).collect();
/// let summary = processor.apply_edits_and_write(&records, &edits, "edited_images".as_ref());
/// println!("{} written, {} failed", summary.success_count, summary.failure_count);
/// ```
pub struct BatchProcessor<'a> {
    max_batch_size: usize,
    png_text_mode: PngTextMode,
    observer: &'a dyn BatchObserver,
}

impl Default for BatchProcessor<'static> {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            png_text_mode: PngTextMode::default(),
            observer: &LogObserver,
        }
    }
}

impl BatchProcessor<'static> {
    /// Processor using the configured limit and PNG mode, logging through [`LogObserver`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_batch_size: config.batch.max_batch_size,
            png_text_mode: config.batch.png_text_mode,
            observer: &LogObserver,
        }
    }
}

impl<'a> BatchProcessor<'a> {
    pub fn with_limit(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_png_text_mode(mut self, mode: PngTextMode) -> Self {
        self.png_text_mode = mode;
        self
    }

    pub fn with_observer<'b>(self, observer: &'b dyn BatchObserver) -> BatchProcessor<'b> {
        BatchProcessor {
            max_batch_size: self.max_batch_size,
            png_text_mode: self.png_text_mode,
            observer,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Decode every path, in input order. One record per path, up to the batch limit.
    pub fn extract(&self, paths: &[PathBuf]) -> Vec<MetadataRecord> {
        if paths.len() > self.max_batch_size {
            self.observer.on_event(&BatchEvent::Truncated {
                supplied: paths.len(),
                limit: self.max_batch_size,
            });
        }

        let batch = &paths[..paths.len().min(self.max_batch_size)];
        let total = batch.len();
        let mut records = Vec::with_capacity(total);

        for (index, path) in batch.iter().enumerate() {
            let record = MetadataRecord::from_path(path);
            self.observer.on_event(&BatchEvent::Decoded {
                index,
                total,
                path: path.clone(),
                format: record.format,
                decode_failed: record.decode_failed,
            });
            records.push(record);
        }

        records
    }

    /// Write an edited copy of each record to `output_dir/<filename>`.
    ///
    /// `edits[i]` applies to `records[i]`; records without a matching edit are
    /// written with their current fields. Records with an empty source path
    /// are skipped. A second record targeting an already written destination
    /// is counted as a failure instead of overwriting the first copy.
    pub fn apply_edits_and_write(
        &self,
        records: &[MetadataRecord],
        edits: &[EditedFields],
        output_dir: &Path,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut destinations: HashSet<PathBuf> = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            if record.source_path.as_os_str().is_empty() {
                continue;
            }
            let source = &record.source_path;

            if record.filename.is_empty() {
                self.fail(&mut summary, source, "no file name to write to".to_string());
                continue;
            }

            let dest = output_dir.join(&record.filename);
            if !destinations.insert(dest.clone()) {
                self.fail(
                    &mut summary,
                    source,
                    format!("another record in this batch already writes {}", dest.display()),
                );
                continue;
            }

            let fields = edits.get(index).unwrap_or(&record.fields);
            match codec::try_encode(source, &dest, fields, self.png_text_mode) {
                Ok(()) => {
                    summary.success_count += 1;
                    self.observer.on_event(&BatchEvent::Written {
                        source: source.clone(),
                        dest,
                    });
                }
                Err(MetaError::UnsupportedFormat(_)) => {
                    self.fail(&mut summary, source, "unsupported format".to_string());
                }
                Err(e) => self.fail(&mut summary, source, e.to_string()),
            }
        }

        summary
    }

    fn fail(&self, summary: &mut BatchSummary, source: &Path, reason: String) {
        self.observer.on_event(&BatchEvent::WriteFailed {
            source: source.to_path_buf(),
            reason: reason.clone(),
        });
        summary.fail(source, reason);
    }
}
