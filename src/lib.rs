//! # image-meta-batch
//!
//! Batch editor for the descriptive metadata of images: title, description and
//! keywords. Reads them from a batch of files, lets the caller edit them, and
//! writes edited **copies** (sources are never modified) or a CSV table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image_meta_batch::config::Config;
//! use image_meta_batch::export::export_csv;
//! use image_meta_batch::pipeline::{BatchProcessor, collect_images};
//! use std::path::{Path, PathBuf};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let processor = BatchProcessor::from_config(&config);
//!
//!     // Files or directories; directories are walked recursively
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!     let records = processor.extract(&images);
//!
//!     // Edit in memory, then write copies
//!     let mut edits: Vec<_> = records.iter().map(|r| r.fields.clone()).collect();
//!     for edit in &mut edits {
//!         edit.keywords = "holiday, 2024".into();
//!     }
//!     let summary = processor.apply_edits_and_write(&records, &edits, Path::new("edited_images"));
//!     println!("{} written, {} failed", summary.success_count, summary.failure_count);
//!
//!     // Or export everything as a table
//!     let table = export_csv(&records, Path::new("."))?;
//!     println!("Table: {}", table.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Container | Read | Write |
//! |--------|-----------|------|-------|
//! | JPEG (`.jpg`, `.jpeg`) | EXIF in APP1 | yes | yes |
//! | WebP (`.webp`) | EXIF chunk | yes | yes |
//! | TIFF (`.tif`, `.tiff`) | IFD0 | yes | yes |
//! | PNG (`.png`) | `tEXt`/`zTXt`/`iTXt` | yes | yes |
//! | BMP, GIF | none | empty fields | no |
//!
//! ## Modules
//!
//! - [`codec`]: format classification and field decode/encode
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: error taxonomy
//! - [`events`]: batch events and observers
//! - [`export`]: CSV export and edit import
//! - [`pipeline`]: image collection and the batch processor
//! - [`record`]: per-image records and field helpers
//! - [`thumbnail`]: preview rendering

pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod pipeline;
pub mod record;
pub mod thumbnail;

pub use codec::{ContainerFormat, classify, decode, encode};
pub use error::MetaError;
pub use pipeline::{BatchProcessor, BatchSummary};
pub use record::{CanonicalFields, EditedFields, MetadataRecord};
