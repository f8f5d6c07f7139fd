//! Format-aware decode/encode of the canonical fields.
//!
//! - [`classify`]: which metadata container a file uses
//! - [`decode`]: read title/description/keywords, never failing
//! - [`encode`]: write edited fields into a copy of the source image
//!
//! | Container | Title | Description | Keywords |
//! |-----------|-------|-------------|----------|
//! | EXIF (JPEG, TIFF, WebP) | `XPTitle` (UTF-16LE) | `ImageDescription` (UTF-8) | `XPKeywords` (UTF-16LE) |
//! | PNG text chunks | `Title` | `Description` | `Keywords` |
//!
//! BMP and GIF are read as EXIF images without an EXIF block, so they always
//! decode to empty fields and cannot be written.

mod format;
mod png_text;
mod reader;
mod text;
mod webp;
mod writer;

pub use format::{ContainerFormat, ImageKind, SUPPORTED_EXTENSIONS, classify, detect_kind, is_supported_image};
pub use text::{decode_utf8, decode_xp, encode_utf8, encode_xp};

use anyhow::Context;
use exif::{Context as ExifContext, Tag};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::PngTextMode;
use crate::error::{MetaError, Result};
use crate::record::CanonicalFields;

pub const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
/// Windows title tag, IFD0.
pub const TAG_XP_TITLE: Tag = Tag(ExifContext::Tiff, 0x9C9B);
/// Windows keywords tag, IFD0.
pub const TAG_XP_KEYWORDS: Tag = Tag(ExifContext::Tiff, 0x9C9E);

pub const KEY_TITLE: &str = "Title";
pub const KEY_DESCRIPTION: &str = "Description";
pub const KEY_KEYWORDS: &str = "Keywords";

/// Outcome of [`decode`]: the fields (empty when absent) and whether reading failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFields {
    pub fields: CanonicalFields,
    pub decode_failed: bool,
}

/// Read the canonical fields from a file, reporting failure as an error.
///
/// Unsupported files yield [`MetaError::UnsupportedFormat`].
pub fn try_decode(path: &Path) -> Result<CanonicalFields> {
    let kind = detect_kind(path).ok_or_else(|| MetaError::UnsupportedFormat(path.to_path_buf()))?;
    reader::read_fields(path, kind).map_err(|e| MetaError::decode(path, e))
}

/// Read the canonical fields from a file. Never fails.
///
/// Unsupported files give empty fields with `decode_failed == false`;
/// unreadable or unparsable files give empty fields with `decode_failed == true`.
///
/// ```rust,no_run
/// use image_meta_batch::codec::decode;
/// use std::path::Path;
///
/// let decoded = decode(Path::new("photo.jpg"));
/// if !decoded.decode_failed {
///     println!("Title: {}", decoded.fields.title);
/// }
/// ```
pub fn decode(path: &Path) -> DecodedFields {
    match try_decode(path) {
        Ok(fields) => DecodedFields {
            fields,
            decode_failed: false,
        },
        Err(MetaError::UnsupportedFormat(_)) => {
            log::debug!("Not decoding unsupported file {}", path.display());
            DecodedFields::default()
        }
        Err(e) => {
            log::warn!("{e}");
            DecodedFields {
                fields: CanonicalFields::default(),
                decode_failed: true,
            }
        }
    }
}

/// Write `fields` into a copy of `source` at `dest`.
///
/// `source` is only ever read. The destination's parent directory is created
/// as needed and the file is written through a temporary sibling, so a failed
/// write leaves neither a partial `dest` nor a newly created empty directory.
/// Nothing is created for unsupported sources or for a destination that
/// resolves to the source itself.
pub fn try_encode(source: &Path, dest: &Path, fields: &CanonicalFields, png_mode: PngTextMode) -> Result<()> {
    let kind = detect_kind(source).ok_or_else(|| MetaError::UnsupportedFormat(source.to_path_buf()))?;

    if same_file(source, dest) {
        return Err(MetaError::Encode {
            path: dest.to_path_buf(),
            reason: "destination is the source file".to_string(),
        });
    }

    let output = writer::rewrite(source, kind, fields, png_mode).map_err(|e| MetaError::encode(source, e))?;

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let created = missing_dirs(parent);
    std::fs::create_dir_all(parent).map_err(|e| MetaError::encode(dest, e.into()))?;

    if let Err(e) = write_via_temp(source, parent, dest, &output) {
        // Deepest first; remove_dir refuses anything that is not empty.
        for dir in &created {
            let _ = std::fs::remove_dir(dir);
        }
        return Err(MetaError::encode(dest, e));
    }

    log::debug!("Wrote {} ({} bytes)", dest.display(), output.len());
    Ok(())
}

/// Directories in `dir`'s ancestry that do not exist yet, deepest first.
fn missing_dirs(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect()
}

/// Write `bytes` to a temporary file next to `dest`, then rename it over `dest`.
/// `dest` is either left untouched or fully replaced.
fn write_via_temp(source: &Path, dir: &Path, dest: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temporary file")?;
    tmp.write_all(bytes).context("Failed to write temporary file")?;

    // Temporary files are private; give the copy the source's permissions.
    if let Ok(meta) = std::fs::metadata(source) {
        if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
            log::debug!("Could not copy permissions to {}: {e}", dest.display());
        }
    }

    tmp.persist(dest)
        .map_err(|e| e.error)
        .context("Failed to move temporary file into place")?;
    Ok(())
}

/// Write the edited fields into a copy of `source`. Returns `false` on any failure.
///
/// ```rust,no_run
/// use image_meta_batch::codec::encode;
/// use std::path::Path;
///
/// let ok = encode(
///     Path::new("photo.jpg"),
///     Path::new("edited_images/photo.jpg"),
///     "Summer Trip",
///     "Beach at sunset",
///     "beach, sunset, summer",
/// );
/// assert!(ok);
/// ```
pub fn encode(source: &Path, dest: &Path, title: &str, description: &str, keywords: &str) -> bool {
    let fields = CanonicalFields {
        title: title.to_string(),
        description: description.to_string(),
        keywords: keywords.to_string(),
    };
    encode_with(source, dest, &fields, PngTextMode::default())
}

/// [`encode`] with an explicit PNG text mode.
pub fn encode_with(source: &Path, dest: &Path, fields: &CanonicalFields, png_mode: PngTextMode) -> bool {
    match try_encode(source, dest, fields, png_mode) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{e}");
            false
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
