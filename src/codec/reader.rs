use anyhow::{Context, Result, anyhow, bail};
use exif::{In, Tag, Value};
use image::ImageReader;
use img_parts::png::Png;
use img_parts::jpeg::Jpeg;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;
use std::path::Path;

use super::format::ImageKind;
use super::png_text::read_text_entries;
use super::text::{decode_utf8, decode_xp};
use super::webp;
use super::{KEY_DESCRIPTION, KEY_KEYWORDS, KEY_TITLE, TAG_XP_KEYWORDS, TAG_XP_TITLE};
use crate::record::CanonicalFields;

/// Read the canonical fields from a supported image file.
pub(crate) fn read_fields(path: &Path, kind: ImageKind) -> Result<CanonicalFields> {
    let bytes = std::fs::read(path).context("Failed to read image file")?;

    match kind {
        ImageKind::Png => {
            let png = Png::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse PNG: {e}"))?;
            Ok(fields_from_png(&png))
        }
        ImageKind::Jpeg => {
            let jpeg = Jpeg::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse JPEG: {e}"))?;
            fields_from_tiff(jpeg.exif())
        }
        ImageKind::WebP => {
            let webp = WebP::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse WebP: {e}"))?;
            fields_from_tiff(webp::read_exif(&webp).map(|exif| exif.tiff))
        }
        ImageKind::Tiff => fields_from_tiff(Some(Bytes::from(bytes))),
        ImageKind::Bmp | ImageKind::Gif => {
            // No EXIF carrier, but the file still has to be a readable image.
            ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()
                .context("Failed to open image")?
                .into_dimensions()
                .context("Failed to parse image header")?;
            Ok(CanonicalFields::default())
        }
    }
}

/// Map PNG text entries onto the canonical fields. The first entry per key wins.
fn fields_from_png(png: &Png) -> CanonicalFields {
    let mut title = None;
    let mut description = None;
    let mut keywords = None;

    for entry in read_text_entries(png) {
        let slot = match entry.keyword.as_str() {
            KEY_TITLE => &mut title,
            KEY_DESCRIPTION => &mut description,
            KEY_KEYWORDS => &mut keywords,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(entry.text);
        }
    }

    CanonicalFields {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        keywords: keywords.unwrap_or_default(),
    }
}

/// Map an EXIF TIFF block onto the canonical fields.
///
/// A missing block means "no metadata"; a block that does not parse is an error.
/// Damage past IFD0 (a dangling next-IFD link, a broken sub-IFD) is tolerated
/// as long as some fields could be read.
fn fields_from_tiff(tiff: Option<Bytes>) -> Result<CanonicalFields> {
    let Some(tiff) = tiff else {
        log::debug!("No EXIF block present");
        return Ok(CanonicalFields::default());
    };

    let exif = read_lenient(tiff.to_vec())?;

    Ok(CanonicalFields {
        title: xp_field(&exif, TAG_XP_TITLE),
        description: exif
            .get_field(Tag::ImageDescription, In::PRIMARY)
            .map(|field| plain_text(&field.value))
            .unwrap_or_default(),
        keywords: xp_field(&exif, TAG_XP_KEYWORDS),
    })
}

fn read_lenient(tiff: Vec<u8>) -> Result<exif::Exif> {
    let err = match exif::Reader::new().continue_on_error(true).read_raw(tiff) {
        Ok(exif) => return Ok(exif),
        Err(err) => err,
    };

    let mut ignored = Vec::new();
    let exif = err
        .distill_partial_result(|errors| ignored = errors)
        .context("Failed to parse EXIF block")?;
    if exif.fields().len() == 0 {
        let first = ignored.first().map(ToString::to_string).unwrap_or_default();
        bail!("Failed to parse EXIF block: {first}");
    }
    for e in &ignored {
        log::debug!("Ignoring EXIF error: {e}");
    }
    Ok(exif)
}

fn xp_field(exif: &exif::Exif, tag: Tag) -> String {
    match exif.get_field(tag, In::PRIMARY).map(|field| &field.value) {
        Some(Value::Byte(bytes)) | Some(Value::Undefined(bytes, _)) => decode_xp(bytes),
        // Some writers store XP tags as SHORT arrays of UTF-16 code units.
        Some(Value::Short(units)) => {
            let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
            decode_xp(&bytes)
        }
        Some(other) => {
            log::debug!("Unexpected value type for {tag}: {other:?}");
            String::new()
        }
        None => String::new(),
    }
}

/// `ImageDescription` is plain bytes; always UTF-8, never UTF-16LE.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Ascii(parts) => {
            let joined: Vec<u8> = parts.concat();
            decode_utf8(&joined)
        }
        Value::Byte(bytes) | Value::Undefined(bytes, _) => decode_utf8(bytes),
        other => {
            log::debug!("Unexpected ImageDescription type: {other:?}");
            String::new()
        }
    }
}
