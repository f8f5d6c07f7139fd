use anyhow::{Context, Result, anyhow, bail};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use std::path::Path;

use super::format::ImageKind;
use super::png_text::{build_text_chunk, chunk_keyword, insert_before_iend, is_text_chunk};
use super::text::{encode_utf8, encode_xp};
use super::webp;
use super::{KEY_DESCRIPTION, KEY_KEYWORDS, KEY_TITLE, TAG_IMAGE_DESCRIPTION, TAG_XP_KEYWORDS, TAG_XP_TITLE};
use crate::config::PngTextMode;
use crate::record::CanonicalFields;

// TIFF field types
const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;

// APP1 payload is limited by its 16-bit length (which counts itself) and the "Exif\0\0" prefix.
const JPEG_EXIF_MAX: usize = u16::MAX as usize - 2 - 6;

/// Produce the bytes of `source` with the canonical fields replaced.
pub(crate) fn rewrite(
    source: &Path,
    kind: ImageKind,
    fields: &CanonicalFields,
    png_mode: PngTextMode,
) -> Result<Vec<u8>> {
    let bytes = std::fs::read(source).context("Failed to read image file")?;

    match kind {
        ImageKind::Jpeg => rewrite_jpeg(bytes, fields),
        ImageKind::WebP => rewrite_webp(bytes, fields),
        ImageKind::Tiff => inject_ifd0_entries(&bytes, &field_entries(fields)),
        ImageKind::Png => rewrite_png(bytes, fields, png_mode),
        ImageKind::Bmp | ImageKind::Gif => bail!("{kind:?} files have no EXIF container to write to"),
    }
}

/// Replace the EXIF APP1 segment of a JPEG, keeping every other segment byte-identical.
fn rewrite_jpeg(bytes: Vec<u8>, fields: &CanonicalFields) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse JPEG: {e}"))?;

    // Remember where the EXIF segment was originally positioned
    let orig_exif_pos = find_exif_segment_pos(&jpeg);
    let tiff = updated_tiff(jpeg.exif(), fields)?;
    if tiff.len() > JPEG_EXIF_MAX {
        bail!("EXIF block of {} bytes does not fit in a JPEG APP1 segment", tiff.len());
    }

    jpeg.set_exif(Some(Bytes::from(tiff)));

    // set_exif() re-inserts the segment near the start; move it back so that
    // EXIF stays ahead of any XMP APP1.
    if let (Some(new_pos), Some(target_pos)) = (find_exif_segment_pos(&jpeg), orig_exif_pos) {
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

fn rewrite_webp(bytes: Vec<u8>, fields: &CanonicalFields) -> Result<Vec<u8>> {
    let mut webp = WebP::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse WebP: {e}"))?;
    let existing = webp::read_exif(&webp);
    let prefixed = existing.as_ref().is_some_and(|exif| exif.prefixed);
    let tiff = updated_tiff(existing.map(|exif| exif.tiff), fields)?;
    webp::write_exif(&mut webp, tiff, prefixed)?;
    Ok(webp.encoder().bytes().to_vec())
}

/// Write the three text keys into a PNG.
///
/// `Replace` drops every existing text chunk first; `Merge` only drops chunks
/// carrying one of the three keys.
fn rewrite_png(bytes: Vec<u8>, fields: &CanonicalFields, mode: PngTextMode) -> Result<Vec<u8>> {
    let mut png = Png::from_bytes(Bytes::from(bytes)).map_err(|e| anyhow!("Failed to parse PNG: {e}"))?;

    let before = png.chunks().len();
    png.chunks_mut().retain(|chunk| {
        if !is_text_chunk(chunk.kind()) {
            return true;
        }
        match mode {
            PngTextMode::Replace => false,
            PngTextMode::Merge => !matches!(
                chunk_keyword(chunk).as_deref(),
                Some(KEY_TITLE | KEY_DESCRIPTION | KEY_KEYWORDS)
            ),
        }
    });
    log::debug!("Removed {} text chunk(s) ({mode:?})", before - png.chunks().len());

    let chunks = vec![
        build_text_chunk(KEY_TITLE, &fields.title)?,
        build_text_chunk(KEY_DESCRIPTION, &fields.description)?,
        build_text_chunk(KEY_KEYWORDS, &fields.keywords)?,
    ];
    insert_before_iend(&mut png, chunks);

    Ok(png.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Apply the canonical fields to an existing TIFF block, or to an empty one.
fn updated_tiff(existing: Option<Bytes>, fields: &CanonicalFields) -> Result<Vec<u8>> {
    let entries = field_entries(fields);
    match existing {
        Some(tiff) if !tiff.is_empty() => inject_ifd0_entries(&tiff, &entries),
        _ => {
            log::debug!("No existing EXIF, building a fresh block");
            inject_ifd0_entries(&empty_tiff(), &entries)
        }
    }
}

/// A little-endian TIFF header followed by an IFD0 with no entries.
fn empty_tiff() -> Vec<u8> {
    let mut tiff = Vec::with_capacity(14);
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&0u16.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff
}

/// A raw IFD entry to inject into a TIFF. `data` is written in place when it
/// fits in the 4-byte value slot, otherwise out of line.
#[derive(Debug, Clone)]
struct RawIfdEntry {
    tag_id: u16,
    data_format: u16,
    data: Vec<u8>,
}

fn field_entries(fields: &CanonicalFields) -> Vec<RawIfdEntry> {
    vec![
        RawIfdEntry {
            tag_id: TAG_IMAGE_DESCRIPTION,
            data_format: TYPE_ASCII,
            data: encode_utf8(&fields.description),
        },
        RawIfdEntry {
            tag_id: TAG_XP_TITLE.1,
            data_format: TYPE_BYTE,
            data: encode_xp(&fields.title),
        },
        RawIfdEntry {
            tag_id: TAG_XP_KEYWORDS.1,
            data_format: TYPE_BYTE,
            data: encode_xp(&fields.keywords),
        },
    ]
}

#[derive(Debug, Clone, Copy)]
struct ByteOrder {
    big_endian: bool,
}

impl ByteOrder {
    fn of(tiff: &[u8]) -> Result<Self> {
        match tiff.get(0..2) {
            Some(b"MM") => Ok(Self { big_endian: true }),
            Some(b"II") => Ok(Self { big_endian: false }),
            _ => bail!("Invalid TIFF byte order"),
        }
    }

    fn read_u16(self, data: &[u8], offset: usize) -> Result<u16> {
        let b: [u8; 2] = data
            .get(offset..offset + 2)
            .and_then(|s| s.try_into().ok())
            .context("TIFF data truncated")?;
        Ok(if self.big_endian { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) })
    }

    fn read_u32(self, data: &[u8], offset: usize) -> Result<u32> {
        let b: [u8; 4] = data
            .get(offset..offset + 4)
            .and_then(|s| s.try_into().ok())
            .context("TIFF data truncated")?;
        Ok(if self.big_endian { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) })
    }

    fn u16(self, val: u16) -> [u8; 2] {
        if self.big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
    }

    fn u32(self, val: u32) -> [u8; 4] {
        if self.big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
    }
}

/// Replace or add IFD0 entries without touching anything else in the TIFF.
///
/// The original bytes are kept as they are and a new IFD0 is appended after
/// them: original entries copied verbatim (their offsets stay valid), target
/// tags replaced or added, entries sorted by tag, next-IFD link preserved.
/// The header is then repointed at the new IFD0. Sub-IFDs (Exif, GPS),
/// thumbnails and maker notes are untouched.
fn inject_ifd0_entries(original: &[u8], entries: &[RawIfdEntry]) -> Result<Vec<u8>> {
    if original.len() < 8 {
        bail!("Original TIFF data too short");
    }
    let order = ByteOrder::of(original)?;
    if order.read_u16(original, 2)? != 42 {
        bail!("Missing TIFF magic number");
    }

    // Parse IFD0
    let ifd0_offset = order.read_u32(original, 4)? as usize;
    let ifd0_count = order.read_u16(original, ifd0_offset)? as usize;
    let ifd0_start = ifd0_offset + 2;
    let ifd0_end = ifd0_start + ifd0_count * 12;
    let ifd0_next = order.read_u32(original, ifd0_end).context("IFD0 extends beyond TIFF data")?;

    let mut ifd: Vec<(u16, [u8; 12])> = Vec::with_capacity(ifd0_count + entries.len());
    for i in 0..ifd0_count {
        let eo = ifd0_start + i * 12;
        let tag = order.read_u16(original, eo)?;
        if entries.iter().any(|e| e.tag_id == tag) {
            continue;
        }
        let mut raw = [0u8; 12];
        raw.copy_from_slice(&original[eo..eo + 12]);
        ifd.push((tag, raw));
    }

    let mut result = original.to_vec();
    pad_to_even(&mut result);

    // Out-of-line values go first, then the new IFD0 which points at them.
    for entry in entries {
        let mut raw = [0u8; 12];
        raw[0..2].copy_from_slice(&order.u16(entry.tag_id));
        raw[2..4].copy_from_slice(&order.u16(entry.data_format));
        raw[4..8].copy_from_slice(&order.u32(entry.data.len() as u32));
        if entry.data.len() <= 4 {
            raw[8..8 + entry.data.len()].copy_from_slice(&entry.data);
        } else {
            let data_off = u32::try_from(result.len()).context("TIFF data exceeds 4 GiB")?;
            raw[8..12].copy_from_slice(&order.u32(data_off));
            result.extend_from_slice(&entry.data);
            pad_to_even(&mut result);
        }
        ifd.push((entry.tag_id, raw));
    }
    ifd.sort_by_key(|(tag, _)| *tag);

    let new_ifd0_start = u32::try_from(result.len()).context("TIFF data exceeds 4 GiB")?;
    let count = u16::try_from(ifd.len()).context("Too many IFD0 entries")?;
    result.extend_from_slice(&order.u16(count));
    for (_, raw) in &ifd {
        result.extend_from_slice(raw);
    }
    result.extend_from_slice(&order.u32(ifd0_next));

    result[4..8].copy_from_slice(&order.u32(new_ifd0_start));

    Ok(result)
}

fn pad_to_even(data: &mut Vec<u8>) {
    if data.len() % 2 != 0 {
        data.push(0);
    }
}
