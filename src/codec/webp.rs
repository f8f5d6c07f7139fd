//! WebP `EXIF` chunk access.
//!
//! The chunk normally holds a bare TIFF block. Some writers put the JPEG-style
//! `Exif\0\0` prefix in front of it; both forms are read, and a rewritten chunk
//! keeps the form it was found in (bare TIFF for new chunks).

use anyhow::{Context, Result, bail};
use img_parts::Bytes;
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::{CHUNK_ALPH, CHUNK_EXIF, CHUNK_ICCP, CHUNK_VP8, CHUNK_VP8L, CHUNK_VP8X, CHUNK_XMP, WebP};

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

// VP8X feature flags, first byte of the chunk.
const FLAG_ICC: u8 = 0b0010_0000;
const FLAG_ALPHA: u8 = 0b0001_0000;
const FLAG_EXIF: u8 = 0b0000_1000;

/// EXIF payload of a WebP file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WebpExif {
    pub tiff: Bytes,
    /// Whether the chunk carried the `Exif\0\0` prefix.
    pub prefixed: bool,
}

/// The TIFF block in the first `EXIF` chunk, if any. Empty chunks count as absent.
pub(crate) fn read_exif(webp: &WebP) -> Option<WebpExif> {
    let data = webp.chunk_by_id(CHUNK_EXIF)?.content().data()?;
    let exif = if data.starts_with(EXIF_PREFIX) {
        WebpExif {
            tiff: data.slice(EXIF_PREFIX.len()..),
            prefixed: true,
        }
    } else {
        WebpExif {
            tiff: data.clone(),
            prefixed: false,
        }
    };
    (!exif.tiff.is_empty()).then_some(exif)
}

/// Store `tiff` as the file's only `EXIF` chunk.
///
/// An existing chunk is replaced where it stands; a new one goes before any
/// `XMP ` chunk, else at the end. The file is converted to the extended
/// (`VP8X`) layout if needed and its EXIF flag is set.
pub(crate) fn write_exif(webp: &mut WebP, tiff: Vec<u8>, prefixed: bool) -> Result<()> {
    ensure_vp8x(webp)?;

    let mut payload = Vec::with_capacity(EXIF_PREFIX.len() + tiff.len());
    if prefixed {
        payload.extend_from_slice(EXIF_PREFIX);
    }
    payload.extend_from_slice(&tiff);
    let chunk = RiffChunk::new(CHUNK_EXIF, RiffContent::Data(Bytes::from(payload)));

    let chunks = webp.chunks_mut();
    let existing = chunks.iter().position(|c| c.id() == CHUNK_EXIF);
    chunks.retain(|c| c.id() != CHUNK_EXIF);
    let pos = existing
        .or_else(|| chunks.iter().position(|c| c.id() == CHUNK_XMP))
        .unwrap_or(chunks.len());
    chunks.insert(pos, chunk);
    Ok(())
}

fn ensure_vp8x(webp: &mut WebP) -> Result<()> {
    let chunks = webp.chunks_mut();
    if let Some(pos) = chunks.iter().position(|c| c.id() == CHUNK_VP8X) {
        let mut data = chunks[pos]
            .content()
            .data()
            .context("VP8X chunk is not a data chunk")?
            .to_vec();
        if data.len() < 10 {
            bail!("VP8X chunk truncated");
        }
        data[0] |= FLAG_EXIF;
        chunks[pos] = RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(data)));
        return Ok(());
    }

    let (width, height) = canvas_size(webp).context("Cannot determine WebP canvas size")?;
    let mut flags = FLAG_EXIF;
    if webp.has_chunk(CHUNK_ICCP) {
        flags |= FLAG_ICC;
    }
    if has_alpha(webp) {
        flags |= FLAG_ALPHA;
    }

    let mut data = Vec::with_capacity(10);
    data.extend_from_slice(&[flags, 0, 0, 0]);
    data.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    data.extend_from_slice(&(height - 1).to_le_bytes()[..3]);
    webp.chunks_mut()
        .insert(0, RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(data))));
    Ok(())
}

/// Bitstream dimensions of a simple-format WebP, bounds-checked.
fn canvas_size(webp: &WebP) -> Option<(u32, u32)> {
    if let Some(data) = webp.chunk_by_id(CHUNK_VP8L).and_then(|c| c.content().data()) {
        // 0x2f signature, then 14 bits width-1, 14 bits height-1
        if data.first() != Some(&0x2f) {
            return None;
        }
        let bits = u32::from_le_bytes(data.get(1..5)?.try_into().ok()?);
        return Some(((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1));
    }

    let data = webp.chunk_by_id(CHUNK_VP8)?.content().data()?;
    // 3-byte frame tag (keyframe bit clear), start code, then 14-bit sizes
    if data.len() < 10 || data[0] & 1 != 0 || data[3..6] != [0x9d, 0x01, 0x2a] {
        return None;
    }
    let width = u16::from_le_bytes([data[6], data[7]]) & 0x3FFF;
    let height = u16::from_le_bytes([data[8], data[9]]) & 0x3FFF;
    (width > 0 && height > 0).then_some((u32::from(width), u32::from(height)))
}

fn has_alpha(webp: &WebP) -> bool {
    if webp.has_chunk(CHUNK_ALPH) {
        return true;
    }
    webp.chunk_by_id(CHUNK_VP8L)
        .and_then(|c| c.content().data())
        .and_then(|data| data.get(1..5))
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .is_some_and(|b| (u32::from_le_bytes(b) >> 28) & 1 == 1)
}
