//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use img_parts::jpeg::Jpeg;
use img_parts::png::{Png, PngChunk};
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::{CHUNK_EXIF, CHUNK_VP8X, WebP};
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
pub const TAG_XP_TITLE: u16 = 0x9C9B;
pub const TAG_XP_KEYWORDS: u16 = 0x9C9E;

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;

/// One IFD0 entry of a fixture. Only byte-sized types are used, so `data`
/// needs no byte swapping.
pub struct Entry {
    pub tag: u16,
    pub kind: u16,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn ascii(tag: u16, s: &str) -> Self {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        Self { tag, kind: TYPE_ASCII, data }
    }

    pub fn xp(tag: u16, s: &str) -> Self {
        let mut data: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        data.extend_from_slice(&[0, 0]);
        Self { tag, kind: TYPE_BYTE, data }
    }
}

/// Assemble a TIFF block holding a single IFD0.
pub fn tiff_block(big_endian: bool, mut entries: Vec<Entry>) -> Vec<u8> {
    entries.sort_by_key(|e| e.tag);
    let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

    let mut out = Vec::new();
    out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    out.extend_from_slice(&u16b(42));
    out.extend_from_slice(&u32b(8));

    let ifd_len = 2 + entries.len() * 12 + 4;
    let mut data_offset = 8 + ifd_len;
    let mut tail = Vec::new();

    out.extend_from_slice(&u16b(entries.len() as u16));
    for entry in &entries {
        out.extend_from_slice(&u16b(entry.tag));
        out.extend_from_slice(&u16b(entry.kind));
        out.extend_from_slice(&u32b(entry.data.len() as u32));
        if entry.data.len() <= 4 {
            let mut slot = entry.data.clone();
            slot.resize(4, 0);
            out.extend_from_slice(&slot);
        } else {
            out.extend_from_slice(&u32b(data_offset as u32));
            tail.extend_from_slice(&entry.data);
            if tail.len() % 2 == 1 {
                tail.push(0);
            }
            data_offset = 8 + ifd_len + tail.len();
        }
    }
    out.extend_from_slice(&u32b(0));
    out.extend_from_slice(&tail);
    out
}

/// Point a little-endian block's IFD0 at a next IFD that `offset` names.
pub fn set_next_ifd(tiff: &mut [u8], offset: u32) {
    let count = u16::from_le_bytes([tiff[8], tiff[9]]) as usize;
    let at = 8 + 2 + count * 12;
    tiff[at..at + 4].copy_from_slice(&offset.to_le_bytes());
}

fn encoded(format: image::ImageFormat) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(16, 8, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 32) as u8, 128])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Write a JPEG, with `tiff` embedded as its EXIF block when given.
pub fn write_jpeg(dir: &Path, name: &str, tiff: Option<Vec<u8>>) -> PathBuf {
    let path = dir.join(name);
    let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded(image::ImageFormat::Jpeg))).unwrap();
    if let Some(tiff) = tiff {
        jpeg.set_exif(Some(Bytes::from(tiff)));
    }
    std::fs::write(&path, jpeg.encoder().bytes()).unwrap();
    path
}

/// Write an extended-layout WebP, with `tiff` as its `EXIF` chunk when given.
/// The chunk holds the bare TIFF block unless `prefixed` asks for `Exif\0\0`.
pub fn write_webp(dir: &Path, name: &str, tiff: Option<Vec<u8>>, prefixed: bool) -> PathBuf {
    let path = dir.join(name);
    let mut webp = WebP::from_bytes(Bytes::from(encoded(image::ImageFormat::WebP))).unwrap();
    if let Some(tiff) = tiff {
        // EXIF flag, then canvas width-1 and height-1 as 24-bit values
        let vp8x = vec![0x08, 0, 0, 0, 15, 0, 0, 7, 0, 0];
        let mut payload = if prefixed { b"Exif\0\0".to_vec() } else { Vec::new() };
        payload.extend_from_slice(&tiff);

        let chunks = webp.chunks_mut();
        chunks.insert(0, RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(vp8x))));
        chunks.push(RiffChunk::new(CHUNK_EXIF, RiffContent::Data(Bytes::from(payload))));
    }
    std::fs::write(&path, webp.encoder().bytes()).unwrap();
    path
}

/// Payload of the `EXIF` chunk of a WebP file, as stored.
pub fn webp_exif_chunk(path: &Path) -> Option<Vec<u8>> {
    let webp = WebP::from_bytes(Bytes::from(std::fs::read(path).unwrap())).unwrap();
    let chunk = webp.chunk_by_id(CHUNK_EXIF)?;
    chunk.content().data().map(|data| data.to_vec())
}

/// Write a PNG carrying the given `tEXt` entries.
pub fn write_png(dir: &Path, name: &str, text: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut png = Png::from_bytes(Bytes::from(encoded(image::ImageFormat::Png))).unwrap();
    let chunks = png.chunks_mut();
    for (keyword, value) in text {
        let mut contents = keyword.as_bytes().to_vec();
        contents.push(0);
        contents.extend_from_slice(value.as_bytes());
        let pos = chunks.len() - 1;
        chunks.insert(pos, PngChunk::new(*b"tEXt", Bytes::from(contents)));
    }
    std::fs::write(&path, png.encoder().bytes()).unwrap();
    path
}

/// Write a plain TIFF image.
pub fn write_tiff(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encoded(image::ImageFormat::Tiff)).unwrap();
    path
}

/// Keywords of every text chunk in a PNG file, in file order.
pub fn png_text_keywords(path: &Path) -> Vec<String> {
    let png = Png::from_bytes(Bytes::from(std::fs::read(path).unwrap())).unwrap();
    png.chunks()
        .iter()
        .filter(|c| matches!(&c.kind(), b"tEXt" | b"zTXt" | b"iTXt"))
        .map(|c| {
            let contents = c.contents();
            let end = contents.iter().position(|&b| b == 0).unwrap_or(contents.len());
            String::from_utf8_lossy(&contents[..end]).into_owned()
        })
        .collect()
}

/// Raw ASCII value of an IFD0 tag in an image file, read back with kamadak-exif.
pub fn exif_ascii(path: &Path, tag: u16) -> Option<Vec<u8>> {
    let file = std::fs::File::open(path).unwrap();
    let exif = exif::Reader::new()
        .read_from_container(&mut std::io::BufReader::new(file))
        .ok()?;
    let field = exif.get_field(exif::Tag(exif::Context::Tiff, tag), exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(parts) => Some(parts.concat()),
        _ => None,
    }
}
