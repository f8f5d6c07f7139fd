//! PNG text chunks (`tEXt`, `zTXt`, `iTXt`).

use anyhow::{Context, Result, bail};
use flate2::read::ZlibDecoder;
use img_parts::Bytes;
use img_parts::png::{Png, PngChunk};
use std::io::Read;

use super::text::{decode_latin1, encode_latin1};

pub const CHUNK_TEXT: [u8; 4] = *b"tEXt";
pub const CHUNK_ZTEXT: [u8; 4] = *b"zTXt";
pub const CHUNK_ITEXT: [u8; 4] = *b"iTXt";
const CHUNK_IEND: [u8; 4] = *b"IEND";

/// One decoded key/value text entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub keyword: String,
    pub text: String,
}

pub fn is_text_chunk(kind: [u8; 4]) -> bool {
    kind == CHUNK_TEXT || kind == CHUNK_ZTEXT || kind == CHUNK_ITEXT
}

/// Decode every readable text entry of a PNG, in chunk order.
///
/// Malformed individual chunks are skipped with a debug log; they do not make
/// the whole image unreadable.
pub fn read_text_entries(png: &Png) -> Vec<TextEntry> {
    png.chunks()
        .iter()
        .filter(|chunk| is_text_chunk(chunk.kind()))
        .filter_map(|chunk| match parse_chunk(chunk.kind(), chunk.contents()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable {} chunk: {e:#}", String::from_utf8_lossy(&chunk.kind()));
                None
            }
        })
        .collect()
}

/// Keyword of a text chunk without decoding its value.
pub fn chunk_keyword(chunk: &PngChunk) -> Option<String> {
    if !is_text_chunk(chunk.kind()) {
        return None;
    }
    let contents = chunk.contents();
    let end = contents.iter().position(|&b| b == 0)?;
    Some(decode_latin1(&contents[..end]))
}

fn parse_chunk(kind: [u8; 4], data: &[u8]) -> Result<TextEntry> {
    let sep = data
        .iter()
        .position(|&b| b == 0)
        .context("missing keyword separator")?;
    if sep == 0 {
        bail!("empty keyword");
    }
    let keyword = decode_latin1(&data[..sep]);
    let rest = &data[sep + 1..];

    let text = match kind {
        CHUNK_TEXT => decode_latin1(rest),
        CHUNK_ZTEXT => {
            let (&method, compressed) = rest.split_first().context("truncated zTXt")?;
            if method != 0 {
                bail!("unknown compression method {method}");
            }
            decode_latin1(&inflate(compressed)?)
        }
        CHUNK_ITEXT => parse_itxt_text(rest)?,
        _ => bail!("not a text chunk"),
    };

    Ok(TextEntry { keyword, text })
}

/// iTXt after the keyword: flag, method, language\0, translated keyword\0, text.
fn parse_itxt_text(rest: &[u8]) -> Result<String> {
    if rest.len() < 2 {
        bail!("truncated iTXt header");
    }
    let (flag, method) = (rest[0], rest[1]);
    let rest = &rest[2..];

    let lang_end = rest.iter().position(|&b| b == 0).context("missing language tag")?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest
        .iter()
        .position(|&b| b == 0)
        .context("missing translated keyword")?;
    let body = &rest[translated_end + 1..];

    let raw = match (flag, method) {
        (0, _) => body.to_vec(),
        (1, 0) => inflate(body)?,
        (1, m) => bail!("unknown compression method {m}"),
        (f, _) => bail!("invalid compression flag {f}"),
    };
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).context("corrupt zlib stream")?;
    Ok(out)
}

/// Build an uncompressed text chunk: `tEXt` when the value fits Latin-1,
/// `iTXt` (UTF-8) otherwise.
pub fn build_text_chunk(keyword: &str, text: &str) -> Result<PngChunk> {
    let key = encode_latin1(keyword).context("keyword is not Latin-1")?;
    if key.is_empty() || key.len() > 79 {
        bail!("keyword must be 1-79 bytes");
    }

    let mut contents = key;
    contents.push(0);

    let kind = match encode_latin1(text) {
        Some(latin1) => {
            contents.extend_from_slice(&latin1);
            CHUNK_TEXT
        }
        None => {
            // compression flag, method, empty language, empty translated keyword
            contents.extend_from_slice(&[0, 0, 0, 0]);
            contents.extend_from_slice(text.as_bytes());
            CHUNK_ITEXT
        }
    };

    Ok(PngChunk::new(kind, Bytes::from(contents)))
}

/// Insert chunks right before `IEND` (or at the end if it is missing).
pub fn insert_before_iend(png: &mut Png, new_chunks: Vec<PngChunk>) {
    let chunks = png.chunks_mut();
    let pos = chunks
        .iter()
        .position(|c| c.kind() == CHUNK_IEND)
        .unwrap_or(chunks.len());
    for (offset, chunk) in new_chunks.into_iter().enumerate() {
        chunks.insert(pos + offset, chunk);
    }
}
