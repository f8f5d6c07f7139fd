//! Byte-level text encodings used by the metadata containers.
//!
//! Windows `XP*` EXIF tags hold NUL-terminated UTF-16LE, `ImageDescription`
//! holds plain bytes (UTF-8 in practice), PNG `tEXt` holds Latin-1 and PNG
//! `iTXt` holds UTF-8.

/// Decode an `XP*` tag blob.
///
/// UTF-16LE with trailing NULs stripped. Odd-length blobs or unpaired
/// surrogates fall back to a lossy UTF-8 decode instead of failing.
pub fn decode_xp(bytes: &[u8]) -> String {
    let decoded = if bytes.len() % 2 == 0 {
        let units = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        char::decode_utf16(units).collect::<Result<String, _>>().ok()
    } else {
        None
    };

    let text = match decoded {
        Some(text) => text,
        None => {
            log::debug!("XP tag is not valid UTF-16LE ({} bytes), decoding lossily", bytes.len());
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    strip_trailing_nuls(text)
}

/// Encode a string as NUL-terminated UTF-16LE bytes for an `XP*` tag.
pub fn encode_xp(s: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = s.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

/// Decode a plain EXIF text value (`ImageDescription`) as UTF-8.
pub fn decode_utf8(bytes: &[u8]) -> String {
    strip_trailing_nuls(String::from_utf8_lossy(bytes).into_owned())
}

/// Encode a plain EXIF text value: UTF-8 bytes plus the ASCII-type NUL terminator.
pub fn encode_utf8(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

/// Encode as Latin-1, or `None` if any character is outside U+0000..=U+00FF.
pub fn encode_latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn strip_trailing_nuls(mut s: String) -> String {
    let trimmed_len = s.trim_end_matches('\0').len();
    s.truncate(trimmed_len);
    s
}
