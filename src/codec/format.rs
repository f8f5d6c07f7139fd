use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions accepted as input (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// The metadata container a file is read from and written to.
///
/// `JpegExif` covers every EXIF-bearing kind (JPEG, TIFF, WebP) plus BMP/GIF,
/// which are read like EXIF images but carry no EXIF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerFormat {
    /// EXIF tag dictionary (`XPTitle`, `ImageDescription`, `XPKeywords`).
    JpegExif,
    /// PNG `tEXt`/`zTXt`/`iTXt` key/value entries.
    PngText,
    /// Anything else. Decodes to empty fields, never encoded.
    Unsupported,
}

impl ContainerFormat {
    pub fn label(&self) -> &'static str {
        match self {
            Self::JpegExif => "JPEG_EXIF",
            Self::PngText => "PNG_TEXT",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

/// The concrete file kind, used to route reads and writes.
///
/// ```rust
/// use image_meta_batch::codec::{ContainerFormat, ImageKind};
/// use std::path::Path;
///
/// let kind = ImageKind::from_path(Path::new("IMG_0001.JPG"));
/// assert_eq!(kind, Some(ImageKind::Jpeg));
/// assert_eq!(kind.unwrap().container(), ContainerFormat::JpegExif);
///
/// assert_eq!(ImageKind::from_path(Path::new("notes.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// EXIF in an APP1 segment
    Jpeg,
    /// Text chunks
    Png,
    /// EXIF in a RIFF `EXIF` chunk
    WebP,
    /// The file itself is the TIFF structure holding IFD0
    Tiff,
    /// No metadata carrier
    Bmp,
    /// No metadata carrier
    Gif,
}

impl ImageKind {
    /// Determine the kind from the file extension alone.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn container(self) -> ContainerFormat {
        match self {
            Self::Png => ContainerFormat::PngText,
            Self::Jpeg | Self::WebP | Self::Tiff | Self::Bmp | Self::Gif => ContainerFormat::JpegExif,
        }
    }

    /// Whether the kind has somewhere to store an EXIF block.
    pub fn carries_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Tiff)
    }
}

/// Check if a file has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve the kind of a file: extension gate first, then content sniffing.
///
/// Returns `None` for unsupported files. When the content cannot be sniffed
/// (unreadable or unrecognised bytes) the extension decides, so a corrupt
/// `.jpg` is still routed to the EXIF reader and reported as a decode failure.
pub fn detect_kind(path: &Path) -> Option<ImageKind> {
    let by_extension = ImageKind::from_path(path)?;

    let sniffed = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .ok()
        .and_then(|reader| reader.format());

    match sniffed {
        Some(format) => {
            let kind = ImageKind::from_image_format(format);
            if kind.is_none() {
                log::debug!("{} is {format:?} despite its extension", path.display());
            } else if kind != Some(by_extension) {
                log::debug!(
                    "{} has a .{} extension but contains {format:?}",
                    path.display(),
                    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
                );
            }
            kind
        }
        None => Some(by_extension),
    }
}

/// Classify the metadata container of a file. Never fails.
pub fn classify(path: &Path) -> ContainerFormat {
    detect_kind(path)
        .map(ImageKind::container)
        .unwrap_or(ContainerFormat::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(2, 2);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(ImageKind::from_path(Path::new("a.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.JPEG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.Png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("a.tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("a.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("a.gif")), Some(ImageKind::Gif));
        assert_eq!(ImageKind::from_path(Path::new("a.bmp")), Some(ImageKind::Bmp));
    }

    #[test]
    fn unsupported_extensions() {
        for name in ["notes.txt", "clip.mp4", "photo.heic", "noext", ".hidden"] {
            assert_eq!(ImageKind::from_path(Path::new(name)), None, "{name}");
            assert!(!is_supported_image(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn classify_txt_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();
        assert_eq!(classify(&txt), ContainerFormat::Unsupported);
    }

    #[test]
    fn classify_missing_file_falls_back_to_extension() {
        assert_eq!(classify(Path::new("/nonexistent/photo.jpg")), ContainerFormat::JpegExif);
        assert_eq!(classify(Path::new("/nonexistent/photo.png")), ContainerFormat::PngText);
    }

    #[test]
    fn classify_sniffs_content_over_extension() {
        let dir = TempDir::new().unwrap();
        let disguised = dir.path().join("actually_png.jpg");
        fs::write(&disguised, png_bytes()).unwrap();

        assert_eq!(detect_kind(&disguised), Some(ImageKind::Png));
        assert_eq!(classify(&disguised), ContainerFormat::PngText);
    }

    #[test]
    fn classify_garbage_with_image_extension() {
        let dir = TempDir::new().unwrap();
        let junk = dir.path().join("broken.jpg");
        fs::write(&junk, b"this is not an image").unwrap();
        assert_eq!(classify(&junk), ContainerFormat::JpegExif);
    }

    #[test]
    fn container_labels() {
        assert_eq!(ContainerFormat::JpegExif.label(), "JPEG_EXIF");
        assert_eq!(ContainerFormat::PngText.label(), "PNG_TEXT");
        assert_eq!(ContainerFormat::Unsupported.label(), "UNSUPPORTED");
        assert_eq!(
            serde_json::to_string(&ContainerFormat::PngText).unwrap(),
            "\"PNG_TEXT\""
        );
    }

    #[test]
    fn exif_carriers() {
        assert!(ImageKind::Jpeg.carries_exif());
        assert!(ImageKind::Tiff.carries_exif());
        assert!(ImageKind::WebP.carries_exif());
        assert!(!ImageKind::Bmp.carries_exif());
        assert!(!ImageKind::Gif.carries_exif());
        assert!(!ImageKind::Png.carries_exif());
    }
}
