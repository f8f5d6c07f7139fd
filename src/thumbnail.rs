use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Default longest edge of a preview, in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 600;

/// Decode an image and scale it to fit within `max_edge` on both sides.
///
/// Aspect ratio is preserved. Images already smaller are returned unchanged.
pub fn render(path: &Path, max_edge: u32) -> Result<DynamicImage> {
    let img = image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
    if img.width() <= max_edge && img.height() <= max_edge {
        return Ok(img);
    }
    Ok(img.thumbnail(max_edge, max_edge))
}

/// Render a preview of `path` into `out_dir/<stem>.png` and return that path.
pub fn write_thumbnail(path: &Path, out_dir: &Path, max_edge: u32) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .with_context(|| format!("No file name in {}", path.display()))?;
    let dest = out_dir.join(format!("{}.png", stem.to_string_lossy()));

    let thumb = render(path, max_edge)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    thumb
        .save_with_format(&dest, image::ImageFormat::Png)
        .with_context(|| format!("Failed to save thumbnail: {}", dest.display()))?;

    log::debug!(
        "Thumbnail {}x{} -> {}",
        thumb.width(),
        thumb.height(),
        dest.display()
    );
    Ok(dest)
}
