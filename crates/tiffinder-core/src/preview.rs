use image::imageops::FilterType;
use image::GenericImageView;
use log::info;
use std::path::Path;

use crate::error::Result;

/// Write a bounded preview of `source` to `target`.
///
/// The image is resized so its longer edge does not exceed `max_edge`,
/// aspect ratio preserved; smaller images are never upscaled but are still
/// converted and saved. The output format follows the target extension
/// (jpg for previews).
pub fn write_preview(source: &Path, target: &Path, max_edge: u32) -> Result<()> {
    let im = image::open(source)?;
    let (width, height) = im.dimensions();

    let im = if width.max(height) > max_edge {
        info!(
            "{}: ({}, {}) -> fit {}",
            source.display(),
            width,
            height,
            max_edge
        );
        im.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        im
    };

    let rgb = im.to_rgb8();
    rgb.save(target)?;
    Ok(())
}

// -- Tests --
