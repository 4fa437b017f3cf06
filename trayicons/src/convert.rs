use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageFormat};

/// Frame sizes written into every generated `.ico`.
pub const ICON_SIZES: [u32; 6] = [16, 24, 32, 48, 64, 256];

/// Flattened preview that Krita stores inside `.kra` and `.krz` archives.
const MERGED_IMAGE: &str = "mergedimage.png";

/// Converts `src` into a multi-size `.ico` at `dst`, creating `dst`'s directory if needed.
///
/// Krita documents are read through their merged preview image,
/// anything else is decoded as a regular image.
pub fn convert_to_ico<P, P2>(src: P, dst: P2) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    P2: AsRef<Path>,
{
    let src = src.as_ref();
    let dst = dst.as_ref();

    let span = tracing::debug_span!("convert::convert_to_ico", ?src, ?dst);
    let _enter = span.enter();

    let image = load_source(src)?;

    let frames = frame_sizes(image.width(), image.height())
        .into_iter()
        .map(|size| {
            let frame = image.resize(size, size, FilterType::Lanczos3).into_rgba8();
            IcoFrame::as_png(
                frame.as_raw(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgba8,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(dst)
        .with_context(|| format!("Failed to create icon file '{}'", dst.display()))?;
    let mut writer = BufWriter::new(file);
    IcoEncoder::new(&mut writer).encode_images(&frames)?;
    writer.flush()?;

    tracing::info!("Converted '{}' into '{}'", src.display(), dst.display());

    Ok(())
}

fn is_krita_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("kra") || e.eq_ignore_ascii_case("krz"))
        .unwrap_or(false)
}

fn load_source(src: &Path) -> anyhow::Result<DynamicImage> {
    if !is_krita_document(src) {
        return image::open(src).with_context(|| format!("Failed to open image '{}'", src.display()));
    }

    let file = File::open(src)
        .with_context(|| format!("Krita file not found at '{}'", src.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a valid Krita (zip) file", src.display()))?;
    let mut entry = archive
        .by_name(MERGED_IMAGE)
        .with_context(|| format!("'{MERGED_IMAGE}' not found in '{}'", src.display()))?;

    let mut png = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut png)?;

    image::load_from_memory_with_format(&png, ImageFormat::Png)
        .with_context(|| format!("Failed to decode '{MERGED_IMAGE}' in '{}'", src.display()))
}

/// Sizes from [`ICON_SIZES`] that fit inside the source image.
/// Falls back to a single frame when the source is smaller than all of them.
fn frame_sizes(width: u32, height: u32) -> Vec<u32> {
    let fits = width.min(height);
    let sizes = ICON_SIZES
        .into_iter()
        .filter(|size| *size <= fits)
        .collect::<Vec<_>>();

    if sizes.is_empty() {
        vec![width.max(height).min(256)]
    } else {
        sizes
    }
}
