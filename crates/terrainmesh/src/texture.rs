use crate::bounds::UvBounds;
use crate::error::{Result, TerrainError};
use crate::metadata::TerrainMeshMetadata;
use crate::raster::{BoundaryMode, ColorRaster, RasterBuffer};
use image::{DynamicImage, RgbaImage};
use std::path::Path;

fn from_image(image: DynamicImage) -> Result<ColorRaster> {
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| p.0)
        .collect::<Vec<[u8; 4]>>();
    RasterBuffer::from_vec(width as usize, height as usize, pixels)
}

/// Loads a surface texture as RGBA.
pub fn load_color_raster(path: &Path) -> Result<ColorRaster> {
    if path.as_os_str().is_empty() {
        return Err(TerrainError::MissingSource);
    }
    if !path.exists() {
        return Err(TerrainError::SourceNotFound(path.to_path_buf()));
    }
    let raster = from_image(image::open(path)?)?;
    log::info!(
        "Loaded texture {} ({}x{})",
        path.display(),
        raster.width(),
        raster.height()
    );
    Ok(raster)
}

pub fn decode_color_raster(bytes: &[u8]) -> Result<ColorRaster> {
    from_image(image::load_from_memory(bytes)?)
}

pub fn to_rgba_image(raster: &ColorRaster) -> Result<RgbaImage> {
    let bytes = raster.data().iter().flatten().copied().collect();
    RgbaImage::from_raw(raster.width() as u32, raster.height() as u32, bytes)
        .ok_or_else(|| TerrainError::InvalidRaster("pixel buffer does not match dimensions".to_string()))
}

/// Pixel rectangle of `raster` covered by `uv` (v grows northward).
pub fn crop_uv(raster: &ColorRaster, uv: &UvBounds) -> ColorRaster {
    let (x0, y0, width, height) = crate::generator::patch_region(raster.width(), raster.height(), uv);
    let mut cropped = ColorRaster::new(width, height);
    for y in 0..height {
        cropped
            .row_mut(y)
            .copy_from_slice(&raster.row(y0 + y)[x0..x0 + width]);
    }
    cropped
}

/// One texture per LOD, block-averaged by the same factors as the geometry.
pub fn lod_textures(base: &ColorRaster, metadata: &TerrainMeshMetadata) -> Result<Vec<ColorRaster>> {
    metadata
        .downsamples()?
        .into_iter()
        .map(|factor| {
            Ok(if factor == 1 {
                base.clone()
            } else {
                base.downsample(factor as usize, BoundaryMode::None)
            })
        })
        .collect()
}
