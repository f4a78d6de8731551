//! DEM decoding: single-channel TIFF (i16 or f32) in strip or tile layout.

use crate::error::{Result, TerrainError};
use crate::raster::ElevationRaster;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::tags::Tag;

const SAMPLE_FORMAT_UINT: u16 = 1;
const SAMPLE_FORMAT_INT: u16 = 2;
const SAMPLE_FORMAT_IEEEFP: u16 = 3;

/// On-disk arrangement of the sample payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Horizontal strips spanning the full width.
    Scanline { rows_per_strip: usize },
    /// Fixed-size tiles; edge tiles may extend past the image.
    Tiled { tile_width: usize, tile_height: usize },
}

impl ChunkLayout {
    pub fn chunk_count(&self, width: usize, height: usize) -> usize {
        match *self {
            ChunkLayout::Scanline { rows_per_strip } => height.div_ceil(rows_per_strip.max(1)),
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
            } => width.div_ceil(tile_width.max(1)) * height.div_ceil(tile_height.max(1)),
        }
    }
}

/// Decoded payload of one strip or tile.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSamples {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl ChunkSamples {
    pub fn len(&self) -> usize {
        match self {
            ChunkSamples::I16(v) => v.len(),
            ChunkSamples::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts `out.len()` samples starting at `start` into `out`.
    fn convert_into(&self, start: usize, out: &mut [f32]) {
        let len = out.len();
        match self {
            ChunkSamples::I16(v) => {
                for (dst, &src) in out.iter_mut().zip(&v[start..start + len]) {
                    *dst = src as f32;
                }
            }
            ChunkSamples::F32(v) => out.copy_from_slice(&v[start..start + len]),
        }
    }

    fn into_f32(self) -> Vec<f32> {
        match self {
            ChunkSamples::I16(v) => v.into_iter().map(|s| s as f32).collect(),
            ChunkSamples::F32(v) => v,
        }
    }
}

/// Anything that can hand out an elevation image chunk by chunk.
pub trait ChunkSource {
    fn dimensions(&self) -> (usize, usize);

    fn layout(&self) -> ChunkLayout;

    fn read_chunk(&mut self, index: usize) -> Result<ChunkSamples>;
}

/// [`ChunkSource`] over a TIFF stream, validated on open.
pub struct TiffChunkSource<R: Read + Seek> {
    decoder: Decoder<R>,
    width: usize,
    height: usize,
    layout: ChunkLayout,
}

impl<R: Read + Seek> TiffChunkSource<R> {
    /// Opens the stream and rejects anything but single-channel i16/f32 before reading samples.
    pub fn open(reader: R) -> Result<Self> {
        let mut decoder = Decoder::new(reader)?;
        let (width, height) = decoder.dimensions()?;
        let color_type = decoder.colortype()?;
        let sample_format = decoder
            .find_tag_unsigned::<u16>(Tag::SampleFormat)?
            .unwrap_or(SAMPLE_FORMAT_UINT);

        let (samples_per_pixel, bits_per_sample) = match color_type {
            ColorType::Gray(bits) => (1, bits as u16),
            ColorType::GrayA(bits) => (2, bits as u16),
            ColorType::RGB(bits) => (3, bits as u16),
            ColorType::RGBA(bits) | ColorType::CMYK(bits) => (4, bits as u16),
            ColorType::Palette(bits) => (1, bits as u16),
            _ => (0, 0),
        };

        let supported = matches!(
            (color_type, sample_format),
            (ColorType::Gray(16), SAMPLE_FORMAT_INT) | (ColorType::Gray(32), SAMPLE_FORMAT_IEEEFP)
        );
        if !supported {
            log::warn!(
                "Rejecting elevation raster: {:?}, sample format {}",
                color_type,
                sample_format
            );
            return Err(TerrainError::UnsupportedRasterFormat {
                samples_per_pixel,
                bits_per_sample,
                sample_format,
            });
        }

        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidRaster(format!(
                "elevation raster is {}x{}",
                width, height
            )));
        }

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let layout = match decoder.get_chunk_type() {
            ChunkType::Strip => ChunkLayout::Scanline {
                rows_per_strip: chunk_height.min(height).max(1) as usize,
            },
            ChunkType::Tile => ChunkLayout::Tiled {
                tile_width: chunk_width.max(1) as usize,
                tile_height: chunk_height.max(1) as usize,
            },
        };

        log::debug!(
            "Opened {}x{} elevation raster ({:?}, {:?})",
            width,
            height,
            color_type,
            layout
        );

        Ok(Self {
            decoder,
            width: width as usize,
            height: height as usize,
            layout,
        })
    }
}

impl<R: Read + Seek> ChunkSource for TiffChunkSource<R> {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn layout(&self) -> ChunkLayout {
        self.layout
    }

    fn read_chunk(&mut self, index: usize) -> Result<ChunkSamples> {
        match self.decoder.read_chunk(index as u32)? {
            DecodingResult::I16(samples) => Ok(ChunkSamples::I16(samples)),
            DecodingResult::F32(samples) => Ok(ChunkSamples::F32(samples)),
            other => Err(TerrainError::InvalidRaster(format!(
                "chunk {} decoded to an unexpected sample type ({} bytes per sample)",
                index,
                decoding_result_sample_size(&other)
            ))),
        }
    }
}

fn decoding_result_sample_size(result: &DecodingResult) -> usize {
    match result {
        DecodingResult::U8(_) | DecodingResult::I8(_) => 1,
        DecodingResult::U16(_) | DecodingResult::I16(_) => 2,
        DecodingResult::U32(_) | DecodingResult::I32(_) | DecodingResult::F32(_) => 4,
        _ => 8,
    }
}

/// Decodes strips one row at a time into `dest`.
pub fn decode_scanline<S: ChunkSource + ?Sized>(
    source: &mut S,
    rows_per_strip: usize,
    dest: &mut ElevationRaster,
) -> Result<()> {
    let (width, height) = source.dimensions();
    let rows_per_strip = rows_per_strip.max(1);
    let strips = height.div_ceil(rows_per_strip);

    for strip in 0..strips {
        let samples = source.read_chunk(strip)?;
        let first_row = strip * rows_per_strip;
        let rows = (samples.len() / width).min(height - first_row);

        for row in 0..rows {
            samples.convert_into(row * width, dest.row_mut(first_row + row));
        }
    }
    Ok(())
}

/// Decodes tiles, scattering each into `dest` at its origin.
pub fn decode_tiled<S: ChunkSource + ?Sized>(
    source: &mut S,
    tile_width: usize,
    tile_height: usize,
    dest: &mut ElevationRaster,
) -> Result<()> {
    let (width, height) = source.dimensions();
    let (tile_width, tile_height) = (tile_width.max(1), tile_height.max(1));
    let tiles_across = width.div_ceil(tile_width);
    let tiles_down = height.div_ceil(tile_height);

    for tile in 0..tiles_across * tiles_down {
        let origin_x = (tile % tiles_across) * tile_width;
        let origin_y = (tile / tiles_across) * tile_height;
        let data_width = tile_width.min(width - origin_x);
        let data_height = tile_height.min(height - origin_y);

        let block = source.read_chunk(tile)?.into_f32();
        // Edge tiles come back either cropped or padded to the full tile size
        let stride = if block.len() == data_width * data_height {
            data_width
        } else {
            tile_width
        };

        for (local_y, row) in block.chunks_exact(stride).enumerate() {
            for (local_x, &sample) in row.iter().enumerate() {
                dest.set(
                    (origin_x + local_x) as i64,
                    (origin_y + local_y) as i64,
                    sample,
                );
            }
        }
    }
    Ok(())
}

/// Turns DEM files into [`ElevationRaster`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevationRasterDecoder;

impl ElevationRasterDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_file(&self, path: &Path) -> Result<ElevationRaster> {
        if path.as_os_str().is_empty() {
            return Err(TerrainError::MissingSource);
        }
        if !path.exists() {
            return Err(TerrainError::SourceNotFound(path.to_path_buf()));
        }
        log::info!("Decoding elevation raster {}", path.display());
        self.decode_reader(BufReader::new(File::open(path)?))
    }

    pub fn decode_reader<R: Read + Seek>(&self, reader: R) -> Result<ElevationRaster> {
        let mut source = TiffChunkSource::open(reader)?;
        self.decode_chunks(&mut source)
    }

    pub fn decode_chunks<S: ChunkSource + ?Sized>(&self, source: &mut S) -> Result<ElevationRaster> {
        let (width, height) = source.dimensions();
        let mut raster = ElevationRaster::new(width, height);

        match source.layout() {
            ChunkLayout::Scanline { rows_per_strip } => {
                decode_scanline(source, rows_per_strip, &mut raster)?
            }
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
            } => decode_tiled(source, tile_width, tile_height, &mut raster)?,
        }

        if let Some((lo, hi)) = raster.elevation_range() {
            log::info!(
                "Decoded {}x{} elevation raster, range {:.1}..{:.1}",
                width,
                height,
                lo,
                hi
            );
        }
        Ok(raster)
    }
}
