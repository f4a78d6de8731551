use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TerrainError>;

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error(
        "unsupported elevation raster: {samples_per_pixel} sample(s) per pixel, \
         {bits_per_sample} bits, sample format {sample_format}"
    )]
    UnsupportedRasterFormat {
        samples_per_pixel: u16,
        bits_per_sample: u16,
        sample_format: u16,
    },

    #[error("downsample factor {0} is not a power of two")]
    InvalidDownsampleFactor(u64),

    #[error("bounding box component index {0} is out of range (expected 0..=3)")]
    IndexOutOfRange(usize),

    #[error("no elevation source supplied")]
    MissingSource,

    #[error("elevation source {0} does not exist")]
    SourceNotFound(PathBuf),

    #[error("downsample {downsample} leaves a {width}x{height} vertex grid (need at least 2x2)")]
    DegenerateGrid {
        downsample: u32,
        width: usize,
        height: usize,
    },

    #[error("invalid terrain metadata: {0}")]
    InvalidMetadata(String),

    #[error("reference mesh does not match metadata: {0}")]
    RescaleMismatch(String),

    #[error("bounding box component {index} must be finite, got {value}")]
    NonFiniteBound { index: usize, value: f32 },

    #[error("cannot parse bounding box from {0:?}")]
    ParseBoundingBox(String),

    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    #[error("a {0} job is already in progress")]
    JobInProgress(&'static str),

    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConfigRead(#[from] toml::de::Error),

    #[error(transparent)]
    ConfigWrite(#[from] toml::ser::Error),
}
