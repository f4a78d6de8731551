pub mod bounds;
pub mod config;
pub mod decoder;
pub mod error;
pub mod generator;
pub mod grid;
pub mod jobs;
pub mod mesh_data;
pub mod metadata;
pub mod prelude;
pub mod raster;
pub mod rescale;
pub mod texture;

pub use error::{Result, TerrainError};
