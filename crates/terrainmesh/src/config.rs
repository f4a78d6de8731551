use crate::bounds::{GeoBoundingBox, UvBounds};
use crate::error::{Result, TerrainError};
use crate::generator::SurfaceRequest;
use crate::mesh_data::SurfaceKind;
use crate::metadata::TerrainMeshMetadata;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainGenConfig {
    pub metadata: TerrainMeshMetadata,
    pub source: SourceConfig,
    pub surface: SurfaceConfig,
    pub rescale: RescaleConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// DEM TIFF. Required for generation.
    pub elevation_path: Option<PathBuf>,
    /// Any png/jpeg the `image` crate can read.
    pub texture_path: Option<PathBuf>,
    /// `"lonStart, latStart, lonEnd, latEnd"`, needed for patches.
    pub bounds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    /// Grow patch bounds to a square product; the patch then samples its own
    /// sub-rectangle of the square raster.
    pub expand_to_square: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescaleConfig {
    pub step: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for RescaleConfig {
    fn default() -> Self {
        Self {
            step: 0.0005,
            min_scale: 0.0,
            max_scale: 0.01,
        }
    }
}

impl RescaleConfig {
    /// `current` moved by `steps` increments and clamped into range.
    pub fn stepped(&self, current: f32, steps: i32) -> f32 {
        (current + self.step * steps as f32).clamp(self.min_scale, self.max_scale)
    }
}

impl TerrainGenConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TerrainGenConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.metadata.validate()?;
        if self.rescale.min_scale > self.rescale.max_scale {
            return Err(TerrainError::InvalidMetadata(format!(
                "rescale range {}..{} is empty",
                self.rescale.min_scale, self.rescale.max_scale
            )));
        }
        self.surface_request()?;
        Ok(())
    }

    pub fn parsed_bounds(&self) -> Result<Option<GeoBoundingBox>> {
        self.source
            .bounds
            .as_deref()
            .map(str::parse::<GeoBoundingBox>)
            .transpose()
    }

    /// The box the DEM and texture products should cover.
    pub fn product_bounds(&self) -> Result<Option<GeoBoundingBox>> {
        let bounds = self.parsed_bounds()?;
        Ok(match bounds {
            Some(b) if self.surface.expand_to_square => Some(b.expanded_to_square()),
            other => other,
        })
    }

    pub fn surface_request(&self) -> Result<SurfaceRequest> {
        match self.surface.kind {
            SurfaceKind::Globe => Ok(SurfaceRequest::Globe),
            SurfaceKind::Plane => Ok(SurfaceRequest::Plane),
            SurfaceKind::Patch => {
                let bounds = self.parsed_bounds()?.ok_or_else(|| {
                    TerrainError::InvalidMetadata("patch surface needs source.bounds".to_string())
                })?;
                let uv_bounds = if self.surface.expand_to_square {
                    bounds.sub_uv_bounds(&bounds.expanded_to_square())
                } else {
                    UvBounds::FULL
                };
                Ok(SurfaceRequest::Patch { bounds, uv_bounds })
            }
        }
    }
}
