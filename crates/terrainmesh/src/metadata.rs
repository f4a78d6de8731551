use crate::error::{Result, TerrainError};
use serde::{Deserialize, Serialize};

/// Parameters shared by every LOD of one terrain model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainMeshMetadata {
    /// Sphere radius for globe and patch surfaces, half the plane width for planar ones.
    pub radius: f32,
    /// Multiplier applied to raw elevation samples.
    pub height_scale: f32,
    /// LOD levels above LOD0.
    pub lod_levels: u32,
    /// Downsample applied at LOD0. Must be a power of two.
    pub base_downsample: u32,
    /// Extra mesh at downsample `1 << index` for colliders.
    #[serde(default)]
    pub physics_lod_index: Option<u32>,
}

impl Default for TerrainMeshMetadata {
    fn default() -> Self {
        Self {
            radius: 6371.0,
            height_scale: 0.001,
            lod_levels: 3,
            base_downsample: 1,
            physics_lod_index: None,
        }
    }
}

fn checked_downsample(base: u32, shift: u32) -> Result<u32> {
    if !base.is_power_of_two() {
        return Err(TerrainError::InvalidDownsampleFactor(base as u64));
    }
    let wide = (base as u64)
        .checked_shl(shift)
        .filter(|&v| v <= u32::MAX as u64 && shift < 32)
        .ok_or(TerrainError::InvalidDownsampleFactor(
            (base as u64).saturating_mul(1u64 << shift.min(63)),
        ))?;
    Ok(wide as u32)
}

impl TerrainMeshMetadata {
    pub fn with_height_scale(mut self, height_scale: f32) -> Self {
        self.height_scale = height_scale;
        self
    }

    pub fn lod_count(&self) -> usize {
        self.lod_levels as usize + 1
    }

    /// `base_downsample << lod`, rejected when it is not a power of two or overflows.
    pub fn downsample_for_lod(&self, lod: u32) -> Result<u32> {
        checked_downsample(self.base_downsample, lod)
    }

    pub fn downsamples(&self) -> Result<Vec<u32>> {
        (0..=self.lod_levels)
            .map(|lod| self.downsample_for_lod(lod))
            .collect()
    }

    pub fn physics_downsample(&self) -> Result<Option<u32>> {
        self.physics_lod_index
            .map(|index| checked_downsample(1, index))
            .transpose()
    }

    /// Checks everything that can be checked without a raster.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(TerrainError::InvalidMetadata(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !self.height_scale.is_finite() {
            return Err(TerrainError::InvalidMetadata(format!(
                "height scale must be finite, got {}",
                self.height_scale
            )));
        }
        self.downsamples()?;
        self.physics_downsample()?;
        Ok(())
    }
}
