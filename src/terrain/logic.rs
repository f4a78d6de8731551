use bevy::asset::RenderAssetUsages;
use bevy::image::Image;
use bevy::math::{Quat, Vec3};
use bevy::prelude::{Transform, warn};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use terrainmesh::config::TerrainGenConfig;
use terrainmesh::decoder::ElevationRasterDecoder;
use terrainmesh::error::{Result, TerrainError};
use terrainmesh::generator::MeshGenerator;
use terrainmesh::mesh_data::{MeshData, SurfaceKind, TerrainMeshSet};
use terrainmesh::raster::ColorRaster;
use terrainmesh::texture::load_color_raster;

pub struct GeneratedTerrain {
    pub set: TerrainMeshSet,
    pub texture: Option<ColorRaster>,
}

/// Worker-side part of a generation request: decode, generate, load the texture.
///
/// A texture that fails to load is logged and skipped; the geometry still comes back.
pub fn run_generation(config: &TerrainGenConfig) -> Result<GeneratedTerrain> {
    let path = config
        .source
        .elevation_path
        .as_deref()
        .ok_or(TerrainError::MissingSource)?;
    let request = config.surface_request()?;
    let set = MeshGenerator::new().generate_from_file(
        &ElevationRasterDecoder::new(),
        path,
        &request,
        &config.metadata,
    )?;

    let texture = match config.source.texture_path.as_deref() {
        Some(texture_path) => match load_color_raster(texture_path) {
            Ok(raster) => Some(raster),
            Err(err) => {
                warn!("Skipping texture {}: {err}", texture_path.display());
                None
            }
        },
        None => None,
    };

    Ok(GeneratedTerrain { set, texture })
}

/// Seats the terrain on the world origin. Patches have +x as up, so they are
/// tipped onto +y and lowered until their floor touches y = 0.
pub fn surface_transform(kind: SurfaceKind, lod0: &MeshData) -> Transform {
    match kind {
        SurfaceKind::Globe | SurfaceKind::Plane => Transform::default(),
        SurfaceKind::Patch => {
            let floor = lod0.minimum_vertex.map_or(0.0, |v| v.x);
            Transform::from_rotation(Quat::from_rotation_z(FRAC_PI_2))
                .with_translation(Vec3::new(0.0, -floor, 0.0))
        }
    }
}

/// Camera distance that keeps the whole mesh in view.
pub fn framing_distance(mesh: &MeshData) -> f32 {
    let extent = mesh
        .vertices
        .iter()
        .map(|v| v.length())
        .fold(0.0_f32, f32::max);
    (extent * 2.5).max(1.0)
}

/// A rescale result only applies to the reference it was computed from.
pub fn accepts_rescale(current: Option<&Arc<TerrainMeshSet>>, source: &Arc<TerrainMeshSet>) -> bool {
    current.is_some_and(|reference| Arc::ptr_eq(reference, source))
}

/// `current` moved by `delta`, kept inside `0..lod_count`.
pub fn step_lod(current: usize, delta: i32, lod_count: usize) -> usize {
    let last = lod_count.saturating_sub(1) as i64;
    (current as i64 + delta as i64).clamp(0, last) as usize
}

pub fn image_from_raster(raster: &ColorRaster) -> Image {
    let data = raster.data().iter().flatten().copied().collect();
    Image::new(
        Extent3d {
            width: raster.width() as u32,
            height: raster.height() as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use terrainmesh::raster::RasterBuffer;

    #[rstest]
    #[case(0, 1, 4, 1)]
    #[case(3, 1, 4, 3)]
    #[case(0, -1, 4, 0)]
    #[case(2, -5, 4, 0)]
    #[case(0, 1, 0, 0)]
    fn test_step_lod(
        #[case] current: usize,
        #[case] delta: i32,
        #[case] count: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(step_lod(current, delta, count), expected);
    }

    #[test]
    fn test_patch_floor_lands_on_zero() {
        let floor = Vec3::new(-0.3, 0.2, -0.1);
        let mesh = MeshData {
            vertices: vec![Vec3::ZERO, floor],
            minimum_vertex: Some(floor),
            ..MeshData::default()
        };
        let transform = surface_transform(SurfaceKind::Patch, &mesh);

        let seated = transform.transform_point(floor);
        assert!(seated.y.abs() < 1e-6, "floor at {seated}");
        let top = transform.transform_point(Vec3::ZERO);
        assert!((top.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_globe_is_not_moved() {
        let transform = surface_transform(SurfaceKind::Globe, &MeshData::default());
        assert_eq!(transform, Transform::default());
    }

    #[test]
    fn test_framing_distance() {
        let mesh = MeshData {
            vertices: vec![Vec3::new(0.0, 4.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
            ..MeshData::default()
        };
        assert_eq!(framing_distance(&mesh), 10.0);
        assert_eq!(framing_distance(&MeshData::default()), 1.0);
    }

    #[test]
    fn test_image_from_raster() {
        let raster = RasterBuffer::filled(3, 2, [10, 20, 30, 255]);
        let image = image_from_raster(&raster);
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.data.as_ref().map(|d| d.len()), Some(24));
    }

    #[test]
    fn test_rescale_only_applies_to_its_reference() {
        let set = || TerrainMeshSet {
            kind: SurfaceKind::Globe,
            metadata: Default::default(),
            lods: vec![MeshData::default()],
            physics: None,
        };
        let source = Arc::new(set());
        let regenerated = Arc::new(set());

        assert!(accepts_rescale(Some(&source.clone()), &source));
        assert!(!accepts_rescale(Some(&regenerated), &source));
        assert!(!accepts_rescale(None, &source));
    }

    #[test]
    fn test_generation_without_source() {
        let config = TerrainGenConfig::default();
        assert!(matches!(
            run_generation(&config),
            Err(TerrainError::MissingSource)
        ));
    }
}
