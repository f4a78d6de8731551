use crate::error::{Result, TerrainError};
use crate::mesh_data::{MeshData, SurfaceKind, TerrainMeshSet};
use crate::metadata::TerrainMeshMetadata;
use glam::Vec3;

/// Re-applies height exaggeration to already generated geometry.
///
/// Only positions move. UVs, indices and vertex counts are carried over, so a
/// new scale costs one pass over the vertices instead of a decode and resample.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeightRescaler;

impl HeightRescaler {
    pub fn new() -> Self {
        Self
    }

    pub fn rescale(
        &self,
        reference: &TerrainMeshSet,
        metadata: &TerrainMeshMetadata,
    ) -> Result<TerrainMeshSet> {
        let original = &reference.metadata;

        if metadata.lod_count() != reference.lod_count() {
            return Err(TerrainError::RescaleMismatch(format!(
                "reference has {} LODs, metadata asks for {}",
                reference.lod_count(),
                metadata.lod_count()
            )));
        }
        if metadata.radius != original.radius {
            return Err(TerrainError::RescaleMismatch(format!(
                "radius {} differs from reference radius {}",
                metadata.radius, original.radius
            )));
        }
        if !metadata.height_scale.is_finite() {
            return Err(TerrainError::RescaleMismatch(format!(
                "height scale {} is not finite",
                metadata.height_scale
            )));
        }

        if metadata.height_scale == original.height_scale {
            let mut set = reference.clone();
            set.metadata = *metadata;
            return Ok(set);
        }
        if original.height_scale == 0.0 {
            return Err(TerrainError::RescaleMismatch(
                "reference was generated flat and carries no height information".to_string(),
            ));
        }

        let factor = metadata.height_scale / original.height_scale;
        let radius = original.radius;
        let apply = |mesh: &MeshData| rescale_mesh(reference.kind, mesh, radius, factor);

        let set = TerrainMeshSet {
            kind: reference.kind,
            metadata: *metadata,
            lods: reference.lods.iter().map(apply).collect(),
            physics: reference.physics.as_ref().map(apply),
        };
        log::debug!(
            "Rescaled {} LODs from height scale {} to {}",
            set.lod_count(),
            original.height_scale,
            metadata.height_scale
        );
        Ok(set)
    }
}

/// `d' = (d - r) * k + r` along the vertex direction. The centre stays put.
fn radial(vertex: Vec3, radius: f32, factor: f32) -> Vec3 {
    let distance = vertex.length();
    if distance == 0.0 {
        return vertex;
    }
    let scaled = (distance - radius) * factor + radius;
    vertex * (scaled / distance)
}

fn rescale_mesh(kind: SurfaceKind, mesh: &MeshData, radius: f32, factor: f32) -> MeshData {
    match kind {
        SurfaceKind::Globe => MeshData {
            vertices: mesh.vertices.iter().map(|&v| radial(v, radius, factor)).collect(),
            ..mesh.clone()
        },
        SurfaceKind::Plane => MeshData {
            vertices: mesh
                .vertices
                .iter()
                .map(|&v| Vec3::new(v.x, v.y * factor, v.z))
                .collect(),
            ..mesh.clone()
        },
        SurfaceKind::Patch => rescale_patch(mesh, radius, factor),
    }
}

fn rescale_patch(mesh: &MeshData, radius: f32, factor: f32) -> MeshData {
    // Patch vertices sit `radius` below the sphere centre offset
    let offset = Vec3::new(radius, 0.0, 0.0);
    let lift = |v: Vec3| radial(v + offset, radius, factor) - offset;

    let vertices: Vec<Vec3> = mesh.vertices.iter().map(|&v| lift(v)).collect();
    let minimum_vertex = vertices
        .iter()
        .copied()
        .reduce(|lowest, v| if v.x < lowest.x { v } else { lowest });

    let mut extra_vertices = mesh.extra_vertices.clone();
    if let Some(floor) = minimum_vertex.map(|v| v.x) {
        let ring = extra_vertices.len() / 2;
        let (top, bottom) = extra_vertices.split_at_mut(ring);
        for (upper, lower) in top.iter_mut().zip(bottom.iter_mut()) {
            *upper = lift(*upper);
            *lower = Vec3::new(floor, upper.y, upper.z);
        }
    }

    MeshData {
        vertices,
        extra_vertices,
        minimum_vertex,
        ..mesh.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{GeoBoundingBox, UvBounds};
    use crate::generator::{MeshGenerator, SurfaceRequest};
    use crate::raster::{ElevationRaster, RasterBuffer};
    use rstest::rstest;

    fn raster() -> ElevationRaster {
        let data = (0..48 * 24)
            .map(|i| 200.0 + ((i % 48) as f32 * 0.4).sin() * 150.0 + (i / 48) as f32 * 5.0)
            .collect();
        RasterBuffer::from_vec(48, 24, data).unwrap()
    }

    fn metadata(height_scale: f32) -> TerrainMeshMetadata {
        TerrainMeshMetadata {
            radius: 50.0,
            height_scale,
            lod_levels: 1,
            base_downsample: 1,
            physics_lod_index: Some(2),
        }
    }

    fn request(kind: SurfaceKind) -> SurfaceRequest {
        match kind {
            SurfaceKind::Globe => SurfaceRequest::Globe,
            SurfaceKind::Plane => SurfaceRequest::Plane,
            SurfaceKind::Patch => SurfaceRequest::Patch {
                bounds: GeoBoundingBox::new(20.0, -15.0, 50.0, 15.0),
                uv_bounds: UvBounds::FULL,
            },
        }
    }

    fn generate(kind: SurfaceKind, height_scale: f32) -> TerrainMeshSet {
        MeshGenerator::new()
            .generate_set(&raster(), &request(kind), &metadata(height_scale))
            .unwrap()
    }

    #[rstest]
    fn same_scale_is_identity(
        #[values(SurfaceKind::Globe, SurfaceKind::Plane, SurfaceKind::Patch)] kind: SurfaceKind,
    ) {
        let reference = generate(kind, 0.01);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.01))
            .unwrap();
        assert_eq!(rescaled, reference);
    }

    #[test]
    fn globe_doubled_scale_doubles_offset() {
        let reference = generate(SurfaceKind::Globe, 0.01);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.02))
            .unwrap();

        assert_eq!(rescaled.metadata.height_scale, 0.02);
        for (old, new) in reference.lods[0].vertices.iter().zip(&rescaled.lods[0].vertices) {
            let expected = (old.length() - 50.0) * 2.0;
            assert!((new.length() - 50.0 - expected).abs() < 1e-3);
            assert!(old.normalize().dot(new.normalize()) > 0.9999);
        }
        assert_eq!(rescaled.lods[1].triangles, reference.lods[1].triangles);
        assert_eq!(rescaled.lods[1].tex_coords, reference.lods[1].tex_coords);
    }

    #[test]
    fn rescale_matches_regeneration() {
        let reference = generate(SurfaceKind::Globe, 0.01);
        let regenerated = generate(SurfaceKind::Globe, 0.03);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.03))
            .unwrap();
        for (a, b) in regenerated.lods[0].vertices.iter().zip(&rescaled.lods[0].vertices) {
            assert!((*a - *b).length() < 1e-3);
        }
    }

    #[test]
    fn plane_scales_heights() {
        let reference = generate(SurfaceKind::Plane, 0.01);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.005))
            .unwrap();
        for (old, new) in reference.lods[0].vertices.iter().zip(&rescaled.lods[0].vertices) {
            assert_eq!(new.x, old.x);
            assert_eq!(new.z, old.z);
            assert!((new.y - old.y * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn patch_skirt_follows_new_floor() {
        let reference = generate(SurfaceKind::Patch, 0.01);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.04))
            .unwrap();
        let mesh = &rescaled.lods[0];
        let minimum = mesh.minimum_vertex.unwrap();

        assert!(mesh.vertices.iter().all(|v| v.x >= minimum.x));
        let ring = mesh.extra_vertices.len() / 2;
        assert_eq!(ring, reference.lods[0].extra_vertices.len() / 2);
        for i in 0..ring {
            let (top, bottom) = (mesh.extra_vertices[i], mesh.extra_vertices[ring + i]);
            assert_eq!(bottom, Vec3::new(minimum.x, top.y, top.z));
        }
        assert_eq!(mesh.extra_triangles, reference.lods[0].extra_triangles);
    }

    #[test]
    fn physics_mesh_is_rescaled() {
        let reference = generate(SurfaceKind::Plane, 0.01);
        let rescaled = HeightRescaler::new()
            .rescale(&reference, &metadata(0.02))
            .unwrap();
        let (old, new) = (reference.physics.unwrap(), rescaled.physics.unwrap());
        assert_eq!(old.vertex_count(), new.vertex_count());
        let top = |m: &MeshData| m.vertices.iter().map(|v| v.y).fold(0.0, f32::max);
        assert!((top(&new) - 2.0 * top(&old)).abs() < 1e-4);
    }

    #[rstest]
    #[case(TerrainMeshMetadata { lod_levels: 3, ..metadata(0.02) })]
    #[case(TerrainMeshMetadata { radius: 60.0, ..metadata(0.02) })]
    #[case(metadata(f32::INFINITY))]
    fn mismatched_metadata_rejected(#[case] target: TerrainMeshMetadata) {
        let reference = generate(SurfaceKind::Globe, 0.01);
        assert!(matches!(
            HeightRescaler::new().rescale(&reference, &target),
            Err(TerrainError::RescaleMismatch(_))
        ));
    }

    #[test]
    fn flat_reference_cannot_be_rescaled() {
        let reference = generate(SurfaceKind::Globe, 0.0);
        assert!(matches!(
            HeightRescaler::new().rescale(&reference, &metadata(0.01)),
            Err(TerrainError::RescaleMismatch(_))
        ));
    }
}
