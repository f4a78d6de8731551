use crate::metadata::TerrainMeshMetadata;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Globe,
    Plane,
    Patch,
}

/// Raw geometry for a single LOD, independent of any rendering engine.
///
/// Positions are in a left-handed, Y-up frame and triangles are wound so
/// `(b - a) × (c - a)` points out of the surface. Use [`MeshData::to_right_handed`]
/// before handing the data to a right-handed renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub triangles: Vec<u32>,
    /// Skirt ring: the border loop followed by its flattened copy.
    pub extra_vertices: Vec<Vec3>,
    pub extra_tex_coords: Vec<Vec2>,
    /// Indices into `extra_vertices`.
    pub extra_triangles: Vec<u32>,
    /// Lowest vertex along the patch's up axis (x), used to seat the patch.
    pub minimum_vertex: Option<Vec3>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn has_skirt(&self) -> bool {
        !self.extra_vertices.is_empty()
    }

    /// Area-weighted vertex normals of the main surface.
    pub fn normals(&self) -> Vec<Vec3> {
        vertex_normals(&self.vertices, &self.triangles)
    }

    pub fn extra_normals(&self) -> Vec<Vec3> {
        vertex_normals(&self.extra_vertices, &self.extra_triangles)
    }

    /// Mirrors z and flips every triangle so the mesh reads correctly in a
    /// right-handed frame with counter-clockwise front faces.
    pub fn to_right_handed(&self) -> MeshData {
        let flip = |v: &Vec3| Vec3::new(v.x, v.y, -v.z);
        let rewind = |indices: &[u32]| {
            indices
                .chunks_exact(3)
                .flat_map(|tri| [tri[0], tri[2], tri[1]])
                .collect::<Vec<_>>()
        };

        MeshData {
            vertices: self.vertices.iter().map(flip).collect(),
            tex_coords: self.tex_coords.clone(),
            triangles: rewind(&self.triangles),
            extra_vertices: self.extra_vertices.iter().map(flip).collect(),
            extra_tex_coords: self.extra_tex_coords.clone(),
            extra_triangles: rewind(&self.extra_triangles),
            minimum_vertex: self.minimum_vertex.as_ref().map(flip),
        }
    }
}

fn vertex_normals(vertices: &[Vec3], triangles: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let face = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

/// A complete LOD set for one terrain model, LOD0 first.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMeshSet {
    pub kind: SurfaceKind,
    pub metadata: TerrainMeshMetadata,
    pub lods: Vec<MeshData>,
    /// Collider mesh, present when `metadata.physics_lod_index` is set.
    pub physics: Option<MeshData>,
}

impl TerrainMeshSet {
    pub fn lod(&self, index: usize) -> Option<&MeshData> {
        self.lods.get(index)
    }

    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn total_vertex_count(&self) -> usize {
        self.lods.iter().map(MeshData::vertex_count).sum::<usize>()
            + self.physics.as_ref().map_or(0, MeshData::vertex_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::triangle_grid_indices;

    fn flat_quad() -> MeshData {
        // y-up plane, grid rows along +z
        MeshData {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            tex_coords: vec![Vec2::ZERO; 4],
            triangles: triangle_grid_indices(2, 2),
            minimum_vertex: Some(Vec3::new(0.0, 0.0, 1.0)),
            ..MeshData::default()
        }
    }

    #[test]
    fn grid_winding_faces_up() {
        let normals = flat_quad().normals();
        assert!(normals.iter().all(|n| (*n - Vec3::Y).length() < 1e-6));
    }

    #[test]
    fn right_handed_keeps_facing() {
        let mesh = flat_quad().to_right_handed();
        assert_eq!(mesh.vertices[2], Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(mesh.minimum_vertex, Some(Vec3::new(0.0, 0.0, -1.0)));
        assert_eq!(&mesh.triangles[..3], &[0, 3, 2]);
        assert!(mesh.normals().iter().all(|n| (*n - Vec3::Y).length() < 1e-6));
    }

    #[test]
    fn counts() {
        let mesh = flat_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.has_skirt());
    }
}
