use bevy::asset::RenderAssetUsages;
use bevy::math::{Vec2, Vec3};
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::Mesh;
use terrainmesh::mesh_data::MeshData;

fn build_mesh(vertices: &[Vec3], tex_coords: &[Vec2], normals: Vec<Vec3>, indices: &[u32]) -> Mesh {
    let positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.to_array()).collect();
    let normals: Vec<[f32; 3]> = normals.into_iter().map(|n| n.to_array()).collect();
    let uvs: Vec<[f32; 2]> = tex_coords.iter().map(|t| [t.x, 1.0 - t.y]).collect();

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices.to_vec()));
    mesh
}

/// Surface of one LOD. Expects data already converted to a right-handed frame.
///
/// Terrain UVs put v = 1 at the north edge, Bevy samples row 0 at v = 0, so v is flipped here.
pub fn terrain_mesh(data: &MeshData) -> Mesh {
    build_mesh(&data.vertices, &data.tex_coords, data.normals(), &data.triangles)
}

pub fn skirt_mesh(data: &MeshData) -> Option<Mesh> {
    if !data.has_skirt() {
        return None;
    }
    Some(build_mesh(
        &data.extra_vertices,
        &data.extra_tex_coords,
        data.extra_normals(),
        &data.extra_triangles,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;
    use terrainmesh::grid::triangle_grid_indices;

    fn quad() -> MeshData {
        MeshData {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            tex_coords: vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
            ],
            triangles: triangle_grid_indices(2, 2),
            ..MeshData::default()
        }
    }

    #[test]
    fn test_terrain_mesh_attributes() {
        let mesh = terrain_mesh(&quad());
        assert_eq!(mesh.count_vertices(), 4);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(6));

        match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(uvs)) => {
                assert_eq!(uvs[0], [0.0, 0.0]);
                assert_eq!(uvs[3], [1.0, 1.0]);
            }
            other => panic!("unexpected uv attribute {other:?}"),
        }
        match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(normals)) => {
                assert!(normals.iter().all(|n| (n[1] - 1.0).abs() < 1e-6));
            }
            other => panic!("unexpected normal attribute {other:?}"),
        }
    }

    #[test]
    fn test_skirt_only_when_present() {
        assert!(skirt_mesh(&quad()).is_none());

        let mut data = quad();
        data.extra_vertices = data.vertices.clone();
        data.extra_tex_coords = data.tex_coords.clone();
        data.extra_triangles = vec![0, 1, 2];
        let skirt = skirt_mesh(&data).unwrap();
        assert_eq!(skirt.count_vertices(), 4);
        assert_eq!(skirt.indices().map(|i| i.len()), Some(3));
    }
}
