use crate::bounds::{GeoBoundingBox, GeoBounds, UvBounds};
use crate::decoder::ElevationRasterDecoder;
use crate::error::{Result, TerrainError};
use crate::grid::{border_loop, grid_uv, triangle_grid_indices};
use crate::mesh_data::{MeshData, SurfaceKind, TerrainMeshSet};
use crate::metadata::TerrainMeshMetadata;
use crate::raster::{BoundaryMode, ElevationRaster};
use glam::{Quat, Vec2, Vec3};
use rayon::prelude::*;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::path::Path;

/// Which surface to build from the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceRequest {
    /// The whole raster wrapped onto a sphere.
    Globe,
    /// The whole raster as a flat height field.
    Plane,
    /// A bounding-box-restricted piece of the sphere, re-centred on the origin.
    ///
    /// `uv_bounds` locates the patch inside the raster (and the texture that
    /// goes with it), so several patches can share one square texture.
    Patch {
        bounds: GeoBoundingBox,
        uv_bounds: UvBounds,
    },
}

impl SurfaceRequest {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            SurfaceRequest::Globe => SurfaceKind::Globe,
            SurfaceRequest::Plane => SurfaceKind::Plane,
            SurfaceRequest::Patch { .. } => SurfaceKind::Patch,
        }
    }
}

/// Pixel rectangle `(x, y, width, height)` a patch samples from.
pub fn patch_region(width: usize, height: usize, uv: &UvBounds) -> (usize, usize, usize, usize) {
    let to_px = |t: f32, size: usize| (t.clamp(0.0, 1.0) * size as f32).round() as usize;
    let x0 = to_px(uv.u_min, width);
    let x1 = to_px(uv.u_max, width);
    // v grows northward, rows grow southward
    let y0 = to_px(1.0 - uv.v_max, height);
    let y1 = to_px(1.0 - uv.v_min, height);
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

fn check_downsample(downsample: u32) -> Result<()> {
    if downsample.is_power_of_two() {
        Ok(())
    } else {
        Err(TerrainError::InvalidDownsampleFactor(downsample as u64))
    }
}

/// Builds per-LOD geometry from a decoded elevation raster.
#[derive(Debug, Clone, Copy)]
pub struct MeshGenerator {
    /// Boundary handling for every elevation read.
    pub sample_mode: BoundaryMode,
}

impl Default for MeshGenerator {
    fn default() -> Self {
        Self {
            sample_mode: BoundaryMode::Repeat,
        }
    }
}

impl MeshGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(&self, raster: &ElevationRaster, x: usize, y: usize, downsample: u32) -> f32 {
        self.sample_axes(raster, x, y, downsample, self.sample_mode)
    }

    fn sample_axes(
        &self,
        raster: &ElevationRaster,
        x: usize,
        y: usize,
        downsample: u32,
        x_mode: BoundaryMode,
    ) -> f32 {
        if downsample > 1 {
            raster.centered_average_axes(
                x as i64,
                y as i64,
                downsample as usize,
                x_mode,
                self.sample_mode,
            )
        } else {
            raster
                .get(x as i64, y as i64, self.sample_mode)
                .unwrap_or_default()
        }
    }

    /// Vertex grid `(columns, rows)` for `request` at `downsample`, or why there is none.
    pub fn grid_size(
        &self,
        raster_width: usize,
        raster_height: usize,
        request: &SurfaceRequest,
        downsample: u32,
    ) -> Result<(usize, usize)> {
        check_downsample(downsample)?;
        let ds = downsample as usize;

        let (columns, rows, usable) = match request {
            SurfaceRequest::Globe => {
                let columns = raster_width / ds;
                (columns + 1, raster_height / ds, columns >= 1)
            }
            SurfaceRequest::Plane => (raster_width / ds, raster_height / ds, true),
            SurfaceRequest::Patch { uv_bounds, .. } => {
                let (_, _, w, h) = patch_region(raster_width, raster_height, uv_bounds);
                (w / ds, h / ds, true)
            }
        };

        if !usable || columns < 2 || rows < 2 {
            return Err(TerrainError::DegenerateGrid {
                downsample,
                width: columns,
                height: rows,
            });
        }
        Ok((columns, rows))
    }

    /// Full sphere. The extra longitude column closes the seam with its own UVs.
    pub fn generate_globe(
        &self,
        raster: &ElevationRaster,
        metadata: &TerrainMeshMetadata,
        downsample: u32,
    ) -> Result<MeshData> {
        let (lon_count, lat_count) =
            self.grid_size(raster.width(), raster.height(), &SurfaceRequest::Globe, downsample)?;
        let ds = downsample as usize;
        let lon_step = TAU / (lon_count - 1) as f32;

        let mut vertices = Vec::with_capacity(lon_count * lat_count);
        let mut tex_coords = Vec::with_capacity(lon_count * lat_count);

        for vy in 0..lat_count {
            // North pole at vy = 0
            let lat = PI * vy as f32 / (lat_count - 1) as f32 + FRAC_PI_2;
            let base = Vec3::new(lat.cos(), lat.sin(), 0.0);
            let y = vy * ds;

            // Reversed so the grid winding faces outward
            for vx in (0..lon_count).rev() {
                // Longitude wraps across the antimeridian
                let x = (vx * ds) % raster.width();
                let elevation = self.sample_axes(raster, x, y, downsample, BoundaryMode::Wrap);
                let distance = metadata.radius + metadata.height_scale * elevation;

                // -90° puts (lat 0, lon 0) on -z
                let rotation = Quat::from_rotation_y(-FRAC_PI_2 - vx as f32 * lon_step);
                vertices.push(rotation * (base * distance));
                tex_coords.push(grid_uv(vx, vy, lon_count, lat_count, &UvBounds::FULL));
            }
        }

        log::debug!(
            "Globe mesh at downsample {}: {}x{} vertices",
            downsample,
            lon_count,
            lat_count
        );

        Ok(MeshData {
            vertices,
            tex_coords,
            triangles: triangle_grid_indices(lon_count, lat_count),
            ..MeshData::default()
        })
    }

    /// Flat height field resting on `y = 0`, `2 * radius` wide.
    pub fn generate_plane(
        &self,
        raster: &ElevationRaster,
        metadata: &TerrainMeshMetadata,
        downsample: u32,
    ) -> Result<MeshData> {
        let (columns, rows) =
            self.grid_size(raster.width(), raster.height(), &SurfaceRequest::Plane, downsample)?;
        let ds = downsample as usize;
        let cell = 2.0 * metadata.radius / (columns - 1) as f32;
        let half_width = (columns - 1) as f32 * cell * 0.5;
        let half_height = (rows - 1) as f32 * cell * 0.5;

        let mut vertices = Vec::with_capacity(columns * rows);
        let mut tex_coords = Vec::with_capacity(columns * rows);

        for vy in 0..rows {
            for vx in 0..columns {
                let elevation = self.sample(raster, vx * ds + ds / 2, vy * ds + ds / 2, downsample);
                vertices.push(Vec3::new(
                    vx as f32 * cell - half_width,
                    elevation * metadata.height_scale,
                    vy as f32 * cell - half_height,
                ));
                tex_coords.push(grid_uv(vx, vy, columns, rows, &UvBounds::FULL));
            }
        }

        let min_height = vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
        for vertex in &mut vertices {
            vertex.y -= min_height;
        }

        log::debug!(
            "Plane mesh at downsample {}: {}x{} vertices",
            downsample,
            columns,
            rows
        );

        Ok(MeshData {
            vertices,
            tex_coords,
            triangles: triangle_grid_indices(columns, rows),
            ..MeshData::default()
        })
    }

    /// Sphere fragment inside `bounds`, rotated so its median direction sits
    /// on the origin with +x as up, plus a skirt down to the lowest vertex.
    pub fn generate_patch(
        &self,
        raster: &ElevationRaster,
        bounds: &GeoBoundingBox,
        uv_bounds: &UvBounds,
        metadata: &TerrainMeshMetadata,
        downsample: u32,
    ) -> Result<MeshData> {
        let request = SurfaceRequest::Patch {
            bounds: *bounds,
            uv_bounds: *uv_bounds,
        };
        let (columns, rows) =
            self.grid_size(raster.width(), raster.height(), &request, downsample)?;
        let (x0, y0, _, _) = patch_region(raster.width(), raster.height(), uv_bounds);
        let ds = downsample as usize;

        let lat_start = bounds.lat_start().to_radians();
        let lon_start = bounds.lon_start().to_radians();
        let lat_increment = bounds.lat_swing().to_radians() / (rows - 1) as f32;
        let lon_increment = bounds.lon_swing().to_radians() / (columns - 1) as f32;
        // Unwrapped so the difference stays continuous across the antimeridian
        let median_longitude = lon_start + bounds.lon_swing().to_radians() * 0.5;
        let median_latitude = bounds.median_latitude().to_radians();
        let tilt = Quat::from_rotation_z(-median_latitude);

        let mut vertices = Vec::with_capacity(columns * rows);
        let mut tex_coords = Vec::with_capacity(columns * rows);
        let mut minimum_vertex = Vec3::splat(f32::INFINITY);

        for vy in 0..rows {
            let y_index = rows - 1 - vy;
            let lat = lat_start + y_index as f32 * lat_increment;
            let base = Vec3::new(lat.cos(), lat.sin(), 0.0);
            let py = y0 + vy * ds + ds / 2;

            for vx in (0..columns).rev() {
                let lon = lon_start + vx as f32 * lon_increment;
                let px = x0 + vx * ds + ds / 2;
                let elevation = self.sample(raster, px, py, downsample);
                let distance = metadata.radius + metadata.height_scale * elevation;

                let spin = Quat::from_rotation_y(median_longitude - lon);
                let mut vertex = tilt * (spin * (base * distance));
                vertex.x -= metadata.radius;

                if vertex.x < minimum_vertex.x {
                    minimum_vertex = vertex;
                }
                vertices.push(vertex);
                tex_coords.push(grid_uv(vx, vy, columns, rows, uv_bounds));
            }
        }

        let mut mesh = MeshData {
            vertices,
            tex_coords,
            triangles: triangle_grid_indices(columns, rows),
            minimum_vertex: Some(minimum_vertex),
            ..MeshData::default()
        };
        build_skirt(&mut mesh, columns, rows);

        log::debug!(
            "Patch mesh {} at downsample {}: {}x{} vertices, floor at x = {:.4}",
            bounds,
            downsample,
            columns,
            rows,
            minimum_vertex.x
        );

        Ok(mesh)
    }

    pub fn generate_surface(
        &self,
        raster: &ElevationRaster,
        request: &SurfaceRequest,
        metadata: &TerrainMeshMetadata,
        downsample: u32,
    ) -> Result<MeshData> {
        match request {
            SurfaceRequest::Globe => self.generate_globe(raster, metadata, downsample),
            SurfaceRequest::Plane => self.generate_plane(raster, metadata, downsample),
            SurfaceRequest::Patch { bounds, uv_bounds } => {
                self.generate_patch(raster, bounds, uv_bounds, metadata, downsample)
            }
        }
    }

    /// Every LOD (and the physics mesh, if requested) from one raster.
    ///
    /// All downsample factors are validated against the raster before any
    /// sample is read.
    pub fn generate_set(
        &self,
        raster: &ElevationRaster,
        request: &SurfaceRequest,
        metadata: &TerrainMeshMetadata,
    ) -> Result<TerrainMeshSet> {
        metadata.validate()?;
        let downsamples = metadata.downsamples()?;
        let physics_downsample = metadata.physics_downsample()?;

        for &ds in downsamples.iter().chain(physics_downsample.iter()) {
            self.grid_size(raster.width(), raster.height(), request, ds)?;
        }

        let lods = downsamples
            .par_iter()
            .map(|&ds| self.generate_surface(raster, request, metadata, ds))
            .collect::<Result<Vec<_>>>()?;
        let physics = physics_downsample
            .map(|ds| self.generate_surface(raster, request, metadata, ds))
            .transpose()?;

        let set = TerrainMeshSet {
            kind: request.kind(),
            metadata: *metadata,
            lods,
            physics,
        };
        log::info!(
            "Generated {:?} terrain: {} LODs, {} vertices total",
            set.kind,
            set.lod_count(),
            set.total_vertex_count()
        );
        Ok(set)
    }

    /// Validates `metadata`, then decodes `path` once and builds every LOD.
    pub fn generate_from_file(
        &self,
        decoder: &ElevationRasterDecoder,
        path: &Path,
        request: &SurfaceRequest,
        metadata: &TerrainMeshMetadata,
    ) -> Result<TerrainMeshSet> {
        metadata.validate()?;
        let raster = decoder.decode_file(path)?;
        self.generate_set(&raster, request, metadata)
    }
}

/// Side wall of a patch: the closed border loop joined to a copy of itself
/// flattened onto the patch floor (`minimum_vertex.x`).
fn build_skirt(mesh: &mut MeshData, columns: usize, rows: usize) {
    let Some(floor) = mesh.minimum_vertex.map(|v| v.x) else {
        return;
    };
    let ring = border_loop(columns, rows);
    let len = ring.len();
    if len < 2 {
        return;
    }

    let top: Vec<Vec3> = ring.iter().map(|&i| mesh.vertices[i]).collect();
    let ring_uvs: Vec<Vec2> = ring.iter().map(|&i| mesh.tex_coords[i]).collect();

    mesh.extra_vertices = top.clone();
    mesh.extra_vertices
        .extend(top.iter().map(|v| Vec3::new(floor, v.y, v.z)));
    mesh.extra_tex_coords = ring_uvs.clone();
    mesh.extra_tex_coords.extend(ring_uvs);

    mesh.extra_triangles = (0..len - 1)
        .flat_map(|i| {
            let (top0, top1) = (i as u32, (i + 1) as u32);
            let (bottom0, bottom1) = ((len + i) as u32, (len + i + 1) as u32);
            [top0, top1, bottom0, top1, bottom1, bottom0]
        })
        .collect();
}
