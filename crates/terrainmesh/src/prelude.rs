pub use crate::bounds::{GeoBoundingBox, GeoBounds, UnrestrictedGeoBoundingBox, UvBounds};
pub use crate::config::TerrainGenConfig;
pub use crate::decoder::ElevationRasterDecoder;
pub use crate::error::{Result, TerrainError};
pub use crate::generator::{MeshGenerator, SurfaceRequest};
pub use crate::jobs::{JobStatus, MainThreadQueue, QueueHandle, TerrainJobs, spawn_job};
pub use crate::mesh_data::{MeshData, SurfaceKind, TerrainMeshSet};
pub use crate::metadata::TerrainMeshMetadata;
pub use crate::raster::{BoundaryMode, ColorRaster, ElevationRaster, RasterBuffer};
pub use crate::rescale::HeightRescaler;
