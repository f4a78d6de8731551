use bevy::prelude::*;
use std::sync::Arc;
use terrainmesh::config::TerrainGenConfig;
use terrainmesh::jobs::{MainThreadQueue, TerrainJobs};
use terrainmesh::mesh_data::TerrainMeshSet;
use terrainmesh::raster::ColorRaster;

#[derive(Resource, Clone)]
pub struct TerrainSettings(pub TerrainGenConfig);

/// Completions posted by worker jobs, drained against the `World` each frame.
#[derive(Resource, Default)]
pub struct CompletionQueue(pub MainThreadQueue<World>);

#[derive(Resource, Default)]
pub struct TerrainState {
    pub jobs: TerrainJobs,
    /// Output of the last full generation. Rescales always start from it.
    pub reference: Option<Arc<TerrainMeshSet>>,
    /// What is on screen: the reference or a rescaled copy.
    pub current: Option<Arc<TerrainMeshSet>>,
    /// Decoded on the worker, turned into an `Image` on the main thread.
    pub pending_texture: Option<ColorRaster>,
    pub texture: Option<Handle<Image>>,
    pub visible_lod: usize,
}

impl TerrainState {
    pub fn height_scale(&self) -> Option<f32> {
        self.current.as_ref().map(|set| set.metadata.height_scale)
    }
}
