use bevy::prelude::*;

#[derive(Message)]
pub struct GenerateTerrainEvent;

#[derive(Message)]
pub struct RescaleTerrainEvent {
    pub height_scale: f32,
}

/// A generation or rescale result was stored and should be spawned.
#[derive(Message)]
pub struct TerrainReadyEvent;

#[derive(Message)]
pub struct ShowLodEvent {
    pub lod: usize,
}

#[derive(Message)]
pub struct FrameTerrainEvent {
    pub distance: f32,
}
