pub mod components;
pub mod events;
pub mod logic;
pub mod resources;
pub mod systems;

use crate::terrain::events::*;
use crate::terrain::resources::*;
use crate::terrain::systems::*;
use bevy::prelude::*;

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<GenerateTerrainEvent>()
            .add_message::<RescaleTerrainEvent>()
            .add_message::<TerrainReadyEvent>()
            .add_message::<ShowLodEvent>()
            .add_message::<FrameTerrainEvent>()
            .init_resource::<CompletionQueue>()
            .init_resource::<TerrainState>()
            .add_systems(Startup, request_initial_generation)
            .add_systems(PreUpdate, apply_completed_jobs)
            .add_systems(
                Update,
                (
                    terrain_keyboard_control,
                    (start_generation, start_rescale),
                    spawn_terrain_on_ready,
                    update_lod_visibility,
                )
                    .chain(),
            );
    }
}
