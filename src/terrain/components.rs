use bevy::prelude::*;

#[derive(Component)]
pub struct TerrainEntity;

#[derive(Component)]
pub struct TerrainLod {
    pub index: usize,
}
