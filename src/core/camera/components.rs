use bevy::prelude::*;

#[derive(Component, Reflect)]
pub struct MainCamera;

/// Orbit around the world origin, where the terrain is seated.
#[derive(Component, Reflect, Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.4,
            distance: 30.0,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}
