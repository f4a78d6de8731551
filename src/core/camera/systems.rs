use crate::core::camera::components::{MainCamera, OrbitCamera};
use crate::core::camera::logic::{OrbitInput, OrbitPose, apply_orbit_input, orbit_translation};
use crate::terrain::events::FrameTerrainEvent;
use bevy::input::ButtonInput;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::light::DirectionalLight;
use bevy::math::{EulerRot, Quat, Vec2, Vec3};
use bevy::prelude::*;
use std::f32::consts::PI;

pub fn spawn_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    let pose = pose_of(&orbit);

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(orbit_translation(&pose)).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
        orbit,
    ));

    commands.spawn((
        Transform::from_rotation(Quat::from_euler(EulerRot::ZYX, 0.0, 1.0, -PI / 4.)),
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
    ));

    info!("Camera spawned");
}

fn pose_of(orbit: &OrbitCamera) -> OrbitPose {
    OrbitPose {
        yaw: orbit.yaw,
        pitch: orbit.pitch,
        distance: orbit.distance,
    }
}

pub fn orbit_camera_control(
    mouse_input: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut camera_q: Query<(&mut Transform, &mut OrbitCamera), With<MainCamera>>,
) {
    let Ok((mut transform, mut orbit)) = camera_q.single_mut() else {
        return;
    };

    let input = OrbitInput {
        dragging: mouse_input.pressed(MouseButton::Left),
        mouse_delta: mouse_motion.read().map(|ev| ev.delta).sum::<Vec2>(),
        wheel_delta: mouse_wheel.read().map(|ev| ev.y).sum(),
    };

    let pose = apply_orbit_input(pose_of(&orbit), &input, orbit.min_distance, orbit.max_distance);
    orbit.yaw = pose.yaw;
    orbit.pitch = pose.pitch;
    orbit.distance = pose.distance;

    *transform =
        Transform::from_translation(orbit_translation(&pose)).looking_at(Vec3::ZERO, Vec3::Y);
}

pub fn frame_terrain(
    mut events: MessageReader<FrameTerrainEvent>,
    mut camera_q: Query<&mut OrbitCamera, With<MainCamera>>,
) {
    for event in events.read() {
        if let Ok(mut orbit) = camera_q.single_mut() {
            orbit.distance = event.distance;
            orbit.min_distance = event.distance * 0.05;
            orbit.max_distance = event.distance * 10.0;
            debug!("Framing terrain at distance {:.3}", event.distance);
        }
    }
}
