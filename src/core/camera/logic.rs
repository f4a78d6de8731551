use bevy::math::{EulerRot, Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

const ROTATE_SENSITIVITY: f32 = 0.005;
const ZOOM_STEP: f32 = 0.1;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.05;

pub struct OrbitInput {
    pub dragging: bool,
    pub mouse_delta: Vec2,
    pub wheel_delta: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

/// Applies one frame of mouse input. Zoom is multiplicative so it feels the
/// same on a tabletop patch and on a planet.
pub fn apply_orbit_input(
    pose: OrbitPose,
    input: &OrbitInput,
    min_distance: f32,
    max_distance: f32,
) -> OrbitPose {
    let mut next = pose;

    if input.dragging && input.mouse_delta.length_squared() > 0.0 {
        next.yaw -= input.mouse_delta.x * ROTATE_SENSITIVITY;
        next.pitch = (next.pitch + input.mouse_delta.y * ROTATE_SENSITIVITY)
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    if input.wheel_delta != 0.0 {
        next.distance *= (1.0 - input.wheel_delta * ZOOM_STEP).max(ZOOM_STEP);
    }
    next.distance = next.distance.clamp(min_distance, max_distance);

    next
}

/// Camera position for `pose`, looking at the origin.
pub fn orbit_translation(pose: &OrbitPose) -> Vec3 {
    Quat::from_euler(EulerRot::YXZ, pose.yaw, -pose.pitch, 0.0) * Vec3::Z * pose.distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn idle() -> OrbitInput {
        OrbitInput {
            dragging: false,
            mouse_delta: Vec2::ZERO,
            wheel_delta: 0.0,
        }
    }

    fn pose() -> OrbitPose {
        OrbitPose {
            yaw: 0.0,
            pitch: 0.0,
            distance: 10.0,
        }
    }

    #[test]
    fn test_no_input_no_change() {
        assert_eq!(apply_orbit_input(pose(), &idle(), 1.0, 100.0), pose());
    }

    #[test]
    fn test_drag_requires_button() {
        let mut input = idle();
        input.mouse_delta = Vec2::new(40.0, 40.0);
        assert_eq!(apply_orbit_input(pose(), &input, 1.0, 100.0), pose());

        input.dragging = true;
        let next = apply_orbit_input(pose(), &input, 1.0, 100.0);
        assert!(next.yaw < 0.0);
        assert!(next.pitch > 0.0);
    }

    #[rstest]
    #[case(1000.0)]
    #[case(-1000.0)]
    fn test_pitch_is_clamped(#[case] delta_y: f32) {
        let mut input = idle();
        input.dragging = true;
        input.mouse_delta = Vec2::new(0.0, delta_y);
        let next = apply_orbit_input(pose(), &input, 1.0, 100.0);
        assert!(next.pitch.abs() <= PITCH_LIMIT);
        assert!(next.pitch.abs() > 1.4);
    }

    #[rstest]
    #[case(1.0, 9.0)]
    #[case(-1.0, 11.0)]
    #[case(50.0, 2.0)] // clamped to the minimum
    #[case(-50.0, 20.0)] // clamped to the maximum
    fn test_wheel_zoom(#[case] wheel: f32, #[case] expected: f32) {
        let mut input = idle();
        input.wheel_delta = wheel;
        let next = apply_orbit_input(pose(), &input, 2.0, 20.0);
        assert!((next.distance - expected).abs() < 1e-4, "distance was {}", next.distance);
    }

    #[rstest]
    #[case(0.0, 0.0, Vec3::new(0.0, 0.0, 10.0))]
    #[case(FRAC_PI_2, 0.0, Vec3::new(10.0, 0.0, 0.0))]
    #[case(0.0, 1.0, Vec3::new(0.0, 10.0 * 1.0f32.sin(), 10.0 * 1.0f32.cos()))]
    fn test_orbit_translation(#[case] yaw: f32, #[case] pitch: f32, #[case] expected: Vec3) {
        let translation = orbit_translation(&OrbitPose {
            yaw,
            pitch,
            distance: 10.0,
        });
        assert!((translation - expected).length() < 1e-4, "translation was {translation}");
    }
}
