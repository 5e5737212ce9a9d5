use crate::avatar::{AvatarRig, CameraPose};
use crate::config::{AimMode, GrabConfig};
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eligibility {
    /// Distance from the avatar root, not the camera.
    pub distance: f32,
    pub in_range: bool,
    pub aimed: bool,
}

impl Eligibility {
    pub fn can_grab(&self) -> bool {
        self.in_range && self.aimed
    }
}

pub fn evaluate(
    config: &GrabConfig,
    object_position: Vec3,
    collider_radius: Option<f32>,
    avatar: &AvatarRig,
) -> Eligibility {
    let distance = avatar.position().distance(object_position);
    let in_range = !config.is_touch_only()
        && distance >= config.min_grab_distance
        && distance <= config.max_grab_distance;

    let aimed = if !in_range {
        false
    } else if config.is_distance_grab() {
        match config.aim_mode {
            AimMode::Cone => within_aim_cone(&avatar.camera, object_position, config.detection_radius),
            AimMode::Ray => {
                let radius = collider_radius.unwrap_or(config.detection_radius);
                ray_hits_sphere(
                    &avatar.camera,
                    object_position,
                    radius,
                    config.max_grab_distance,
                )
            }
        }
    } else {
        true
    };

    Eligibility {
        distance,
        in_range,
        aimed,
    }
}

/// Half-angle of the aim cone: wide for near objects, narrow for far ones.
pub fn cone_half_angle(detection_radius: f32, distance: f32) -> f32 {
    if distance <= f32::EPSILON {
        return std::f32::consts::FRAC_PI_2;
    }
    (detection_radius / distance).atan()
}

pub fn within_aim_cone(camera: &CameraPose, target: Vec3, detection_radius: f32) -> bool {
    let to_target = target - camera.position;
    let distance = to_target.length();
    if distance <= f32::EPSILON {
        return true;
    }
    camera.forward.angle_between(to_target) <= cone_half_angle(detection_radius, distance)
}

pub fn ray_hits_sphere(camera: &CameraPose, center: Vec3, radius: f32, max_distance: f32) -> bool {
    let Some(direction) = camera.forward.try_normalize() else {
        return false;
    };
    let to_center = center - camera.position;
    let along = to_center.dot(direction);
    let closest_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return false;
    }
    let half_chord = (radius_sq - closest_sq).max(0.0).sqrt();
    let near = along - half_chord;
    let far = along + half_chord;
    if far < 0.0 {
        return false;
    }
    near.max(0.0) <= max_distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Pose, Quat};
    use crate::scene::NodeId;

    fn avatar_facing(yaw_degrees: f32) -> AvatarRig {
        let forward = Quat::from_yaw(yaw_degrees.to_radians()).forward();
        AvatarRig::new(
            Pose::default(),
            CameraPose {
                position: Vec3::ZERO,
                forward,
            },
            NodeId(1),
        )
    }

    fn distance_grab(aim_mode: AimMode) -> GrabConfig {
        GrabConfig {
            detection_radius: 1.0,
            min_grab_distance: 0.0,
            max_grab_distance: 2.0,
            aim_mode,
            ..GrabConfig::default()
        }
    }

    #[test]
    fn cone_half_angle_matches_atan_ratio() {
        let angle = cone_half_angle(1.0, 1.5).to_degrees();
        assert!((angle - 33.69).abs() < 0.01, "{angle}");
    }

    #[test]
    fn cone_accepts_30_degrees_and_rejects_40_at_one_and_a_half_units() {
        let config = distance_grab(AimMode::Cone);
        let object = Vec3::new(0.0, 0.0, 1.5);

        let thirty = evaluate(&config, object, None, &avatar_facing(30.0));
        assert!(thirty.in_range);
        assert!(thirty.can_grab());

        let forty = evaluate(&config, object, None, &avatar_facing(40.0));
        assert!(forty.in_range);
        assert!(!forty.can_grab());
    }

    #[test]
    fn outside_distance_window_is_never_eligible() {
        let config = GrabConfig {
            min_grab_distance: 1.0,
            ..distance_grab(AimMode::Cone)
        };
        let avatar = avatar_facing(0.0);

        let too_close = evaluate(&config, Vec3::new(0.0, 0.0, 0.5), None, &avatar);
        assert!(!too_close.in_range);
        assert!(!too_close.can_grab());

        let too_far = evaluate(&config, Vec3::new(0.0, 0.0, 2.5), None, &avatar);
        assert!(!too_far.in_range);
        assert!(!too_far.can_grab());
    }

    #[test]
    fn proximity_measures_from_avatar_root_not_camera() {
        let config = distance_grab(AimMode::Cone);
        let mut avatar = avatar_facing(0.0);
        avatar.camera.position = Vec3::new(0.0, 0.0, -5.0);

        let eligibility = evaluate(&config, Vec3::new(0.0, 0.0, 1.0), None, &avatar);
        assert!((eligibility.distance - 1.0).abs() < 1e-6);
        assert!(eligibility.in_range);
    }

    #[test]
    fn fixed_distance_mode_skips_aim_test() {
        let config = GrabConfig {
            min_grab_distance: 2.0,
            max_grab_distance: 2.0,
            ..distance_grab(AimMode::Cone)
        };
        let eligibility = evaluate(&config, Vec3::new(0.0, 0.0, -2.0), None, &avatar_facing(0.0));
        assert!(eligibility.can_grab());
    }

    #[test]
    fn touch_only_is_never_in_range() {
        let config = GrabConfig {
            max_grab_distance: 0.0,
            ..GrabConfig::default()
        };
        let eligibility = evaluate(&config, Vec3::ZERO, None, &avatar_facing(0.0));
        assert!(!eligibility.in_range);
        assert!(!eligibility.can_grab());
    }

    #[test]
    fn ray_mode_uses_collider_radius() {
        let config = distance_grab(AimMode::Ray);
        let avatar = avatar_facing(0.0);
        let object = Vec3::new(0.3, 0.0, 1.5);

        assert!(evaluate(&config, object, Some(0.5), &avatar).can_grab());
        assert!(!evaluate(&config, object, Some(0.1), &avatar).can_grab());
    }

    #[test]
    fn ray_behind_camera_misses() {
        let camera = CameraPose {
            position: Vec3::ZERO,
            forward: Vec3::FORWARD,
        };
        assert!(!ray_hits_sphere(&camera, Vec3::new(0.0, 0.0, -2.0), 0.5, 10.0));
        assert!(ray_hits_sphere(&camera, Vec3::new(0.0, 0.0, 2.0), 0.5, 10.0));
        assert!(!ray_hits_sphere(&camera, Vec3::new(0.0, 0.0, 20.0), 0.5, 10.0));
    }
}
