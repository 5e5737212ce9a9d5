use interaction::{InteractionWorld, ObjectId, Vec3};
use tracing::trace;

use super::scenario::GroundSpec;

/// Point-mass integrator standing in for an engine's physics step. Only
/// dynamic bodies move; contacts with the ground square are reported back to
/// the interaction world as collisions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BallisticSim {
    ground: GroundSpec,
}

impl BallisticSim {
    pub(crate) fn new(ground: GroundSpec) -> Self {
        Self { ground }
    }

    fn over_ground(&self, position: Vec3) -> bool {
        position.x.abs() <= self.ground.half_extent && position.z.abs() <= self.ground.half_extent
    }

    /// Advances every dynamic body by `dt_seconds`. Returns ids that hit the
    /// ground together with the impact speed.
    pub(crate) fn step(&self, world: &mut InteractionWorld, dt_seconds: f32) -> Vec<(ObjectId, f32)> {
        let ids = world
            .interactables()
            .filter(|interactable| !interactable.is_grabbed())
            .map(|interactable| interactable.id())
            .collect::<Vec<_>>();

        let mut impacts = Vec::new();
        for id in ids {
            let Some(object) = world.object_mut(id) else {
                continue;
            };
            let radius = object.collider.map(|collider| collider.radius).unwrap_or(0.0);
            let Some(body) = object.rigidbody.as_mut() else {
                continue;
            };
            if body.is_kinematic {
                continue;
            }
            if body.use_gravity {
                body.linear_velocity.y += self.ground.gravity * dt_seconds;
            }
            let mut position = object.pose.position + body.linear_velocity * dt_seconds;

            let rest_height = self.ground.height + radius;
            let on_ground = self.over_ground(position) && object.pose.position.y >= rest_height;
            if on_ground && position.y < rest_height && body.linear_velocity.y < 0.0 {
                let impact_speed = -body.linear_velocity.y;
                position.y = rest_height;
                body.linear_velocity.y = impact_speed * self.ground.restitution;
                body.linear_velocity.x *= self.ground.friction;
                body.linear_velocity.z *= self.ground.friction;
                if body.linear_velocity.y < 0.05 {
                    body.linear_velocity.y = 0.0;
                }
                trace!(object = id.0, speed = impact_speed, "ground_contact");
                impacts.push((id, impact_speed));
            }
            object.pose.position = position;
        }

        for &(id, speed) in &impacts {
            world.report_collision(id, speed);
        }
        impacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction::{
        ColliderState, InteractableConfig, Pose, RigidBodyState, SceneObject,
    };

    fn ball(position: Vec3) -> SceneObject {
        SceneObject::new(Pose::from_position(position))
            .with_collider(ColliderState {
                is_trigger: false,
                radius: 0.25,
            })
            .with_rigidbody(RigidBodyState::default())
    }

    #[test]
    fn falling_body_lands_on_the_ground() {
        let mut world = InteractionWorld::new();
        let id = world
            .spawn(InteractableConfig::grabbable(), ball(Vec3::new(0.0, 2.0, 0.0)))
            .expect("spawn");
        let sim = BallisticSim::new(GroundSpec::default());

        let mut impacts = 0;
        for _ in 0..120 {
            impacts += sim.step(&mut world, 1.0 / 60.0).len();
        }

        let position = world.get(id).expect("ball").object().position();
        assert!(impacts >= 1);
        assert!((position.y - 0.25).abs() < 1e-4);
    }

    #[test]
    fn body_outside_the_ground_square_keeps_falling() {
        let mut world = InteractionWorld::new();
        let id = world
            .spawn(InteractableConfig::grabbable(), ball(Vec3::new(20.0, 1.0, 0.0)))
            .expect("spawn");
        let sim = BallisticSim::new(GroundSpec::default());

        for _ in 0..60 {
            assert!(sim.step(&mut world, 1.0 / 60.0).is_empty());
        }
        assert!(world.get(id).expect("ball").object().position().y < -2.0);
    }

    #[test]
    fn kinematic_bodies_do_not_move() {
        let mut world = InteractionWorld::new();
        let mut object = ball(Vec3::new(0.0, 2.0, 0.0));
        if let Some(body) = object.rigidbody.as_mut() {
            body.is_kinematic = true;
        }
        let id = world
            .spawn(InteractableConfig::grabbable(), object)
            .expect("spawn");
        BallisticSim::new(GroundSpec::default()).step(&mut world, 0.5);
        assert_eq!(
            world.get(id).expect("ball").object().position(),
            Vec3::new(0.0, 2.0, 0.0)
        );
    }
}
