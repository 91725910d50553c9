use specs::{Join, Read, ReadExpect, ReadStorage, System, WriteExpect, WriteStorage};

use super::{DeltaTime, PixelsPerMeter, components::RigidBody};
use crate::{data_structures::instance::Instance, physics::Physics};

/// Advances the physics world by the frame's [`DeltaTime`].
pub struct PhysicsStep;

impl<'a> System<'a> for PhysicsStep {
    type SystemData = (Read<'a, DeltaTime>, WriteExpect<'a, Physics>);

    fn run(&mut self, (dt, mut physics): Self::SystemData) {
        physics.update(dt.0);
    }
}

/// Copies body poses into render instances, converting meters to pixels.
pub struct SyncInstances;

impl<'a> System<'a> for SyncInstances {
    type SystemData = (
        ReadExpect<'a, Physics>,
        Read<'a, PixelsPerMeter>,
        ReadStorage<'a, RigidBody>,
        WriteStorage<'a, Instance>,
    );

    fn run(&mut self, (physics, ppm, bodies, mut instances): Self::SystemData) {
        for (body, instance) in (&bodies, &mut instances).join() {
            if let Some((x, y, rotation)) = physics.position(body.0) {
                instance.set_x(x * ppm.0);
                instance.set_y(y * ppm.0);
                instance.set_rotation(rotation);
            }
        }
    }
}
