//! Entity-component-system glue on top of specs.
//!
//! A [`Scene`] owns a specs `World` with the [`Physics`] world as a resource and a
//! dispatcher that steps physics and then copies body poses into the `Instance`
//! component of every entity with a [`components::RigidBody`]. Rendering reads the
//! instances afterwards via
//! [`MeshStore::sync_from_world`](crate::data_structures::batch::MeshStore::sync_from_world).

pub mod components;
pub mod systems;

use specs::{
    Dispatcher, DispatcherBuilder, Entity, World, WorldExt,
    shred::{Fetch, FetchMut},
};

use crate::{
    data_structures::instance::Instance,
    physics::Physics,
    unit::{Allegiance, Health},
};

use self::{
    components::{MeshRef, RigidBody},
    systems::{PhysicsStep, SyncInstances},
};

/// Seconds since the last update.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct DeltaTime(pub f32);

/// Scale between physics meters and render pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PixelsPerMeter(pub f32);

pub const DEFAULT_PIXELS_PER_METER: f32 = 50.0;

impl Default for PixelsPerMeter {
    fn default() -> Self {
        Self(DEFAULT_PIXELS_PER_METER)
    }
}

pub struct Scene {
    world: World,
    dispatcher: Dispatcher<'static, 'static>,
}

impl Scene {
    pub fn new(physics: Physics, pixels_per_meter: f32) -> Self {
        let mut world = World::new();
        world.register::<Instance>();
        world.register::<MeshRef>();
        world.register::<RigidBody>();
        world.register::<Health>();
        world.register::<Allegiance>();
        world.insert(physics);
        world.insert(DeltaTime::default());
        world.insert(PixelsPerMeter(pixels_per_meter));

        let mut dispatcher = DispatcherBuilder::new()
            .with(PhysicsStep, "physics_step", &[])
            .with(SyncInstances, "sync_instances", &["physics_step"])
            .build();
        dispatcher.setup(&mut world);

        Self { world, dispatcher }
    }

    /// Run all systems for a frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.world.insert(DeltaTime(dt));
        self.dispatcher.dispatch(&self.world);
        self.world.maintain();
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn physics(&self) -> Fetch<'_, Physics> {
        self.world.read_resource::<Physics>()
    }

    pub fn physics_mut(&self) -> FetchMut<'_, Physics> {
        self.world.write_resource::<Physics>()
    }

    pub fn pixels_per_meter(&self) -> f32 {
        self.world.read_resource::<PixelsPerMeter>().0
    }

    /// Delete an entity together with its physics body.
    pub fn despawn(&mut self, entity: Entity) -> anyhow::Result<()> {
        let body = self.world.read_storage::<RigidBody>().get(entity).copied();
        if let Some(RigidBody(handle)) = body {
            self.physics_mut().remove(handle);
        }
        self.world
            .delete_entity(entity)
            .map_err(|e| anyhow::anyhow!("Could not delete entity: {e}"))?;
        self.world.maintain();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::mesh::MeshId,
        physics::{Physics, shape::Shape},
    };
    use approx::assert_relative_eq;
    use cgmath::Vector2;
    use specs::{Builder, Join};

    fn falling_entity(scene: &mut Scene) -> Entity {
        let body = scene.physics_mut().spawn_rigid_body(
            &Physics::default_rigid_body_builder(),
            &[Physics::default_collider_builder(Shape::ball(0.5))],
        );
        scene
            .world_mut()
            .create_entity()
            .with(Instance::new(0.0, 0.0))
            .with(MeshRef(MeshId(0)))
            .with(RigidBody(body))
            .build()
    }

    #[test]
    fn update_moves_instances_with_their_bodies() {
        let mut scene = Scene::new(Physics::default(), 50.0);
        let entity = falling_entity(&mut scene);
        for _ in 0..30 {
            scene.update(1.0 / 60.0);
        }

        let instances = scene.world().read_storage::<Instance>();
        let instance = instances.get(entity).unwrap();
        let bodies = scene.world().read_storage::<RigidBody>();
        let (_, y, _) = scene.physics().position(bodies.get(entity).unwrap().0).unwrap();
        assert!(y > 0.0);
        assert_relative_eq!(instance.position.y, y * 50.0);
        assert_relative_eq!(instance.position.x, 0.0);
    }

    #[test]
    fn entities_without_bodies_stay_put() {
        let mut scene = Scene::new(Physics::default(), 50.0);
        let entity = scene
            .world_mut()
            .create_entity()
            .with(Instance::new(10.0, 20.0))
            .build();
        scene.update(0.5);
        let instances = scene.world().read_storage::<Instance>();
        assert_eq!(instances.get(entity).unwrap().position, Vector2::new(10.0, 20.0));
    }

    #[test]
    fn despawn_removes_the_body() {
        let mut scene = Scene::new(Physics::default(), DEFAULT_PIXELS_PER_METER);
        let entity = falling_entity(&mut scene);
        assert_eq!(scene.physics().len(), 1);
        scene.despawn(entity).unwrap();
        assert!(scene.physics().is_empty());
        assert_eq!(scene.world().read_storage::<Instance>().join().count(), 0);
        assert!(scene.despawn(entity).is_err());
    }
}
