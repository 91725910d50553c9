//! Units: objects with health and a side.

use cgmath::Vector2;
use specs::{Component, Entity, VecStorage, World, WorldExt};

use crate::object::ObjectDef;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Allegiance {
    #[default]
    Enemy,
    Ally,
}

impl Component for Allegiance {
    type Storage = VecStorage<Self>;
}

/// Life points.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Health(pub f32);

impl Default for Health {
    fn default() -> Self {
        Self(100.0)
    }
}

impl Component for Health {
    type Storage = VecStorage<Self>;
}

pub struct UnitBuilder<'a> {
    allegiance: Allegiance,
    health: Health,
    pos: Vector2<f32>,
    z: u8,
    def: &'a ObjectDef,
}

impl<'a> UnitBuilder<'a> {
    fn new(def: &'a ObjectDef, allegiance: Allegiance) -> Self {
        Self {
            allegiance,
            health: Health::default(),
            pos: Vector2::new(0.0, 0.0),
            z: 0,
            def,
        }
    }

    /// Create a default ally unit.
    pub fn ally(def: &'a ObjectDef) -> Self {
        Self::new(def, Allegiance::Ally)
    }

    /// Create a default enemy unit.
    pub fn enemy(def: &'a ObjectDef) -> Self {
        Self::new(def, Allegiance::Enemy)
    }

    /// Set the lifepoints of the unit.
    pub fn health(mut self, health: f32) -> Self {
        self.health = Health(health);
        self
    }

    /// Set the position of the unit in pixels.
    pub fn pos(mut self, x: f32, y: f32) -> Self {
        self.pos = Vector2::new(x, y);
        self
    }

    /// Set the z index of the unit.
    pub fn z(mut self, z: u8) -> Self {
        self.z = z;
        self
    }

    /// Spawn the unit in the world.
    pub fn spawn(self, world: &mut World) -> Entity {
        let entity = self.def.spawn_into(world, self.pos, self.z);
        let mut healths = world.write_storage::<Health>();
        let mut allegiances = world.write_storage::<Allegiance>();
        if let Err(e) = healths
            .insert(entity, self.health)
            .and_then(|_| allegiances.insert(entity, self.allegiance))
        {
            log::error!("Could not attach unit components: {e}");
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{instance::Instance, mesh::MeshId},
        ecs::Scene,
        physics::{Physics, shape::Shape},
    };

    #[test]
    fn builder_attaches_unit_components() {
        let mut scene = Scene::new(Physics::default(), 50.0);
        let def = ObjectDef::new(
            MeshId(0),
            vec![Physics::default_collider_builder(Shape::ball(0.5))],
        );
        let ally = UnitBuilder::ally(&def)
            .health(42.0)
            .pos(10.0, 20.0)
            .z(2)
            .spawn(scene.world_mut());
        let enemy = UnitBuilder::enemy(&def).spawn(scene.world_mut());

        let world = scene.world();
        let healths = world.read_storage::<Health>();
        let allegiances = world.read_storage::<Allegiance>();
        assert_eq!(healths.get(ally), Some(&Health(42.0)));
        assert_eq!(allegiances.get(ally), Some(&Allegiance::Ally));
        assert_eq!(healths.get(enemy), Some(&Health::default()));
        assert_eq!(allegiances.get(enemy), Some(&Allegiance::Enemy));

        let instances = world.read_storage::<Instance>();
        assert_eq!(instances.get(ally).unwrap().z, 2);
        assert_eq!(scene.physics().len(), 2);
    }
}
