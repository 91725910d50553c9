use cgmath::Vector2;
use specs::{Builder, Entity, World, WorldExt};

use crate::{
    data_structures::{batch::MeshStore, instance::Instance, mesh::{MeshData, MeshId}},
    ecs::{
        PixelsPerMeter,
        components::{MeshRef, RigidBody},
    },
    physics::{ColliderDesc, Physics, RigidBodyDesc},
    svg::Svg,
};

/// Definition that can be used to spawn objects.
///
/// Objects contain a mesh to render plus a rigid body description and colliders
/// for physics. Collider shapes are relative to the object's origin, which is the
/// top-left corner of the SVG it was made from.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    /// Mesh reference to render the object.
    pub mesh: MeshId,
    /// Description of the rigid body (translation is set on spawn, ignored for ground).
    pub rigid_body: RigidBodyDesc,
    pub colliders: Vec<ColliderDesc>,
    /// Ground objects are static.
    pub is_ground: bool,
}

/// The CPU half of an [`ObjectDef`]: tessellated art and collider descriptions.
///
/// Building it needs no GPU, so art can be validated before a window exists.
#[derive(Debug, Clone)]
pub struct ObjectArt {
    pub mesh: MeshData,
    pub colliders: Vec<ColliderDesc>,
}

impl ObjectArt {
    pub fn from_svg(svg: &Svg, pixels_per_meter: f32) -> anyhow::Result<Self> {
        let colliders = svg
            .colliders(pixels_per_meter)
            .into_iter()
            .map(Physics::default_collider_builder)
            .collect::<Vec<_>>();
        if colliders.is_empty() {
            log::info!("SVG object has no colliders, it will not take part in physics");
        }
        Ok(Self {
            mesh: svg.mesh()?,
            colliders,
        })
    }

    pub fn upload(&self, device: &wgpu::Device, store: &mut MeshStore, label: &str) -> ObjectDef {
        let mesh = store.upload(device, &self.mesh, label);
        ObjectDef::new(mesh, self.colliders.clone())
    }
}

impl ObjectDef {
    pub fn new(mesh: MeshId, colliders: Vec<ColliderDesc>) -> Self {
        Self {
            mesh,
            rigid_body: Physics::default_rigid_body_builder(),
            colliders,
            is_ground: false,
        }
    }

    /// Upload the art of an SVG and read its colliders.
    pub fn from_svg(
        svg: &Svg,
        device: &wgpu::Device,
        store: &mut MeshStore,
        pixels_per_meter: f32,
    ) -> anyhow::Result<Self> {
        Ok(ObjectArt::from_svg(svg, pixels_per_meter)?.upload(device, store, "svg object"))
    }

    /// Mark the object as static ground.
    pub fn ground(mut self) -> Self {
        self.is_ground = true;
        self
    }

    /// Get the mesh reference.
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// Spawn an instance of this object at `pos` (pixels).
    ///
    /// Objects without colliders get no body and keep their position.
    pub fn spawn(
        &self,
        physics: &mut Physics,
        pixels_per_meter: f32,
        pos: Vector2<f32>,
        z: u8,
    ) -> (Instance, Option<RigidBody>) {
        let mut instance = Instance::new(pos.x, pos.y);
        instance.set_z(z);

        if self.colliders.is_empty() {
            return (instance, None);
        }
        let translation = pos / pixels_per_meter;
        let handle = if self.is_ground {
            physics.spawn_ground(translation, &self.colliders)
        } else {
            let desc = self.rigid_body.clone().translation(translation);
            physics.spawn_rigid_body(&desc, &self.colliders)
        };
        (instance, Some(RigidBody(handle)))
    }

    /// Spawn into an ECS world that holds the [`Physics`] and [`PixelsPerMeter`]
    /// resources.
    pub fn spawn_into(&self, world: &mut World, pos: Vector2<f32>, z: u8) -> Entity {
        let pixels_per_meter = world.read_resource::<PixelsPerMeter>().0;
        let (instance, body) = {
            let mut physics = world.write_resource::<Physics>();
            self.spawn(&mut physics, pixels_per_meter, pos, z)
        };
        let builder = world
            .create_entity()
            .with(instance)
            .with(MeshRef(self.mesh));
        match body {
            Some(body) => builder.with(body).build(),
            None => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ecs::Scene, physics::shape::Shape};
    use approx::assert_relative_eq;

    fn crate_def() -> ObjectDef {
        ObjectDef::new(
            MeshId(0),
            vec![Physics::default_collider_builder(Shape::cuboid(0.5, 0.5))],
        )
    }

    #[test]
    fn spawn_converts_pixels_to_meters() {
        let mut physics = Physics::default();
        let (instance, body) =
            crate_def().spawn(&mut physics, 50.0, Vector2::new(100.0, 25.0), 3);
        assert_eq!(instance.position, Vector2::new(100.0, 25.0));
        assert_eq!(instance.z, 3);
        let (x, y, _) = physics.position(body.unwrap().0).unwrap();
        assert_relative_eq!(x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn ground_does_not_fall() {
        let mut scene = Scene::new(Physics::default(), 50.0);
        let ground = crate_def().ground();
        let entity = ground.spawn_into(scene.world_mut(), Vector2::new(0.0, 100.0), 0);
        for _ in 0..10 {
            scene.update(1.0 / 60.0);
        }
        let instances = scene.world().read_storage::<Instance>();
        let instance = instances.get(entity).unwrap();
        assert_relative_eq!(instance.position.y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn art_reads_colliders_in_meters() {
        let svg: Svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
            <rect width="100" height="100" fill="#ff0000"/>
            <rect id="collider" width="100" height="50" fill="#000000"/>
        </svg>"##
            .parse()
            .unwrap();
        let art = ObjectArt::from_svg(&svg, 50.0).unwrap();
        assert!(!art.mesh.is_empty());
        assert_eq!(art.colliders.len(), 1);
        let aabb = art.colliders[0].shape.aabb();
        assert_relative_eq!(aabb.max.x - aabb.min.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(aabb.max.y - aabb.min.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn objects_without_colliders_have_no_body() {
        let mut physics = Physics::default();
        let def = ObjectDef::new(MeshId(0), Vec::new());
        let (_, body) = def.spawn(&mut physics, 50.0, Vector2::new(0.0, 0.0), 0);
        assert!(body.is_none());
        assert!(physics.is_empty());
    }
}
