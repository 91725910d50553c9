use crate::{
    data_structures::{
        batch::MeshStore,
        instance::Instance,
        mesh::{MeshData, MeshId},
    },
    physics::Physics,
    tessellation::{circle, linear_rgba},
};

/// Markers are drawn above every other object.
pub const MARKER_Z: u8 = u8::MAX;

/// Render the physics shapes.
///
/// Every body gets a translucent blue circle around its centre of mass, sized to
/// enclose all of its colliders.
#[derive(Debug)]
pub struct DebugPhysics {
    circle_mesh: MeshId,
    enabled: bool,
}

impl DebugPhysics {
    /// Instantiate everything and upload the meshes.
    pub fn new(device: &wgpu::Device, store: &mut MeshStore) -> anyhow::Result<Self> {
        Ok(Self::from_mesh(device, store, &Self::marker_mesh()?))
    }

    /// The unit circle drawn around every body.
    pub fn marker_mesh() -> anyhow::Result<MeshData> {
        circle(1.0, linear_rgba(0x00, 0x00, 0xFF, 0.5))
    }

    pub fn from_mesh(device: &wgpu::Device, store: &mut MeshStore, marker: &MeshData) -> Self {
        Self {
            circle_mesh: store.upload(device, marker, "debug circle"),
            enabled: true,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
        log::info!("Physics debug overlay {}", if self.enabled { "on" } else { "off" });
    }

    /// Replace the marker instances with the current body positions.
    ///
    /// Call after the store was synced from the world, syncing clears all instances.
    pub fn update(&self, store: &mut MeshStore, physics: &Physics, pixels_per_meter: f32) {
        let markers = if self.enabled {
            markers(physics, pixels_per_meter)
        } else {
            Vec::new()
        };
        store.set_instances(self.circle_mesh, markers);
    }
}

fn markers(physics: &Physics, pixels_per_meter: f32) -> Vec<Instance> {
    physics
        .debug_circles()
        .into_iter()
        .map(|(center, radius)| {
            let at = center * pixels_per_meter;
            let mut instance = Instance::new(at.x, at.y).with_scale(radius * pixels_per_meter);
            instance.set_z(MARKER_Z);
            instance
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shape::Shape;
    use approx::assert_relative_eq;
    use cgmath::Vector2;

    #[test]
    fn one_marker_per_body_in_pixels() {
        let mut physics = Physics::default();
        physics.spawn_ground(
            Vector2::new(2.0, 4.0),
            &[Physics::default_collider_builder(Shape::ball(0.5))],
        );
        let markers = markers(&physics, 10.0);
        assert_eq!(markers.len(), 1);
        assert_relative_eq!(markers[0].position.x, 20.0, epsilon = 1e-4);
        assert_relative_eq!(markers[0].position.y, 40.0, epsilon = 1e-4);
        assert_relative_eq!(markers[0].scale.x, 5.0, epsilon = 1e-4);
        assert_eq!(markers[0].z, MARKER_Z);
    }
}
