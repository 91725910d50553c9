//! Instanced mesh batches.
//!
//! Every uploaded mesh owns one instance buffer. All placements of the mesh are
//! collected into that buffer and drawn with a single instanced draw call, which is
//! what keeps thousands of identical vector objects cheap.

use specs::{Join, World, WorldExt};

use crate::{
    context::{BufferWriter, Context},
    data_structures::{
        instance::{Instance, InstanceRaw},
        mesh::{GpuMesh, MeshData, MeshId},
    },
    ecs::components::MeshRef,
    render::{Instanced, Render},
};

/// Upper bound of instances a single mesh can draw per frame.
pub const MAX_MESH_INSTANCES: usize = 1024 * 1024;
const INITIAL_CAPACITY: usize = 16;

/// Capacity of an instance buffer that has to hold `needed` instances.
///
/// Buffers only grow, in powers of two, and never beyond [`MAX_MESH_INSTANCES`].
pub(crate) fn grown_capacity(current: usize, needed: usize) -> usize {
    if needed <= current {
        return current;
    }
    needed
        .next_power_of_two()
        .max(INITIAL_CAPACITY)
        .min(MAX_MESH_INSTANCES)
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} Instance Buffer")),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// One mesh together with the instances that should be drawn this frame.
#[derive(Debug)]
pub struct MeshBatch {
    label: String,
    pub mesh: GpuMesh,
    instances: Vec<Instance>,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    /// Number of instances currently stored in `instance_buffer`.
    uploaded: usize,
    dirty: bool,
}

impl MeshBatch {
    fn new(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        Self {
            label: label.to_string(),
            mesh: GpuMesh::new(device, data, label),
            instances: Vec::new(),
            instance_buffer: create_instance_buffer(device, INITIAL_CAPACITY, label),
            capacity: INITIAL_CAPACITY,
            uploaded: 0,
            dirty: false,
        }
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        if self.instances.len() > MAX_MESH_INSTANCES {
            log::warn!(
                "Mesh {} has {} instances, only the first {} are drawn",
                self.label,
                self.instances.len(),
                MAX_MESH_INSTANCES
            );
            self.instances.truncate(MAX_MESH_INSTANCES);
        }

        let needed = self.instances.len();
        if needed > self.capacity {
            self.capacity = grown_capacity(self.capacity, needed);
            self.instance_buffer = create_instance_buffer(device, self.capacity, &self.label);
        }
        if needed > 0 {
            let raw = self
                .instances
                .iter()
                .map(Instance::to_raw)
                .collect::<Vec<_>>();
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raw));
        }
        self.uploaded = needed;
        self.dirty = false;
    }

    fn instanced(&self) -> Option<Instanced<'_>> {
        if self.uploaded == 0 || self.mesh.num_indices == 0 {
            return None;
        }
        Some(Instanced {
            mesh: &self.mesh,
            instance: &self.instance_buffer,
            amount: self.uploaded,
        })
    }
}

/// Owns uploaded meshes and their per-frame instances.
///
/// Meshes are never removed, so a [`MeshId`] stays valid for the lifetime of the
/// store that issued it.
#[derive(Debug, Default)]
pub struct MeshStore {
    batches: Vec<MeshBatch>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload tessellated geometry.
    ///
    /// Returns a reference that can be used to add instances.
    pub fn upload(&mut self, device: &wgpu::Device, data: &MeshData, label: &str) -> MeshId {
        if data.is_empty() {
            log::warn!("Uploading empty mesh {}, it will never be drawn", label);
        }
        self.batches.push(MeshBatch::new(device, data, label));
        MeshId(self.batches.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn instances(&self, mesh: MeshId) -> &[Instance] {
        self.batches
            .get(mesh.0)
            .map(|batch| batch.instances.as_slice())
            .unwrap_or(&[])
    }

    pub fn push_instance(&mut self, mesh: MeshId, instance: Instance) {
        match self.batches.get_mut(mesh.0) {
            Some(batch) => {
                batch.instances.push(instance);
                batch.dirty = true;
            }
            None => log::warn!("Instance for unknown mesh {:?} dropped", mesh),
        }
    }

    pub fn set_instances(&mut self, mesh: MeshId, instances: Vec<Instance>) {
        match self.batches.get_mut(mesh.0) {
            Some(batch) => {
                batch.instances = instances;
                batch.dirty = true;
            }
            None => log::warn!("Instances for unknown mesh {:?} dropped", mesh),
        }
    }

    pub fn clear_instances(&mut self) {
        self.batches.iter_mut().for_each(|batch| {
            batch.dirty |= !batch.instances.is_empty();
            batch.instances.clear();
        });
    }

    /// Replace all instances with the `Instance` of every entity that has a
    /// [`MeshRef`] into this store.
    pub fn sync_from_world(&mut self, world: &World) {
        self.clear_instances();
        let meshes = world.read_storage::<MeshRef>();
        let instances = world.read_storage::<Instance>();
        for (mesh, instance) in (&meshes, &instances).join() {
            self.push_instance(mesh.0, *instance);
        }
    }

    /// World-space draws for every batch that has instances.
    pub fn render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Defaults(self.batches.iter().filter_map(MeshBatch::instanced).collect())
    }

    /// Screen-space draws, for HUD elements that ignore the world camera.
    pub fn render_screen<'pass>(&self) -> Render<'_, 'pass> {
        Render::Screens(self.batches.iter().filter_map(MeshBatch::instanced).collect())
    }
}

impl BufferWriter for MeshStore {
    fn write_to_buffer(&mut self, ctx: &Context) {
        self.batches
            .iter_mut()
            .for_each(|batch| batch.write(&ctx.device, &ctx.queue));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_grows_in_powers_of_two() {
        assert_eq!(grown_capacity(16, 10), 16);
        assert_eq!(grown_capacity(16, 17), 32);
        assert_eq!(grown_capacity(16, 1000), 1024);
        assert_eq!(grown_capacity(0, 1), INITIAL_CAPACITY);
    }

    #[test]
    fn capacity_is_capped() {
        assert_eq!(
            grown_capacity(16, MAX_MESH_INSTANCES * 3),
            MAX_MESH_INSTANCES
        );
    }
}
