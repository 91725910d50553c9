//! Instance transformation data for GPU rendering.
//!
//! Per-instance data like position, rotation, scale and z-index is stored in GPU
//! buffers and passed to the vector shader so every placement of a mesh is drawn
//! by the same instanced draw call.

use std::ops::Mul;

use cgmath::{Rad, Vector2};

/// Per-instance 2D transformation.
///
/// `z` orders overlapping instances: higher values are drawn in front. Within the
/// same `z` the instance drawn last wins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector2<f32>,
    pub rotation: Rad<f32>,
    pub scale: Vector2<f32>,
    pub z: u8,
}

impl Instance {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            rotation: Rad(0.0),
            scale: Vector2::new(1.0, 1.0),
            z: 0,
        }
    }

    pub fn set_x(&mut self, x: f32) {
        self.position.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.position.y = y;
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = Rad(rotation);
    }

    pub fn set_z(&mut self, z: u8) {
        self.z = z;
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vector2::new(scale, scale);
        self
    }

    /// Depth written to the depth buffer, in `(0, 1)`.
    pub(crate) fn depth(&self) -> f32 {
        1.0 - (self.z as f32 + 1.0) / 257.0
    }

    /// Map a point from the instance's local space into world space.
    pub fn transform_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        let (sin, cos) = self.rotation.0.sin_cos();
        let scaled = Vector2::new(point.x * self.scale.x, point.y * self.scale.y);
        Vector2::new(
            scaled.x * cos - scaled.y * sin,
            scaled.x * sin + scaled.y * cos,
        ) + self.position
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            position: self.position.into(),
            rotation: self.rotation.0,
            scale: self.scale.into(),
            depth: self.depth(),
        }
    }
}

/// Composes a parent transform with a child expressed in the parent's space.
impl Mul<Instance> for Instance {
    type Output = Instance;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        Instance {
            position: self.transform_point(rhs.position),
            rotation: self.rotation + rhs.rotation,
            scale: Vector2::new(self.scale.x * rhs.scale.x, self.scale.y * rhs.scale.y),
            z: rhs.z.max(self.z),
        }
    }
}

impl From<Vector2<f32>> for Instance {
    fn from(position: Vector2<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    position: [f32; 2],
    rotation: f32,
    scale: [f32; 2],
    depth: f32,
}

impl InstanceRaw {
    /**
     * Instance attributes start at location 2, right after the mesh vertex attributes.
     * The step mode makes the shader advance once per instance instead of per vertex.
     */
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn higher_z_is_closer_to_the_camera() {
        let mut back = Instance::new(0.0, 0.0);
        back.set_z(0);
        let mut front = Instance::new(0.0, 0.0);
        front.set_z(255);
        assert!(front.depth() < back.depth());
        assert!(front.depth() > 0.0);
        assert!(back.depth() < 1.0);
    }

    #[test]
    fn composing_rotates_and_scales_the_child_offset() {
        let mut parent = Instance::new(10.0, 20.0).with_scale(2.0);
        parent.set_rotation(FRAC_PI_2);
        let child = Instance::new(1.0, 0.0);

        let world = parent * child;
        assert_relative_eq!(world.position.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.y, 22.0, epsilon = 1e-5);
        assert_relative_eq!(world.rotation.0, FRAC_PI_2);
        assert_relative_eq!(world.scale.x, 2.0);
    }

    #[test]
    fn raw_layout_has_no_padding() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 6 * 4);
        let raw = Instance::new(3.0, 4.0).to_raw();
        assert_eq!(raw.position, [3.0, 4.0]);
        assert_eq!(raw.scale, [1.0, 1.0]);
    }
}
