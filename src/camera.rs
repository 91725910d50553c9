//! 2D orthographic camera.
//!
//! World units are pixels at zoom 1 and the y axis points down, matching SVG
//! coordinates. The camera position is the world point shown at the centre of the
//! screen.

use cgmath::{Matrix4, Vector2};
use wgpu::util::DeviceExt;

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vector2<f32>,
    zoom: f32,
}

impl Camera {
    pub fn new(position: Vector2<f32>, zoom: f32) -> Self {
        Self {
            position,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// A camera whose world coordinates are screen pixels with the origin in the
    /// top-left corner. Used for HUD and text overlays.
    pub fn screen(width: u32, height: u32) -> Self {
        Self::new(Vector2::new(width as f32 / 2.0, height as f32 / 2.0), 1.0)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Half of the visible world area.
    fn half_extent(&self, width: u32, height: u32) -> Vector2<f32> {
        Vector2::new(
            width.max(1) as f32 / (2.0 * self.zoom),
            height.max(1) as f32 / (2.0 * self.zoom),
        )
    }

    pub fn view_proj(&self, width: u32, height: u32) -> Matrix4<f32> {
        let half = self.half_extent(width, height);
        // y grows downwards, so the top edge is the smaller y value.
        cgmath::ortho(
            self.position.x - half.x,
            self.position.x + half.x,
            self.position.y + half.y,
            self.position.y - half.y,
            -1.0,
            1.0,
        )
    }

    /// Convert a cursor position in physical pixels into world coordinates.
    pub fn screen_to_world(&self, point: Vector2<f32>, width: u32, height: u32) -> Vector2<f32> {
        let centre = Vector2::new(width as f32 / 2.0, height as f32 / 2.0);
        self.position + (point - centre) / self.zoom
    }

    pub fn world_to_screen(&self, point: Vector2<f32>, width: u32, height: u32) -> Vector2<f32> {
        let centre = Vector2::new(width as f32 / 2.0, height as f32 / 2.0);
        (point - self.position) * self.zoom + centre
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector2::new(0.0, 0.0), 1.0)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            view_proj: camera.view_proj(width, height).into(),
        }
    }
}

/// Camera state together with the GPU buffer and bind group it is uploaded to.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraResources {
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        })
    }

    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: Camera,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let uniform = CameraUniform::new(&camera, width, height);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });

        Self {
            camera,
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Recompute the projection and upload it.
    pub fn write(&mut self, queue: &wgpu::Queue, width: u32, height: u32) {
        self.uniform = CameraUniform::new(&self.camera, width, height);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    fn clip(camera: &Camera, x: f32, y: f32) -> Vector4<f32> {
        camera.view_proj(800, 600) * Vector4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn camera_position_is_the_screen_centre() {
        let camera = Camera::new(Vector2::new(100.0, 50.0), 1.0);
        let p = clip(&camera, 100.0, 50.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn y_axis_points_down() {
        let camera = Camera::screen(800, 600);
        let top_left = clip(&camera, 0.0, 0.0);
        assert_relative_eq!(top_left.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(top_left.y, 1.0, epsilon = 1e-5);
        let bottom_right = clip(&camera, 800.0, 600.0);
        assert_relative_eq!(bottom_right.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(bottom_right.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn zoom_shrinks_the_visible_area() {
        let camera = Camera::new(Vector2::new(0.0, 0.0), 2.0);
        let edge = clip(&camera, 200.0, 0.0);
        assert_relative_eq!(edge.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn screen_and_world_conversions_are_inverse() {
        let camera = Camera::new(Vector2::new(-30.0, 12.5), 1.5);
        let screen = Vector2::new(123.0, 456.0);
        let world = camera.screen_to_world(screen, 800, 600);
        let back = camera.world_to_screen(world, 800, 600);
        assert_relative_eq!(back.x, screen.x, epsilon = 1e-3);
        assert_relative_eq!(back.y, screen.y, epsilon = 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.set_zoom(1000.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
        camera.set_zoom(0.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }
}
