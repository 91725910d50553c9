//! Render target textures.
//!
//! Vector art is drawn as plain coloured triangles, so the only textures the
//! engine owns are the depth buffer and the optional multisampled colour target.

/// A GPU texture with its default view.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create the depth texture used for z-ordering instances.
    ///
    /// `sample_count` must match the colour target of the render pass. Sizes are
    /// clamped to at least one pixel because minimised windows report zero.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        Self::create_target(device, size, sample_count, Self::DEPTH_FORMAT, label)
    }

    /// Create the multisampled colour target that is resolved into the surface.
    ///
    /// Returns `None` when multisampling is disabled.
    pub fn create_msaa_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        format: wgpu::TextureFormat,
    ) -> Option<Self> {
        (sample_count > 1)
            .then(|| Self::create_target(device, size, sample_count, format, "msaa_texture"))
    }

    fn create_target(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }
}
