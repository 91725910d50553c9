//! GPU and window context.
//!
//! [`Context`] owns everything the renderer needs across frames: surface, device,
//! queue, render targets, the two cameras and the vector pipeline. Flows receive it
//! in every lifecycle hook and may change the public fields (camera, clear colour,
//! tick duration) at runtime.

use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources},
    config::Config,
    data_structures::texture::Texture,
    pipelines::vector::mk_vector_pipeline,
};

/// Anything that mirrors CPU-side state into GPU buffers.
pub trait BufferWriter {
    fn write_to_buffer(&mut self, ctx: &Context);
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub(crate) msaa_texture: Option<Texture>,
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    /// Camera for world space draws.
    pub camera: CameraResources,
    /// Camera for screen space draws, origin in the top-left corner.
    pub screen: CameraResources,
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
    pub sample_count: u32,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: &Config) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let sample_count = settings.sample_count();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter found: {e}"))?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Could not acquire a device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Vertex colours are converted to linear space on the CPU, which assumes an
        // sRGB surface. Other formats render slightly too dark.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("The surface is not supported by the adapter"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera_bind_group_layout = CameraResources::bind_group_layout(&device);
        let camera = CameraResources::new(
            &device,
            &camera_bind_group_layout,
            Camera::new(
                cgmath::Vector2::new(config.width as f32 / 2.0, config.height as f32 / 2.0),
                1.0,
            ),
            config.width,
            config.height,
            "camera_bind_group",
        );
        let screen = CameraResources::new(
            &device,
            &camera_bind_group_layout,
            Camera::screen(config.width, config.height),
            config.width,
            config.height,
            "screen_bind_group",
        );

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_texture = Texture::create_msaa_texture(
            &device,
            [config.width, config.height],
            sample_count,
            config.format,
        );
        let pipeline =
            mk_vector_pipeline(&device, config.format, &camera_bind_group_layout, sample_count);

        Ok(Self {
            window,
            depth_texture,
            msaa_texture,
            pipeline,
            surface,
            device,
            queue,
            config,
            camera,
            screen,
            clear_colour: settings.clear_colour,
            tick_duration_millis: settings.tick_duration_millis,
            sample_count,
        })
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Reconfigure the surface and every size dependent resource.
    ///
    /// Returns `false` and leaves everything untouched for empty sizes, which
    /// windows report while minimised.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [width, height],
            self.sample_count,
            "depth_texture",
        );
        self.msaa_texture = Texture::create_msaa_texture(
            &self.device,
            [width, height],
            self.sample_count,
            self.config.format,
        );
        self.screen.camera = Camera::screen(width, height);
        self.write_cameras();
        true
    }

    /// Upload both camera projections for the current surface size.
    pub fn write_cameras(&mut self) {
        let (width, height) = (self.config.width, self.config.height);
        self.camera.write(&self.queue, width, height);
        self.screen.write(&self.queue, width, height);
    }

    /// Convert a cursor position into world coordinates of the world camera.
    pub fn cursor_to_world(
        &self,
        position: winit::dpi::PhysicalPosition<f64>,
    ) -> cgmath::Vector2<f32> {
        self.camera.camera.screen_to_world(
            cgmath::Vector2::new(position.x as f32, position.y as f32),
            self.config.width,
            self.config.height,
        )
    }
}

/// The subset of the [`Context`] flow constructors get before the first frame.
///
/// `wgpu::Device` and `wgpu::Queue` are internally reference counted, so the
/// clones refer to the same GPU objects as the context.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            config: ctx.config.clone(),
            sample_count: ctx.sample_count,
        }
    }
}
