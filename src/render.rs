//! Render composition and pipeline batching.
//!
//! This module defines the [`Render`] enum that flows return every frame to
//! describe what they want drawn. The engine flattens the returned trees into
//! world-space and screen-space batches and issues one instanced draw call per
//! mesh.
//!
//! # Key types
//!
//! - [`Render<'a, 'pass>`] is the primary enum describing render operations
//! - [`Instanced<'a>`] references a mesh, its instance buffer and instance count
//!

use wgpu::RenderPass;

use crate::{context::Context, data_structures::mesh::GpuMesh};

/// Data for instanced rendering: a mesh and the buffer with its instances.
pub struct Instanced<'a> {
    pub mesh: &'a GpuMesh,
    pub instance: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Specifies how a flow's objects should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders one mesh through the world camera
/// - `Defaults(Vec<Instanced>)` renders a batch of meshes through the world camera
/// - `Screen(Instanced)` renders one mesh in screen pixels (HUD, text)
/// - `Screens(Vec<Instanced>)` renders a batch of meshes in screen pixels
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
/// - `Custom(...)` invokes a user-defined closure on the main render pass
///
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Screen(Instanced<'a>),
    Screens(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>),
}

impl<'a, 'pass> Render<'a, 'pass> {
    /// Sort the render tree into world and screen batches.
    ///
    /// Custom closures run immediately, before any batched draw of this frame.
    pub(crate) fn set_pipelines(
        self,
        ctx: &Context,
        render_pass: &mut RenderPass<'pass>,
        world: &mut Vec<Instanced<'a>>,
        screen: &mut Vec<Instanced<'a>>,
    ) {
        match self {
            Render::Default(instanced) => world.push(instanced),
            Render::Defaults(mut vec) => world.append(&mut vec),
            Render::Screen(instanced) => screen.push(instanced),
            Render::Screens(mut vec) => screen.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(ctx, render_pass, world, screen)),
            Render::Custom(f) => f(ctx, render_pass),
            Render::None => (),
        }
    }
}

/// Record the draw calls of one batch list with the given camera.
pub(crate) fn draw_instanced(
    render_pass: &mut RenderPass<'_>,
    camera_bind_group: &wgpu::BindGroup,
    batches: Vec<Instanced<'_>>,
) {
    render_pass.set_bind_group(0, camera_bind_group, &[]);
    for instanced in batches {
        if instanced.amount == 0 || instanced.instance.size() == 0 {
            log::warn!("you attemted to render something with zero instances");
            continue;
        }
        if instanced.mesh.num_indices == 0 {
            continue;
        }
        render_pass.set_vertex_buffer(0, instanced.mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.set_index_buffer(
            instanced.mesh.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        render_pass.draw_indexed(
            0..instanced.mesh.num_indices,
            0,
            0..instanced.amount as u32,
        );
    }
}
