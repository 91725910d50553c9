//! The playground: a strip of ground and a pile of characters.
//!
//! Left click spawns another character at the cursor, `D` toggles the physics
//! overlay, `R` resets the scene and the mouse wheel zooms. When `assets/font.ttf`
//! can be loaded a HUD with the body count is drawn in the top-left corner.

use std::str::FromStr;

use cgmath::Vector2;
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::Key,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    config::Config,
    context::{BufferWriter, Context, InitContext},
    data_structures::{batch::MeshStore, mesh::MeshData},
    debug::DebugPhysics,
    ecs::{DEFAULT_PIXELS_PER_METER, Scene},
    flow::{FlowConstructor, GraphicsFlow, Out, run_with_config},
    object::{ObjectArt, ObjectDef},
    physics::Physics,
    render::Render,
    resources::load_font,
    svg::Svg,
    tessellation::linear_rgba,
    text::{Font, FontInstance},
    unit::UnitBuilder,
};

const CHARACTER_SVG: &str = include_str!(concat!(env!("OUT_DIR"), "/assets/single-character.svg"));
const GROUND_SVG: &str = include_str!(concat!(env!("OUT_DIR"), "/assets/ground.svg"));
const HUD_FONT: &str = "font.ttf";
const HUD_SIZE: f32 = 16.0;
const HUD_Z: u8 = u8::MAX;
const CHARACTERS: usize = 10;
const CHARACTER_Z: u8 = 1;
const GROUND_Z: u8 = 0;
const ZOOM_STEP: f32 = 1.1;

/// CPU side art of the playground, prepared before the window opens.
#[derive(Debug, Clone)]
pub struct PlaygroundArt {
    character: ObjectArt,
    character_size: Vector2<f32>,
    ground: ObjectArt,
    marker: MeshData,
}

impl PlaygroundArt {
    pub fn new(pixels_per_meter: f32) -> anyhow::Result<Self> {
        let character = Svg::from_str(CHARACTER_SVG)?;
        let ground = Svg::from_str(GROUND_SVG)?;
        Ok(Self {
            character_size: character.size(),
            character: ObjectArt::from_svg(&character, pixels_per_meter)?,
            ground: ObjectArt::from_svg(&ground, pixels_per_meter)?,
            marker: DebugPhysics::marker_mesh()?,
        })
    }
}

pub struct Playground {
    scene: Scene,
    world_store: MeshStore,
    hud_store: MeshStore,
    character: ObjectDef,
    character_size: Vector2<f32>,
    ground: ObjectDef,
    debug: DebugPhysics,
    font: Option<FontInstance>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Playground {
    pub fn new(ctx: &InitContext, art: &PlaygroundArt, font: Option<&Font>) -> Self {
        let mut world_store = MeshStore::new();
        let character = art
            .character
            .upload(&ctx.device, &mut world_store, "character");
        let ground = art
            .ground
            .upload(&ctx.device, &mut world_store, "ground")
            .ground();
        let debug = DebugPhysics::from_mesh(&ctx.device, &mut world_store, &art.marker);

        let mut hud_store = MeshStore::new();
        let font = font.and_then(|font| {
            let charset: String = (' '..='~').collect();
            let color = linear_rgba(0x20, 0x20, 0x20, 1.0);
            match font.upload(&ctx.device, &mut hud_store, &charset, color) {
                Ok(instance) => Some(instance),
                Err(e) => {
                    log::warn!("Could not build the HUD font: {:#}", e);
                    None
                }
            }
        });

        let mut playground = Self {
            scene: Scene::new(Physics::default(), DEFAULT_PIXELS_PER_METER),
            world_store,
            hud_store,
            character,
            character_size: art.character_size,
            ground,
            debug,
            font,
            cursor: None,
        };
        playground.populate();
        playground
    }

    /// Ground plus a diagonal row of characters.
    fn populate(&mut self) {
        let world = self.scene.world_mut();
        self.ground
            .spawn_into(world, Vector2::new(0.0, 100.0), GROUND_Z);
        for i in 0..CHARACTERS {
            let pos = Vector2::new((i * 20) as f32, (i * 10) as f32);
            self.character.spawn_into(world, pos, CHARACTER_Z);
        }
    }

    fn reset(&mut self) {
        let pixels_per_meter = self.scene.pixels_per_meter();
        self.scene = Scene::new(Physics::default(), pixels_per_meter);
        self.populate();
        log::info!("Scene reset");
    }

    fn spawn_at_cursor(&mut self, ctx: &Context) {
        let Some(cursor) = self.cursor else {
            return;
        };
        // Objects are placed by their top-left corner
        let at = ctx.cursor_to_world(cursor) - self.character_size / 2.0;
        UnitBuilder::ally(&self.character)
            .pos(at.x, at.y)
            .z(CHARACTER_Z)
            .spawn(self.scene.world_mut());
    }

    fn hud_text(&self) -> String {
        format!(
            "bodies: {}\nclick: spawn  D: debug  R: reset",
            self.scene.physics().len()
        )
    }
}

impl GraphicsFlow<(), ()> for Playground {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.clear_colour = wgpu::Color {
            r: 0.62,
            g: 0.8,
            b: 0.95,
            a: 1.0,
        };
        ctx.camera.camera.position = Vector2::new(400.0, 100.0);
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        self.scene.update(dt.as_secs_f32());
        self.world_store.sync_from_world(self.scene.world());
        self.debug.update(
            &mut self.world_store,
            &self.scene.physics(),
            self.scene.pixels_per_meter(),
        );
        self.world_store.write_to_buffer(ctx);
        Out::Empty
    }

    fn on_tick(&mut self, ctx: &Context, _: &mut ()) -> Out<(), ()> {
        if let Some(font) = &self.font {
            let text = self.hud_text();
            self.hud_store.clear_instances();
            font.place(
                &mut self.hud_store,
                &text,
                Vector2::new(10.0, 10.0),
                HUD_SIZE,
                HUD_Z,
            );
            self.hud_store.write_to_buffer(ctx);
        }
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &DeviceEvent) -> Out<(), ()> {
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut (), event: &WindowEvent) -> Out<(), ()> {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.cursor = Some(*position),
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.spawn_at_cursor(ctx),
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                match event.logical_key.as_ref() {
                    Key::Character("d" | "D") => self.debug.toggle(),
                    Key::Character("r" | "R") => self.reset(),
                    _ => (),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                return Out::Configure(Box::new(move |ctx: &mut Context| {
                    let zoom = ctx.camera.camera.zoom() * ZOOM_STEP.powf(lines);
                    ctx.camera.camera.set_zoom(zoom);
                }));
            }
            _ => (),
        }
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut (), event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Composed(vec![
            self.world_store.render(),
            self.hud_store.render_screen(),
        ])
    }

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _: &Context,
        _: &mut (),
        _: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<crate::flow::ImageTestResult, anyhow::Error> {
        Ok(crate::flow::ImageTestResult::Passed)
    }
}

/// The flow constructor of the playground.
///
/// The HUD font is loaded while the window opens; without it the playground runs
/// without HUD.
pub fn playground(art: PlaygroundArt) -> FlowConstructor<(), ()> {
    let constructor: FlowConstructor<(), ()> = Box::new(move |ctx| {
        Box::pin(async move {
            let font = match load_font(HUD_FONT).await {
                Ok(font) => Some(font),
                Err(e) => {
                    log::info!("No HUD font: {:#}", e);
                    None
                }
            };
            Box::new(Playground::new(&ctx, &art, font.as_ref())) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    constructor
}

/// Run the playground until its window is closed.
pub fn run_playground(config: Config) -> anyhow::Result<()> {
    let art = PlaygroundArt::new(DEFAULT_PIXELS_PER_METER)?;
    run_with_config(config, vec![playground(art)])
}

/// Entry point of the binary and of the web build.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn start() {
    if let Err(e) = run_playground(Config::default()) {
        log::error!("{:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_art_has_colliders() {
        let art = PlaygroundArt::new(DEFAULT_PIXELS_PER_METER).unwrap();
        assert_eq!(art.character.colliders.len(), 2);
        assert_eq!(art.ground.colliders.len(), 1);
        assert!(!art.character.mesh.is_empty());
        assert!(!art.ground.mesh.is_empty());
        assert_eq!(art.character_size, Vector2::new(16.0, 28.0));
    }
}
