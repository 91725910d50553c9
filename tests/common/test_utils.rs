use vector_ngin::{
    context::{BufferWriter, Context},
    data_structures::{
        batch::MeshStore,
        mesh::{MeshData, Vertex},
    },
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    tick_invocations: u32,
    pub dummy_state: String,
}
impl State {
    pub fn new() -> Self {
        Self {
            frame_counter: 0,
            init_invocations: 0,
            update_invocations: 0,
            tick_invocations: 0,
            dummy_state: String::new(),
        }
    }

    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn tick(&mut self) {
        self.tick_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }

    pub fn tick_invocations(&self) -> u32 {
        self.tick_invocations
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

pub(crate) type Frame = image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>;

pub(crate) type Validate =
    Box<dyn Fn(&Context, &FrameCounter, &Frame) -> Result<ImageTestResult, anyhow::Error>>;

/// A flow that draws the content of a [`MeshStore`] and checks the rendered frame.
pub(crate) struct ImageTest {
    pub(crate) store: MeshStore,
    pub(crate) setup: Box<dyn Fn(&mut Context)>,
    pub(crate) validate: Validate,
}

impl GraphicsFlow<FrameCounter, ()> for ImageTest {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        state: &mut FrameCounter,
        _: std::time::Duration,
    ) -> Out<FrameCounter, ()> {
        self.store.write_to_buffer(ctx);
        state.progress();
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_device_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &vector_ngin::DeviceEvent,
    ) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &vector_ngin::WindowEvent,
    ) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut FrameCounter, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        self.store.render()
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut Frame,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, texture)
    }
}

/// An axis aligned square of one colour centred on the origin.
pub(crate) fn square(half: f32, color: [f32; 4]) -> MeshData {
    let corners = [[-half, -half], [half, -half], [half, half], [-half, half]];
    MeshData {
        vertices: corners
            .iter()
            .map(|&position| Vertex { position, color })
            .collect(),
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Convert a colour channel to the byte an sRGB target stores for it.
pub(crate) fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[macro_export]
macro_rules! golden_image_test {
    ($constructor:expr) => {{
        use crate::common::test_utils::FrameCounter;
        use vector_ngin::flow::{FlowConstructor, GraphicsFlow};
        let constructor: FlowConstructor<FrameCounter, ()> = Box::new(|ctx| {
            Box::pin(async move {
                let flow: Box<dyn GraphicsFlow<FrameCounter, ()>> = Box::new(($constructor)(ctx));
                flow
            })
        });

        vector_ngin::flow::run(vec![constructor])
            .expect("Failed to run flow for integration test.");
    }};
}
