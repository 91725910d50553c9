#![cfg(feature = "integration-tests")]

use vector_ngin::{
    context::Context,
    flow::{FlowConstructor, GraphicsFlow, ImageTestResult, Out},
    render::Render,
};
use wgpu::Color;

use crate::common::test_utils::State;

mod common;

enum Event {
    Test,
}

struct GraphicsElement;

impl GraphicsFlow<State, Event> for GraphicsElement {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
        ctx.clear_colour = Color::TRANSPARENT;
        ctx.tick_duration_millis = 0;
        assert_eq!(state.frame_counter(), 0);
        assert_eq!(state.init_invocations(), 0);
        assert_eq!(state.update_invocations(), 0);

        state.init();
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut State,
        _: std::time::Duration,
    ) -> Out<State, Event> {
        assert_eq!(state.frame_counter(), state.update_invocations());
        assert_eq!(state.init_invocations(), 1);
        state.frame();
        state.update();

        // test scenarios:
        let serve_sencha: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🍵');
        });
        let serve_mate: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🧉');
        });
        match state.frame_counter() {
            3 => Out::FutEvent(vec![Box::new(async move { Event::Test })]),
            5 => Out::FutFn(vec![
                Box::new(async move { serve_sencha }),
                Box::new(async move { serve_mate }),
            ]),
            x if x > 5 => {
                assert!(state.dummy_state.contains('🧉'));
                assert!(state.dummy_state.contains('🍵'));
                // emojis are 4 bytes wide.
                assert_eq!(state.dummy_state.len(), 8, "{}", state.dummy_state);
                Out::Empty
            }
            _ => Out::Empty,
        }
    }

    fn on_tick(&mut self, _: &Context, state: &mut State) -> Out<State, Event> {
        state.tick();
        Out::Configure(Box::new(|ctx: &mut Context| {
            ctx.clear_colour = Color::BLACK;
        }))
    }

    fn on_device_events(
        &mut self,
        _: &Context,
        _: &mut State,
        _: &vector_ngin::DeviceEvent,
    ) -> Out<State, Event> {
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut State,
        _: &vector_ngin::WindowEvent,
    ) -> Out<State, Event> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, state: &mut State, _: Event) -> Option<Event> {
        // we send the event in frame 3
        assert!(state.frame_counter() >= 3);
        assert!(state.update_invocations() >= 3);
        None
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut State,
        _: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        if state.frame_counter() < 8 {
            return Ok(ImageTestResult::Waiting);
        }
        assert!(state.tick_invocations() > 0);
        assert_eq!(ctx.clear_colour, Color::BLACK, "Out::Configure was not applied");
        Ok(ImageTestResult::Passed)
    }
}

#[test]
fn should_run_every_lifecycle_hook() {
    let constructor: FlowConstructor<State, Event> = Box::new(|_| {
        Box::pin(async move { Box::new(GraphicsElement) as Box<dyn GraphicsFlow<_, _>> })
    });

    if let Err(e) = vector_ngin::flow::run(vec![constructor]) {
        panic!("{}", e);
    }
}
