#![cfg(feature = "integration-tests")]

use vector_ngin::{
    context::{Context, InitContext},
    data_structures::{batch::MeshStore, instance::Instance},
    flow::ImageTestResult,
    tessellation::linear_rgba,
};
use wgpu::Color;

use crate::common::test_utils::{FrameCounter, Frame, ImageTest, square};

mod common;

const HALF: f32 = 50.0;

/// A green square in the centre of a white frame.
///
/// Green is used because the surface may store pixels as BGRA.
#[test]
fn should_draw_an_instanced_square_through_the_world_camera() {
    golden_image_test!(|ctx: InitContext| {
        let mut store = MeshStore::new();
        let mesh = store.upload(
            &ctx.device,
            &square(HALF, linear_rgba(0x00, 0xFF, 0x00, 1.0)),
            "square",
        );
        store.push_instance(mesh, Instance::new(0.0, 0.0));
        ImageTest {
            store,
            setup: Box::new(|ctx: &mut Context| {
                ctx.clear_colour = Color::WHITE;
                ctx.camera.camera.position = [0.0, 0.0].into();
            }),
            validate: Box::new(|ctx: &Context, state: &FrameCounter, texture: &Frame| {
                // the instance buffer is written in the first update
                if state.frame() < 2 {
                    return Ok(ImageTestResult::Waiting);
                }
                let (cx, cy) = (ctx.width() / 2, ctx.height() / 2);
                let green = image::Rgba([0, 255, 0, 255]);
                let white = image::Rgba([255, 255, 255, 255]);

                assert_eq!(*texture.get_pixel(cx, cy), green, "centre is not covered");
                assert_eq!(*texture.get_pixel(cx + 40, cy - 40), green, "square is too small");
                assert_eq!(*texture.get_pixel(cx + 60, cy), white, "square is too wide");
                assert_eq!(*texture.get_pixel(2, 2), white, "corner is not cleared");
                Ok(ImageTestResult::Passed)
            }),
        }
    });
}
