#![cfg(feature = "integration-tests")]

use render_dojo::{
    capture,
    config::DojoConfig,
    context::Context,
    data_structures::texture::Texture,
    demos::{Demo, cascaded_shadows::CascadedShadows, default_demos},
};
use winit::keyboard::KeyCode;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;

#[test]
fn every_demo_renders_a_scene() {
    futures::executor::block_on(async {
        let ctx = Context::headless(WIDTH, HEIGHT).await.unwrap();
        let config = DojoConfig {
            shadow_resolution: 256,
            cube_shadow_resolution: 128,
            ..DojoConfig::default()
        };
        for constructor in default_demos() {
            let mut demo = constructor(ctx.init_context(&config)).await.unwrap();
            demo.update(&ctx, None, 0.5, 1.0 / 60.0);

            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            demo.render(&mut encoder);
            ctx.queue.submit(std::iter::once(encoder.finish()));

            let image = capture::read_texture(&ctx.device, &ctx.queue, &demo.output().texture)
                .await
                .unwrap();
            assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
            let first = *image.get_pixel(0, 0);
            assert!(
                image.pixels().any(|p| *p != first),
                "{} rendered a blank image",
                demo.name()
            );
        }
    });
}

#[test]
fn demos_follow_the_window_size() {
    futures::executor::block_on(async {
        let mut ctx = Context::headless(WIDTH, HEIGHT).await.unwrap();
        let config = DojoConfig::default();
        let mut demos = Vec::new();
        for constructor in default_demos() {
            demos.push(constructor(ctx.init_context(&config)).await.unwrap());
        }
        assert!(ctx.resize(200, 100));
        for demo in &mut demos {
            demo.resize(&ctx, 200, 100);
            let size = demo.output().texture.size();
            assert_eq!((size.width, size.height), (200, 100));
        }
        assert!(!ctx.resize(0, 100));
        assert_eq!(ctx.size(), [200, 100]);
    });
}

async fn render_frame(ctx: &Context, demo: &mut dyn Demo) -> image::RgbaImage {
    demo.update(ctx, None, 0.5, 1.0 / 60.0);
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    demo.render(&mut encoder);
    ctx.queue.submit(std::iter::once(encoder.finish()));
    capture::read_texture(&ctx.device, &ctx.queue, &demo.output().texture)
        .await
        .unwrap()
}

#[test]
fn cascade_layers_show_in_the_bottom_left_corner() {
    futures::executor::block_on(async {
        let ctx = Context::headless(WIDTH, HEIGHT).await.unwrap();
        let config = DojoConfig {
            shadow_resolution: 256,
            ..DojoConfig::default()
        };
        let mut demo = CascadedShadows::new(ctx.init_context(&config)).await.unwrap();

        let plain = render_frame(&ctx, &mut demo).await;
        demo.on_key(KeyCode::KeyD);
        let debug = render_frame(&ctx, &mut demo).await;

        // inside the first layer quad, which spans 2%..22% of the width and
        // height from the bottom-left corner
        let xs = WIDTH * 4 / 100..WIDTH * 20 / 100;
        let ys = HEIGHT * 80 / 100..HEIGHT * 96 / 100;
        let mut changed = false;
        for y in ys {
            for x in xs.clone() {
                let pixel = debug.get_pixel(x, y);
                // depth is drawn as grey
                assert_eq!(pixel[0], pixel[1], "pixel {x},{y} is not grey");
                assert_eq!(pixel[1], pixel[2], "pixel {x},{y} is not grey");
                changed |= pixel != plain.get_pixel(x, y);
            }
        }
        assert!(changed, "the overlay left the corner untouched");
    });
}

#[test]
fn depth_targets_carry_no_sampler() {
    futures::executor::block_on(async {
        let ctx = Context::headless(WIDTH, HEIGHT).await.unwrap();
        let depth = Texture::create_depth_texture(&ctx.device, [WIDTH, HEIGHT], "test depth");
        assert!(depth.sampler.is_none());
        assert_eq!(depth.texture.format(), Texture::DEPTH_FORMAT);
    });
}
