//! The demo scenes and the welcome grid presenting them.
//!
//! A [`Demo`] owns its pipelines and GPU resources and renders into its own
//! output texture. The frame loop in [`crate::flow`] never looks inside a
//! demo: it updates all of them, lets the visible ones encode their passes
//! and hands their outputs to the [`welcome::WelcomeScreen`] compositor.

pub mod cascaded_shadows;
pub mod point_shadows;
pub mod welcome;

use std::{fmt::Debug, pin::Pin};

use winit::keyboard::KeyCode;

use crate::{
    context::{Context, InitContext},
    data_structures::texture::Texture,
    input::InputState,
};

/// One self-contained example scene.
///
/// # Lifecycle
///
/// 1. A [`DemoConstructor`] builds the demo from an [`InitContext`]
/// 2. `resize()` is called whenever the window size changes
/// 3. `update()` is called every frame, with input only while the demo is open
/// 4. `render()` encodes the demo's passes while its tile is visible
pub trait Demo {
    /// Title shown in logs and used for capture file names.
    fn name(&self) -> &str;

    /// A few sentences on the technique the demo shows.
    fn description(&self) -> &str;

    /// The texture the demo renders into. Replaced on resize.
    fn output(&self) -> &Texture;

    fn resize(&mut self, ctx: &Context, width: u32, height: u32);

    /// `elapsed` is the time since start-up, `dt` the frame time, both in
    /// seconds. `input` is `None` while the demo is not the open one.
    fn update(&mut self, ctx: &Context, input: Option<&InputState>, elapsed: f32, dt: f32);

    fn render(&self, encoder: &mut wgpu::CommandEncoder);

    /// Keys not handled by the frame loop are forwarded to the open demo.
    fn on_key(&mut self, _key: KeyCode) {}
}

impl Debug for dyn Demo + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demo").field("name", &self.name()).finish()
    }
}

/// Factory of a demo.
///
/// Constructors run concurrently while the app starts so model loading of
/// one demo does not hold up the others.
pub type DemoConstructor = Box<
    dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn Demo>>>>>,
>;

/// Every demo in tile order.
pub fn default_demos() -> Vec<DemoConstructor> {
    vec![
        Box::new(|ctx| {
            Box::pin(async move {
                let demo = cascaded_shadows::CascadedShadows::new(ctx).await?;
                Ok(Box::new(demo) as Box<dyn Demo>)
            })
        }),
        Box::new(|ctx| {
            Box::pin(async move {
                let demo = point_shadows::PointShadows::new(ctx)?;
                Ok(Box::new(demo) as Box<dyn Demo>)
            })
        }),
    ]
}
