//! Application event loop.
//!
//! The [`App`] owns the window, the GPU [`Context`], every [`Demo`] and the
//! [`WelcomeScreen`] compositor. Each frame:
//!
//! 1. Collect window/device events into the [`InputState`]
//! 2. Animate the welcome grid, open a demo if its tile was clicked
//! 3. Update every demo; only the open one sees the input
//! 4. Let the visible demos encode their passes into one command encoder
//! 5. Draw the tiles to the surface, submit once and present

use std::{iter, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    capture,
    config::DojoConfig,
    context::Context,
    demos::{Demo, DemoConstructor, welcome::WelcomeScreen},
    input::InputState,
};

/// Log filter used unless `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "render_dojo=info,wgpu_core=warn,wgpu_hal=warn";

const DIGIT_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Tile index selected by a number key.
pub fn demo_for_key(key: KeyCode) -> Option<usize> {
    DIGIT_KEYS.iter().position(|&digit| digit == key)
}

/// Everything that exists once the window is up.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    demos: Vec<Box<dyn Demo>>,
    welcome: WelcomeScreen,
    input: InputState,
    capture_dir: PathBuf,
    started: Instant,
    last_time: Instant,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(
        window: Arc<Window>,
        config: &DojoConfig,
        constructors: Vec<DemoConstructor>,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.vsync)
            .await
            .context("App initialization failed. Cannot create the main context")?;

        let demo_futures: Vec<_> = constructors
            .into_iter()
            // Device and Queue are Arcs internally, the clones only copy the refs
            .map(|constructor| constructor(ctx.init_context(config)))
            .collect();
        let demos = futures::future::join_all(demo_futures)
            .await
            .into_iter()
            .collect::<anyhow::Result<Vec<_>>>()?;
        for (i, demo) in demos.iter().enumerate() {
            log::info!("[{}] {}", i + 1, demo.name());
        }

        let outputs: Vec<_> = demos.iter().map(|demo| demo.output()).collect();
        let mut welcome = WelcomeScreen::new(&ctx.device, ctx.config.format, ctx.size(), &outputs);
        if let Some(index) = config.start.demo_index() {
            welcome.open(index);
        }

        let now = Instant::now();
        Ok(Self {
            ctx,
            demos,
            welcome,
            input: InputState::default(),
            capture_dir: config.capture_dir.clone(),
            started: now,
            last_time: now,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if !self.ctx.resize(width, height) {
            return;
        }
        self.is_surface_configured = true;
        for demo in &mut self.demos {
            demo.resize(&self.ctx, width, height);
        }
        self.welcome.resize(&self.ctx.queue, width, height);
        let outputs: Vec<_> = self.demos.iter().map(|demo| demo.output()).collect();
        self.welcome.set_outputs(&self.ctx.device, &outputs);
    }

    fn open_demo(&mut self, index: usize) {
        let Some(demo) = self.demos.get(index) else {
            log::warn!("There is no demo number {}", index + 1);
            return;
        };
        log::info!("Opening {}: {}", demo.name(), demo.description());
        self.welcome.open(index);
    }

    /// Demos whose output is on screen this frame.
    fn is_visible(&self, index: usize) -> bool {
        self.welcome
            .fully_open()
            .is_none_or(|open| open == index)
    }

    /// Returns `false` when the app should exit.
    fn handle_key(&mut self, key: KeyCode, async_runtime: &tokio::runtime::Runtime) -> bool {
        match key {
            KeyCode::Escape => match self.welcome.opened() {
                Some(_) => self.welcome.close(),
                None => return false,
            },
            KeyCode::KeyI => match self.welcome.opened().and_then(|i| self.demos.get(i)) {
                Some(demo) => log::info!("{}: {}", demo.name(), demo.description()),
                None => {
                    for (i, demo) in self.demos.iter().enumerate() {
                        log::info!("[{}] {}: {}", i + 1, demo.name(), demo.description());
                    }
                }
            },
            KeyCode::KeyC => self.capture(async_runtime),
            key => match (demo_for_key(key), self.welcome.opened()) {
                (Some(index), None) => self.open_demo(index),
                (_, Some(open)) => {
                    if let Some(demo) = self.demos.get_mut(open) {
                        demo.on_key(key);
                    }
                }
                (None, None) => {}
            },
        }
        true
    }

    /// Save the open demo, or every demo while the grid is shown.
    fn capture(&self, async_runtime: &tokio::runtime::Runtime) {
        let demos: Vec<&dyn Demo> = match self.welcome.opened() {
            Some(open) => self.demos.get(open).map(|demo| &**demo).into_iter().collect(),
            None => self.demos.iter().map(|demo| &**demo).collect(),
        };
        for demo in demos {
            let saved = async_runtime.block_on(capture::save_png(
                &self.ctx.device,
                &self.ctx.queue,
                &demo.output().texture,
                &self.capture_dir,
                demo.name(),
            ));
            match saved {
                Ok(path) => log::info!("Saved {}", path.display()),
                Err(e) => log::error!("Capture of {} failed: {e:#}", demo.name()),
            }
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let now = Instant::now();
        let dt = (now - self.last_time).as_secs_f32();
        let elapsed = (now - self.started).as_secs_f32();
        self.last_time = now;

        if let Some(clicked) = self.welcome.update(&self.ctx.queue, &self.input, dt) {
            self.open_demo(clicked);
        }
        let open = self.welcome.opened();
        for (i, demo) in self.demos.iter_mut().enumerate() {
            let input = (open == Some(i)).then_some(&self.input);
            demo.update(&self.ctx, input, elapsed, dt);
        }
        self.input.end_frame();

        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        for (i, demo) in self.demos.iter().enumerate() {
            if self.is_visible(i) {
                demo.render(&mut encoder);
            }
        }
        self.welcome.render(&mut encoder, &view);

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: DojoConfig,
    state: Option<AppState>,
    // We use Option to `take()` the constructors once the window exists.
    constructors: Option<Vec<DemoConstructor>>,
    /// Initialization failure handed back to [`run`].
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: DojoConfig, constructors: Vec<DemoConstructor>) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
        Ok(Self {
            async_runtime,
            config,
            state: None,
            constructors: Some(constructors),
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = Window::default_attributes()
            .with_title("Render Dojo")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create the window")?,
        );
        let constructors = self.constructors.take().unwrap_or_default();
        let mut state = self
            .async_runtime
            .block_on(AppState::new(window.clone(), &self.config, constructors))?;
        let size = window.inner_size();
        state.resize(size.width, size.height);
        Ok(state)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("{e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.input.handle_device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        state.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if event.state.is_pressed()
                        && !event.repeat
                        && !state.handle_key(code, &self.async_runtime)
                    {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let [width, height] = state.ctx.size();
                    state.resize(width, height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of GPU memory, exiting");
                    event_loop.exit();
                }
                Err(e) => log::warn!("Skipping frame: {e}"),
            },
            _ => {}
        }
    }
}

/// Open the window and run until it is closed.
pub fn run(config: DojoConfig, constructors: Vec<DemoConstructor>) -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new().context("Failed to create an event loop")?;
    let mut app = App::new(config, constructors)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_select_tiles() {
        assert_eq!(demo_for_key(KeyCode::Digit1), Some(0));
        assert_eq!(demo_for_key(KeyCode::Digit2), Some(1));
        assert_eq!(demo_for_key(KeyCode::Digit9), Some(8));
        assert_eq!(demo_for_key(KeyCode::Digit0), None);
        assert_eq!(demo_for_key(KeyCode::KeyD), None);
    }
}
