//! Forward/deferred rendering demo.
//!
//! The window, GL context, and event pump live here; everything interesting
//! happens in `engine`: model loading into shared mesh buffers, per-program
//! VAO binding, and the G-buffer + composite frame.
//!
//! Controls: WASD moves, hold a mouse button to look, scroll zooms,
//! F toggles forward/deferred, Tab cycles the displayed render target.

mod engine;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Instant;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use engine::app::App;
use engine::config::load_scene_config;
use engine::input::InputState;
use engine::rendering::renderer;

const WINDOW_TITLE: &str = "glint-poc";
const INITIAL_WIDTH: u32 = 1280;
const INITIAL_HEIGHT: u32 = 720;
const SCENE_CONFIG_PATH: &str = "assets/scene.json";

struct GraphicsState {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    gl: glow::Context,
    app: App,
}

struct Demo {
    graphics: Option<GraphicsState>,
    input: InputState,
    last_frame: Instant,
    last_cursor: Option<(f64, f64)>,
}

impl Demo {
    fn new() -> Self {
        Self {
            graphics: None,
            input: InputState::default(),
            last_frame: Instant::now(),
            last_cursor: None,
        }
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match create_graphics(event_loop) {
            Ok(state) => {
                self.graphics = Some(state);
                self.last_frame = Instant::now();
            }
            Err(error) => {
                log::error!("failed to initialize graphics: {error}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.graphics.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                state.surface.resize(
                    &state.context,
                    NonZeroU32::new(size.width).unwrap(),
                    NonZeroU32::new(size.height).unwrap(),
                );
                state.app.on_resize(&state.gl, size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    if pressed && !event.repeat {
                        match code {
                            KeyCode::KeyF => {
                                state.app.render_mode = state.app.render_mode.toggled();
                                log::info!("render mode: {:?}", state.app.render_mode);
                            }
                            KeyCode::Tab => {
                                state.app.current_render_target_mode =
                                    state.app.current_render_target_mode.next();
                                log::info!(
                                    "render target: {:?}",
                                    state.app.current_render_target_mode
                                );
                            }
                            KeyCode::Escape => event_loop.exit(),
                            _ => {}
                        }
                    }
                    self.input.set_key(code, pressed);
                }
            }
            WindowEvent::MouseInput { state: button_state, .. } => {
                self.input.look_active = button_state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    self.input
                        .add_mouse_delta((position.x - last_x) as f32, (position.y - last_y) as f32);
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 20.0,
                };
                self.input.add_scroll_delta(dy);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_time = (now - self.last_frame).as_secs_f32();
                self.last_frame = now;

                state.app.update(&mut self.input, delta_time);
                renderer::render(&mut state.app, &state.gl);
                if let Err(error) = state.surface.swap_buffers(&state.context) {
                    log::error!("swap_buffers failed: {error}");
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.graphics {
            state.window.request_redraw();
        }
    }
}

fn create_graphics(event_loop: &ActiveEventLoop) -> Result<GraphicsState, Box<dyn std::error::Error>> {
    let window_attributes = Window::default_attributes()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(INITIAL_WIDTH, INITIAL_HEIGHT));
    let template = ConfigTemplateBuilder::new().with_depth_size(24);
    let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attributes));

    let (window, gl_config) = display_builder.build(event_loop, template, |mut configs| {
        configs.next().expect("no suitable GL config")
    })?;
    let window = window.ok_or("window creation failed")?;
    let raw_window_handle = window.window_handle()?.as_raw();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 3))))
        .build(Some(raw_window_handle));
    let not_current_context =
        unsafe { gl_display.create_context(&gl_config, &context_attributes)? };

    let surface_attributes =
        window.build_surface_attributes(SurfaceAttributesBuilder::default())?;
    let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
    let context = not_current_context.make_current(&surface)?;

    let gl = unsafe {
        glow::Context::from_loader_function(|symbol| {
            let symbol = CString::new(symbol).unwrap();
            gl_display.get_proc_address(&symbol).cast()
        })
    };

    let size = window.inner_size();
    let config = load_scene_config(Path::new(SCENE_CONFIG_PATH));
    let mut app = App::new(&config, (size.width, size.height));
    app.init_graphics(&gl, &config);

    Ok(GraphicsState {
        window,
        surface,
        context,
        gl,
        app,
    })
}

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().expect("failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut demo = Demo::new();
    if let Err(error) = event_loop.run_app(&mut demo) {
        log::error!("event loop error: {error}");
    }
}
