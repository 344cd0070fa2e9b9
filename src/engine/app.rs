use std::path::Path;

use glow::HasContext;
use winit::keyboard::KeyCode;

use crate::engine::components::camera::{Camera, CameraMovement};
use crate::engine::components::entity::{Entity, Light, LightKind};
use crate::engine::components::material::Material;
use crate::engine::components::mesh::{Mesh, Model};
use crate::engine::components::program::Program;
use crate::engine::components::texture::Texture;
use crate::engine::config::SceneConfig;
use crate::engine::input::InputState;
use crate::engine::loaders::model_loader::load_model;
use crate::engine::loaders::shader_loader::{load_program, load_program_attributes};
use crate::engine::rendering::gbuffer::GBuffer;
use crate::engine::rendering::renderer::ScreenQuad;
use crate::engine::INVALID_INDEX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Forward,
    Deferred,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Forward => RenderMode::Deferred,
            RenderMode::Deferred => RenderMode::Forward,
        }
    }
}

/// Which G-buffer channel (or the lit result) the composite pass shows.
/// The discriminants travel to the shaders as `renderTargetMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RenderTargetsMode {
    Albedo = 0,
    Normals = 1,
    Position = 2,
    Depth = 3,
    FinalRender = 4,
}

impl RenderTargetsMode {
    pub fn next(self) -> Self {
        match self {
            RenderTargetsMode::Albedo => RenderTargetsMode::Normals,
            RenderTargetsMode::Normals => RenderTargetsMode::Position,
            RenderTargetsMode::Position => RenderTargetsMode::Depth,
            RenderTargetsMode::Depth => RenderTargetsMode::FinalRender,
            RenderTargetsMode::FinalRender => RenderTargetsMode::Albedo,
        }
    }
}

/// Everything one running demo owns: the resource tables, the camera, and
/// the frame state. Built once at startup and passed by reference into
/// update and render each frame.
pub struct App {
    pub camera: Camera,
    pub render_mode: RenderMode,
    pub current_render_target_mode: RenderTargetsMode,
    pub display_size: (u32, u32),

    pub textures: Vec<Texture>,
    pub programs: Vec<Program>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub models: Vec<Model>,
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,

    pub forward_quad_program_idx: u32,
    pub deferred_quad_program_idx: u32,
    pub forward_mesh_program_idx: u32,
    pub deferred_geometry_program_idx: u32,
    pub depth_program_idx: u32,

    pub gbuffer: Option<GBuffer>,
    pub screen_quad: Option<ScreenQuad>,

    /// (light table index, entity table index) pairs for the point-light
    /// visualization entities; the entity position drives the light.
    light_entities: Vec<(usize, usize)>,
}

impl App {
    pub fn new(config: &SceneConfig, display_size: (u32, u32)) -> Self {
        Self {
            camera: Camera::new(config.camera.position, config.camera.yaw, config.camera.pitch),
            render_mode: RenderMode::Deferred,
            current_render_target_mode: RenderTargetsMode::Albedo,
            display_size,
            textures: Vec::new(),
            programs: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            models: Vec::new(),
            entities: Vec::new(),
            lights: Vec::new(),
            forward_quad_program_idx: INVALID_INDEX,
            deferred_quad_program_idx: INVALID_INDEX,
            forward_mesh_program_idx: INVALID_INDEX,
            deferred_geometry_program_idx: INVALID_INDEX,
            depth_program_idx: INVALID_INDEX,
            gbuffer: None,
            screen_quad: None,
            light_entities: Vec::new(),
        }
    }

    /// Load programs, scene assets, and the offscreen framebuffer. A failed
    /// framebuffer leaves the app non-renderable; frames are skipped.
    pub fn init_graphics(&mut self, gl: &glow::Context, config: &SceneConfig) {
        unsafe {
            log::info!(
                "OpenGL {} on {}",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER)
            );
        }

        match ScreenQuad::new(gl) {
            Ok(quad) => self.screen_quad = Some(quad),
            Err(error) => log::error!("failed to create screen quad: {error}"),
        }

        self.deferred_quad_program_idx = load_program(
            &mut self.programs,
            gl,
            Path::new("assets/shaders/composite_deferred.glsl"),
            "DEFERRED_QUAD",
        );
        self.forward_quad_program_idx = load_program(
            &mut self.programs,
            gl,
            Path::new("assets/shaders/composite_forward.glsl"),
            "FORWARD_QUAD",
        );
        self.depth_program_idx = load_program(
            &mut self.programs,
            gl,
            Path::new("assets/shaders/depth_view.glsl"),
            "DEPTH_SHADER",
        );

        self.forward_mesh_program_idx = load_program(
            &mut self.programs,
            gl,
            Path::new("assets/shaders/forward_mesh.glsl"),
            "FORWARD_SHADER",
        );
        if let Some(program) = self.programs.get_mut(self.forward_mesh_program_idx as usize) {
            load_program_attributes(gl, program);
        }

        self.deferred_geometry_program_idx = load_program(
            &mut self.programs,
            gl,
            Path::new("assets/shaders/deferred_geometry.glsl"),
            "DEFERRED_SHADER",
        );
        if let Some(program) = self
            .programs
            .get_mut(self.deferred_geometry_program_idx as usize)
        {
            load_program_attributes(gl, program);
        }

        self.load_scene(gl, config);

        let (width, height) = self.display_size;
        match GBuffer::new(gl, width, height) {
            Ok(gbuffer) => self.gbuffer = Some(gbuffer),
            Err(error) => log::error!("{error}; rendering disabled"),
        }
    }

    fn load_scene(&mut self, gl: &glow::Context, config: &SceneConfig) {
        for entity_config in &config.entities {
            let model_index = load_model(self, gl, &entity_config.model);
            if model_index == INVALID_INDEX {
                continue;
            }
            self.entities.push(Entity {
                position: entity_config.position,
                metallic: entity_config.metallic,
                roughness: entity_config.roughness,
                model_index,
            });
        }

        let has_point_lights = config
            .lights
            .iter()
            .any(|light| light.kind == LightKind::Point);
        let point_light_model = match (&config.point_light_model, has_point_lights) {
            (Some(path), true) => load_model(self, gl, path),
            _ => INVALID_INDEX,
        };

        for light_config in &config.lights {
            let mut light = Light::new(
                light_config.kind,
                light_config.position,
                light_config.direction,
                light_config.color,
            );
            let light_index = self.lights.len();

            if light_config.kind == LightKind::Point && point_light_model != INVALID_INDEX {
                let entity = Entity::new(light_config.position, point_light_model);
                light.entity = entity;
                let entity_index = self.entities.len();
                self.entities.push(entity);
                self.light_entities.push((light_index, entity_index));
            }

            self.lights.push(light);
        }

        log::info!(
            "scene ready: {} entities, {} lights, {} materials, {} textures",
            self.entities.len(),
            self.lights.len(),
            self.materials.len(),
            self.textures.len()
        );
    }

    pub fn update(&mut self, input: &mut InputState, delta_time: f32) {
        if input.is_pressed(KeyCode::KeyW) {
            self.camera.process_keyboard(CameraMovement::Forward, delta_time);
        }
        if input.is_pressed(KeyCode::KeyS) {
            self.camera.process_keyboard(CameraMovement::Backward, delta_time);
        }
        if input.is_pressed(KeyCode::KeyA) {
            self.camera.process_keyboard(CameraMovement::Left, delta_time);
        }
        if input.is_pressed(KeyCode::KeyD) {
            self.camera.process_keyboard(CameraMovement::Right, delta_time);
        }

        let (dx, dy) = input.take_mouse_delta();
        if input.look_active && (dx != 0.0 || dy != 0.0) {
            // Screen y grows downward, pitch grows upward.
            self.camera.process_mouse_movement(dx, -dy, true);
        }

        let scroll = input.take_scroll_delta();
        if scroll != 0.0 {
            self.camera.process_mouse_scroll(scroll);
        }

        // The visualization entities are the mutable handles; follow them.
        for &(light_index, entity_index) in &self.light_entities {
            let position = self.entities[entity_index].position;
            let light = &mut self.lights[light_index];
            light.position = position;
            light.entity.position = position;
        }
    }

    pub fn on_resize(&mut self, gl: &glow::Context, width: u32, height: u32) {
        if (width, height) == self.display_size {
            return;
        }
        self.display_size = (width, height);
        if let Some(old) = self.gbuffer.take() {
            old.delete(gl);
        }
        match GBuffer::new(gl, width, height) {
            Ok(gbuffer) => self.gbuffer = Some(gbuffer),
            Err(error) => log::error!("{error}; rendering disabled"),
        }
    }
}
