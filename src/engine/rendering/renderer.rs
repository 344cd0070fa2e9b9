use glow::HasContext;

use crate::engine::app::{App, RenderMode, RenderTargetsMode};
use crate::engine::components::entity::{Entity, Light};
use crate::engine::components::mesh::{Mesh, Vao, VertexBufferLayout};
use crate::engine::components::program::{Program, VertexShaderLayout};
use crate::engine::utils::math::{
    mat4x4_mul, mat4x4_perspective, mat4x4_scale, mat4x4_translate, Vec3,
};

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;
const ENTITY_SCALE: f32 = 0.45;
const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 0.0];

/// The fixed two-triangle quad the composite pass draws. Its layout is
/// hand-built (location 0: position, location 1: texcoord) rather than
/// matched, since the composite programs are fixed too.
#[derive(Debug)]
pub struct ScreenQuad {
    pub vao: glow::VertexArray,
    #[allow(dead_code)]
    pub vertex_buffer: glow::Buffer,
    #[allow(dead_code)]
    pub index_buffer: glow::Buffer,
}

impl ScreenQuad {
    pub fn new(gl: &glow::Context) -> Result<Self, String> {
        #[rustfmt::skip]
        let vertices: [f32; 20] = [
            -1.0, -1.0, 0.0,   0.0, 0.0,
             1.0, -1.0, 0.0,   1.0, 0.0,
             1.0,  1.0, 0.0,   1.0, 1.0,
            -1.0,  1.0, 0.0,   0.0, 1.0,
        ];
        let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];

        unsafe {
            let vertex_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&vertices),
                glow::STATIC_DRAW,
            );

            let index_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&indices),
                glow::STATIC_DRAW,
            );

            let vao = gl.create_vertex_array()?;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 20, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, 20, 12);
            gl.enable_vertex_attrib_array(1);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            Ok(Self {
                vao,
                vertex_buffer,
                index_buffer,
            })
        }
    }
}

pub(crate) struct AttributeBinding {
    pub location: u32,
    pub component_count: u32,
    /// Attribute offset inside the vertex plus the submesh's base offset in
    /// the shared buffer.
    pub offset: u32,
}

/// Match every attribute the program consumes against the submesh layout.
/// A missing attribute means the data cannot feed this shader; drawing
/// anyway would read garbage, so that is a hard failure.
pub(crate) fn resolve_attribute_bindings(
    program_layout: &VertexShaderLayout,
    submesh_layout: &VertexBufferLayout,
    base_vertex_offset: u32,
    program_name: &str,
) -> Vec<AttributeBinding> {
    program_layout
        .attributes
        .iter()
        .map(|shader_attribute| {
            let buffer_attribute = submesh_layout
                .find_attribute(shader_attribute.location)
                .unwrap_or_else(|| {
                    panic!(
                        "submesh layout provides no attribute for shader location {} required by program {}",
                        shader_attribute.location, program_name
                    )
                });
            AttributeBinding {
                location: buffer_attribute.location,
                component_count: buffer_attribute.component_count,
                offset: buffer_attribute.offset + base_vertex_offset,
            }
        })
        .collect()
}

/// Get the VAO binding this (submesh, program) pair draws with, creating and
/// caching it on first use. The cache lets the same geometry be drawn by
/// programs that declare different attribute subsets.
pub fn find_vao(
    mesh: &mut Mesh,
    submesh_index: usize,
    program: &Program,
    gl: &glow::Context,
) -> glow::VertexArray {
    let vertex_buffer = mesh
        .vertex_buffer_handle
        .expect("mesh buffers must be uploaded before drawing");
    let index_buffer = mesh
        .index_buffer_handle
        .expect("mesh buffers must be uploaded before drawing");
    let submesh = &mut mesh.submeshes[submesh_index];

    if let Some(handle) = submesh.cached_vao(program.handle) {
        return handle;
    }

    let bindings = resolve_attribute_bindings(
        &program.vertex_input_layout,
        &submesh.vertex_buffer_layout,
        submesh.vertex_offset,
        &program.program_name,
    );
    let stride = submesh.vertex_buffer_layout.stride;

    unsafe {
        let handle = gl
            .create_vertex_array()
            .expect("failed to create vertex array");
        gl.bind_vertex_array(Some(handle));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
        for binding in &bindings {
            gl.vertex_attrib_pointer_f32(
                binding.location,
                binding.component_count as i32,
                glow::FLOAT,
                false,
                stride as i32,
                binding.offset as i32,
            );
            gl.enable_vertex_attrib_array(binding.location);
        }
        gl.bind_vertex_array(None);

        submesh.vaos.push(Vao {
            handle,
            program_handle: program.handle,
        });
        handle
    }
}

pub fn geometry_program_index(app: &App) -> u32 {
    match app.render_mode {
        RenderMode::Forward => app.forward_mesh_program_idx,
        RenderMode::Deferred => app.deferred_geometry_program_idx,
    }
}

pub fn composite_program_index(app: &App) -> u32 {
    match app.render_mode {
        RenderMode::Deferred => app.deferred_quad_program_idx,
        RenderMode::Forward => {
            if app.current_render_target_mode == RenderTargetsMode::Depth {
                app.depth_program_idx
            } else {
                app.forward_quad_program_idx
            }
        }
    }
}

/// One frame: fill the G-buffer, then composite onto the default target.
/// Skipped entirely while the framebuffer never came up.
pub fn render(app: &mut App, gl: &glow::Context) {
    if app.gbuffer.is_none() || app.screen_quad.is_none() {
        return;
    }
    geometry_pass(app, gl);
    composite_pass(app, gl);
}

fn geometry_pass(app: &mut App, gl: &glow::Context) {
    let Some(gbuffer) = app.gbuffer.as_ref() else {
        return;
    };
    let framebuffer = gbuffer.framebuffer;
    let (width, height) = (gbuffer.width, gbuffer.height);

    unsafe {
        gl.push_debug_group(glow::DEBUG_SOURCE_APPLICATION, 1, "Geometry pass");
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        gl.draw_buffers(&[
            glow::COLOR_ATTACHMENT0,
            glow::COLOR_ATTACHMENT1,
            glow::COLOR_ATTACHMENT2,
            glow::COLOR_ATTACHMENT3,
        ]);
        gl.viewport(0, 0, width as i32, height as i32);
        gl.clear_color(CLEAR_COLOR[0], CLEAR_COLOR[1], CLEAR_COLOR[2], CLEAR_COLOR[3]);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        gl.enable(glow::DEPTH_TEST);
        gl.depth_func(glow::LESS);
        gl.disable(glow::BLEND);
    }

    let program_index = geometry_program_index(app) as usize;
    let Some(program) = app.programs.get(program_index).cloned() else {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.pop_debug_group();
        }
        return;
    };

    unsafe {
        gl.use_program(Some(program.handle));
    }
    upload_lights(gl, program.handle, &app.lights);
    upload_camera_position(gl, program.handle, app.camera.position);

    let aspect_ratio = width as f32 / height as f32;
    let projection = mat4x4_perspective(app.camera.zoom.to_radians(), aspect_ratio, Z_NEAR, Z_FAR);
    let view_projection = mat4x4_mul(projection, app.camera.view_matrix());

    for entity_index in 0..app.entities.len() {
        let entity = app.entities[entity_index];
        if (entity.model_index as usize) >= app.models.len() {
            continue;
        }

        let world = mat4x4_mul(
            mat4x4_translate(entity.position[0], entity.position[1], entity.position[2]),
            mat4x4_scale(ENTITY_SCALE, ENTITY_SCALE, ENTITY_SCALE),
        );
        unsafe {
            if let Some(location) = gl.get_uniform_location(program.handle, "uWorldMatrix") {
                gl.uniform_matrix_4_f32_slice(Some(&location), true, &world);
            }
            if let Some(location) =
                gl.get_uniform_location(program.handle, "uWorldViewProjectionMatrix")
            {
                gl.uniform_matrix_4_f32_slice(
                    Some(&location),
                    true,
                    &mat4x4_mul(view_projection, world),
                );
            }
        }

        render_model(app, gl, &entity, &program);
    }

    unsafe {
        gl.use_program(None);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.pop_debug_group();
    }
}

fn render_model(app: &mut App, gl: &glow::Context, entity: &Entity, program: &Program) {
    let App {
        meshes,
        models,
        materials,
        textures,
        ..
    } = app;

    let model = &models[entity.model_index as usize];
    let mesh = &mut meshes[model.mesh_index as usize];

    for submesh_index in 0..mesh.submeshes.len() {
        let vao = find_vao(mesh, submesh_index, program, gl);
        unsafe {
            gl.bind_vertex_array(Some(vao));
        }

        let material = model
            .material_indices
            .get(submesh_index)
            .and_then(|&material_index| materials.get(material_index as usize));
        if let Some(material) = material {
            if material.has_albedo_texture(textures.len()) {
                unsafe {
                    gl.active_texture(glow::TEXTURE0);
                    gl.bind_texture(
                        glow::TEXTURE_2D,
                        Some(textures[material.albedo_texture_idx as usize].handle),
                    );
                    if let Some(location) = gl.get_uniform_location(program.handle, "uTexture") {
                        gl.uniform_1_i32(Some(&location), 0);
                    }
                }
            }
        }

        let submesh = &mesh.submeshes[submesh_index];
        unsafe {
            gl.draw_elements(
                glow::TRIANGLES,
                submesh.indices.len() as i32,
                glow::UNSIGNED_INT,
                submesh.index_offset as i32,
            );
        }
    }

    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.bind_vertex_array(None);
    }
}

fn composite_pass(app: &App, gl: &glow::Context) {
    let Some(gbuffer) = app.gbuffer.as_ref() else {
        return;
    };
    let Some(quad) = app.screen_quad.as_ref() else {
        return;
    };
    let Some(program) = app.programs.get(composite_program_index(app) as usize) else {
        return;
    };
    let (width, height) = app.display_size;

    unsafe {
        gl.push_debug_group(glow::DEBUG_SOURCE_APPLICATION, 2, "Composite pass");
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.viewport(0, 0, width as i32, height as i32);
        gl.clear_color(CLEAR_COLOR[0], CLEAR_COLOR[1], CLEAR_COLOR[2], CLEAR_COLOR[3]);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        gl.disable(glow::DEPTH_TEST);

        gl.use_program(Some(program.handle));
        gl.bind_vertex_array(Some(quad.vao));
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
    }

    match app.render_mode {
        RenderMode::Forward => unsafe {
            // Show the selected attachment straight through one sampler.
            let attachment = match app.current_render_target_mode {
                RenderTargetsMode::Albedo => gbuffer.color_attachment,
                RenderTargetsMode::Normals => gbuffer.normal_attachment,
                RenderTargetsMode::Position => gbuffer.position_attachment,
                RenderTargetsMode::Depth => gbuffer.depth_attachment,
                RenderTargetsMode::FinalRender => gbuffer.final_attachment,
            };
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(attachment));
            if let Some(location) = gl.get_uniform_location(program.handle, "uColor") {
                gl.uniform_1_i32(Some(&location), 0);
            }
        },
        RenderMode::Deferred => {
            // Deferred lighting resolves in this pass, so it gets the whole
            // G-buffer plus the lighting and camera state.
            unsafe {
                if let Some(location) = gl.get_uniform_location(program.handle, "renderTargetMode") {
                    gl.uniform_1_u32(Some(&location), app.current_render_target_mode as u32);
                }
            }
            upload_lights(gl, program.handle, &app.lights);
            upload_camera_position(gl, program.handle, app.camera.position);
            unsafe {
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(gbuffer.color_attachment));
                if let Some(location) = gl.get_uniform_location(program.handle, "uColor") {
                    gl.uniform_1_i32(Some(&location), 0);
                }
                gl.active_texture(glow::TEXTURE1);
                gl.bind_texture(glow::TEXTURE_2D, Some(gbuffer.normal_attachment));
                if let Some(location) = gl.get_uniform_location(program.handle, "uNormals") {
                    gl.uniform_1_i32(Some(&location), 1);
                }
                gl.active_texture(glow::TEXTURE2);
                gl.bind_texture(glow::TEXTURE_2D, Some(gbuffer.position_attachment));
                if let Some(location) = gl.get_uniform_location(program.handle, "uPosition") {
                    gl.uniform_1_i32(Some(&location), 2);
                }
                gl.active_texture(glow::TEXTURE3);
                gl.bind_texture(glow::TEXTURE_2D, Some(gbuffer.depth_attachment));
                if let Some(location) = gl.get_uniform_location(program.handle, "uDepth") {
                    gl.uniform_1_i32(Some(&location), 3);
                }
            }
        }
    }

    unsafe {
        gl.draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);
        gl.disable(glow::BLEND);
        gl.bind_vertex_array(None);
        gl.use_program(None);
        gl.pop_debug_group();
    }
}

fn upload_lights(gl: &glow::Context, program: glow::Program, lights: &[Light]) {
    unsafe {
        if let Some(location) = gl.get_uniform_location(program, "lightCount") {
            gl.uniform_1_u32(Some(&location), lights.len() as u32);
        }
        for (i, light) in lights.iter().enumerate() {
            let base = format!("lights[{i}]");
            if let Some(location) = gl.get_uniform_location(program, &format!("{base}.type")) {
                gl.uniform_1_u32(Some(&location), light.kind as u32);
            }
            if let Some(location) = gl.get_uniform_location(program, &format!("{base}.color")) {
                gl.uniform_3_f32_slice(Some(&location), &light.color);
            }
            if let Some(location) = gl.get_uniform_location(program, &format!("{base}.position")) {
                gl.uniform_3_f32_slice(Some(&location), &light.position);
            }
            if let Some(location) = gl.get_uniform_location(program, &format!("{base}.direction")) {
                gl.uniform_3_f32_slice(Some(&location), &light.direction);
            }
        }
    }
}

fn upload_camera_position(gl: &glow::Context, program: glow::Program, position: Vec3) {
    unsafe {
        if let Some(location) = gl.get_uniform_location(program, "uCameraPosition") {
            gl.uniform_3_f32_slice(Some(&location), &position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::program::VertexShaderAttribute;
    use crate::engine::config::SceneConfig;
    use std::num::NonZeroU32;
    use std::path::PathBuf;

    fn fake_program(id: u32) -> Program {
        Program {
            handle: glow::NativeProgram(NonZeroU32::new(id).unwrap()),
            filepath: PathBuf::from("assets/shaders/test.glsl"),
            program_name: format!("TEST_{id}"),
            last_write_timestamp: 0,
            vertex_input_layout: Default::default(),
        }
    }

    fn submesh_layout() -> VertexBufferLayout {
        let mut layout = VertexBufferLayout::default();
        layout.push(0, 3);
        layout.push(1, 3);
        layout.push(2, 2);
        layout
    }

    fn program_layout(locations: &[(u32, u32)]) -> VertexShaderLayout {
        VertexShaderLayout {
            attributes: locations
                .iter()
                .map(|&(location, component_count)| VertexShaderAttribute {
                    location,
                    component_count,
                })
                .collect(),
        }
    }

    #[test]
    fn bindings_offset_by_submesh_base() {
        let bindings = resolve_attribute_bindings(
            &program_layout(&[(0, 3), (2, 2)]),
            &submesh_layout(),
            3200,
            "DEFERRED_SHADER",
        );
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].offset, 3200);
        assert_eq!(bindings[1].offset, 3200 + 24);
        assert_eq!(bindings[1].component_count, 2);
    }

    #[test]
    fn program_subset_of_submesh_layout_is_fine() {
        // A depth-only style program that reads just positions.
        let bindings =
            resolve_attribute_bindings(&program_layout(&[(0, 3)]), &submesh_layout(), 0, "DEPTH");
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].location, 0);
    }

    #[test]
    #[should_panic(expected = "no attribute for shader location 4")]
    fn missing_attribute_is_fatal() {
        // The submesh has no tangent space; a program demanding location 4
        // cannot be satisfied.
        resolve_attribute_bindings(&program_layout(&[(0, 3), (4, 3)]), &submesh_layout(), 0, "FORWARD_SHADER");
    }

    fn app_with_programs() -> App {
        let mut app = App::new(&SceneConfig::default(), (1280, 720));
        for id in 1..=5 {
            app.programs.push(fake_program(id));
        }
        app.forward_quad_program_idx = 0;
        app.deferred_quad_program_idx = 1;
        app.forward_mesh_program_idx = 2;
        app.deferred_geometry_program_idx = 3;
        app.depth_program_idx = 4;
        app
    }

    #[test]
    fn render_mode_switch_selects_different_programs() {
        let mut app = app_with_programs();
        let tables_before = (
            app.textures.len(),
            app.programs.len(),
            app.materials.len(),
            app.meshes.len(),
            app.models.len(),
        );

        app.render_mode = RenderMode::Forward;
        let forward_geometry = geometry_program_index(&app);
        let forward_composite = composite_program_index(&app);

        app.render_mode = RenderMode::Deferred;
        let deferred_geometry = geometry_program_index(&app);
        let deferred_composite = composite_program_index(&app);

        assert_ne!(forward_geometry, deferred_geometry);
        assert_ne!(forward_composite, deferred_composite);

        let tables_after = (
            app.textures.len(),
            app.programs.len(),
            app.materials.len(),
            app.meshes.len(),
            app.models.len(),
        );
        assert_eq!(tables_before, tables_after);
    }

    #[test]
    fn forward_depth_target_uses_the_depth_program() {
        let mut app = app_with_programs();
        app.render_mode = RenderMode::Forward;
        app.current_render_target_mode = RenderTargetsMode::Depth;
        assert_eq!(composite_program_index(&app), app.depth_program_idx);

        app.current_render_target_mode = RenderTargetsMode::Normals;
        assert_eq!(composite_program_index(&app), app.forward_quad_program_idx);

        // Deferred mode routes every target through the multi-texture program.
        app.render_mode = RenderMode::Deferred;
        app.current_render_target_mode = RenderTargetsMode::Depth;
        assert_eq!(composite_program_index(&app), app.deferred_quad_program_idx);
    }
}
