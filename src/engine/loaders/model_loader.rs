use std::path::{Path, PathBuf};

use glow::HasContext;

use crate::engine::app::App;
use crate::engine::components::material::Material;
use crate::engine::components::mesh::{assign_buffer_ranges, Mesh, Model, Submesh, VertexBufferLayout};
use crate::engine::components::texture::Texture;
use crate::engine::loaders::texture_loader::load_texture_2d;
use crate::engine::utils::math::{
    mat4x4_from_columns, mat4x4_identity, mat4x4_mul, mat4x4_transform_direction,
    mat4x4_transform_point, vec3_add, vec3_cross, vec3_normalize, vec3_scale, vec3_sub, Mat4x4,
    Vec3,
};
use crate::engine::INVALID_INDEX;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("importer failed on {}: {source}", path.display())]
    Import {
        path: PathBuf,
        source: Box<gltf::Error>,
    },
    #[error("{}: scene contains no renderable geometry", path.display())]
    EmptyScene { path: PathBuf },
    #[error("failed to create GL buffer: {0}")]
    Gl(String),
}

/// Load a model file into the resource tables. All geometry in the file is
/// flattened into a single mesh; materials are appended to the global table
/// once per model. Returns the model table index, or `INVALID_INDEX` after
/// logging when the file cannot be imported.
pub fn load_model(app: &mut App, gl: &glow::Context, filepath: &Path) -> u32 {
    match try_load_model(app, gl, filepath) {
        Ok(model_index) => model_index,
        Err(error) => {
            log::error!("error loading model: {error}");
            INVALID_INDEX
        }
    }
}

fn try_load_model(app: &mut App, gl: &glow::Context, filepath: &Path) -> Result<u32, ModelError> {
    let (document, buffers, _images) = gltf::import(filepath).map_err(|source| ModelError::Import {
        path: filepath.to_path_buf(),
        source: Box::new(source),
    })?;

    let directory = filepath.parent().unwrap_or_else(|| Path::new("")).to_path_buf();

    // Materials for the whole file, appended once. Primitives without a
    // material fall back to a default entry at the base index.
    let base_material_index = app.materials.len() as u32;
    if document.materials().len() == 0 {
        app.materials.push(Material::default());
    } else {
        for gltf_material in document.materials() {
            let material = process_material(&mut app.textures, gl, &gltf_material, &directory);
            app.materials.push(material);
        }
    }

    let mut mesh = Mesh::new();
    let mut material_indices = Vec::new();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| ModelError::EmptyScene {
            path: filepath.to_path_buf(),
        })?;
    for node in scene.nodes() {
        process_node(
            &node,
            &buffers,
            mat4x4_identity(),
            base_material_index,
            &mut mesh,
            &mut material_indices,
        );
    }
    if mesh.submeshes.is_empty() {
        return Err(ModelError::EmptyScene {
            path: filepath.to_path_buf(),
        });
    }

    upload_mesh(gl, &mut mesh).map_err(ModelError::Gl)?;

    let mesh_index = app.meshes.len() as u32;
    app.meshes.push(mesh);
    let model_index = app.models.len() as u32;
    app.models.push(Model {
        mesh_index,
        material_indices,
    });

    log::info!(
        "loaded model {} ({} submeshes)",
        filepath.display(),
        app.meshes[mesh_index as usize].submeshes.len()
    );
    Ok(model_index)
}

/// Depth-first walk: collect the node's primitives, then recurse into its
/// children. World transforms are accumulated and baked into the vertices,
/// flattening the hierarchy away.
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: Mat4x4,
    base_material_index: u32,
    mesh: &mut Mesh,
    material_indices: &mut Vec<u32>,
) {
    let world = mat4x4_mul(
        parent_transform,
        mat4x4_from_columns(node.transform().matrix()),
    );

    if let Some(gltf_mesh) = node.mesh() {
        for primitive in gltf_mesh.primitives() {
            process_primitive(&primitive, buffers, &world, base_material_index, mesh, material_indices);
        }
    }

    for child in node.children() {
        process_node(&child, buffers, world, base_material_index, mesh, material_indices);
    }
}

fn process_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: &Mat4x4,
    base_material_index: u32,
    mesh: &mut Mesh,
    material_indices: &mut Vec<u32>,
) {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("skipping non-triangle primitive (mode {:?})", primitive.mode());
        return;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let Some(positions) = reader.read_positions().map(|iter| iter.collect::<Vec<Vec3>>()) else {
        log::warn!("skipping primitive without positions");
        return;
    };
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(iter) => iter.collect(),
        None => generate_smooth_normals(&positions, &indices),
    };
    let tex_coords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|iter| iter.into_f32().collect());
    let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|iter| iter.collect());

    let has_tex_coords = tex_coords.is_some();
    let has_tangent_space = tangents.is_some();
    let layout = vertex_layout_for(has_tex_coords, has_tangent_space);

    let mut vertices = Vec::with_capacity(positions.len() * layout.stride as usize / 4);
    for i in 0..positions.len() {
        let position = mat4x4_transform_point(world, positions[i]);
        let normal = vec3_normalize(mat4x4_transform_direction(
            world,
            normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
        ));
        vertices.extend_from_slice(&position);
        vertices.extend_from_slice(&normal);

        if let Some(tex_coords) = &tex_coords {
            vertices.extend_from_slice(&tex_coords.get(i).copied().unwrap_or([0.0, 0.0]));
        }
        if let Some(tangents) = &tangents {
            let raw = tangents.get(i).copied().unwrap_or([1.0, 0.0, 0.0, 1.0]);
            let tangent = vec3_normalize(mat4x4_transform_direction(world, [raw[0], raw[1], raw[2]]));
            vertices.extend_from_slice(&tangent);
            // The importer's tangent basis comes out left-handed relative to
            // what the shaders expect, so the derived bitangent is flipped.
            let bitangent = vec3_scale(vec3_cross(normal, tangent), raw[3]);
            vertices.extend_from_slice(&vec3_scale(bitangent, -1.0));
        }
    }

    let material_index = primitive.material().index().unwrap_or(0) as u32;
    material_indices.push(base_material_index + material_index);
    mesh.submeshes.push(Submesh::new(layout, vertices, indices));
}

/// Position and normal are always present; texture coordinates and tangent
/// space extend the vertex only when the file provides them.
pub(crate) fn vertex_layout_for(has_tex_coords: bool, has_tangent_space: bool) -> VertexBufferLayout {
    let mut layout = VertexBufferLayout::default();
    layout.push(0, 3);
    layout.push(1, 3);
    if has_tex_coords {
        layout.push(2, 2);
    }
    if has_tangent_space {
        layout.push(3, 3);
        layout.push(4, 3);
    }
    layout
}

/// Area-weighted vertex normals for files that ship none.
pub(crate) fn generate_smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let edge1 = vec3_sub(positions[i1], positions[i0]);
        let edge2 = vec3_sub(positions[i2], positions[i0]);
        let face_normal = vec3_cross(edge1, edge2);
        for index in [i0, i1, i2] {
            normals[index] = vec3_add(normals[index], face_normal);
        }
    }
    normals.into_iter().map(vec3_normalize).collect()
}

fn process_material(
    textures: &mut Vec<Texture>,
    gl: &glow::Context,
    material: &gltf::Material,
    directory: &Path,
) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let base_color = pbr.base_color_factor();

    let mut out = Material {
        name: material.name().unwrap_or("").to_string(),
        albedo: [base_color[0], base_color[1], base_color[2]],
        emissive: material.emissive_factor(),
        smoothness: 1.0 - pbr.roughness_factor(),
        ..Material::default()
    };

    out.albedo_texture_idx = load_role_texture(
        textures,
        gl,
        pbr.base_color_texture().map(|info| info.texture()),
        directory,
    );
    out.emissive_texture_idx = load_role_texture(
        textures,
        gl,
        material.emissive_texture().map(|info| info.texture()),
        directory,
    );
    out.specular_texture_idx = load_role_texture(
        textures,
        gl,
        pbr.metallic_roughness_texture().map(|info| info.texture()),
        directory,
    );
    out.normals_texture_idx = load_role_texture(
        textures,
        gl,
        material.normal_texture().map(|info| info.texture()),
        directory,
    );
    out.bump_texture_idx = load_role_texture(
        textures,
        gl,
        material.occlusion_texture().map(|info| info.texture()),
        directory,
    );

    out
}

/// Resolve a texture reference against the model's directory and route it
/// through the deduplicating loader. Embedded payloads carry no path to
/// deduplicate on and are skipped.
fn load_role_texture(
    textures: &mut Vec<Texture>,
    gl: &glow::Context,
    texture: Option<gltf::Texture>,
    directory: &Path,
) -> u32 {
    let Some(texture) = texture else {
        return INVALID_INDEX;
    };
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } => load_texture_2d(textures, gl, &directory.join(uri)),
        gltf::image::Source::View { .. } => {
            log::warn!("embedded image payloads are not supported, skipping texture");
            INVALID_INDEX
        }
    }
}

/// Allocate the mesh's two shared buffers at their total sizes, then copy
/// each submesh in at its assigned byte offset.
fn upload_mesh(gl: &glow::Context, mesh: &mut Mesh) -> Result<(), String> {
    let (vertex_buffer_size, index_buffer_size) = assign_buffer_ranges(mesh);

    unsafe {
        let vertex_buffer = gl.create_buffer()?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
        gl.buffer_data_size(glow::ARRAY_BUFFER, vertex_buffer_size as i32, glow::STATIC_DRAW);

        let index_buffer = gl.create_buffer()?;
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
        gl.buffer_data_size(
            glow::ELEMENT_ARRAY_BUFFER,
            index_buffer_size as i32,
            glow::STATIC_DRAW,
        );

        for submesh in &mesh.submeshes {
            gl.buffer_sub_data_u8_slice(
                glow::ARRAY_BUFFER,
                submesh.vertex_offset as i32,
                bytemuck::cast_slice(&submesh.vertices),
            );
            gl.buffer_sub_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                submesh.index_offset as i32,
                bytemuck::cast_slice(&submesh.indices),
            );
        }

        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

        mesh.vertex_buffer_handle = Some(vertex_buffer);
        mesh.index_buffer_handle = Some(index_buffer);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_layout_is_position_and_normal() {
        let layout = vertex_layout_for(false, false);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.stride, 24);
    }

    #[test]
    fn tex_coords_extend_the_stride() {
        let layout = vertex_layout_for(true, false);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.find_attribute(2).unwrap().offset, 24);
    }

    #[test]
    fn tangent_space_appends_two_attributes() {
        let layout = vertex_layout_for(true, true);
        assert_eq!(layout.attributes.len(), 5);
        assert_eq!(layout.stride, 56);
        assert_eq!(layout.find_attribute(3).unwrap().offset, 32);
        assert_eq!(layout.find_attribute(4).unwrap().offset, 44);
    }

    #[test]
    fn smooth_normals_of_flat_triangle_point_up() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]];
        let normals = generate_smooth_normals(&positions, &[0, 1, 2]);
        for normal in normals {
            assert!((normal[1] - 1.0).abs() < 1e-5, "expected +Y normal, got {normal:?}");
        }
    }

    #[test]
    fn smooth_normals_average_across_shared_vertices() {
        // Two faces of a right-angle fold sharing an edge: the shared
        // vertices get the averaged 45-degree normal.
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, -1.0],
            [0.0, 0.0, -1.0],
            [0.0, 1.0, -1.0],
            [1.0, 1.0, -1.0],
        ];
        let indices = [0, 1, 2, 0, 2, 3, 3, 2, 5, 3, 5, 4];
        let normals = generate_smooth_normals(&positions, &indices);
        let shared = normals[2];
        assert!(shared[1] > 0.5 && shared[2] > 0.5, "expected blended normal, got {shared:?}");
    }

    #[test]
    fn degenerate_indices_are_ignored() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]];
        let normals = generate_smooth_normals(&positions, &[0, 1, 9]);
        assert_eq!(normals.len(), 3);
    }
}
