use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use glow::HasContext;

use crate::engine::components::program::{Program, VertexShaderAttribute};
use crate::engine::INVALID_INDEX;

const VERSION_DIRECTIVE: &str = "#version 430\n";

/// Both shader stages live in one source file; the stage is selected by the
/// preprocessor defines injected ahead of it.
pub fn assemble_stage_source(program_name: &str, stage_define: &str, source: &str) -> String {
    format!("{VERSION_DIRECTIVE}#define {program_name}\n#define {stage_define}\n{source}")
}

/// Read, compile, and link a program from a single-source shader file and
/// append it to the program table. Compile and link diagnostics are logged
/// but the handle is recorded regardless; an unreadable file or a failed GL
/// object allocation returns `INVALID_INDEX`.
pub fn load_program(
    programs: &mut Vec<Program>,
    gl: &glow::Context,
    filepath: &Path,
    program_name: &str,
) -> u32 {
    let source = match fs::read_to_string(filepath) {
        Ok(source) => source,
        Err(error) => {
            log::error!("could not read shader {}: {error}", filepath.display());
            return INVALID_INDEX;
        }
    };

    match create_program_from_source(gl, &source, program_name) {
        Ok(handle) => {
            let index = programs.len() as u32;
            programs.push(Program {
                handle,
                filepath: filepath.to_path_buf(),
                program_name: program_name.to_string(),
                last_write_timestamp: file_write_timestamp(filepath),
                vertex_input_layout: Default::default(),
            });
            index
        }
        Err(error) => {
            log::error!("could not create program {program_name}: {error}");
            INVALID_INDEX
        }
    }
}

pub fn create_program_from_source(
    gl: &glow::Context,
    program_source: &str,
    program_name: &str,
) -> Result<glow::Program, String> {
    unsafe {
        let vertex_shader = gl.create_shader(glow::VERTEX_SHADER)?;
        gl.shader_source(
            vertex_shader,
            &assemble_stage_source(program_name, "VERTEX", program_source),
        );
        gl.compile_shader(vertex_shader);
        if !gl.get_shader_compile_status(vertex_shader) {
            log::error!(
                "vertex shader compilation failed for {program_name}:\n{}",
                gl.get_shader_info_log(vertex_shader)
            );
        }

        let fragment_shader = gl.create_shader(glow::FRAGMENT_SHADER)?;
        gl.shader_source(
            fragment_shader,
            &assemble_stage_source(program_name, "FRAGMENT", program_source),
        );
        gl.compile_shader(fragment_shader);
        if !gl.get_shader_compile_status(fragment_shader) {
            log::error!(
                "fragment shader compilation failed for {program_name}:\n{}",
                gl.get_shader_info_log(fragment_shader)
            );
        }

        let program = gl.create_program()?;
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            log::error!(
                "program link failed for {program_name}:\n{}",
                gl.get_program_info_log(program)
            );
        }

        gl.detach_shader(program, vertex_shader);
        gl.detach_shader(program, fragment_shader);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        Ok(program)
    }
}

/// Fill in the program's vertex input layout from its active attributes.
/// Mesh programs get this once at load so VAO construction can match the
/// submesh layouts against what the program actually consumes.
pub fn load_program_attributes(gl: &glow::Context, program: &mut Program) -> usize {
    unsafe {
        let attribute_count = gl.get_active_attributes(program.handle);
        for i in 0..attribute_count {
            let Some(attribute) = gl.get_active_attribute(program.handle, i) else {
                continue;
            };
            // Built-ins (gl_VertexID and friends) are reported active but
            // have no bindable location.
            if attribute.name.starts_with("gl_") {
                continue;
            }
            let Some(location) = gl.get_attrib_location(program.handle, &attribute.name) else {
                continue;
            };
            program.vertex_input_layout.attributes.push(VertexShaderAttribute {
                location,
                component_count: component_count_of(attribute.atype),
            });
        }
    }
    program.vertex_input_layout.attributes.len()
}

fn component_count_of(attribute_type: u32) -> u32 {
    match attribute_type {
        glow::FLOAT => 1,
        glow::FLOAT_VEC2 => 2,
        glow::FLOAT_VEC3 => 3,
        glow::FLOAT_VEC4 => 4,
        other => {
            log::warn!("unexpected attribute type {other:#x}, assuming one component");
            1
        }
    }
}

fn file_write_timestamp(filepath: &Path) -> u64 {
    fs::metadata(filepath)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_source_injects_defines_in_order() {
        let assembled = assemble_stage_source("FORWARD_SHADER", "VERTEX", "void main() {}\n");
        let lines: Vec<&str> = assembled.lines().collect();
        assert_eq!(lines[0], "#version 430");
        assert_eq!(lines[1], "#define FORWARD_SHADER");
        assert_eq!(lines[2], "#define VERTEX");
        assert_eq!(lines[3], "void main() {}");
    }

    #[test]
    fn fragment_stage_gets_its_own_define() {
        let assembled = assemble_stage_source("DEFERRED_QUAD", "FRAGMENT", "");
        assert!(assembled.contains("#define FRAGMENT\n"));
        assert!(!assembled.contains("#define VERTEX"));
    }

    #[test]
    fn component_counts_follow_attribute_type() {
        assert_eq!(component_count_of(glow::FLOAT), 1);
        assert_eq!(component_count_of(glow::FLOAT_VEC2), 2);
        assert_eq!(component_count_of(glow::FLOAT_VEC3), 3);
        assert_eq!(component_count_of(glow::FLOAT_VEC4), 4);
    }

    #[test]
    fn missing_file_timestamp_is_zero() {
        assert_eq!(file_write_timestamp(Path::new("no/such/shader.glsl")), 0);
    }
}
