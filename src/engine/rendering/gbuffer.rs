use glow::HasContext;

#[derive(Debug, thiserror::Error)]
pub enum GBufferError {
    #[error("failed to create GL object: {0}")]
    Gl(String),
    #[error("framebuffer incomplete: {0}")]
    Incomplete(&'static str),
}

/// The offscreen render targets the geometry pass writes into: albedo/color,
/// world normal, world position, and a placeholder for the final composite,
/// plus a depth attachment. The composite pass samples these.
#[derive(Debug)]
pub struct GBuffer {
    pub framebuffer: glow::Framebuffer,
    pub color_attachment: glow::Texture,
    pub normal_attachment: glow::Texture,
    pub position_attachment: glow::Texture,
    pub final_attachment: glow::Texture,
    pub depth_attachment: glow::Texture,
    pub width: u32,
    pub height: u32,
}

impl GBuffer {
    pub fn new(gl: &glow::Context, width: u32, height: u32) -> Result<Self, GBufferError> {
        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(GBufferError::Gl)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let color_attachment = color_target(gl, width, height)?;
            let normal_attachment = color_target(gl, width, height)?;
            let position_attachment = color_target(gl, width, height)?;
            let final_attachment = color_target(gl, width, height)?;
            let depth_attachment = depth_target(gl, width, height)?;

            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color_attachment),
                0,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT1,
                glow::TEXTURE_2D,
                Some(normal_attachment),
                0,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT2,
                glow::TEXTURE_2D,
                Some(position_attachment),
                0,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT3,
                glow::TEXTURE_2D,
                Some(final_attachment),
                0,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::TEXTURE_2D,
                Some(depth_attachment),
                0,
            );

            gl.draw_buffers(&[
                glow::COLOR_ATTACHMENT0,
                glow::COLOR_ATTACHMENT1,
                glow::COLOR_ATTACHMENT2,
                glow::COLOR_ATTACHMENT3,
            ]);

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                return Err(GBufferError::Incomplete(framebuffer_status_name(status)));
            }

            Ok(Self {
                framebuffer,
                color_attachment,
                normal_attachment,
                position_attachment,
                final_attachment,
                depth_attachment,
                width,
                height,
            })
        }
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_texture(self.color_attachment);
            gl.delete_texture(self.normal_attachment);
            gl.delete_texture(self.position_attachment);
            gl.delete_texture(self.final_attachment);
            gl.delete_texture(self.depth_attachment);
        }
    }
}

unsafe fn color_target(gl: &glow::Context, width: u32, height: u32) -> Result<glow::Texture, GBufferError> {
    attachment_target(gl, width, height, glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE)
}

unsafe fn depth_target(gl: &glow::Context, width: u32, height: u32) -> Result<glow::Texture, GBufferError> {
    attachment_target(
        gl,
        width,
        height,
        glow::DEPTH_COMPONENT24,
        glow::DEPTH_COMPONENT,
        glow::FLOAT,
    )
}

unsafe fn attachment_target(
    gl: &glow::Context,
    width: u32,
    height: u32,
    internal_format: u32,
    data_format: u32,
    data_type: u32,
) -> Result<glow::Texture, GBufferError> {
    let handle = gl.create_texture().map_err(GBufferError::Gl)?;
    gl.bind_texture(glow::TEXTURE_2D, Some(handle));
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        internal_format as i32,
        width as i32,
        height as i32,
        0,
        data_format,
        data_type,
        glow::PixelUnpackData::Slice(None),
    );
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(handle)
}

pub fn framebuffer_status_name(status: u32) -> &'static str {
    match status {
        glow::FRAMEBUFFER_UNDEFINED => "GL_FRAMEBUFFER_UNDEFINED",
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
        }
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER",
        glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_READ_BUFFER",
        glow::FRAMEBUFFER_UNSUPPORTED => "GL_FRAMEBUFFER_UNSUPPORTED",
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE",
        glow::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => "GL_FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS",
        _ => "unknown framebuffer status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_cover_the_gl_enum() {
        assert_eq!(
            framebuffer_status_name(glow::FRAMEBUFFER_UNSUPPORTED),
            "GL_FRAMEBUFFER_UNSUPPORTED"
        );
        assert_eq!(
            framebuffer_status_name(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT),
            "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT"
        );
        assert_eq!(framebuffer_status_name(0xDEAD), "unknown framebuffer status");
    }
}
