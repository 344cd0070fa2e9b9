use std::path::{Path, PathBuf};

use glow::HasContext;

use crate::engine::components::texture::Texture;
use crate::engine::INVALID_INDEX;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("could not open {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("{}: unsupported channel count {channels}, expected 3 or 4", path.display())]
    UnsupportedChannelCount { path: PathBuf, channels: u8 },
    #[error("failed to create GL texture: {0}")]
    Gl(String),
}

/// Load a texture into the table, deduplicating by source path. Returns the
/// table index, or `INVALID_INDEX` after logging when the file cannot be
/// decoded or has an unsupported channel count.
pub fn load_texture_2d(textures: &mut Vec<Texture>, gl: &glow::Context, filepath: &Path) -> u32 {
    if let Some(existing) = find_texture(textures, filepath) {
        return existing;
    }

    match create_texture_from_file(gl, filepath) {
        Ok(handle) => {
            let index = textures.len() as u32;
            textures.push(Texture {
                handle,
                filepath: filepath.to_path_buf(),
            });
            index
        }
        Err(error) => {
            log::error!("texture load failed: {error}");
            INVALID_INDEX
        }
    }
}

pub fn find_texture(textures: &[Texture], filepath: &Path) -> Option<u32> {
    textures
        .iter()
        .position(|texture| texture.filepath == filepath)
        .map(|index| index as u32)
}

fn create_texture_from_file(gl: &glow::Context, filepath: &Path) -> Result<glow::Texture, TextureError> {
    let img = image::open(filepath).map_err(|source| TextureError::Decode {
        path: filepath.to_path_buf(),
        source,
    })?;

    // Image rows come out top-first; GL samples with a bottom-left origin.
    let img = img.flipv();

    let (width, height, data_format, internal_format, pixels) = match img {
        image::DynamicImage::ImageRgb8(buffer) => {
            let (width, height) = buffer.dimensions();
            (width, height, glow::RGB, glow::RGB8, buffer.into_raw())
        }
        image::DynamicImage::ImageRgba8(buffer) => {
            let (width, height) = buffer.dimensions();
            (width, height, glow::RGBA, glow::RGBA8, buffer.into_raw())
        }
        other => {
            return Err(TextureError::UnsupportedChannelCount {
                path: filepath.to_path_buf(),
                channels: other.color().channel_count(),
            });
        }
    };

    unsafe {
        let handle = gl.create_texture().map_err(TextureError::Gl)?;
        gl.bind_texture(glow::TEXTURE_2D, Some(handle));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            internal_format as i32,
            width as i32,
            height as i32,
            0,
            data_format,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(Some(&pixels)),
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR_MIPMAP_LINEAR as i32,
        );
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.generate_mipmap(glow::TEXTURE_2D);
        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(handle)
    }
}
