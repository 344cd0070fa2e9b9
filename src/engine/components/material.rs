use crate::engine::utils::math::Vec3;
use crate::engine::INVALID_INDEX;

/// Material record. Texture fields are indices into the texture table;
/// `INVALID_INDEX` means the role has no texture, and renderers must check
/// the index against the table before binding.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub albedo: Vec3,
    pub emissive: Vec3,
    pub smoothness: f32,
    pub albedo_texture_idx: u32,
    pub emissive_texture_idx: u32,
    pub specular_texture_idx: u32,
    pub normals_texture_idx: u32,
    pub bump_texture_idx: u32,
}

impl Material {
    pub fn has_albedo_texture(&self, texture_count: usize) -> bool {
        (self.albedo_texture_idx as usize) < texture_count
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: [1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            smoothness: 0.0,
            albedo_texture_idx: INVALID_INDEX,
            emissive_texture_idx: INVALID_INDEX,
            specular_texture_idx: INVALID_INDEX,
            normals_texture_idx: INVALID_INDEX,
            bump_texture_idx: INVALID_INDEX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_has_no_textures() {
        let material = Material::default();
        assert!(!material.has_albedo_texture(100));
        assert_eq!(material.emissive_texture_idx, INVALID_INDEX);
    }

    #[test]
    fn albedo_index_must_be_inside_table() {
        let material = Material {
            albedo_texture_idx: 2,
            ..Material::default()
        };
        assert!(material.has_albedo_texture(3));
        assert!(!material.has_albedo_texture(2));
    }
}
