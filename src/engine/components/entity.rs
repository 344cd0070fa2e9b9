use serde::{Deserialize, Serialize};

use crate::engine::utils::math::Vec3;

/// A placed instance of a model. Metallic/roughness are carried along from
/// the scene description but the current shaders do not consume them.
#[derive(Debug, Clone, Copy)]
pub struct Entity {
    pub position: Vec3,
    #[allow(dead_code)]
    pub metallic: f32,
    #[allow(dead_code)]
    pub roughness: f32,
    pub model_index: u32,
}

impl Entity {
    pub fn new(position: Vec3, model_index: u32) -> Self {
        Self {
            position,
            metallic: 0.5,
            roughness: 0.5,
            model_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub direction: Vec3,
    pub position: Vec3,
    /// Visualization record (a small mesh drawn where the light sits).
    #[allow(dead_code)]
    pub entity: Entity,
}

impl Light {
    pub fn new(kind: LightKind, position: Vec3, direction: Vec3, color: Vec3) -> Self {
        Self {
            kind,
            color,
            direction,
            position,
            entity: Entity::new(position, crate::engine::INVALID_INDEX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_kind_maps_to_shader_ids() {
        assert_eq!(LightKind::Directional as u32, 0);
        assert_eq!(LightKind::Point as u32, 1);
    }

    #[test]
    fn new_light_places_visualization_entity_at_light() {
        let light = Light::new(LightKind::Point, [1.0, 2.0, 3.0], [0.0, -1.0, 0.0], [1.0, 1.0, 1.0]);
        assert_eq!(light.entity.position, light.position);
        assert_eq!(light.entity.model_index, crate::engine::INVALID_INDEX);
    }
}
