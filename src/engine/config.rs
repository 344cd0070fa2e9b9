use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::components::entity::LightKind;
use crate::engine::utils::math::Vec3;

/// Scene description loaded from JSON. Any missing file or parse error
/// falls back to the built-in default scene, so the demo always starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub entities: Vec<EntityConfig>,
    pub lights: Vec<LightConfig>,
    /// Model drawn at each point light's position for visualization.
    pub point_light_model: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub model: PathBuf,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_surface_factor")]
    pub metallic: f32,
    #[serde(default = "default_surface_factor")]
    pub roughness: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    pub kind: LightKind,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_light_direction")]
    pub direction: Vec3,
    #[serde(default = "default_light_color")]
    pub color: Vec3,
}

fn default_surface_factor() -> f32 {
    0.5
}

fn default_light_direction() -> Vec3 {
    [0.0, -1.0, 0.0]
}

fn default_light_color() -> Vec3 {
    [1.0, 1.0, 1.0]
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.25, 1.25, 6.75],
            yaw: -90.0,
            pitch: -10.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            entities: vec![EntityConfig {
                model: PathBuf::from("assets/models/patrick/patrick.gltf"),
                position: [0.0, 0.0, 0.0],
                metallic: 2.0,
                roughness: 2.75,
            }],
            lights: vec![
                LightConfig {
                    kind: LightKind::Directional,
                    position: [2.5, 3.0, 0.0],
                    direction: [0.2, 0.25, 0.8],
                    color: [0.9, 0.9, 0.9],
                },
                LightConfig {
                    kind: LightKind::Point,
                    position: [-1.0, 2.75, 2.2],
                    direction: [1.0, 1.0, 1.0],
                    color: [0.0, 0.2, 0.0],
                },
                LightConfig {
                    kind: LightKind::Point,
                    position: [1.0, 2.75, 2.2],
                    direction: [1.0, 1.0, 1.0],
                    color: [0.5, 0.2, 0.5],
                },
                LightConfig {
                    kind: LightKind::Point,
                    position: [0.1, 1.55, -0.2],
                    direction: [1.0, 1.0, 1.0],
                    color: [0.33, 0.2, 0.05],
                },
            ],
            point_light_model: Some(PathBuf::from("assets/models/primitives/sphere/sphere.gltf")),
        }
    }
}

pub fn load_scene_config(filepath: &Path) -> SceneConfig {
    match fs::read_to_string(filepath) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(error) => {
                log::warn!(
                    "invalid scene config {}: {error}; using built-in scene",
                    filepath.display()
                );
                SceneConfig::default()
            }
        },
        Err(_) => {
            log::info!(
                "no scene config at {}, using built-in scene",
                filepath.display()
            );
            SceneConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_scene() {
        let config = load_scene_config(Path::new("no/such/scene.json"));
        assert_eq!(config.lights.len(), 4);
        assert_eq!(config.camera.yaw, -90.0);
        assert_eq!(config.camera.pitch, -10.0);
    }

    #[test]
    fn default_scene_has_one_directional_light() {
        let config = SceneConfig::default();
        let directional = config
            .lights
            .iter()
            .filter(|light| light.kind == LightKind::Directional)
            .count();
        assert_eq!(directional, 1);
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let text = r#"{
            "entities": [{ "model": "assets/models/box.gltf" }],
            "lights": [{ "kind": "point", "position": [0.0, 2.0, 0.0] }]
        }"#;
        let config: SceneConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.entities.len(), 1);
        assert_eq!(config.entities[0].metallic, 0.5);
        assert_eq!(config.lights[0].kind, LightKind::Point);
        assert_eq!(config.lights[0].color, [1.0, 1.0, 1.0]);
        // Camera falls back to the built-in start position.
        assert_eq!(config.camera.position, [0.25, 1.25, 6.75]);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SceneConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: SceneConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.lights.len(), config.lights.len());
        assert_eq!(parsed.entities[0].model, config.entities[0].model);
    }
}
