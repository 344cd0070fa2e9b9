pub mod camera;
pub mod entity;
pub mod material;
pub mod mesh;
pub mod program;
pub mod texture;

pub use camera::{Camera, CameraMovement};
pub use entity::{Entity, Light, LightKind};
pub use material::Material;
pub use mesh::{Mesh, Model, Submesh, Vao, VertexBufferAttribute, VertexBufferLayout};
pub use program::{Program, VertexShaderAttribute, VertexShaderLayout};
pub use texture::Texture;
