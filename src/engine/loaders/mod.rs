pub mod model_loader;
pub mod shader_loader;
pub mod texture_loader;
