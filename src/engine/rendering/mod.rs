pub mod gbuffer;
pub mod renderer;
