use std::path::PathBuf;

/// A loaded 2D texture. Identity is the source path; the texture table is
/// deduplicated on it, so two loads of the same file share one handle.
#[derive(Debug, Clone)]
pub struct Texture {
    pub handle: glow::Texture,
    pub filepath: PathBuf,
}
