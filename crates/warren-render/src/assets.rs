//! Path-keyed cache of loaded textures and models.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::RenderError;
use crate::model::Model;
use crate::texture::Texture;

/// Loads each texture and model file once and hands out shared handles.
#[derive(Debug, Default)]
pub struct AssetCache {
    textures: HashMap<PathBuf, Arc<Texture>>,
    models: HashMap<PathBuf, Arc<Model>>,
}

impl AssetCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture at `path`, loading it on first use.
    pub fn texture(&mut self, path: &Path) -> Result<Arc<Texture>, RenderError> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }
        let texture = Arc::new(Texture::load(path)?);
        debug!(path = %path.display(), "cached texture");
        self.textures.insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    /// Model at `path`, loading it on first use.
    pub fn model(&mut self, path: &Path) -> Result<Arc<Model>, RenderError> {
        if let Some(model) = self.models.get(path) {
            return Ok(model.clone());
        }
        let model = Arc::new(Model::load(path)?);
        debug!(path = %path.display(), "cached model");
        self.models.insert(path.to_path_buf(), model.clone());
        Ok(model)
    }

    /// Number of cached textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of cached models.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Drop every cached asset. Handles already given out stay valid.
    pub fn clear(&mut self) {
        self.textures.clear();
        self.models.clear();
    }
}
