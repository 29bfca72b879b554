//! Error types for rendering and asset loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading assets or creating render targets.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A frame buffer was requested with a zero dimension.
    #[error("Invalid frame buffer dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Clip planes or focal length cannot form a projection.
    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    /// Texture bytes do not match the declared size.
    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    /// Texture file could not be read or decoded.
    #[error("Failed to load texture {path}: {source}")]
    TextureLoad {
        /// Texture path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Model file could not be read or parsed.
    #[error("Failed to load model {path}: {source}")]
    ModelLoad {
        /// Model path.
        path: PathBuf,
        /// glTF error.
        #[source]
        source: gltf::Error,
    },

    /// Wavefront OBJ file could not be read or parsed.
    #[error("Failed to load OBJ model {path}: {source}")]
    ObjLoad {
        /// Model path.
        path: PathBuf,
        /// OBJ parser error.
        #[source]
        source: tobj::LoadError,
    },

    /// Model file extension is not one of `gltf`, `glb` or `obj`.
    #[error("Unsupported model format: {path}")]
    UnsupportedModel {
        /// Model path.
        path: PathBuf,
    },

    /// Model parsed but holds nothing drawable.
    #[error("Model {path} contains no triangles")]
    EmptyModel {
        /// Model path.
        path: PathBuf,
    },
}
