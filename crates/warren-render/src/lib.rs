#![warn(missing_docs)]

//! Offscreen rendering for the warren agent sandbox.
//!
//! Everything here runs on the CPU and writes into plain byte buffers, so
//! camera frames can be produced headless and compared in tests:
//!
//! - [`CameraView`] - a frame buffer, projection parameters and a pose
//! - [`render_view`] - draws [`DrawItem`]s into a camera, with an optional
//!   shadow pass driven by the [`Light`]
//! - [`Model`] / [`TriangleMesh`] / [`Texture`] - drawable geometry
//! - [`AssetCache`] - loads texture and glTF files once per path

mod assets;
mod camera;
mod error;
mod framebuffer;
mod light;
mod mesh;
mod model;
mod raster;
mod texture;

pub use assets::AssetCache;
pub use camera::{CameraId, CameraSpec, CameraView};
pub use error::RenderError;
pub use framebuffer::{BoundFrameBuffer, DepthMap, FrameBuffer};
pub use light::Light;
pub use mesh::{box_mesh, cylinder_mesh, sphere_mesh, TessellationParams, TriangleMesh};
pub use model::{Model, ModelPart};
pub use raster::{render_view, DrawItem};
pub use texture::Texture;
