//! Error types for the environment and its configuration.

use std::path::PathBuf;

use thiserror::Error;
use warren_physics::PhysicsError;
use warren_render::{CameraId, RenderError};

use crate::object::ObjectId;

/// Errors returned by [`Environment`](crate::Environment) operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Collision shape or rigid body construction failed.
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    /// Texture, model or camera target creation failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// No object with this id is alive.
    #[error("Unknown object id {0}")]
    UnknownObject(ObjectId),

    /// No camera view with this id exists.
    #[error("Unknown camera id {0}")]
    UnknownCamera(CameraId),

    /// The operation needs an agent and none has been added.
    #[error("No agent in the environment")]
    NoAgent,

    /// An agent was added while one already exists.
    #[error("Agent already exists with id {0}")]
    AgentExists(ObjectId),

    /// The agent was passed to `remove_object`; use `remove_agent`.
    #[error("Object {0} is the agent; remove it with remove_agent")]
    AgentRemoval(ObjectId),
}

/// Errors from loading or writing an [`EnvironmentConfig`](crate::EnvironmentConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
