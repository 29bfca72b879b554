//! Environment configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! [physics]
//! gravity = [0.0, -9.81, 0.0]
//! timestep = 0.016666668
//!
//! [agent]
//! spawn = true
//! radius = 1.0
//! position = [0.0, 1.0, 0.0]
//!
//! [light]
//! dir = [-0.5, -1.0, -0.4]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use warren_physics::{AgentParams, DEFAULT_GRAVITY};
use warren_render::Light;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Simulation settings.
    pub physics: PhysicsConfig,
    /// Agent body and control settings.
    pub agent: AgentConfig,
    /// Initial light.
    pub light: Light,
}

impl EnvironmentConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Physics world settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector, Y up.
    pub gravity: [f32; 3],
    /// Fixed sub-step length in seconds.
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            timestep: 1.0 / 60.0,
        }
    }
}

/// Agent settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Create the agent when the environment is built.
    pub spawn: bool,
    /// Radius of the agent's sphere.
    pub radius: f32,
    /// Agent mass.
    pub mass: f32,
    /// Spawn position.
    pub position: [f32; 3],
    /// Spawn heading around Y, in radians.
    pub rot_y: f32,
    /// Target speed for a unit move/strafe.
    pub linear_velocity_rate: f32,
    /// Yaw rate for a unit look.
    pub angular_velocity_rate: f32,
    /// Largest velocity change per control call.
    pub impulse_length_limit: f32,
    /// Height of the follow camera above the agent center.
    pub eye_height: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let params = AgentParams::default();
        Self {
            spawn: true,
            radius: 1.0,
            mass: 1.0,
            position: [0.0, 1.0, 0.0],
            rot_y: 0.0,
            linear_velocity_rate: params.linear_velocity_rate,
            angular_velocity_rate: params.angular_velocity_rate,
            impulse_length_limit: params.impulse_length_limit,
            eye_height: 0.0,
        }
    }
}

impl AgentConfig {
    /// Control tuning for the agent body.
    pub fn params(&self) -> AgentParams {
        AgentParams {
            linear_velocity_rate: self.linear_velocity_rate,
            angular_velocity_rate: self.angular_velocity_rate,
            impulse_length_limit: self.impulse_length_limit,
        }
    }
}
