#![warn(missing_docs)]

//! warren: an embodied-agent sandbox.
//!
//! An [`Environment`] owns a Rapier physics world, a table of objects
//! addressed by [`ObjectId`], an optional agent driven by discrete
//! [`Action`]s and any number of offscreen camera views.
//!
//! # Example
//!
//! ```ignore
//! use nalgebra::{UnitQuaternion, Vector3};
//! use warren::{Action, CameraSpec, Environment, EnvironmentConfig};
//!
//! let mut env = Environment::new(EnvironmentConfig::default())?;
//! let floor = env.add_box(
//!     "",
//!     Vector3::new(10.0, 0.5, 10.0),
//!     Vector3::new(0.0, -0.5, 0.0),
//!     UnitQuaternion::identity(),
//!     0.0,
//!     false,
//! )?;
//! let camera = env.add_camera_view(CameraSpec::default())?;
//!
//! env.step(&Action::new(0, 0, 1), 4);
//! let agent = env.agent_info().unwrap();
//! env.render(camera, agent.position(), agent.rotation())?;
//! let pixels = env.frame_buffer(camera)?;
//! ```

mod config;
mod environment;
mod error;
mod info;
mod object;

pub use config::{AgentConfig, EnvironmentConfig, PhysicsConfig};
pub use environment::Environment;
pub use error::{ConfigError, EnvError};
pub use info::ObjectInfo;
pub use object::{yaw_rotation, EnvironmentObject, ObjectId, ObjectKind};

pub use warren_physics::Action;
pub use warren_render::{CameraId, CameraSpec, Light};
