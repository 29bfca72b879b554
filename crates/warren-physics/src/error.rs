//! Error types for the physics layer.

use thiserror::Error;

/// Errors that can occur while building physics objects.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Failed to create collision shape.
    #[error("Failed to create collision shape for {name}: {reason}")]
    CollisionShape {
        /// Object or asset name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// A primitive shape was requested with unusable dimensions.
    #[error("Invalid {kind} dimensions: {dims:?}")]
    InvalidShape {
        /// Shape kind ("sphere", "box", "cylinder").
        kind: &'static str,
        /// The offending dimensions.
        dims: Vec<f32>,
    },

    /// Mass must be finite and non-negative.
    #[error("Invalid mass: {0}")]
    InvalidMass(f32),

    /// A body handle no longer refers to a live body.
    #[error("Rigid body is not registered with the physics world")]
    MissingBody,
}
