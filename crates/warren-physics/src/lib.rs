#![warn(missing_docs)]

//! Rigid-body layer for the warren agent sandbox, built on Rapier3d.
//!
//! This crate owns everything the environment needs from the physics
//! engine:
//!
//! - [`PhysicsWorld`] - the Rapier pipeline and every body/collider set
//! - [`CollisionShapeManager`] - cached primitive shapes and mesh colliders
//! - [`RigidBodyComponent`] - one body with a tagged [`BodyControl`]
//! - [`Action`] - the discrete agent command consumed by agent bodies
//!
//! # Example
//!
//! ```ignore
//! use nalgebra::Isometry3;
//! use warren_physics::{Action, AgentParams, BodyControl, CollisionShapeManager, PhysicsWorld, RigidBodyComponent};
//!
//! let mut world = PhysicsWorld::default();
//! let mut shapes = CollisionShapeManager::new();
//! let agent = RigidBodyComponent::new(
//!     &mut world,
//!     shapes.sphere_shape(1.0)?,
//!     1.0,
//!     Isometry3::translation(0.0, 1.0, 0.0),
//!     0,
//!     BodyControl::Agent(AgentParams::default()),
//! )?;
//!
//! agent.control(&mut world, &Action::new(0, 0, 1));
//! world.advance(1.0 / 60.0);
//! ```

mod action;
mod body;
mod error;
mod shapes;
mod world;

pub use action::Action;
pub use body::{AgentParams, BodyControl, RigidBodyComponent};
pub use error::PhysicsError;
pub use shapes::{mesh_to_collider, ColliderStrategy, CollisionShapeManager};
pub use world::{PhysicsWorld, DEFAULT_GRAVITY};

pub use parry3d::shape::SharedShape;
