//! Rigid body component: one Rapier body plus its collider.

use nalgebra::{Isometry3, Matrix4, Vector3};
use parry3d::shape::SharedShape;
use rapier3d::dynamics::{RigidBodyBuilder, RigidBodyHandle};
use rapier3d::geometry::{ColliderBuilder, ColliderHandle};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::PhysicsError;
use crate::world::PhysicsWorld;

/// Tuning for the agent's action-to-impulse translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    /// Target speed (m/s) for a unit `move`/`strafe`.
    pub linear_velocity_rate: f32,
    /// Yaw rate (rad/s) for a unit `look`.
    pub angular_velocity_rate: f32,
    /// Largest velocity change (m/s) applied in one control call.
    pub impulse_length_limit: f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            linear_velocity_rate: 5.0,
            angular_velocity_rate: 0.5,
            impulse_length_limit: 1.0,
        }
    }
}

/// How a body reacts to actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyControl {
    /// Ignores actions (walls, floors, props).
    Static,
    /// Player-controlled body.
    Agent(AgentParams),
}

/// A body registered with a [`PhysicsWorld`].
///
/// The component only stores handles; the world owns the body. Dropping a
/// component without calling [`destroy`](Self::destroy) leaves the body in
/// the world until the world itself is cleared.
#[derive(Debug)]
pub struct RigidBodyComponent {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    collision_id: u128,
    mass: f32,
    control: BodyControl,
}

impl RigidBodyComponent {
    /// Create a body and register it with `world`.
    ///
    /// A `mass` of zero makes a fixed body. `collision_id` is stored as
    /// `user_data` on both body and collider so contacts can be mapped back
    /// to their owner.
    pub fn new(
        world: &mut PhysicsWorld,
        shape: SharedShape,
        mass: f32,
        position: Isometry3<f32>,
        collision_id: u128,
        control: BodyControl,
    ) -> Result<Self, PhysicsError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }

        let mut builder = if mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        builder = builder.position(position).user_data(collision_id);

        if let BodyControl::Agent(_) = control {
            // Agent only turns around the vertical axis and never sleeps.
            builder = builder.enabled_rotations(false, true, false).can_sleep(false);
        }

        let mut collider = ColliderBuilder::new(shape)
            .friction(0.5)
            .restitution(0.1)
            .user_data(collision_id);
        if mass > 0.0 {
            collider = collider.mass(mass);
        }

        let (body, collider) = world.insert_body(builder.build(), collider.build());

        Ok(Self {
            body,
            collider,
            collision_id,
            mass,
            control,
        })
    }

    /// Apply an action. No-op unless this is the agent body.
    pub fn control(&self, world: &mut PhysicsWorld, action: &Action) {
        let BodyControl::Agent(params) = self.control else {
            return;
        };
        let Some(body) = world.body_mut(self.body) else {
            return;
        };

        // Body space: forward is -Z, positive strafe is -X (left).
        let local = Vector3::new(-(action.strafe as f32), 0.0, -(action.forward as f32))
            * params.linear_velocity_rate;
        let target = body.rotation() * local;

        let mut diff = target - body.linvel();
        // Leave vertical motion to gravity and contacts.
        diff.y = 0.0;

        let mass = body.mass();
        let limit = params.impulse_length_limit * mass;
        let mut impulse = diff * mass;
        let length = impulse.norm();
        if length > limit && length > 0.0 {
            impulse *= limit / length;
        }

        body.apply_impulse(impulse, true);
        body.set_angvel(
            Vector3::new(0.0, action.look as f32 * params.angular_velocity_rate, 0.0),
            true,
        );
    }

    /// Teleport the body and drop any velocity it had.
    pub fn locate(
        &self,
        world: &mut PhysicsWorld,
        position: Isometry3<f32>,
    ) -> Result<(), PhysicsError> {
        let body = world.body_mut(self.body).ok_or(PhysicsError::MissingBody)?;
        body.set_position(position, true);
        body.set_linvel(Vector3::zeros(), true);
        body.set_angvel(Vector3::zeros(), true);
        body.reset_forces(true);
        body.reset_torques(true);
        Ok(())
    }

    /// Current world transform of the body.
    pub fn transform(&self, world: &PhysicsWorld) -> Option<Isometry3<f32>> {
        world.body(self.body).map(|b| *b.position())
    }

    /// Current world transform as a 4x4 matrix.
    pub fn matrix(&self, world: &PhysicsWorld) -> Option<Matrix4<f32>> {
        self.transform(world).map(|iso| iso.to_homogeneous())
    }

    /// Current linear velocity.
    pub fn velocity(&self, world: &PhysicsWorld) -> Option<Vector3<f32>> {
        world.body(self.body).map(|b| *b.linvel())
    }

    /// Remove the body (and its collider) from the world.
    pub fn destroy(self, world: &mut PhysicsWorld) -> bool {
        world.remove_body(self.body)
    }

    /// Id used to correlate contacts with the owning object.
    pub fn collision_id(&self) -> u128 {
        self.collision_id
    }

    /// Mass given at construction (zero for fixed bodies).
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Behaviour of this body.
    pub fn control_kind(&self) -> &BodyControl {
        &self.control
    }

    /// Handle of the underlying Rapier body.
    pub fn body_handle(&self) -> RigidBodyHandle {
        self.body
    }

    /// Handle of the attached collider.
    pub fn collider_handle(&self) -> ColliderHandle {
        self.collider
    }
}
