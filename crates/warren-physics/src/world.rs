//! Physics world management using Rapier3d.

use nalgebra::Vector3;
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet, RigidBody,
    RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, Collider, ColliderHandle, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};
use tracing::debug;

/// Default gravity, Y up.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Physics simulation world.
///
/// Owns every Rapier set; bodies are only ever referred to by handle from
/// outside. Dropping the world releases bodies and colliders together with
/// the solver state.
pub struct PhysicsWorld {
    // Rapier components
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create an empty physics world with the given gravity.
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity,
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Step the physics simulation by dt seconds.
    pub fn advance(&mut self, dt: f32) {
        self.integration_params.dt = dt;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Register a body together with its single collider.
    pub fn insert_body(
        &mut self,
        body: RigidBody,
        collider: Collider,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body_handle = self.bodies.insert(body);
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        (body_handle, collider_handle)
    }

    /// Unregister a body and its attached colliders.
    ///
    /// Returns `false` if the handle was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Remove every body, collider and joint.
    ///
    /// Bodies go first so no collider or joint outlives its parent.
    pub fn clear(&mut self) {
        let handles: Vec<RigidBodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
        debug!(bodies = handles.len(), "clearing physics world");
        for handle in handles {
            self.remove_body(handle);
        }
    }

    /// Borrow a body.
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutably borrow a body.
    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Number of registered bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Collision ids (collider `user_data`) of every collider pair that is
    /// currently in active contact.
    pub fn active_contacts(&self) -> Vec<(u128, u128)> {
        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter_map(|pair| {
                let a = self.colliders.get(pair.collider1)?;
                let b = self.colliders.get(pair.collider2)?;
                Some((a.user_data, b.user_data))
            })
            .collect()
    }

    /// Current gravity vector.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vector3::new(x, y, z);
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        let [x, y, z] = DEFAULT_GRAVITY;
        Self::new(Vector3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Isometry3;
    use rapier3d::dynamics::RigidBodyBuilder;
    use rapier3d::geometry::ColliderBuilder;

    fn ball_at(world: &mut PhysicsWorld, y: f32, tag: u128) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(Isometry3::translation(0.0, y, 0.0))
            .build();
        let collider = ColliderBuilder::ball(0.5).user_data(tag).build();
        world.insert_body(body, collider).0
    }

    #[test]
    fn test_body_falls() {
        let mut world = PhysicsWorld::default();
        let handle = ball_at(&mut world, 5.0, 1);

        for _ in 0..10 {
            world.advance(1.0 / 60.0);
        }

        let y = world.body(handle).unwrap().translation().y;
        assert!(y < 5.0);
    }

    #[test]
    fn test_remove_body() {
        let mut world = PhysicsWorld::default();
        let handle = ball_at(&mut world, 0.0, 1);
        assert_eq!(world.body_count(), 1);

        assert!(world.remove_body(handle));
        assert!(!world.remove_body(handle));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_active_contacts() {
        let mut world = PhysicsWorld::new(Vector3::zeros());
        ball_at(&mut world, 0.0, 7);
        ball_at(&mut world, 0.5, 9);

        world.advance(1.0 / 60.0);

        let contacts = world.active_contacts();
        assert_eq!(contacts.len(), 1);
        let (a, b) = contacts[0];
        assert_eq!(a.min(b), 7);
        assert_eq!(a.max(b), 9);
    }

    #[test]
    fn test_clear() {
        let mut world = PhysicsWorld::default();
        ball_at(&mut world, 0.0, 1);
        ball_at(&mut world, 3.0, 2);
        world.clear();
        assert_eq!(world.body_count(), 0);
        world.advance(1.0 / 60.0);
        assert!(world.active_contacts().is_empty());
    }
}
