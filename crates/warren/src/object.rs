//! Addressable entities of an environment.

use std::fmt;
use std::sync::Arc;

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use warren_physics::{Action, PhysicsError, PhysicsWorld, RigidBodyComponent};
use warren_render::{DrawItem, Model, Texture};

use crate::info::ObjectInfo;

/// Handle of an object inside one environment. Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Value stored as `user_data` on the object's body and collider.
    pub fn collision_id(self) -> u128 {
        u128::from(self.0)
    }

    /// Inverse of [`collision_id`](Self::collision_id).
    pub fn from_collision_id(tag: u128) -> Option<Self> {
        u32::try_from(tag).ok().map(Self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What role an object plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Walls, floors, props and loose dynamic bodies.
    Stage,
    /// The player-controlled body.
    Agent,
}

/// Rotation of `angle` radians around +Y.
pub fn yaw_rotation(angle: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle)
}

/// One placed entity: a rigid body plus what to draw for it.
#[derive(Debug)]
pub struct EnvironmentObject {
    id: ObjectId,
    kind: ObjectKind,
    body: RigidBodyComponent,
    detect_collision: bool,
    model: Option<Arc<Model>>,
    scale: Vector3<f32>,
}

impl EnvironmentObject {
    pub(crate) fn new(
        id: ObjectId,
        kind: ObjectKind,
        body: RigidBodyComponent,
        detect_collision: bool,
        model: Option<Arc<Model>>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            id,
            kind,
            body,
            detect_collision,
            model,
            scale,
        }
    }

    /// Object id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Id carried by contacts involving this object.
    pub fn collision_id(&self) -> u128 {
        self.body.collision_id()
    }

    /// Role of the object.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// `true` for the agent.
    pub fn is_agent(&self) -> bool {
        self.kind == ObjectKind::Agent
    }

    /// `true` if contacts of this object are reported after each step.
    pub fn detects_collision(&self) -> bool {
        self.detect_collision
    }

    /// Mass given at creation; zero for static objects.
    pub fn mass(&self) -> f32 {
        self.body.mass()
    }

    /// Drawable model, if the object is rendered.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_deref()
    }

    /// Render scale applied on top of the body transform.
    pub fn scale(&self) -> &Vector3<f32> {
        &self.scale
    }

    /// Current world transform.
    pub fn transform(&self, world: &PhysicsWorld) -> Option<Isometry3<f32>> {
        self.body.transform(world)
    }

    /// Snapshot of pose and velocity.
    pub fn info(&self, world: &PhysicsWorld) -> Option<ObjectInfo> {
        let transform = self.body.transform(world)?;
        let velocity = self.body.velocity(world)?;
        Some(ObjectInfo::new(
            &transform.translation.vector,
            &velocity,
            &transform.rotation,
        ))
    }

    /// Forward an action to the body. Only the agent body reacts.
    pub(crate) fn control(&self, world: &mut PhysicsWorld, action: &Action) {
        self.body.control(world, action);
    }

    /// Teleport with velocity reset.
    pub(crate) fn locate(
        &self,
        world: &mut PhysicsWorld,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
    ) -> Result<(), PhysicsError> {
        self.body.locate(
            world,
            Isometry3::from_parts(Translation3::from(position), rotation),
        )
    }

    /// Set part textures in order. Returns how many parts were updated.
    pub(crate) fn replace_textures(&mut self, textures: Vec<Option<Arc<Texture>>>) -> usize {
        let Some(model) = self.model.as_mut() else {
            return 0;
        };
        let model = Arc::make_mut(model);
        textures
            .into_iter()
            .enumerate()
            .filter(|(index, texture)| model.set_texture(*index, texture.clone()))
            .count()
    }

    /// What to draw this frame, using the body's current transform.
    pub(crate) fn draw_item(&self, world: &PhysicsWorld) -> Option<DrawItem<'_>> {
        let model = self.model.as_deref()?;
        let body = self.body.matrix(world)?;
        Some(DrawItem {
            model,
            transform: body * Matrix4::new_nonuniform_scaling(&self.scale),
        })
    }

    /// Remove the body from the world.
    pub(crate) fn destroy(self, world: &mut PhysicsWorld) -> bool {
        self.body.destroy(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_physics::{BodyControl, CollisionShapeManager};
    use warren_render::box_mesh;

    fn stage_box(world: &mut PhysicsWorld, id: ObjectId) -> EnvironmentObject {
        let mut shapes = CollisionShapeManager::new();
        let body = RigidBodyComponent::new(
            world,
            shapes.box_shape(1.0, 1.0, 1.0).unwrap(),
            0.0,
            Isometry3::translation(0.0, 2.0, 0.0),
            id.collision_id(),
            BodyControl::Static,
        )
        .unwrap();
        let model = Model::from_mesh(box_mesh(&Vector3::new(1.0, 1.0, 1.0)), None);
        EnvironmentObject::new(
            id,
            ObjectKind::Stage,
            body,
            true,
            Some(Arc::new(model)),
            Vector3::new(1.0, 2.0, 1.0),
        )
    }

    #[test]
    fn test_collision_id_round_trip() {
        let id = ObjectId(42);
        assert_eq!(ObjectId::from_collision_id(id.collision_id()), Some(id));
        assert_eq!(ObjectId::from_collision_id(u128::MAX), None);
    }

    #[test]
    fn test_info_and_draw_item() {
        let mut world = PhysicsWorld::default();
        let obj = stage_box(&mut world, ObjectId(3));

        assert_eq!(obj.collision_id(), 3);
        assert!(!obj.is_agent());

        let info = obj.info(&world).unwrap();
        assert_eq!(info.pos, [0.0, 2.0, 0.0]);

        let item = obj.draw_item(&world).unwrap();
        // Scale is applied before the body translation.
        let top = item
            .transform
            .transform_point(&nalgebra::Point3::new(0.0, 1.0, 0.0));
        assert!((top.y - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_replace_textures_copies_shared_model() {
        let mut world = PhysicsWorld::default();
        let mut obj = stage_box(&mut world, ObjectId(0));
        let shared = obj.model.clone().unwrap();

        let tex = Arc::new(Texture::solid([1.0, 0.0, 0.0]));
        assert_eq!(obj.replace_textures(vec![Some(tex), None]), 1);

        assert!(obj.model().unwrap().parts()[0].texture.is_some());
        assert!(shared.parts()[0].texture.is_none());
    }

    #[test]
    fn test_destroy_removes_body() {
        let mut world = PhysicsWorld::default();
        let obj = stage_box(&mut world, ObjectId(1));
        assert_eq!(world.body_count(), 1);
        assert!(obj.destroy(&mut world));
        assert_eq!(world.body_count(), 0);
    }
}
