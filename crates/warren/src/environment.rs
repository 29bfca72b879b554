//! The environment: physics world, object table, agent and camera views.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use tracing::{debug, trace, warn};
use warren_physics::{
    Action, BodyControl, ColliderStrategy, CollisionShapeManager, PhysicsWorld,
    RigidBodyComponent, SharedShape,
};
use warren_render::{
    box_mesh, cylinder_mesh, render_view, sphere_mesh, AssetCache, CameraId, CameraSpec,
    CameraView, Light, Model, TessellationParams, Texture, TriangleMesh,
};

use crate::config::EnvironmentConfig;
use crate::error::EnvError;
use crate::info::ObjectInfo;
use crate::object::{yaw_rotation, EnvironmentObject, ObjectId, ObjectKind};

/// Simulation sandbox with one optional agent and any number of cameras.
///
/// Objects are addressed by [`ObjectId`]s handed out by the `add_*`
/// methods. Each [`step`](Self::step) applies the action to the agent,
/// advances physics and rebuilds the set of colliding objects. Cameras are
/// drawn on demand with [`render`](Self::render).
pub struct Environment {
    config: EnvironmentConfig,
    world: PhysicsWorld,
    shapes: CollisionShapeManager,
    objects: BTreeMap<ObjectId, EnvironmentObject>,
    agent: Option<ObjectId>,
    next_obj_id: u32,
    collided_ids: BTreeSet<ObjectId>,
    cameras: Vec<CameraView>,
    follow_camera: Option<CameraId>,
    assets: AssetCache,
    light: Light,
    tessellation: TessellationParams,
}

impl Environment {
    /// Build an environment. Spawns the agent when `config.agent.spawn` is
    /// set.
    pub fn new(config: EnvironmentConfig) -> Result<Self, EnvError> {
        let [gx, gy, gz] = config.physics.gravity;
        let mut env = Self {
            world: PhysicsWorld::new(Vector3::new(gx, gy, gz)),
            shapes: CollisionShapeManager::new(),
            objects: BTreeMap::new(),
            agent: None,
            next_obj_id: 0,
            collided_ids: BTreeSet::new(),
            cameras: Vec::new(),
            follow_camera: None,
            assets: AssetCache::new(),
            light: config.light,
            tessellation: TessellationParams::default(),
            config,
        };

        if env.config.agent.spawn {
            let agent = env.config.agent;
            env.add_agent(Vector3::from(agent.position), agent.rot_y)?;
        }
        Ok(env)
    }

    /// Configuration the environment was built with.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Underlying physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Shape cache shared by every object.
    pub fn shapes(&self) -> &CollisionShapeManager {
        &self.shapes
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Add a box. An empty `texture_path` leaves it untextured.
    pub fn add_box(
        &mut self,
        texture_path: &str,
        half_extent: Vector3<f32>,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let shape = self
            .shapes
            .box_shape(half_extent.x, half_extent.y, half_extent.z)?;
        let mesh = box_mesh(&half_extent);
        self.add_primitive(texture_path, shape, mesh, pos, rot, mass, detect_collision)
    }

    /// Add a sphere.
    pub fn add_sphere(
        &mut self,
        texture_path: &str,
        radius: f32,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let shape = self.shapes.sphere_shape(radius)?;
        let mesh = sphere_mesh(radius, &self.tessellation);
        self.add_primitive(texture_path, shape, mesh, pos, rot, mass, detect_collision)
    }

    /// Add a Y-aligned cylinder of radius `half_extent.x` and half height
    /// `half_extent.y`.
    pub fn add_cylinder(
        &mut self,
        texture_path: &str,
        half_extent: Vector3<f32>,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let shape = self
            .shapes
            .cylinder_shape(half_extent.x, half_extent.y, half_extent.z)?;
        let mesh = cylinder_mesh(half_extent.x, half_extent.y, &self.tessellation);
        self.add_primitive(texture_path, shape, mesh, pos, rot, mass, detect_collision)
    }

    /// Add a glTF (`.gltf`/`.glb`) or Wavefront (`.obj`) model scaled by
    /// `scale`.
    ///
    /// Static models collide with their triangle mesh, dynamic ones with the
    /// convex hull.
    pub fn add_model(
        &mut self,
        path: &Path,
        scale: Vector3<f32>,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let model = self.assets.model(path)?;
        let collision = model.collision_mesh(&scale);
        let shape = self.shapes.mesh_shape(
            &collision.vertices,
            &collision.indices,
            ColliderStrategy::for_mass(mass),
            &path.display().to_string(),
        )?;
        self.add_object(
            ObjectKind::Stage,
            shape,
            Some(model),
            scale,
            pos,
            rot,
            mass,
            detect_collision,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn add_primitive(
        &mut self,
        texture_path: &str,
        shape: SharedShape,
        mesh: TriangleMesh,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let texture = self.texture(texture_path)?;
        let model = Arc::new(Model::from_mesh(mesh, texture));
        self.add_object(
            ObjectKind::Stage,
            shape,
            Some(model),
            Vector3::repeat(1.0),
            pos,
            rot,
            mass,
            detect_collision,
        )
    }

    /// Register a body and insert the object. The id is only consumed on
    /// success.
    #[allow(clippy::too_many_arguments)]
    fn add_object(
        &mut self,
        kind: ObjectKind,
        shape: SharedShape,
        model: Option<Arc<Model>>,
        scale: Vector3<f32>,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
        mass: f32,
        detect_collision: bool,
    ) -> Result<ObjectId, EnvError> {
        let id = ObjectId(self.next_obj_id);
        let control = match kind {
            ObjectKind::Agent => BodyControl::Agent(self.config.agent.params()),
            ObjectKind::Stage => BodyControl::Static,
        };
        let body = RigidBodyComponent::new(
            &mut self.world,
            shape,
            mass,
            Isometry3::from_parts(pos.into(), rot),
            id.collision_id(),
            control,
        )?;
        self.next_obj_id += 1;

        self.objects.insert(
            id,
            EnvironmentObject::new(id, kind, body, detect_collision, model, scale),
        );
        debug!(%id, ?kind, mass, detect_collision, "added object");
        Ok(id)
    }

    fn texture(&mut self, path: &str) -> Result<Option<Arc<Texture>>, EnvError> {
        if path.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.assets.texture(Path::new(path))?))
    }

    /// Remove an object. Unknown ids are ignored with a warning; the agent
    /// must be removed with [`remove_agent`](Self::remove_agent).
    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), EnvError> {
        if self.agent == Some(id) {
            return Err(EnvError::AgentRemoval(id));
        }
        match self.objects.remove(&id) {
            Some(object) => {
                object.destroy(&mut self.world);
                self.collided_ids.remove(&id);
                debug!(%id, "removed object");
            }
            None => warn!(%id, "remove_object: no such object"),
        }
        Ok(())
    }

    /// Teleport an object and clear its velocity.
    pub fn locate_object(
        &mut self,
        id: ObjectId,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
    ) -> Result<(), EnvError> {
        let object = self.objects.get(&id).ok_or(EnvError::UnknownObject(id))?;
        object.locate(&mut self.world, pos, rot)?;
        Ok(())
    }

    /// Replace the texture of part `i` with `paths[i]`. Every texture is
    /// loaded before any part changes.
    pub fn replace_object_textures<P: AsRef<Path>>(
        &mut self,
        id: ObjectId,
        paths: &[P],
    ) -> Result<(), EnvError> {
        if !self.objects.contains_key(&id) {
            return Err(EnvError::UnknownObject(id));
        }
        let textures = paths
            .iter()
            .map(|p| self.assets.texture(p.as_ref()).map(Some))
            .collect::<Result<Vec<_>, _>>()?;

        let object = self.objects.get_mut(&id).ok_or(EnvError::UnknownObject(id))?;
        let requested = textures.len();
        let replaced = object.replace_textures(textures);
        if replaced < requested {
            warn!(%id, requested, replaced, "more textures than model parts");
        }
        Ok(())
    }

    /// Object by id.
    pub fn object(&self, id: ObjectId) -> Option<&EnvironmentObject> {
        self.objects.get(&id)
    }

    /// Ids of all live objects, ascending.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// Number of live objects, agent included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Pose and velocity of an object.
    pub fn object_info(&self, id: ObjectId) -> Option<ObjectInfo> {
        self.objects.get(&id)?.info(&self.world)
    }

    // =========================================================================
    // Agent
    // =========================================================================

    /// Add the agent at `pos` facing `rot_y` radians around Y.
    pub fn add_agent(&mut self, pos: Vector3<f32>, rot_y: f32) -> Result<ObjectId, EnvError> {
        if let Some(id) = self.agent {
            return Err(EnvError::AgentExists(id));
        }
        let agent = self.config.agent;
        let shape = self.shapes.sphere_shape(agent.radius)?;
        let id = self.add_object(
            ObjectKind::Agent,
            shape,
            None,
            Vector3::repeat(1.0),
            pos,
            yaw_rotation(rot_y),
            agent.mass,
            false,
        )?;
        self.agent = Some(id);
        Ok(id)
    }

    /// Id of the agent, if one exists.
    pub fn agent_id(&self) -> Option<ObjectId> {
        self.agent
    }

    /// Teleport the agent and clear its velocity.
    pub fn locate_agent(&mut self, pos: Vector3<f32>, rot_y: f32) -> Result<(), EnvError> {
        let id = self.agent.ok_or(EnvError::NoAgent)?;
        self.locate_object(id, pos, yaw_rotation(rot_y))
    }

    /// Remove the agent. A follow camera stops following.
    pub fn remove_agent(&mut self) -> Result<(), EnvError> {
        let id = self.agent.take().ok_or(EnvError::NoAgent)?;
        if let Some(object) = self.objects.remove(&id) {
            object.destroy(&mut self.world);
        }
        self.collided_ids.remove(&id);
        debug!(%id, "removed agent");
        Ok(())
    }

    /// Pose and velocity of the agent.
    pub fn agent_info(&self) -> Option<ObjectInfo> {
        self.object_info(self.agent?)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Run `step_num` sub-steps of control and physics, then rebuild the
    /// collision set and move the follow camera.
    pub fn step(&mut self, action: &Action, step_num: u32) {
        let dt = self.config.physics.timestep;
        for _ in 0..step_num {
            if let Some(agent) = self.agent.and_then(|id| self.objects.get(&id)) {
                agent.control(&mut self.world, action);
            }
            self.world.advance(dt);
        }
        self.check_collision();
        self.update_follow_camera();
    }

    fn check_collision(&mut self) {
        self.collided_ids.clear();
        for (a, b) in self.world.active_contacts() {
            let (Some(a), Some(b)) = (
                ObjectId::from_collision_id(a),
                ObjectId::from_collision_id(b),
            ) else {
                continue;
            };
            for (id, other) in [(a, b), (b, a)] {
                if self.detects_collision(id)
                    && (self.agent == Some(other) || self.detects_collision(other))
                {
                    self.collided_ids.insert(id);
                }
            }
        }
        trace!(count = self.collided_ids.len(), "collision check");
    }

    fn detects_collision(&self, id: ObjectId) -> bool {
        self.objects
            .get(&id)
            .is_some_and(EnvironmentObject::detects_collision)
    }

    /// Detect-collision objects that were touching the agent or another
    /// detect-collision object after the last step.
    pub fn collided_ids(&self) -> &BTreeSet<ObjectId> {
        &self.collided_ids
    }

    // =========================================================================
    // Light
    // =========================================================================

    /// Current light.
    pub fn light(&self) -> &Light {
        &self.light
    }

    /// Replace the light used by every camera.
    pub fn set_light(&mut self, light: Light) {
        self.light = light;
    }

    // =========================================================================
    // Cameras
    // =========================================================================

    /// Allocate a camera view. Returns its id.
    pub fn add_camera_view(&mut self, spec: CameraSpec) -> Result<CameraId, EnvError> {
        let view = CameraView::new(spec)?;
        self.cameras.push(view);
        Ok(self.cameras.len() - 1)
    }

    /// Number of camera views.
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Camera view by id.
    pub fn camera(&self, camera_id: CameraId) -> Result<&CameraView, EnvError> {
        self.cameras
            .get(camera_id)
            .ok_or(EnvError::UnknownCamera(camera_id))
    }

    /// Make a camera track the agent after every step, or stop tracking.
    pub fn set_follow_camera(&mut self, camera_id: Option<CameraId>) -> Result<(), EnvError> {
        if let Some(id) = camera_id {
            self.camera(id)?;
        }
        self.follow_camera = camera_id;
        self.update_follow_camera();
        Ok(())
    }

    fn update_follow_camera(&mut self) {
        let Some(camera_id) = self.follow_camera else {
            return;
        };
        let Some(transform) = self
            .agent
            .and_then(|id| self.objects.get(&id))
            .and_then(|agent| agent.transform(&self.world))
        else {
            return;
        };
        if let Some(camera) = self.cameras.get_mut(camera_id) {
            let eye = transform.translation.vector + Vector3::y() * self.config.agent.eye_height;
            camera.set_pose(eye, transform.rotation);
        }
    }

    /// Pose a camera and draw the current world into it.
    pub fn render(
        &mut self,
        camera_id: CameraId,
        pos: Vector3<f32>,
        rot: UnitQuaternion<f32>,
    ) -> Result<(), EnvError> {
        self.cameras
            .get_mut(camera_id)
            .ok_or(EnvError::UnknownCamera(camera_id))?
            .set_pose(pos, rot);
        self.render_camera(camera_id)
    }

    /// Draw the current world into a camera from its current pose.
    pub fn render_camera(&mut self, camera_id: CameraId) -> Result<(), EnvError> {
        let camera = self
            .cameras
            .get_mut(camera_id)
            .ok_or(EnvError::UnknownCamera(camera_id))?;
        let items: Vec<_> = self
            .objects
            .values()
            .filter_map(|object| object.draw_item(&self.world))
            .collect();
        render_view(camera, &self.light, &items);
        Ok(())
    }

    /// RGB8 pixels of a camera, row 0 at the top.
    pub fn frame_buffer(&self, camera_id: CameraId) -> Result<&[u8], EnvError> {
        Ok(self.camera(camera_id)?.frame_buffer().pixels())
    }

    /// Frame buffer width in pixels.
    pub fn frame_buffer_width(&self, camera_id: CameraId) -> Result<u32, EnvError> {
        Ok(self.camera(camera_id)?.frame_buffer().width())
    }

    /// Frame buffer height in pixels.
    pub fn frame_buffer_height(&self, camera_id: CameraId) -> Result<u32, EnvError> {
        Ok(self.camera(camera_id)?.frame_buffer().height())
    }

    /// Frame buffer size in bytes (`width * height * 3`).
    pub fn frame_buffer_size(&self, camera_id: CameraId) -> Result<usize, EnvError> {
        Ok(self.camera(camera_id)?.frame_buffer().size())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Destroy every object, then cached shapes, then cameras and assets.
    /// Ids keep counting from where they were.
    pub fn release(&mut self) {
        let objects = std::mem::take(&mut self.objects);
        let count = objects.len();
        for object in objects.into_values() {
            object.destroy(&mut self.world);
        }
        self.agent = None;
        self.collided_ids.clear();
        self.world.clear();
        self.shapes.clear();
        self.follow_camera = None;
        self.cameras.clear();
        self.assets.clear();
        debug!(objects = count, "released environment");
    }
}
