//! Read-only snapshots of object state.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Position, velocity and orientation of one object at the time of the
/// query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// World position.
    pub pos: [f32; 3],
    /// Linear velocity.
    pub velocity: [f32; 3],
    /// Orientation quaternion as `(x, y, z, w)`.
    pub rot: [f32; 4],
}

impl ObjectInfo {
    pub(crate) fn new(
        position: &Vector3<f32>,
        velocity: &Vector3<f32>,
        rotation: &UnitQuaternion<f32>,
    ) -> Self {
        let q = rotation.quaternion();
        Self {
            pos: [position.x, position.y, position.z],
            velocity: [velocity.x, velocity.y, velocity.z],
            rot: [q.i, q.j, q.k, q.w],
        }
    }

    /// Heading around Y: `atan2(q.y, q.w) * 2`.
    pub fn rot_y(&self) -> f32 {
        self.rot[1].atan2(self.rot[3]) * 2.0
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector3<f32> {
        Vector3::from(self.pos)
    }

    /// Orientation as a unit quaternion.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        let [x, y, z, w] = self.rot;
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z))
    }
}
