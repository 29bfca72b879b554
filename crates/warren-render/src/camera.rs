//! Camera views: an offscreen target plus projection parameters and a pose.

use nalgebra::{Isometry3, Matrix4, Perspective3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RenderError;
use crate::framebuffer::{DepthMap, FrameBuffer};

/// Height of the 35mm film back, in millimetres.
const FILM_HEIGHT_MM: f32 = 24.0;

/// Index of a camera view inside its owner.
pub type CameraId = usize;

/// Parameters for a new camera view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSpec {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Clear color.
    pub background: [f32; 3],
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Lens focal length in millimetres (35mm film).
    pub focal_length: f32,
    /// Edge length of the shadow map; zero disables shadows.
    pub shadow_width: u32,
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            background: [0.0, 0.0, 0.0],
            near: 0.05,
            far: 80.0,
            focal_length: 50.0,
            shadow_width: 0,
        }
    }
}

impl CameraSpec {
    /// Vertical field of view in radians: `2 * atan(12 / focal_length)`.
    pub fn fovy(&self) -> f32 {
        2.0 * (FILM_HEIGHT_MM * 0.5 / self.focal_length).atan()
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            return Err(RenderError::InvalidProjection(format!(
                "near {} / far {}",
                self.near, self.far
            )));
        }
        if !(self.focal_length > 0.0 && self.focal_length.is_finite()) {
            return Err(RenderError::InvalidProjection(format!(
                "focal length {}",
                self.focal_length
            )));
        }
        Ok(())
    }
}

/// One render target with its own projection and pose.
///
/// The camera looks down its local -Z axis with +Y up.
#[derive(Debug, Clone)]
pub struct CameraView {
    spec: CameraSpec,
    frame_buffer: FrameBuffer,
    shadow_map: Option<DepthMap>,
    pose: Isometry3<f32>,
}

impl CameraView {
    /// Allocate the frame buffer (and shadow map, if requested).
    pub fn new(spec: CameraSpec) -> Result<Self, RenderError> {
        spec.validate()?;
        let frame_buffer = FrameBuffer::new(spec.width, spec.height)?;
        let shadow_map = match spec.shadow_width {
            0 => None,
            size => Some(DepthMap::new(size)?),
        };
        debug!(
            width = spec.width,
            height = spec.height,
            shadows = shadow_map.is_some(),
            "created camera view"
        );
        Ok(Self {
            spec,
            frame_buffer,
            shadow_map,
            pose: Isometry3::identity(),
        })
    }

    /// Creation parameters.
    pub fn spec(&self) -> &CameraSpec {
        &self.spec
    }

    /// Current camera-to-world pose.
    pub fn pose(&self) -> &Isometry3<f32> {
        &self.pose
    }

    /// Place the camera.
    pub fn set_pose(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) {
        self.pose = Isometry3::from_parts(Translation3::from(position), rotation);
    }

    /// World-to-camera matrix.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.pose.inverse().to_homogeneous()
    }

    /// OpenGL-style perspective projection.
    pub fn projection(&self) -> Perspective3<f32> {
        Perspective3::new(
            self.spec.aspect(),
            self.spec.fovy(),
            self.spec.near,
            self.spec.far,
        )
    }

    /// Projection times view.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection().as_matrix() * self.view_matrix()
    }

    /// Rendered color target.
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    /// Color target and shadow map, borrowed together for a render pass.
    pub(crate) fn targets_mut(&mut self) -> (&mut FrameBuffer, Option<&mut DepthMap>) {
        (&mut self.frame_buffer, self.shadow_map.as_mut())
    }

    /// `true` when the camera renders a shadow pass.
    pub fn has_shadows(&self) -> bool {
        self.shadow_map.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_fovy_from_focal_length() {
        let spec = CameraSpec {
            focal_length: 12.0,
            ..CameraSpec::default()
        };
        assert!((spec.fovy() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_specs() {
        let zero = CameraSpec {
            width: 0,
            ..CameraSpec::default()
        };
        assert!(matches!(
            CameraView::new(zero),
            Err(RenderError::InvalidDimensions { .. })
        ));

        let clip = CameraSpec {
            near: 2.0,
            far: 1.0,
            ..CameraSpec::default()
        };
        assert!(matches!(
            CameraView::new(clip),
            Err(RenderError::InvalidProjection(_))
        ));
    }

    #[test]
    fn test_shadow_map_allocation() {
        let plain = CameraView::new(CameraSpec::default()).unwrap();
        assert!(!plain.has_shadows());

        let shadowed = CameraView::new(CameraSpec {
            shadow_width: 64,
            ..CameraSpec::default()
        })
        .unwrap();
        assert!(shadowed.has_shadows());
    }

    #[test]
    fn test_point_ahead_projects_to_center() {
        let mut cam = CameraView::new(CameraSpec::default()).unwrap();
        cam.set_pose(Vector3::new(0.0, 1.0, 5.0), UnitQuaternion::identity());

        let clip = cam.view_projection().transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!(clip.x.abs() < 1e-5);
        assert!(clip.y.abs() < 1e-5);
        assert!(clip.z > -1.0 && clip.z < 1.0);
    }
}
