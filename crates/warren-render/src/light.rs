//! Directional light.

use nalgebra::{Matrix4, Orthographic3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A single directional light with ambient term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    /// Direction the light travels in (need not be normalized).
    pub dir: [f32; 3],
    /// Diffuse color.
    pub color: [f32; 3],
    /// Ambient color added to every fragment.
    pub ambient: [f32; 3],
    /// Fraction of the diffuse term kept for shadowed fragments.
    pub shadow_rate: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            dir: [-0.5, -1.0, -0.4],
            color: [1.0, 1.0, 1.0],
            ambient: [0.4, 0.4, 0.4],
            shadow_rate: 0.2,
        }
    }
}

impl Light {
    /// Normalized light direction. Falls back to straight down for a zero
    /// vector.
    pub fn direction(&self) -> Vector3<f32> {
        Vector3::from(self.dir)
            .try_normalize(1.0e-9)
            .unwrap_or_else(|| -Vector3::y())
    }

    /// Lit color for a texel: `texel * (ambient + color * max(0, n . -dir) * s)`
    /// with `s = 1` when lit and `shadow_rate` in shadow.
    pub fn shade(&self, texel: [f32; 3], normal: &Vector3<f32>, in_shadow: bool) -> [f32; 3] {
        let lambert = normal.dot(&-self.direction()).max(0.0);
        let s = if in_shadow { self.shadow_rate } else { 1.0 };
        std::array::from_fn(|i| texel[i] * (self.ambient[i] + self.color[i] * lambert * s))
    }

    /// Orthographic view-projection of the light that covers a sphere of
    /// `radius` around `center`.
    pub fn shadow_matrix(&self, center: &Point3<f32>, radius: f32) -> Matrix4<f32> {
        let radius = radius.max(1.0e-3);
        let dir = self.direction();
        let eye = center - dir * (radius * 2.0);
        let up = if dir.y.abs() > 0.99 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let view = Matrix4::look_at_rh(&eye, center, &up);
        let proj = Orthographic3::new(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);
        proj.as_matrix() * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let light = Light::default();
        assert_eq!(light.dir, [-0.5, -1.0, -0.4]);
        assert!((light.shadow_rate - 0.2).abs() < 1e-6);
        assert!((light.direction().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shade_facing_and_shadowed() {
        let light = Light {
            dir: [0.0, -1.0, 0.0],
            ..Light::default()
        };
        let up = Vector3::y();

        let lit = light.shade([1.0, 1.0, 1.0], &up, false);
        assert!((lit[0] - 1.4).abs() < 1e-6);

        let shadowed = light.shade([1.0, 1.0, 1.0], &up, true);
        assert!((shadowed[0] - 0.6).abs() < 1e-6);

        let back = light.shade([1.0, 1.0, 1.0], &-up, false);
        assert!((back[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_shadow_matrix_centers_scene() {
        let light = Light::default();
        let center = Point3::new(1.0, 2.0, 3.0);
        let m = light.shadow_matrix(&center, 10.0);
        let p = m.transform_point(&center);
        assert!(p.x.abs() < 1e-4);
        assert!(p.y.abs() < 1e-4);
        assert!(p.z > -1.0 && p.z < 1.0);
    }
}
