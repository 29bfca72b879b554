//! Scanline-free half-space rasterizer.
//!
//! Triangles are transformed to clip space, clipped against the near plane
//! and filled with perspective-correct attribute interpolation. A camera
//! with a shadow map first renders the scene depth from the light.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
use tracing::trace;

use crate::camera::CameraView;
use crate::framebuffer::DepthMap;
use crate::light::Light;
use crate::model::Model;

/// Smallest shadow bias, in world units.
const MIN_SHADOW_BIAS: f32 = 0.05;

/// A model placed in the world for one frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    /// What to draw.
    pub model: &'a Model,
    /// Model-to-world transform, scale included.
    pub transform: Matrix4<f32>,
}

/// Draw `items` into the camera's frame buffer.
///
/// The frame buffer is bound for the duration of the call and cleared to
/// the camera background first.
pub fn render_view(camera: &mut CameraView, light: &Light, items: &[DrawItem<'_>]) {
    let view_projection = camera.view_projection();
    let background = camera.spec().background;
    let (frame_buffer, shadow_map) = camera.targets_mut();

    let mut target = frame_buffer.bind();
    target.clear(background);
    let (width, height) = (target.width(), target.height());

    let mut shadow = None;
    if let Some(map) = shadow_map {
        map.clear();
        if let Some((center, radius)) = scene_bounds(items) {
            let matrix = light.shadow_matrix(&center, radius);
            shadow_pass(map, &matrix, items);
            let map: &DepthMap = map;
            let texel = 2.0 * radius / map.size() as f32;
            shadow = Some(ShadowLookup {
                matrix,
                map,
                // World-space bias mapped into light NDC depth.
                bias: MIN_SHADOW_BIAS.max(1.5 * texel) * 2.0 / (3.0 * radius),
            });
        }
    }

    let mut triangles = 0usize;
    for item in items {
        let normal_matrix = normal_matrix(&item.transform);
        for part in item.model.parts() {
            let mesh = &part.mesh;
            for tri in mesh.indices.chunks_exact(3) {
                let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
                if corners.iter().any(|&i| i >= mesh.num_vertices()) {
                    continue;
                }
                let verts = corners.map(|i| {
                    let world = item
                        .transform
                        .transform_point(&Point3::from(mesh.position(i)))
                        .coords;
                    ClipVertex {
                        clip: view_projection * world.push(1.0),
                        world,
                        normal: normal_matrix * mesh.normal(i),
                        uv: mesh.uv(i),
                    }
                });

                let polygon = clip_near(&verts);
                if polygon.len() < 3 {
                    continue;
                }
                triangles += 1;

                for k in 1..polygon.len() - 1 {
                    let fan = [polygon[0], polygon[k], polygon[k + 1]];
                    let screen = fan.map(|v| to_screen(&v.clip, width, height));
                    rasterize(&screen, width, height, |x, y, depth, bary| {
                        if !(-1.0..=1.0).contains(&depth) || depth >= target.depth_at(x, y) {
                            return;
                        }
                        let v = ClipVertex::blend(&fan, bary);
                        let texel = match &part.texture {
                            Some(texture) => texture.sample(v.uv[0], v.uv[1]),
                            None => [1.0, 1.0, 1.0],
                        };
                        let albedo = std::array::from_fn(|c| texel[c] * part.base_color[c]);
                        let normal = v.normal.try_normalize(1.0e-12).unwrap_or_else(Vector3::y);
                        let in_shadow = shadow.as_ref().is_some_and(|s| s.in_shadow(&v.world));
                        target.write(x, y, depth, light.shade(albedo, &normal, in_shadow));
                    });
                }
            }
        }
    }

    trace!(items = items.len(), triangles, "rendered view");
}

/// Vertex after the model-view-projection transform.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vector4<f32>,
    world: Vector3<f32>,
    normal: Vector3<f32>,
    uv: [f32; 2],
}

impl ClipVertex {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(&other.clip, t),
            world: self.world.lerp(&other.world, t),
            normal: self.normal.lerp(&other.normal, t),
            uv: [
                self.uv[0] + (other.uv[0] - self.uv[0]) * t,
                self.uv[1] + (other.uv[1] - self.uv[1]) * t,
            ],
        }
    }

    fn blend(verts: &[Self; 3], w: [f32; 3]) -> Self {
        Self {
            clip: verts[0].clip * w[0] + verts[1].clip * w[1] + verts[2].clip * w[2],
            world: verts[0].world * w[0] + verts[1].world * w[1] + verts[2].world * w[2],
            normal: verts[0].normal * w[0] + verts[1].normal * w[1] + verts[2].normal * w[2],
            uv: [
                verts[0].uv[0] * w[0] + verts[1].uv[0] * w[1] + verts[2].uv[0] * w[2],
                verts[0].uv[1] * w[0] + verts[1].uv[1] * w[1] + verts[2].uv[1] * w[2],
            ],
        }
    }
}

/// Pixel-space vertex: `x`/`y` in pixels (y down), NDC depth, `1 / w`.
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
    inv_w: f32,
}

fn to_screen(clip: &Vector4<f32>, width: u32, height: u32) -> ScreenVertex {
    let inv_w = 1.0 / clip.w;
    ScreenVertex {
        x: (clip.x * inv_w * 0.5 + 0.5) * width as f32,
        y: (0.5 - clip.y * inv_w * 0.5) * height as f32,
        z: clip.z * inv_w,
        inv_w,
    }
}

/// Clip a triangle against the near plane (`z + w >= 0`). Returns a convex
/// polygon with 0, 3 or 4 vertices.
fn clip_near(tri: &[ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = &tri[i];
        let b = &tri[(i + 1) % 3];
        let da = a.clip.z + a.clip.w;
        let db = b.clip.z + b.clip.w;
        if da >= 0.0 {
            out.push(*a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            out.push(a.lerp(b, da / (da - db)));
        }
    }
    out
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Visit every pixel whose center lies inside the triangle. The callback
/// receives the interpolated depth and perspective-correct barycentrics.
fn rasterize(
    v: &[ScreenVertex; 3],
    width: u32,
    height: u32,
    mut fragment: impl FnMut(u32, u32, f32, [f32; 3]),
) {
    let area = edge(&v[0], &v[1], v[2].x, v[2].y);
    if !area.is_finite() || area.abs() < 1.0e-12 {
        return;
    }

    let min_x = v.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = v.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(width as f32) as u32;
    let min_y = v.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_y = v.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(height as f32) as u32;

    for y in min_y..max_y {
        let py = y as f32 + 0.5;
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let w0 = edge(&v[1], &v[2], px, py) / area;
            let w1 = edge(&v[2], &v[0], px, py) / area;
            let w2 = edge(&v[0], &v[1], px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = w0 * v[0].z + w1 * v[1].z + w2 * v[2].z;
            let p = [w0 * v[0].inv_w, w1 * v[1].inv_w, w2 * v[2].inv_w];
            let sum = p[0] + p[1] + p[2];
            if sum <= 0.0 {
                continue;
            }
            fragment(x, y, depth, p.map(|c| c / sum));
        }
    }
}

fn normal_matrix(transform: &Matrix4<f32>) -> Matrix3<f32> {
    transform
        .fixed_view::<3, 3>(0, 0)
        .into_owned()
        .try_inverse()
        .map(|m| m.transpose())
        .unwrap_or_else(Matrix3::identity)
}

/// Bounding sphere (center, radius) of every transformed vertex.
fn scene_bounds(items: &[DrawItem<'_>]) -> Option<(Point3<f32>, f32)> {
    let mut min = Vector3::repeat(f32::INFINITY);
    let mut max = Vector3::repeat(f32::NEG_INFINITY);
    let mut any = false;

    for item in items {
        for part in item.model.parts() {
            for i in 0..part.mesh.num_vertices() {
                let p = item
                    .transform
                    .transform_point(&Point3::from(part.mesh.position(i)));
                min = min.inf(&p.coords);
                max = max.sup(&p.coords);
                any = true;
            }
        }
    }

    if !any {
        return None;
    }
    let center = Point3::from((min + max) * 0.5);
    Some((center, ((max - min) * 0.5).norm()))
}

fn shadow_pass(map: &mut DepthMap, matrix: &Matrix4<f32>, items: &[DrawItem<'_>]) {
    let size = map.size();
    for item in items {
        for part in item.model.parts() {
            let mesh = &part.mesh;
            for tri in mesh.indices.chunks_exact(3) {
                if tri.iter().any(|&i| i as usize >= mesh.num_vertices()) {
                    continue;
                }
                let screen = [tri[0], tri[1], tri[2]].map(|i| {
                    let world = item
                        .transform
                        .transform_point(&Point3::from(mesh.position(i as usize)));
                    to_screen(&(matrix * world.to_homogeneous()), size, size)
                });
                rasterize(&screen, size, size, |x, y, depth, _| {
                    map.write_min(x, y, depth);
                });
            }
        }
    }
}

struct ShadowLookup<'a> {
    matrix: Matrix4<f32>,
    map: &'a DepthMap,
    bias: f32,
}

impl ShadowLookup<'_> {
    fn in_shadow(&self, world: &Vector3<f32>) -> bool {
        let p = self.matrix.transform_point(&Point3::from(*world));
        let size = self.map.size() as f32;
        let u = (p.x * 0.5 + 0.5) * size;
        let v = (0.5 - p.y * 0.5) * size;
        if u < 0.0 || v < 0.0 || u >= size || v >= size || p.z > 1.0 {
            return false;
        }
        p.z - self.bias > self.map.get(u as u32, v as u32)
    }
}
