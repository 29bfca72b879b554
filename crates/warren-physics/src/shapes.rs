//! Collision shape construction and caching.

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3, Vector3};
use parry3d::shape::{ConvexPolyhedron, SharedShape, TriMesh};
use tracing::{debug, warn};

use crate::error::PhysicsError;

/// Strategy for generating collision shapes from meshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColliderStrategy {
    /// Use convex hull (fast, approximate).
    #[default]
    ConvexHull,
    /// Use triangle mesh (accurate, only sensible for fixed bodies).
    TriMesh,
    /// Use axis-aligned bounding box (fastest, rough).
    Aabb,
}

impl ColliderStrategy {
    /// Strategy used for a model of the given mass.
    ///
    /// Fixed bodies keep the exact triangle mesh; dynamic bodies need a
    /// convex shape for stable contacts.
    pub fn for_mass(mass: f32) -> Self {
        if mass > 0.0 {
            ColliderStrategy::ConvexHull
        } else {
            ColliderStrategy::TriMesh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ShapeKey {
    Sphere(u32),
    Box([u32; 3]),
    Cylinder([u32; 3]),
}

/// Produces collision shapes and keeps every primitive it has handed out.
///
/// Primitive shapes are deduplicated by kind and exact dimensions, so two
/// requests with equal parameters share one shape. Shapes are reference
/// counted; a body holding a shape keeps it alive even after [`clear`].
///
/// [`clear`]: CollisionShapeManager::clear
#[derive(Default)]
pub struct CollisionShapeManager {
    shapes: HashMap<ShapeKey, SharedShape>,
}

impl CollisionShapeManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sphere of the given radius.
    pub fn sphere_shape(&mut self, radius: f32) -> Result<SharedShape, PhysicsError> {
        check_dims("sphere", &[radius])?;
        Ok(self
            .shapes
            .entry(ShapeKey::Sphere(radius.to_bits()))
            .or_insert_with(|| SharedShape::ball(radius))
            .clone())
    }

    /// Box with the given half extents.
    pub fn box_shape(
        &mut self,
        half_extent_x: f32,
        half_extent_y: f32,
        half_extent_z: f32,
    ) -> Result<SharedShape, PhysicsError> {
        check_dims("box", &[half_extent_x, half_extent_y, half_extent_z])?;
        let key = ShapeKey::Box([
            half_extent_x.to_bits(),
            half_extent_y.to_bits(),
            half_extent_z.to_bits(),
        ]);
        Ok(self
            .shapes
            .entry(key)
            .or_insert_with(|| SharedShape::cuboid(half_extent_x, half_extent_y, half_extent_z))
            .clone())
    }

    /// Y-aligned cylinder: `half_extent_x` is the radius, `half_extent_y` the
    /// half height. `half_extent_z` only takes part in the cache key.
    pub fn cylinder_shape(
        &mut self,
        half_extent_x: f32,
        half_extent_y: f32,
        half_extent_z: f32,
    ) -> Result<SharedShape, PhysicsError> {
        check_dims("cylinder", &[half_extent_x, half_extent_y, half_extent_z])?;
        let key = ShapeKey::Cylinder([
            half_extent_x.to_bits(),
            half_extent_y.to_bits(),
            half_extent_z.to_bits(),
        ]);
        Ok(self
            .shapes
            .entry(key)
            .or_insert_with(|| SharedShape::cylinder(half_extent_y, half_extent_x))
            .clone())
    }

    /// Build a shape from a flat triangle mesh (`[x0, y0, z0, x1, ...]`).
    ///
    /// Mesh shapes are not cached; models are cached one level up by path.
    pub fn mesh_shape(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        strategy: ColliderStrategy,
        name: &str,
    ) -> Result<SharedShape, PhysicsError> {
        mesh_to_collider(vertices, indices, strategy, name)
    }

    /// Number of cached primitive shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// `true` if no primitive has been produced yet.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Release every cached primitive.
    pub fn clear(&mut self) {
        debug!(count = self.shapes.len(), "releasing collision shapes");
        self.shapes.clear();
    }
}

fn check_dims(kind: &'static str, dims: &[f32]) -> Result<(), PhysicsError> {
    if dims.iter().all(|d| d.is_finite() && *d > 0.0) {
        Ok(())
    } else {
        Err(PhysicsError::InvalidShape {
            kind,
            dims: dims.to_vec(),
        })
    }
}

/// Generate a collision shape from a flat triangle mesh.
pub fn mesh_to_collider(
    vertices: &[f32],
    indices: &[u32],
    strategy: ColliderStrategy,
    name: &str,
) -> Result<SharedShape, PhysicsError> {
    if vertices.is_empty() || indices.is_empty() {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Empty mesh".to_string(),
        });
    }

    match strategy {
        ColliderStrategy::ConvexHull => create_convex_hull(vertices, name),
        ColliderStrategy::TriMesh => create_trimesh(vertices, indices, name),
        ColliderStrategy::Aabb => create_aabb(vertices, name),
    }
}

fn points(vertices: &[f32]) -> Vec<Point3<f32>> {
    vertices
        .chunks_exact(3)
        .map(|v| Point3::new(v[0], v[1], v[2]))
        .collect()
}

fn create_convex_hull(vertices: &[f32], name: &str) -> Result<SharedShape, PhysicsError> {
    let points = points(vertices);

    if points.len() < 4 {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Need at least 4 points for convex hull".to_string(),
        });
    }

    match ConvexPolyhedron::from_convex_hull(&points) {
        Some(hull) => Ok(SharedShape::new(hull)),
        None => {
            warn!(name, "degenerate convex hull, falling back to bounding box");
            create_aabb(vertices, name)
        }
    }
}

fn create_trimesh(vertices: &[f32], indices: &[u32], name: &str) -> Result<SharedShape, PhysicsError> {
    let vertices = points(vertices);
    let num_vertices = vertices.len() as u32;

    let indices: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|i| [i[0], i[1], i[2]])
        .collect();

    if indices.is_empty() {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "No triangles in mesh".to_string(),
        });
    }
    if indices.iter().flatten().any(|&i| i >= num_vertices) {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Triangle index out of range".to_string(),
        });
    }

    match TriMesh::new(vertices, indices) {
        Ok(trimesh) => Ok(SharedShape::new(trimesh)),
        Err(e) => Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: format!("Failed to create trimesh: {:?}", e),
        }),
    }
}

fn create_aabb(vertices: &[f32], name: &str) -> Result<SharedShape, PhysicsError> {
    let mut min = Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);

    for v in vertices.chunks_exact(3) {
        min.x = min.x.min(v[0]);
        min.y = min.y.min(v[1]);
        min.z = min.z.min(v[2]);
        max.x = max.x.max(v[0]);
        max.y = max.y.max(v[1]);
        max.z = max.z.max(v[2]);
    }

    // Flat meshes still need some thickness to collide.
    let half_extents = ((max - min) / 2.0).map(|h| h.max(1.0e-3));
    if !half_extents.iter().all(|h| h.is_finite()) {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Mesh has no finite vertices".to_string(),
        });
    }

    let cuboid = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
    let center = (min + max) / 2.0;
    if center.norm_squared() <= f32::EPSILON {
        return Ok(cuboid);
    }
    // Keep the box where the mesh is rather than on the body origin.
    Ok(SharedShape::compound(vec![(
        Isometry3::translation(center.x, center.y, center.z),
        cuboid,
    )]))
}
