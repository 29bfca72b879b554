//! Triangle meshes and primitive mesh generation.

use std::f32::consts::PI;

use nalgebra::Vector3;

/// Triangle mesh for rendering and collision.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
    /// Flat array of vertex normals. Same length as vertices.
    pub normals: Vec<f32>,
    /// Flat array of texture coordinates `[u0, v0, ...]`, v = 0 at the top
    /// row of the image. Empty when the mesh is untextured.
    pub uvs: Vec<f32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Position of vertex `i`.
    pub fn position(&self, i: usize) -> Vector3<f32> {
        Vector3::new(
            self.vertices[i * 3],
            self.vertices[i * 3 + 1],
            self.vertices[i * 3 + 2],
        )
    }

    /// Normal of vertex `i`, or +Y if the mesh has no normals.
    pub fn normal(&self, i: usize) -> Vector3<f32> {
        if self.normals.len() < (i + 1) * 3 {
            return Vector3::y();
        }
        Vector3::new(self.normals[i * 3], self.normals[i * 3 + 1], self.normals[i * 3 + 2])
    }

    /// Texture coordinate of vertex `i`, or `(0, 0)` if the mesh has none.
    pub fn uv(&self, i: usize) -> [f32; 2] {
        if self.uvs.len() < (i + 1) * 2 {
            return [0.0, 0.0];
        }
        [self.uvs[i * 2], self.uvs[i * 2 + 1]]
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices
            .extend(other.indices.iter().map(|&i| i + offset));
    }

    /// Recompute smooth vertex normals from triangle areas.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.num_vertices()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let n = (self.position(b) - self.position(a)).cross(&(self.position(c) - self.position(a)));
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }

        self.normals.clear();
        for n in acc {
            let n = n.try_normalize(1.0e-12).unwrap_or_else(Vector3::y);
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
    }

    /// Copy of the mesh with every position multiplied component-wise by
    /// `scale`.
    pub fn scaled(&self, scale: &Vector3<f32>) -> TriangleMesh {
        let mut mesh = self.clone();
        for v in mesh.vertices.chunks_exact_mut(3) {
            v[0] *= scale.x;
            v[1] *= scale.y;
            v[2] *= scale.z;
        }
        mesh
    }

    fn push_vertex(&mut self, p: Vector3<f32>, n: Vector3<f32>, uv: [f32; 2]) -> u32 {
        let index = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&[p.x, p.y, p.z]);
        self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        self.uvs.extend_from_slice(&uv);
        index
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Tessellation parameters for curved primitives.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Number of segments around the vertical axis.
    pub circle_segments: u32,
    /// Number of latitude bands for spheres.
    pub latitude_segments: u32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            circle_segments: 24,
            latitude_segments: 12,
        }
    }
}

/// Axis-aligned box centered at the origin, one textured quad per face.
pub fn box_mesh(half_extent: &Vector3<f32>) -> TriangleMesh {
    let h = half_extent;
    let mut mesh = TriangleMesh::new();

    // (normal, u axis, v axis) per face; corners are n + -u/+u, -v/+v.
    let faces = [
        (Vector3::x(), -Vector3::z(), -Vector3::y()),
        (-Vector3::x(), Vector3::z(), -Vector3::y()),
        (Vector3::y(), Vector3::x(), Vector3::z()),
        (-Vector3::y(), Vector3::x(), -Vector3::z()),
        (Vector3::z(), Vector3::x(), -Vector3::y()),
        (-Vector3::z(), -Vector3::x(), -Vector3::y()),
    ];

    for (n, u, v) in faces {
        let corner = |su: f32, sv: f32| (n + u * su + v * sv).component_mul(h);
        let i0 = mesh.push_vertex(corner(-1.0, -1.0), n, [0.0, 0.0]);
        let i1 = mesh.push_vertex(corner(1.0, -1.0), n, [1.0, 0.0]);
        let i2 = mesh.push_vertex(corner(1.0, 1.0), n, [1.0, 1.0]);
        let i3 = mesh.push_vertex(corner(-1.0, 1.0), n, [0.0, 1.0]);
        // Keep the winding normal pointing along n.
        if u.cross(&v).dot(&n) > 0.0 {
            mesh.indices.extend_from_slice(&[i0, i1, i2, i0, i2, i3]);
        } else {
            mesh.indices.extend_from_slice(&[i0, i2, i1, i0, i3, i2]);
        }
    }

    mesh
}

/// UV sphere centered at the origin.
pub fn sphere_mesh(radius: f32, params: &TessellationParams) -> TriangleMesh {
    let lon = params.circle_segments.max(3);
    let lat = params.latitude_segments.max(2);
    let mut mesh = TriangleMesh::new();

    for j in 0..=lat {
        let v = j as f32 / lat as f32;
        let theta = v * PI;
        for i in 0..=lon {
            let u = i as f32 / lon as f32;
            let phi = u * 2.0 * PI;
            let n = Vector3::new(theta.sin() * phi.cos(), theta.cos(), -theta.sin() * phi.sin());
            mesh.push_vertex(n * radius, n, [u, v]);
        }
    }

    let row = lon + 1;
    for j in 0..lat {
        for i in 0..lon {
            let a = j * row + i;
            let b = a + row;
            mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    mesh
}

/// Y-aligned cylinder centered at the origin, with caps.
pub fn cylinder_mesh(radius: f32, half_height: f32, params: &TessellationParams) -> TriangleMesh {
    let segments = params.circle_segments.max(3);
    let mut mesh = TriangleMesh::new();

    // Side
    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let phi = u * 2.0 * PI;
        let n = Vector3::new(phi.cos(), 0.0, -phi.sin());
        mesh.push_vertex(n * radius + Vector3::y() * half_height, n, [u, 0.0]);
        mesh.push_vertex(n * radius - Vector3::y() * half_height, n, [u, 1.0]);
    }
    for i in 0..segments {
        let top = i * 2;
        let bottom = top + 1;
        mesh.indices
            .extend_from_slice(&[top, bottom, top + 2, top + 2, bottom, bottom + 2]);
    }

    // Caps
    for (sign, n) in [(1.0f32, Vector3::y()), (-1.0, -Vector3::y())] {
        let center = mesh.push_vertex(n * half_height, n, [0.5, 0.5]);
        let first = mesh.num_vertices() as u32;
        for i in 0..=segments {
            let phi = i as f32 / segments as f32 * 2.0 * PI;
            let p = Vector3::new(phi.cos() * radius, sign * half_height, -phi.sin() * radius);
            mesh.push_vertex(p, n, [0.5 + 0.5 * phi.cos(), 0.5 - 0.5 * phi.sin()]);
        }
        for i in 0..segments {
            let (a, b) = (first + i, first + i + 1);
            if sign > 0.0 {
                mesh.indices.extend_from_slice(&[center, a, b]);
            } else {
                mesh.indices.extend_from_slice(&[center, b, a]);
            }
        }
    }

    mesh
}
