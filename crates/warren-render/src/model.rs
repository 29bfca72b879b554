//! Drawable models: one or more textured mesh parts.

use std::path::Path;
use std::sync::Arc;

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::mesh::TriangleMesh;
use crate::texture::Texture;

/// One mesh with its material.
#[derive(Debug, Clone)]
pub struct ModelPart {
    /// Geometry in model space.
    pub mesh: TriangleMesh,
    /// Optional color texture.
    pub texture: Option<Arc<Texture>>,
    /// Color multiplied with the texel (or used alone when untextured).
    pub base_color: [f32; 3],
}

impl ModelPart {
    /// Part with a white base color.
    pub fn new(mesh: TriangleMesh, texture: Option<Arc<Texture>>) -> Self {
        Self {
            mesh,
            texture,
            base_color: [1.0, 1.0, 1.0],
        }
    }
}

/// A drawable model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    parts: Vec<ModelPart>,
}

impl Model {
    /// Model from explicit parts.
    pub fn new(parts: Vec<ModelPart>) -> Self {
        Self { parts }
    }

    /// Single-part model.
    pub fn from_mesh(mesh: TriangleMesh, texture: Option<Arc<Texture>>) -> Self {
        Self::new(vec![ModelPart::new(mesh, texture)])
    }

    /// Load a model, picking the loader from the file extension
    /// (`gltf`/`glb` or `obj`, case-insensitive).
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gltf" | "glb") => Self::load_gltf(path),
            Some("obj") => Self::load_obj(path),
            _ => Err(RenderError::UnsupportedModel {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load a Wavefront `.obj` file, one part per object in the file.
    ///
    /// Faces are triangulated. Each part takes the diffuse color and
    /// diffuse texture of its material; a missing `.mtl` file or texture
    /// leaves the part untextured.
    pub fn load_obj(path: &Path) -> Result<Self, RenderError> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) =
            tobj::load_obj(path, &options).map_err(|source| RenderError::ObjLoad {
                path: path.to_path_buf(),
                source,
            })?;
        let materials = materials.unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring OBJ materials");
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut parts = Vec::with_capacity(models.len());
        for model in models {
            let mesh = model.mesh;
            let count = mesh.positions.len() / 3;

            let mut out = TriangleMesh::new();
            out.vertices = mesh.positions;
            out.indices = mesh.indices;
            if out.indices.iter().any(|&i| i as usize >= count) {
                warn!(name = %model.name, "skipping OBJ object with out-of-range indices");
                continue;
            }
            if mesh.normals.len() == count * 3 {
                out.normals = mesh.normals;
            } else {
                out.compute_normals();
            }
            if mesh.texcoords.len() == count * 2 {
                // OBJ puts v = 0 at the bottom of the image.
                out.uvs = mesh
                    .texcoords
                    .chunks_exact(2)
                    .flat_map(|uv| [uv[0], 1.0 - uv[1]])
                    .collect();
            }

            let material = mesh.material_id.and_then(|id| materials.get(id));
            let base_color = material
                .and_then(|m| m.diffuse)
                .unwrap_or([1.0, 1.0, 1.0]);
            let texture = material
                .and_then(|m| m.diffuse_texture.as_deref())
                .and_then(|name| {
                    let texture_path = base_dir.join(name);
                    match Texture::load(&texture_path) {
                        Ok(texture) => Some(Arc::new(texture)),
                        Err(err) => {
                            warn!(error = %err, "skipping OBJ diffuse texture");
                            None
                        }
                    }
                });

            parts.push(ModelPart {
                mesh: out,
                texture,
                base_color,
            });
        }

        if parts.iter().all(|p| p.mesh.num_triangles() == 0) {
            return Err(RenderError::EmptyModel {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), parts = parts.len(), "loaded OBJ model");
        Ok(Self { parts })
    }

    /// Load every triangle primitive of a `.gltf`/`.glb` file.
    ///
    /// Node transforms of the default scene (or the first scene) are baked
    /// into the part geometry.
    pub fn load_gltf(path: &Path) -> Result<Self, RenderError> {
        let (document, buffers, images) =
            gltf::import(path).map_err(|source| RenderError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let mut parts = Vec::new();
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());

        if let Some(scene) = scene {
            for node in scene.nodes() {
                collect_node(&node, &Matrix4::identity(), &buffers, &images, &mut parts);
            }
        } else {
            // No scene: take meshes as they are.
            for mesh in document.meshes() {
                collect_mesh(&mesh, &Matrix4::identity(), &buffers, &images, &mut parts);
            }
        }

        if parts.iter().all(|p| p.mesh.num_triangles() == 0) {
            return Err(RenderError::EmptyModel {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), parts = parts.len(), "loaded model");
        Ok(Self { parts })
    }

    /// Parts of the model.
    pub fn parts(&self) -> &[ModelPart] {
        &self.parts
    }

    /// Number of parts.
    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    /// Replace the texture of part `index`. Returns `false` if there is no
    /// such part.
    pub fn set_texture(&mut self, index: usize, texture: Option<Arc<Texture>>) -> bool {
        match self.parts.get_mut(index) {
            Some(part) => {
                part.texture = texture;
                true
            }
            None => false,
        }
    }

    /// Texture of each part, in part order.
    pub fn textures(&self) -> Vec<Option<Arc<Texture>>> {
        self.parts.iter().map(|p| p.texture.clone()).collect()
    }

    /// All parts merged into one mesh and scaled, for collision shapes.
    pub fn collision_mesh(&self, scale: &Vector3<f32>) -> TriangleMesh {
        let mut merged = TriangleMesh::new();
        for part in &self.parts {
            merged.merge(&part.mesh.scaled(scale));
        }
        merged
    }
}

fn collect_node(
    node: &gltf::Node,
    parent: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    parts: &mut Vec<ModelPart>,
) {
    let local = Matrix4::from(node.transform().matrix());
    let transform = parent * local;

    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, &transform, buffers, images, parts);
    }
    for child in node.children() {
        collect_node(&child, &transform, buffers, images, parts);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    transform: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    parts: &mut Vec<ModelPart>,
) {
    let normal_matrix = transform
        .fixed_view::<3, 3>(0, 0)
        .into_owned()
        .try_inverse()
        .map(|m| m.transpose())
        .unwrap_or_else(Matrix3::identity);

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!(mode = ?primitive.mode(), "skipping non-triangle primitive");
            continue;
        }

        let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };

        let mut out = TriangleMesh::new();
        for p in positions {
            let p = transform.transform_point(&Point3::new(p[0], p[1], p[2]));
            out.vertices.extend_from_slice(&[p.x, p.y, p.z]);
        }
        let count = out.num_vertices() as u32;

        out.indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count).collect(),
        };
        if out.indices.iter().any(|&i| i >= count) {
            warn!("skipping primitive with out-of-range indices");
            continue;
        }

        match reader.read_normals() {
            Some(normals) => {
                for n in normals {
                    let n = (normal_matrix * Vector3::new(n[0], n[1], n[2]))
                        .try_normalize(1.0e-12)
                        .unwrap_or_else(Vector3::y);
                    out.normals.extend_from_slice(&[n.x, n.y, n.z]);
                }
            }
            None => out.compute_normals(),
        }

        if let Some(uvs) = reader.read_tex_coords(0) {
            for uv in uvs.into_f32() {
                out.uvs.extend_from_slice(&uv);
            }
        }

        let pbr = primitive.material().pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let texture = pbr
            .base_color_texture()
            .and_then(|info| images.get(info.texture().source().index()))
            .and_then(convert_image);

        parts.push(ModelPart {
            mesh: out,
            texture,
            base_color: [r, g, b],
        });
    }
}

fn convert_image(image: &gltf::image::Data) -> Option<Arc<Texture>> {
    use gltf::image::Format;

    let rgb: Vec<u8> = match image.format {
        Format::R8G8B8 => image.pixels.clone(),
        Format::R8G8B8A8 => image
            .pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l]).collect(),
        other => {
            warn!(format = ?other, "unsupported embedded texture format");
            return None;
        }
    };

    Texture::from_rgb(image.width, image.height, rgb)
        .ok()
        .map(Arc::new)
}
