//! Triangle-mesh loading for robot link geometry and obstacles.
//!
//! OBJ files are read with `tobj` (polygons triangulated, one shared index
//! buffer) and STL files, binary or ASCII, with `stl_io`.  Both end up as a
//! [`TriangleMesh`].

use std::io::Cursor;
use std::path::{Path, PathBuf};

use nalgebra::{Isometry3, Point3, Vector3};

use crate::error::SceneError;

/// An indexed triangle mesh in single precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Load a mesh, choosing the reader from the file extension.
    ///
    /// # Errors
    ///
    /// [`SceneError::Io`] when the file cannot be read,
    /// [`SceneError::UnsupportedMeshFormat`] for other extensions, and
    /// [`SceneError::Mesh`] for malformed content.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let bytes = std::fs::read(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match ext.as_deref() {
            Some("obj") => {
                let text = String::from_utf8_lossy(&bytes);
                parse_obj(&text, path)
            }
            Some("stl") => parse_stl(&bytes, path),
            _ => Err(SceneError::UnsupportedMeshFormat(path.to_path_buf())),
        }
    }

    /// Multiply every vertex component-wise by `scale`.
    pub fn scaled(mut self, scale: Vector3<f32>) -> Self {
        for v in &mut self.vertices {
            v.coords.component_mul_assign(&scale);
        }
        self
    }

    /// Apply a rigid transform to every vertex.
    pub fn transformed(mut self, pose: &Isometry3<f32>) -> Self {
        for v in &mut self.vertices {
            *v = pose * *v;
        }
        self
    }

    /// The three corners of every face.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.faces.iter().map(|f| {
            [
                self.vertices[f[0] as usize],
                self.vertices[f[1] as usize],
                self.vertices[f[2] as usize],
            ]
        })
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn malformed(path: &Path, details: impl Into<String>) -> SceneError {
    SceneError::Mesh {
        path: PathBuf::from(path),
        details: details.into(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OBJ
// ────────────────────────────────────────────────────────────────────────────

fn obj_load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Parse Wavefront OBJ text.  Materials are ignored; `path` is only used in
/// error messages.
pub fn parse_obj(text: &str, path: &Path) -> Result<TriangleMesh, SceneError> {
    let mut reader = Cursor::new(text.as_bytes());
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &obj_load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|e| malformed(path, e.to_string()))?;

    let mut mesh = TriangleMesh::default();
    for model in models {
        let base = u32::try_from(mesh.vertices.len())
            .map_err(|_| malformed(path, "too many vertices"))?;
        mesh.vertices.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Point3::new(p[0], p[1], p[2])),
        );
        mesh.faces.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|f| [base + f[0], base + f[1], base + f[2]]),
        );
    }
    Ok(mesh)
}

// ────────────────────────────────────────────────────────────────────────────
// STL
// ────────────────────────────────────────────────────────────────────────────

/// Parse binary or ASCII STL bytes.  `path` is only used in error messages.
pub fn parse_stl(bytes: &[u8], path: &Path) -> Result<TriangleMesh, SceneError> {
    let stl = stl_io::read_stl(&mut Cursor::new(bytes))
        .map_err(|e| malformed(path, e.to_string()))?;

    let vertices = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0], v[1], v[2]))
        .collect();
    let faces = stl
        .faces
        .iter()
        .map(|face| {
            let [a, b, c] = face.vertices;
            match (u32::try_from(a), u32::try_from(b), u32::try_from(c)) {
                (Ok(a), Ok(b), Ok(c)) => Ok([a, b, c]),
                _ => Err(malformed(path, "too many vertices")),
            }
        })
        .collect::<Result<_, _>>()?;

    Ok(TriangleMesh { vertices, faces })
}
