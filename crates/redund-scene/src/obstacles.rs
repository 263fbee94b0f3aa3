//! Static obstacle bodies loaded from a directory of numbered meshes.
//!
//! The directory holds `0.obj, 1.obj, …`; files of any other type are
//! ignored.  Every obstacle is the solid convex hull of its world-space mesh
//! vertices, so a link shape sitting wholly inside an obstacle counts as a
//! collision just like one crossing its surface.  A bounding-box test runs
//! before the exact query.

use std::path::Path;

use nalgebra::Isometry3;
use parry3d::bounding_volume::{Aabb, BoundingVolume};
use parry3d::query::{self, Unsupported};
use parry3d::shape::{Shape, SharedShape};
use tracing::{debug, warn};

use crate::error::SceneError;
use crate::mesh::TriangleMesh;

/// Hulls at or below this volume (m³) are treated as flat.
const MIN_VOLUME: f32 = 1e-9;

/// One static obstacle body.
#[derive(Clone)]
pub struct Obstacle {
    index: usize,
    /// `None` when the mesh has no volume; such an obstacle never collides.
    hull: Option<SharedShape>,
    aabb: Aabb,
}

impl std::fmt::Debug for Obstacle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obstacle")
            .field("index", &self.index)
            .field("solid", &self.hull.is_some())
            .field("aabb", &self.aabb)
            .finish()
    }
}

impl Obstacle {
    /// Build an obstacle from a mesh already placed in world coordinates.
    pub fn from_mesh(index: usize, mesh: &TriangleMesh) -> Self {
        let hull = if mesh.is_empty() || mesh.vertices.len() < 4 {
            None
        } else {
            SharedShape::convex_hull(&mesh.vertices)
                .filter(|h| h.mass_properties(1.0).mass() > MIN_VOLUME)
        };
        if hull.is_none() {
            warn!(obstacle = index, "obstacle mesh has no volume and is ignored");
        }
        let aabb = hull
            .as_ref()
            .map(|h| h.compute_local_aabb())
            .unwrap_or_else(Aabb::new_invalid);
        Self { index, hull, aabb }
    }

    /// Position of this obstacle in the numbered sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the obstacle has a volume to collide with.
    pub fn is_solid(&self) -> bool {
        self.hull.is_some()
    }

    /// True when `shape` placed at `pose` overlaps this obstacle, including
    /// when either body contains the other.
    pub fn intersects(&self, shape: &dyn Shape, pose: &Isometry3<f32>) -> Result<bool, Unsupported> {
        let Some(hull) = &self.hull else {
            return Ok(false);
        };
        if !shape.compute_aabb(pose).intersects(&self.aabb) {
            return Ok(false);
        }
        query::intersection_test(pose, shape, &Isometry3::identity(), &**hull)
    }
}

/// The immutable set of obstacle bodies of a collision scene.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    /// Build a set from meshes given in index order, all placed at `pose`.
    pub fn from_meshes(meshes: Vec<TriangleMesh>, pose: &Isometry3<f32>) -> Self {
        let obstacles = meshes
            .into_iter()
            .enumerate()
            .map(|(i, m)| Obstacle::from_mesh(i, &m.transformed(pose)))
            .collect();
        Self { obstacles }
    }

    /// Load every `<n>.obj` in `dir`, in index order, placed at `pose`.
    ///
    /// # Errors
    ///
    /// - [`SceneError::Io`] when the directory cannot be listed.
    /// - [`SceneError::ObstacleNumbering`] when the numbering has a gap.
    /// - Any mesh parse error.
    pub fn load_dir(dir: &Path, pose: &Isometry3<f32>) -> Result<Self, SceneError> {
        let entries = std::fs::read_dir(dir).map_err(|source| SceneError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut count = 0usize;
        for entry in entries {
            let entry = entry.map_err(|source| SceneError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            if entry.file_name().to_string_lossy().ends_with(".obj") {
                count += 1;
            }
        }

        let mut meshes = Vec::with_capacity(count);
        for i in 0..count {
            let path = dir.join(format!("{i}.obj"));
            if !path.exists() {
                return Err(SceneError::ObstacleNumbering {
                    dir: dir.to_path_buf(),
                    missing: format!("{i}.obj"),
                });
            }
            meshes.push(TriangleMesh::load(&path)?);
        }
        debug!(dir = %dir.display(), count, "obstacle meshes loaded");
        Ok(Self::from_meshes(meshes, pose))
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Obstacle> {
        self.obstacles.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nalgebra::Point3;
    use parry3d::shape::{Ball, Cuboid};

    /// Axis-aligned box as an OBJ document.
    pub(crate) fn box_obj(min: [f32; 3], max: [f32; 3]) -> String {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let mut s = String::new();
        for (x, y, z) in [
            (x0, y0, z0),
            (x1, y0, z0),
            (x1, y1, z0),
            (x0, y1, z0),
            (x0, y0, z1),
            (x1, y0, z1),
            (x1, y1, z1),
            (x0, y1, z1),
        ] {
            s.push_str(&format!("v {x} {y} {z}\n"));
        }
        s.push_str(
            "f 1 2 3 4\nf 5 8 7 6\nf 1 5 6 2\nf 2 6 7 3\nf 3 7 8 4\nf 4 8 5 1\n",
        );
        s
    }

    fn unit_box() -> TriangleMesh {
        crate::mesh::parse_obj(&box_obj([0.0; 3], [1.0; 3]), Path::new("0.obj")).unwrap()
    }

    #[test]
    fn box_mesh_is_solid() {
        assert!(Obstacle::from_mesh(0, &unit_box()).is_solid());
    }

    #[test]
    fn flat_or_empty_mesh_never_collides() {
        let flat = crate::mesh::parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
            Path::new("0.obj"),
        )
        .unwrap();
        let ball = Ball::new(0.5);
        let pose = Isometry3::translation(0.2, 0.2, 0.0);
        for mesh in [flat, TriangleMesh::default()] {
            let o = Obstacle::from_mesh(0, &mesh);
            assert!(!o.is_solid());
            assert!(!o.intersects(&ball, &pose).unwrap());
        }
    }

    #[test]
    fn shape_enclosed_by_the_obstacle_intersects() {
        let o = Obstacle::from_mesh(0, &unit_box());
        let cube = Cuboid::new(nalgebra::Vector3::new(0.1, 0.1, 0.1));
        let pose = Isometry3::translation(0.5, 0.5, 0.5);
        assert!(o.intersects(&cube, &pose).unwrap());
    }

    #[test]
    fn obstacle_enclosed_by_the_shape_intersects() {
        let o = Obstacle::from_mesh(0, &unit_box());
        let cube = Cuboid::new(nalgebra::Vector3::new(5.0, 5.0, 5.0));
        assert!(o.intersects(&cube, &Isometry3::identity()).unwrap());
    }

    #[test]
    fn ball_touching_a_face_intersects() {
        let o = Obstacle::from_mesh(0, &unit_box());
        let ball = Ball::new(0.25);
        let pose = Isometry3::translation(1.2, 0.5, 0.5);
        assert!(o.intersects(&ball, &pose).unwrap());
    }

    #[test]
    fn distant_shape_does_not_intersect() {
        let o = Obstacle::from_mesh(0, &unit_box());
        let cube = Cuboid::new(nalgebra::Vector3::new(0.1, 0.1, 0.1));
        let pose = Isometry3::translation(5.0, 5.0, 5.0);
        assert!(!o.intersects(&cube, &pose).unwrap());
    }

    #[test]
    fn placement_pose_moves_the_obstacle() {
        let set = ObstacleSet::from_meshes(vec![unit_box()], &Isometry3::translation(10.0, 0.0, 0.0));
        let ball = Ball::new(0.25);
        let near_origin = Isometry3::translation(1.2, 0.5, 0.5);
        let near_moved = Isometry3::translation(11.2, 0.5, 0.5);
        let o = set.iter().next().unwrap();
        assert!(!o.intersects(&ball, &near_origin).unwrap());
        assert!(o.intersects(&ball, &near_moved).unwrap());
    }

    #[test]
    fn load_dir_reads_numbered_obj_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.obj"), box_obj([0.0; 3], [1.0; 3])).unwrap();
        std::fs::write(dir.path().join("1.obj"), box_obj([5.0; 3], [6.0; 3])).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("0.stl"), "ignored").unwrap();
        let set = ObstacleSet::load_dir(dir.path(), &Isometry3::identity()).unwrap();
        assert_eq!(set.len(), 2);
        let second = set.iter().nth(1).unwrap();
        assert_eq!(second.index(), 1);
        let ball = Ball::new(0.1);
        assert!(second.intersects(&ball, &Isometry3::translation(5.5, 5.5, 5.5)).unwrap());
    }

    #[test]
    fn load_dir_rejects_numbering_gap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.obj"), box_obj([0.0; 3], [1.0; 3])).unwrap();
        std::fs::write(dir.path().join("2.obj"), box_obj([0.0; 3], [1.0; 3])).unwrap();
        assert!(matches!(
            ObstacleSet::load_dir(dir.path(), &Isometry3::identity()),
            Err(SceneError::ObstacleNumbering { .. })
        ));
    }

    #[test]
    fn load_dir_on_missing_directory_is_io_error() {
        assert!(matches!(
            ObstacleSet::load_dir(Path::new("/definitely/not/here"), &Isometry3::identity()),
            Err(SceneError::Io { .. })
        ));
    }

    #[test]
    fn triangle_corners_match_mesh() {
        let mesh = unit_box();
        let first = mesh.triangles().next().unwrap();
        assert_eq!(first[0], Point3::new(0.0, 0.0, 0.0));
    }
}
