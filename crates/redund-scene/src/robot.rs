//! [`RobotModel`] – kinematic tree and collision geometry read from a URDF.
//!
//! The model keeps, per link, the list of collision shapes in link-local
//! coordinates and, per joint, the fixed origin transform and motion axis.
//! [`RobotModel::link_poses`] runs forward kinematics for one configuration
//! and returns the world pose of every link.
//!
//! # Joint assignment
//!
//! Joints are indexed in URDF declaration order, fixed joints included, the
//! way a physics engine numbers them after loading the file.  Value `i` of a
//! configuration goes to joint `joint_offset + i`; a value that lands on a
//! fixed joint has no effect.  Joints before the offset, and those past the
//! end of the configuration, stay at zero.  With `joint_offset = 1` a URDF
//! whose joint 0 is the lift axis (or a fixed mount) is driven by six-joint
//! IK configurations.
//!
//! # Geometry
//!
//! Boxes, cylinders, capsules and spheres become the matching primitive
//! shapes, and a non-positive dimension is rejected.  Mesh
//! geometry (OBJ or STL) is wrapped in its convex hull.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use parry3d::shape::SharedShape;
use tracing::{debug, warn};

use crate::error::SceneError;
use crate::mesh::TriangleMesh;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// One collision shape attached to a link.
#[derive(Clone)]
pub struct LinkShape {
    /// Pose of the shape in the link frame.
    pub local: Isometry3<f32>,
    pub shape: SharedShape,
}

/// A link and its collision shapes.
#[derive(Clone)]
pub struct Link {
    pub name: String,
    pub shapes: Vec<LinkShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JointKind {
    Fixed,
    Revolute,
    Prismatic,
}

#[derive(Debug, Clone)]
struct Joint {
    name: String,
    kind: JointKind,
    parent: usize,
    child: usize,
    origin: Isometry3<f32>,
    axis: Unit<Vector3<f32>>,
}

/// Kinematic tree plus collision geometry of a robot.
#[derive(Clone)]
pub struct RobotModel {
    name: String,
    links: Vec<Link>,
    /// Joints sorted so that a parent link is always posed before its child.
    joints: Vec<Joint>,
    /// Per URDF joint in declaration order: its position in `joints` when it
    /// moves, `None` when it is fixed or unreachable from the root.
    slots: Vec<Option<usize>>,
    joint_offset: usize,
    base: Isometry3<f32>,
}

impl RobotModel {
    /// Load a URDF file.  Mesh paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// [`SceneError::Urdf`] for parse failures, plus any mesh or geometry
    /// error raised while building collision shapes.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let robot = urdf_rs::read_file(path).map_err(|e| SceneError::Urdf {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_urdf(&robot, &base_dir)
    }

    /// Parse URDF text.  Relative mesh paths are resolved against `base_dir`.
    pub fn from_urdf_str(xml: &str, base_dir: &Path) -> Result<Self, SceneError> {
        let robot = urdf_rs::read_from_string(xml).map_err(|e| SceneError::Urdf {
            path: PathBuf::from("<string>"),
            details: e.to_string(),
        })?;
        Self::from_urdf(&robot, base_dir)
    }

    fn from_urdf(robot: &urdf_rs::Robot, base_dir: &Path) -> Result<Self, SceneError> {
        let mut links = Vec::with_capacity(robot.links.len());
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (i, l) in robot.links.iter().enumerate() {
            index_of.insert(l.name.as_str(), i);
            let mut shapes = Vec::with_capacity(l.collision.len());
            for c in &l.collision {
                shapes.push(collision_shape(&l.name, c, base_dir)?);
            }
            links.push(Link {
                name: l.name.clone(),
                shapes,
            });
        }

        let lookup = |name: &str| {
            index_of.get(name).copied().ok_or_else(|| SceneError::Urdf {
                path: PathBuf::from(&robot.name),
                details: format!("joint references unknown link '{name}'"),
            })
        };

        let mut declared = Vec::with_capacity(robot.joints.len());
        for j in &robot.joints {
            let kind = match j.joint_type {
                urdf_rs::JointType::Revolute | urdf_rs::JointType::Continuous => {
                    JointKind::Revolute
                }
                urdf_rs::JointType::Prismatic => JointKind::Prismatic,
                urdf_rs::JointType::Fixed => JointKind::Fixed,
                ref other => {
                    warn!(joint = %j.name, kind = ?other, "joint type is not driven; treating as fixed");
                    JointKind::Fixed
                }
            };
            let axis = vec3(&j.axis.xyz);
            declared.push(Joint {
                name: j.name.clone(),
                kind,
                parent: lookup(&j.parent.link)?,
                child: lookup(&j.child.link)?,
                origin: pose(&j.origin.xyz, &j.origin.rpy),
                axis: if axis.norm() > f32::EPSILON {
                    Unit::new_normalize(axis)
                } else {
                    Vector3::x_axis()
                },
            });
        }

        let mut is_child = vec![false; links.len()];
        for j in &declared {
            is_child[j.child] = true;
        }
        let root = is_child
            .iter()
            .position(|c| !c)
            .ok_or(SceneError::NoRootLink)?;

        // Walk down from the root so parents are posed before children.
        let mut order: Vec<usize> = Vec::with_capacity(declared.len());
        let mut frontier = vec![root];
        while let Some(link) = frontier.pop() {
            for (ji, j) in declared.iter().enumerate() {
                if j.parent == link && !order.contains(&ji) {
                    order.push(ji);
                    frontier.push(j.child);
                }
            }
        }
        if order.len() != declared.len() {
            warn!(
                robot = %robot.name,
                unreachable = declared.len() - order.len(),
                "some joints are not reachable from the root link and will not move"
            );
        }

        let joints: Vec<Joint> = order.iter().map(|&ji| declared[ji].clone()).collect();
        let slots: Vec<Option<usize>> = declared
            .iter()
            .enumerate()
            .map(|(ji, j)| match j.kind {
                JointKind::Fixed => None,
                _ => order.iter().position(|&o| o == ji),
            })
            .collect();

        debug!(
            robot = %robot.name,
            links = links.len(),
            joints = joints.len(),
            movable = slots.iter().flatten().count(),
            "robot model built"
        );

        Ok(Self {
            name: robot.name.clone(),
            links,
            joints,
            slots,
            joint_offset: 0,
            base: Isometry3::identity(),
        })
    }

    /// Place the robot base in the world.
    pub fn with_base(mut self, position: [f64; 3], orientation_xyzw: [f64; 4]) -> Self {
        self.base = base_pose(position, orientation_xyzw);
        self
    }

    /// Index, in URDF declaration order with fixed joints counted, of the
    /// joint that receives the first configuration value.
    pub fn with_joint_offset(mut self, offset: usize) -> Self {
        self.joint_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Names of the movable joints in URDF declaration order.
    pub fn movable_joint_names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .flatten()
            .map(|&j| self.joints[j].name.as_str())
            .collect()
    }

    /// How many configuration values this model can absorb.
    pub fn driven_joint_count(&self) -> usize {
        self.slots.len().saturating_sub(self.joint_offset)
    }

    /// World pose of every link (indexed like [`links`][Self::links]) for the
    /// given joint values.
    ///
    /// # Errors
    ///
    /// [`SceneError::TooManyJoints`] when `values` has more entries than
    /// there are joints from the offset on.
    pub fn link_poses(&self, values: &[f64]) -> Result<Vec<Isometry3<f32>>, SceneError> {
        if values.len() > self.driven_joint_count() {
            return Err(SceneError::TooManyJoints {
                given: values.len(),
                available: self.driven_joint_count(),
                offset: self.joint_offset,
            });
        }

        let mut positions = vec![0.0f32; self.joints.len()];
        for (value, slot) in values.iter().zip(self.slots.iter().skip(self.joint_offset)) {
            if let Some(joint) = *slot {
                positions[joint] = *value as f32;
            }
        }

        // Links unreachable from the root stay at the base pose.
        let mut poses = vec![self.base; self.links.len()];
        for (j, q) in self.joints.iter().zip(&positions) {
            let motion = match j.kind {
                JointKind::Fixed => Isometry3::identity(),
                JointKind::Revolute => Isometry3::from_parts(
                    Translation3::identity(),
                    UnitQuaternion::from_axis_angle(&j.axis, *q),
                ),
                JointKind::Prismatic => Isometry3::from_parts(
                    Translation3::from(j.axis.into_inner() * *q),
                    UnitQuaternion::identity(),
                ),
            };
            poses[j.child] = poses[j.parent] * j.origin * motion;
        }
        Ok(poses)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Conversion helpers
// ────────────────────────────────────────────────────────────────────────────

fn vec3(v: &[f64; 3]) -> Vector3<f32> {
    Vector3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

/// URDF origin: translation plus fixed-axis roll/pitch/yaw.
fn pose(xyz: &[f64; 3], rpy: &[f64; 3]) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::from(vec3(xyz)),
        UnitQuaternion::from_euler_angles(rpy[0] as f32, rpy[1] as f32, rpy[2] as f32),
    )
}

/// Base pose from a position and an `[x, y, z, w]` quaternion.
pub(crate) fn base_pose(position: [f64; 3], q: [f64; 4]) -> Isometry3<f32> {
    let quat = nalgebra::Quaternion::new(q[3] as f32, q[0] as f32, q[1] as f32, q[2] as f32);
    Isometry3::from_parts(
        Translation3::from(vec3(&position)),
        UnitQuaternion::from_quaternion(quat),
    )
}

fn collision_shape(
    link: &str,
    collision: &urdf_rs::Collision,
    base_dir: &Path,
) -> Result<LinkShape, SceneError> {
    let local = pose(&collision.origin.xyz, &collision.origin.rpy);
    let (shape, local) = match &collision.geometry {
        urdf_rs::Geometry::Box { size } => {
            let x = dimension(link, "box size x", size[0])?;
            let y = dimension(link, "box size y", size[1])?;
            let z = dimension(link, "box size z", size[2])?;
            (SharedShape::cuboid(x * 0.5, y * 0.5, z * 0.5), local)
        }
        urdf_rs::Geometry::Sphere { radius } => {
            (SharedShape::ball(dimension(link, "sphere radius", *radius)?), local)
        }
        urdf_rs::Geometry::Cylinder { radius, length } => {
            let radius = dimension(link, "cylinder radius", *radius)?;
            let length = dimension(link, "cylinder length", *length)?;
            // URDF cylinders run along Z, parry cylinders along Y.
            let y_to_z = UnitQuaternion::from_axis_angle(
                &Vector3::x_axis(),
                std::f32::consts::FRAC_PI_2,
            );
            (SharedShape::cylinder(length * 0.5, radius), local * y_to_z)
        }
        urdf_rs::Geometry::Mesh { filename, scale } => {
            let path = resolve_mesh_path(filename, base_dir);
            let mut mesh = TriangleMesh::load(&path)?;
            if let Some(s) = scale.as_ref() {
                mesh = mesh.scaled(vec3(s));
            }
            let hull = SharedShape::convex_hull(&mesh.vertices).ok_or_else(|| {
                SceneError::Mesh {
                    path: path.clone(),
                    details: "convex hull is degenerate".to_string(),
                }
            })?;
            (hull, local)
        }
        urdf_rs::Geometry::Capsule { radius, length } => {
            let radius = dimension(link, "capsule radius", *radius)?;
            let length = dimension(link, "capsule length", *length)?;
            // URDF capsules run along Z, parry capsules along Y.
            let y_to_z = UnitQuaternion::from_axis_angle(
                &Vector3::x_axis(),
                std::f32::consts::FRAC_PI_2,
            );
            (SharedShape::capsule_y(length * 0.5, radius), local * y_to_z)
        }
    };
    Ok(LinkShape { local, shape })
}

/// A strictly positive, finite shape dimension.
fn dimension(link: &str, what: &str, value: f64) -> Result<f32, SceneError> {
    if value.is_finite() && value > 0.0 {
        Ok(value as f32)
    } else {
        Err(SceneError::UnsupportedGeometry {
            link: link.to_string(),
            details: format!("{what} must be positive, got {value}"),
        })
    }
}

/// Resolve `package://pkg/rest`, `file://abs` and relative mesh references.
fn resolve_mesh_path(filename: &str, base_dir: &Path) -> PathBuf {
    if let Some(abs) = filename.strip_prefix("file://") {
        return PathBuf::from(abs);
    }
    if let Some(pkg) = filename.strip_prefix("package://") {
        let rest = pkg.split_once('/').map(|(_, r)| r).unwrap_or(pkg);
        let here = base_dir.join(rest);
        if here.exists() {
            return here;
        }
        return base_dir.join("..").join(rest);
    }
    let p = Path::new(filename);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-joint planar arm: a revolute joint about Z at the base and a
    /// revolute joint about Z at the end of a 1 m link along X.
    pub(crate) const PLANAR_ARM: &str = r#"
<robot name="planar">
  <link name="base">
    <collision><geometry><box size="0.2 0.2 0.2"/></geometry></collision>
  </link>
  <link name="upper">
    <collision>
      <origin xyz="0.5 0 0" rpy="0 0 0"/>
      <geometry><box size="1.0 0.1 0.1"/></geometry>
    </collision>
  </link>
  <link name="fore">
    <collision>
      <origin xyz="0.5 0 0" rpy="0 0 0"/>
      <geometry><box size="1.0 0.1 0.1"/></geometry>
    </collision>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base"/><child link="upper"/>
    <origin xyz="0 0 0.5" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3.14" upper="3.14" effort="10" velocity="1"/>
  </joint>
  <joint name="elbow" type="revolute">
    <parent link="upper"/><child link="fore"/>
    <origin xyz="1 0 0" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3.14" upper="3.14" effort="10" velocity="1"/>
  </joint>
</robot>
"#;

    fn arm() -> RobotModel {
        RobotModel::from_urdf_str(PLANAR_ARM, Path::new(".")).unwrap()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn movable_joints_follow_declaration_order() {
        let robot = arm();
        assert_eq!(robot.name(), "planar");
        assert_eq!(robot.movable_joint_names(), vec!["shoulder", "elbow"]);
        assert_eq!(robot.driven_joint_count(), 2);
    }

    #[test]
    fn zero_configuration_stacks_origins() {
        let poses = arm().link_poses(&[0.0, 0.0]).unwrap();
        let fore = poses[2].translation.vector;
        assert!(close(fore.x, 1.0) && close(fore.y, 0.0) && close(fore.z, 0.5));
    }

    #[test]
    fn shoulder_rotation_swings_the_elbow() {
        let poses = arm()
            .link_poses(&[std::f64::consts::FRAC_PI_2, 0.0])
            .unwrap();
        let fore = poses[2].translation.vector;
        assert!(close(fore.x, 0.0), "x = {}", fore.x);
        assert!(close(fore.y, 1.0), "y = {}", fore.y);
    }

    #[test]
    fn short_configuration_leaves_tail_joints_at_zero() {
        let full = arm().link_poses(&[0.3, 0.0]).unwrap();
        let short = arm().link_poses(&[0.3]).unwrap();
        assert_eq!(full, short);
    }

    #[test]
    fn joint_offset_skips_leading_joints() {
        let robot = arm().with_joint_offset(1);
        assert_eq!(robot.driven_joint_count(), 1);
        let poses = robot.link_poses(&[1.0]).unwrap();
        // Shoulder untouched, so the elbow stays on the X axis.
        let fore = poses[2].translation.vector;
        assert!(close(fore.x, 1.0) && close(fore.y, 0.0));
    }

    #[test]
    fn too_many_values_is_an_error() {
        assert!(matches!(
            arm().link_poses(&[0.0, 0.0, 0.0]),
            Err(SceneError::TooManyJoints { given: 3, available: 2, offset: 0 })
        ));
    }

    #[test]
    fn base_pose_translates_every_link() {
        let robot = arm().with_base([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]);
        let poses = robot.link_poses(&[0.0, 0.0]).unwrap();
        let base = poses[0].translation.vector;
        assert!(close(base.x, 1.0) && close(base.y, 2.0) && close(base.z, 3.0));
    }

    /// The planar arm hung from the world through a fixed mount joint.
    const MOUNTED_ARM: &str = r#"
<robot name="mounted">
  <link name="world"/>
  <link name="base"/>
  <link name="upper">
    <collision>
      <origin xyz="0.5 0 0" rpy="0 0 0"/>
      <geometry><box size="1.0 0.1 0.1"/></geometry>
    </collision>
  </link>
  <link name="fore"/>
  <joint name="mount" type="fixed">
    <parent link="world"/><child link="base"/>
  </joint>
  <joint name="shoulder" type="revolute">
    <parent link="base"/><child link="upper"/>
    <origin xyz="0 0 0.5" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3.14" upper="3.14" effort="10" velocity="1"/>
  </joint>
  <joint name="elbow" type="revolute">
    <parent link="upper"/><child link="fore"/>
    <origin xyz="1 0 0" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3.14" upper="3.14" effort="10" velocity="1"/>
  </joint>
</robot>
"#;

    fn mounted() -> RobotModel {
        RobotModel::from_urdf_str(MOUNTED_ARM, Path::new(".")).unwrap()
    }

    #[test]
    fn fixed_joints_count_towards_the_index() {
        let robot = mounted();
        assert_eq!(robot.movable_joint_names(), vec!["shoulder", "elbow"]);
        assert_eq!(robot.driven_joint_count(), 3);
        assert_eq!(robot.with_joint_offset(1).driven_joint_count(), 2);
    }

    #[test]
    fn offset_past_a_fixed_mount_drives_the_same_joints() {
        let q = [std::f64::consts::FRAC_PI_2, 0.0];
        let plain = arm().link_poses(&q).unwrap();
        let robot = mounted().with_joint_offset(1);
        let poses = robot.link_poses(&q).unwrap();
        // Links are `world, base, upper, fore` in the mounted arm.
        let (a, b) = (plain[2].translation.vector, poses[3].translation.vector);
        assert!(close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z));
        assert!(close(b.y, 1.0), "y = {}", b.y);
    }

    #[test]
    fn value_on_a_fixed_joint_has_no_effect() {
        let poses = mounted().link_poses(&[1.0, 0.0, 0.0]).unwrap();
        let fore = poses[3].translation.vector;
        assert!(close(fore.x, 1.0) && close(fore.y, 0.0) && close(fore.z, 0.5));
    }

    #[test]
    fn capsule_geometry_is_supported() {
        let xml = r#"<robot name="c"><link name="a">
            <collision><geometry><capsule radius="0.1" length="0.5"/></geometry></collision>
            </link></robot>"#;
        let robot = RobotModel::from_urdf_str(xml, Path::new(".")).unwrap();
        assert_eq!(robot.links()[0].shapes.len(), 1);
    }

    #[test]
    fn non_positive_dimension_is_unsupported_geometry() {
        let xml = r#"<robot name="s"><link name="a">
            <collision><geometry><sphere radius="0"/></geometry></collision>
            </link></robot>"#;
        assert!(matches!(
            RobotModel::from_urdf_str(xml, Path::new(".")),
            Err(SceneError::UnsupportedGeometry { ref link, .. }) if link == "a"
        ));
    }

    #[test]
    fn unknown_link_reference_is_rejected() {
        let xml = r#"<robot name="bad"><link name="a"/>
            <joint name="j" type="fixed"><parent link="a"/><child link="ghost"/></joint>
            </robot>"#;
        assert!(matches!(
            RobotModel::from_urdf_str(xml, Path::new(".")),
            Err(SceneError::Urdf { .. })
        ));
    }

    #[test]
    fn missing_mesh_file_is_reported() {
        let xml = r#"<robot name="m"><link name="a">
            <collision><geometry><mesh filename="nowhere.stl"/></geometry></collision>
            </link></robot>"#;
        assert!(matches!(
            RobotModel::from_urdf_str(xml, Path::new("/nonexistent")),
            Err(SceneError::Io { .. })
        ));
    }

    #[test]
    fn package_paths_resolve_against_urdf_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("meshes")).unwrap();
        std::fs::write(dir.path().join("meshes/a.stl"), b"solid x\nendsolid x\n").unwrap();
        let resolved = resolve_mesh_path("package://ur20/meshes/a.stl", dir.path());
        assert_eq!(resolved, dir.path().join("meshes/a.stl"));
    }
}
