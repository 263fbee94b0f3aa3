//! [`CollisionScene`] – a placed robot plus its static obstacles, and the
//! headless parry3d backend that checks configurations against them.

use std::path::PathBuf;

use nalgebra::Isometry3;
use redund_types::Configuration;
use tracing::{debug, info, instrument};

use crate::error::SceneError;
use crate::obstacles::ObstacleSet;
use crate::robot::{RobotModel, base_pose};
use crate::session::{CollisionSession, SceneBackend, SessionMode};

/// Where the scene's inputs live and how they are placed.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub urdf: PathBuf,
    pub base_position: [f64; 3],
    /// Quaternion `[x, y, z, w]`.
    pub base_orientation: [f64; 4],
    pub joint_offset: usize,
    pub obstacle_dir: PathBuf,
    pub obstacle_position: [f64; 3],
    /// Quaternion `[x, y, z, w]`.
    pub obstacle_orientation: [f64; 4],
}

/// Static robot placement plus obstacle bodies.  Immutable once built.
#[derive(Clone)]
pub struct CollisionScene {
    robot: RobotModel,
    obstacles: ObstacleSet,
}

impl CollisionScene {
    pub fn new(robot: RobotModel, obstacles: ObstacleSet) -> Self {
        Self { robot, obstacles }
    }

    /// Load the robot URDF and every numbered obstacle mesh named by `spec`.
    #[instrument(skip_all, fields(urdf = %spec.urdf.display(), obstacles = %spec.obstacle_dir.display()))]
    pub fn load(spec: &SceneSpec) -> Result<Self, SceneError> {
        let robot = RobotModel::load(&spec.urdf)?
            .with_base(spec.base_position, spec.base_orientation)
            .with_joint_offset(spec.joint_offset);
        let placement = base_pose(spec.obstacle_position, spec.obstacle_orientation);
        let obstacles = ObstacleSet::load_dir(&spec.obstacle_dir, &placement)?;
        info!(
            robot = robot.name(),
            links = robot.links().len(),
            driven_joints = robot.driven_joint_count(),
            obstacles = obstacles.len(),
            "collision scene loaded"
        );
        Ok(Self::new(robot, obstacles))
    }

    pub fn robot(&self) -> &RobotModel {
        &self.robot
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }
}

impl SceneBackend for CollisionScene {
    fn open(&self, mode: SessionMode) -> Result<Box<dyn CollisionSession + '_>, SceneError> {
        if mode != SessionMode::Headless {
            return Err(SceneError::SessionUnavailable(mode));
        }
        debug!("collision session opened");
        Ok(Box::new(ParrySession {
            scene: self,
            poses: self.robot.link_poses(&[])?,
            configurations: 0,
        }))
    }
}

/// Headless session: link poses of the current configuration.
struct ParrySession<'a> {
    scene: &'a CollisionScene,
    poses: Vec<Isometry3<f32>>,
    configurations: usize,
}

impl CollisionSession for ParrySession<'_> {
    fn mode(&self) -> SessionMode {
        SessionMode::Headless
    }

    fn set_configuration(&mut self, configuration: &Configuration) -> Result<(), SceneError> {
        self.poses = self.scene.robot.link_poses(configuration.joints())?;
        self.configurations += 1;
        Ok(())
    }

    fn penetrating_obstacles(&self) -> Result<Vec<usize>, SceneError> {
        let mut hits = Vec::new();
        for obstacle in self.scene.obstacles.iter() {
            'links: for (link, pose) in self.scene.robot.links().iter().zip(&self.poses) {
                for part in &link.shapes {
                    let world = pose * part.local;
                    let touching = obstacle
                        .intersects(&*part.shape, &world)
                        .map_err(|_| SceneError::UnsupportedQuery {
                            link: link.name.clone(),
                            obstacle: obstacle.index(),
                        })?;
                    if touching {
                        hits.push(obstacle.index());
                        break 'links;
                    }
                }
            }
        }
        Ok(hits)
    }
}

impl Drop for ParrySession<'_> {
    fn drop(&mut self) {
        debug!(
            configurations = self.configurations,
            "collision session closed"
        );
    }
}
