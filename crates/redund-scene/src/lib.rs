//! `redund-scene` – collision scene and collision filter.
//!
//! Loads a robot from URDF and a set of numbered static obstacle meshes,
//! poses the robot in each candidate configuration and keeps only the
//! configurations that do not penetrate any obstacle.
//!
//! # Modules
//!
//! - [`robot`] – [`RobotModel`][robot::RobotModel]: URDF link/joint tree,
//!   forward kinematics and per-link parry3d collision shapes.
//! - [`mesh`] – [`TriangleMesh`][mesh::TriangleMesh]: OBJ and STL loading.
//! - [`obstacles`] – [`ObstacleSet`][obstacles::ObstacleSet]: the
//!   `0.obj, 1.obj, …` obstacle directory as solid world-space convex hulls.
//! - [`session`] – [`CollisionSession`][session::CollisionSession] and
//!   [`SceneBackend`][session::SceneBackend]: scoped per-pass simulation
//!   state, with a headless fallback for visual requests.
//! - [`scene`] – [`CollisionScene`][scene::CollisionScene]: the bundled
//!   headless backend.
//! - [`filter`] – [`CollisionFilter`][filter::CollisionFilter] and its
//!   [`FilterReport`][filter::FilterReport].
//!
//! Self collision (tool vs. arm, arm vs. arm) is not checked.

pub mod error;
pub mod filter;
pub mod mesh;
pub mod obstacles;
pub mod robot;
pub mod scene;
pub mod session;

pub use error::SceneError;
pub use filter::{CollisionFilter, FilterReport};
pub use obstacles::{Obstacle, ObstacleSet};
pub use robot::RobotModel;
pub use scene::{CollisionScene, SceneSpec};
pub use session::{CollisionSession, SceneBackend, SessionMode, open_with_fallback};
