//! `redund-types` – shared data model for the redundancy-resolution pipeline.
//!
//! Every stage of the pipeline (collision filter, path optimizer) consumes and
//! produces the types defined here, and every JSON artifact on disk is the
//! `serde` image of one of them.
//!
//! # Modules
//!
//! - [`log`] – [`RunLog`][log::RunLog]: the explicitly injected progress/timing
//!   log collaborator, with tracing-backed, in-memory and fan-out
//!   implementations.
//!
//! # Example
//!
//! ```
//! use redund_types::{Configuration, SolutionSet};
//!
//! let set = SolutionSet::from_nested(vec![
//!     vec![vec![0.0, 0.0, 0.0], vec![0.1, 0.0, 0.0]],
//!     vec![],
//!     vec![vec![1.0, 2.0, -3.0]],
//! ]);
//! assert_eq!(set.total_configurations(), 3);
//! assert_eq!(set.dead_points(), vec![1]);
//!
//! let a = Configuration::new(vec![0.0, 0.0, 0.0]);
//! let b = Configuration::new(vec![1.0, 2.0, -3.0]);
//! assert_eq!(a.l1_distance(&b), 6.0);
//! ```

pub mod log;

use std::hash::{Hash, Hasher};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use log::{MemoryLog, NullLog, RunLog, TeeLog, TracingLog};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// One candidate joint-angle tuple (radians) for the robot arm.
///
/// A configuration has no identity beyond its values: equality and hashing
/// compare the joint values bit-for-bit (with `-0.0` folded onto `0.0`), so a
/// configuration can be used as a set or map key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Configuration(Vec<f64>);

impl Configuration {
    /// Wrap a joint vector.
    pub fn new(joints: Vec<f64>) -> Self {
        Self(joints)
    }

    /// Joint values in order.
    pub fn joints(&self) -> &[f64] {
        &self.0
    }

    /// Number of joints.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Sum of absolute per-joint differences to `other`.
    ///
    /// This is the transition cost used by the planner: it adds up independent
    /// joint displacements, i.e. total actuator travel. Joints present in only
    /// one of the two vectors are ignored; callers validate arity up front with
    /// [`SolutionSet::validate_arity`].
    pub fn l1_distance(&self, other: &Configuration) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).abs())
            .sum()
    }

    /// Insert `lift` as joint 0, shifting the existing joints right.
    ///
    /// This is the one in-place augmentation the pipeline performs: it adds
    /// the vertical retract/approach axis ahead of the IK-solved joints just
    /// before export.
    pub fn prepend_lift(&mut self, lift: f64) {
        self.0.insert(0, lift);
    }

    /// Consume the configuration and return the joint vector.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    fn canonical_bits(&self) -> impl Iterator<Item = u64> + '_ {
        self.0
            .iter()
            .map(|v| if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.arity() == other.arity() && self.canonical_bits().eq(other.canonical_bits())
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arity().hash(state);
        for bits in self.canonical_bits() {
            bits.hash(state);
        }
    }
}

impl From<Vec<f64>> for Configuration {
    fn from(joints: Vec<f64>) -> Self {
        Self(joints)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Point
// ────────────────────────────────────────────────────────────────────────────

/// A target frame together with every candidate [`Configuration`] reaching it.
///
/// A point with no configurations is a *dead point*.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Point(Vec<Configuration>);

impl Point {
    pub fn new(configurations: Vec<Configuration>) -> Self {
        Self(configurations)
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no configuration reaches this point.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Configuration> {
        self.0.iter()
    }
}

impl FromIterator<Configuration> for Point {
    fn from_iter<I: IntoIterator<Item = Configuration>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SolutionSet
// ────────────────────────────────────────────────────────────────────────────

/// The full problem instance: points in visiting order.
///
/// Point 0 is visited first, the last point last; there is no backward motion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SolutionSet(Vec<Point>);

impl SolutionSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Build a set from the raw nested-list shape used by the JSON artifacts.
    pub fn from_nested(points: Vec<Vec<Vec<f64>>>) -> Self {
        Self(
            points
                .into_iter()
                .map(|p| p.into_iter().map(Configuration::new).collect())
                .collect(),
        )
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Number of points (graph layers).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of configurations summed over all points.
    pub fn total_configurations(&self) -> usize {
        self.0.iter().map(Point::len).sum()
    }

    /// Configuration count of every point, in order.
    pub fn counts_per_point(&self) -> Vec<usize> {
        self.0.iter().map(Point::len).collect()
    }

    /// Indices of points that have no configuration left.
    pub fn dead_points(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Check that every configuration has the same number of finite joints.
    ///
    /// When `expected` is `None` the arity of the first configuration found is
    /// used as the reference. Returns the arity, or `None` when the set holds
    /// no configuration at all.
    ///
    /// # Errors
    ///
    /// - [`RedundError::ArityMismatch`] – a configuration has a different
    ///   number of joints.
    /// - [`RedundError::NonFiniteJoint`] – a joint value is NaN or infinite.
    pub fn validate_arity(&self, expected: Option<usize>) -> Result<Option<usize>, RedundError> {
        let mut arity = expected;
        for (point, p) in self.0.iter().enumerate() {
            for (index, config) in p.iter().enumerate() {
                if config.joints().iter().any(|v| !v.is_finite()) {
                    return Err(RedundError::NonFiniteJoint { point, index });
                }
                match arity {
                    None => arity = Some(config.arity()),
                    Some(expected) if expected != config.arity() => {
                        return Err(RedundError::ArityMismatch {
                            point,
                            index,
                            expected,
                            found: config.arity(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(arity.filter(|_| self.total_configurations() > 0))
    }
}

impl FromIterator<Point> for SolutionSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Metadata
// ────────────────────────────────────────────────────────────────────────────

/// Run metadata written by the upstream IK generator.
///
/// Only `lift_height` and `robot_spawnpoint` are interpreted; every other key
/// is preserved untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// Vertical offset prepended as joint 0 of every exported configuration.
    #[serde(default)]
    pub lift_height: f64,

    /// Robot base position `[x, y, z]` in the scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_spawnpoint: Option<[f64; 3]>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// ExportedPath
// ────────────────────────────────────────────────────────────────────────────

/// The optimizer's export: one configuration per point in visiting order,
/// each with the lift height prepended as element 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ExportedPath(Vec<Configuration>);

impl ExportedPath {
    pub fn new(configurations: Vec<Configuration>) -> Self {
        Self(configurations)
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Validation failures of the data model itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedundError {
    #[error("configuration {index} of point {point} has {found} joints, expected {expected}")]
    ArityMismatch {
        point: usize,
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("configuration {index} of point {point} contains a non-finite joint value")]
    NonFiniteJoint { point: usize, index: usize },

    #[error("solution set contains no points")]
    EmptySolutionSet,
}
