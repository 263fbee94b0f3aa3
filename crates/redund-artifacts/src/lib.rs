//! `redund-artifacts` – the JSON files exchanged between pipeline stages.
//!
//! # Modules
//!
//! - [`resolver`] – [`ArtifactResolver`][resolver::ArtifactResolver] and
//!   [`TimestampedDir`][resolver::TimestampedDir]: pick the newest (or
//!   oldest) `YYMMDD_HHMMSS_<tag>.json` in a directory; output names that
//!   reuse the input's stamp; the standard data directory layout.
//! - [`io`] – typed JSON reads and writes whose errors carry the file path
//!   and the stage.
//! - [`compute_log`] – [`ComputeTimesLog`][compute_log::ComputeTimesLog]:
//!   the run log appended to `auto_generated/compute_times.log`.
//!
//! # Example
//!
//! ```no_run
//! use redund_artifacts::{ArtifactKind, ArtifactResolver, DataLayout, Stage, TimestampedDir};
//!
//! let layout = DataLayout::new("data");
//! let resolver = TimestampedDir::new(layout.export_dir(), Stage::Filter);
//! let solutions = resolver.latest(ArtifactKind::SelectedSolutions)?;
//! let set = redund_artifacts::read_solutions(&solutions, Stage::Filter)?;
//! # Ok::<(), redund_artifacts::ArtifactError>(())
//! ```

pub mod compute_log;
pub mod error;
pub mod io;
pub mod resolver;

pub use compute_log::ComputeTimesLog;
pub use error::{ArtifactError, Stage};
pub use io::{read_json, read_metadata, read_solutions, write_json, write_path, write_solutions};
pub use resolver::{
    ArtifactKind, ArtifactResolver, DataLayout, Selection, Stamp, TimestampedDir, derived_path,
};
