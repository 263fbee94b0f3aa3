//! Scoped collision sessions.
//!
//! A [`CollisionSession`] is the transient "current joint configuration"
//! state of one filter pass.  A [`SceneBackend`] hands sessions out; the
//! session is released when the returned box is dropped, so every exit path
//! of the filter (including `?` propagation) tears it down.

use std::fmt;

use redund_types::Configuration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SceneError;

/// How a collision session should be run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// No visualisation.
    #[default]
    Headless,
    /// Interactive visualisation of every tested configuration.
    Visual,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Headless => f.write_str("headless"),
            SessionMode::Visual => f.write_str("visual"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headless" | "direct" => Ok(SessionMode::Headless),
            "visual" | "gui" => Ok(SessionMode::Visual),
            other => Err(format!("unknown session mode '{other}'")),
        }
    }
}

/// One live collision-checking session over an immutable scene.
pub trait CollisionSession {
    /// The mode this session actually runs in.
    fn mode(&self) -> SessionMode;

    /// Put the simulated robot into `configuration`.
    fn set_configuration(&mut self, configuration: &Configuration) -> Result<(), SceneError>;

    /// Indices of every obstacle the robot currently penetrates.
    fn penetrating_obstacles(&self) -> Result<Vec<usize>, SceneError>;

    /// True when the robot currently penetrates at least one obstacle.
    fn is_colliding(&self) -> Result<bool, SceneError> {
        Ok(!self.penetrating_obstacles()?.is_empty())
    }
}

/// Source of collision sessions.
pub trait SceneBackend {
    /// Acquire a session in `mode`.  The session is released on drop.
    fn open(&self, mode: SessionMode) -> Result<Box<dyn CollisionSession + '_>, SceneError>;
}

/// Open a session in `mode`, retrying once as [`SessionMode::Headless`] when
/// a visual session cannot be established.
///
/// # Errors
///
/// The headless retry's error, or the original error when `mode` was already
/// headless.
pub fn open_with_fallback<'a>(
    backend: &'a dyn SceneBackend,
    mode: SessionMode,
) -> Result<Box<dyn CollisionSession + 'a>, SceneError> {
    match backend.open(mode) {
        Ok(session) => Ok(session),
        Err(err) if mode == SessionMode::Visual => {
            warn!(error = %err, "visual session unavailable, falling back to headless");
            backend.open(SessionMode::Headless)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;

    // ────────────────────────────────────────────────────────────────────────
    // Sentinel backend
    // ────────────────────────────────────────────────────────────────────────

    /// Backend whose "colliding" configurations are planted explicitly.
    #[derive(Default)]
    pub(crate) struct SentinelBackend {
        pub colliding: HashSet<Configuration>,
        pub visual_available: bool,
        pub headless_available: bool,
        pub opened: Cell<usize>,
        pub closed: Cell<usize>,
        pub fail_on: Option<Configuration>,
    }

    impl SentinelBackend {
        pub(crate) fn new(colliding: impl IntoIterator<Item = Configuration>) -> Self {
            Self {
                colliding: colliding.into_iter().collect(),
                headless_available: true,
                ..Self::default()
            }
        }
    }

    pub(crate) struct SentinelSession<'a> {
        backend: &'a SentinelBackend,
        mode: SessionMode,
        current: Option<Configuration>,
    }

    impl CollisionSession for SentinelSession<'_> {
        fn mode(&self) -> SessionMode {
            self.mode
        }

        fn set_configuration(&mut self, configuration: &Configuration) -> Result<(), SceneError> {
            if self.backend.fail_on.as_ref() == Some(configuration) {
                return Err(SceneError::TooManyJoints {
                    given: configuration.arity(),
                    available: 0,
                    offset: 0,
                });
            }
            self.current = Some(configuration.clone());
            Ok(())
        }

        fn penetrating_obstacles(&self) -> Result<Vec<usize>, SceneError> {
            Ok(match &self.current {
                Some(c) if self.backend.colliding.contains(c) => vec![0],
                _ => vec![],
            })
        }
    }

    impl Drop for SentinelSession<'_> {
        fn drop(&mut self) {
            self.backend.closed.set(self.backend.closed.get() + 1);
        }
    }

    impl SceneBackend for SentinelBackend {
        fn open(&self, mode: SessionMode) -> Result<Box<dyn CollisionSession + '_>, SceneError> {
            let available = match mode {
                SessionMode::Headless => self.headless_available,
                SessionMode::Visual => self.visual_available,
            };
            if !available {
                return Err(SceneError::SessionUnavailable(mode));
            }
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(SentinelSession {
                backend: self,
                mode,
                current: None,
            }))
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Tests
    // ────────────────────────────────────────────────────────────────────────

    #[test]
    fn session_mode_parses_aliases() {
        assert_eq!("GUI".parse::<SessionMode>(), Ok(SessionMode::Visual));
        assert_eq!("direct".parse::<SessionMode>(), Ok(SessionMode::Headless));
        assert!("tty".parse::<SessionMode>().is_err());
        assert_eq!(SessionMode::Visual.to_string(), "visual");
    }

    #[test]
    fn visual_request_falls_back_to_headless() {
        let backend = SentinelBackend::new([]);
        let session = open_with_fallback(&backend, SessionMode::Visual).unwrap();
        assert_eq!(session.mode(), SessionMode::Headless);
        drop(session);
        assert_eq!(backend.opened.get(), 1);
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn available_visual_session_is_used_directly() {
        let backend = SentinelBackend {
            visual_available: true,
            ..SentinelBackend::new([])
        };
        let session = open_with_fallback(&backend, SessionMode::Visual).unwrap();
        assert_eq!(session.mode(), SessionMode::Visual);
    }

    #[test]
    fn failed_fallback_propagates() {
        let backend = SentinelBackend::default();
        let err = open_with_fallback(&backend, SessionMode::Visual)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SceneError::SessionUnavailable(SessionMode::Headless)
        ));
    }

    #[test]
    fn headless_failure_is_not_retried() {
        let backend = SentinelBackend {
            visual_available: true,
            ..SentinelBackend::default()
        };
        let err = open_with_fallback(&backend, SessionMode::Headless)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SceneError::SessionUnavailable(SessionMode::Headless)
        ));
        assert_eq!(backend.opened.get(), 0);
    }

    #[test]
    fn is_colliding_reflects_planted_sentinel() {
        let bad = Configuration::new(vec![1.0, 1.0]);
        let backend = SentinelBackend::new([bad.clone()]);
        let mut session = backend.open(SessionMode::Headless).unwrap();
        session.set_configuration(&bad).unwrap();
        assert!(session.is_colliding().unwrap());
        session
            .set_configuration(&Configuration::new(vec![0.0, 0.0]))
            .unwrap();
        assert!(!session.is_colliding().unwrap());
    }
}
