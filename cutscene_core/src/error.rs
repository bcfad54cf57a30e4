use serde::Serialize;
use thiserror::Error;

use crate::session::Phase;
use crate::surfaces::{ActorRef, CameraHandle};

/// Failure reported by a capability surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("{0} is not available")]
    MissingActor(ActorRef),
    #[error("{0} is not available")]
    MissingCamera(CameraHandle),
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
    #[error("surface call panicked: {0}")]
    Panicked(String),
}

/// Which participant an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Subject,
    Initiator,
}

impl ActorRole {
    pub fn label(&self) -> &'static str {
        match self {
            ActorRole::Subject => "subject",
            ActorRole::Initiator => "initiator",
        }
    }
}

/// Coarse classification used in log lines and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Busy,
    ValidationFailure,
    RuntimeFault,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("a cutscene session is already active")]
    Busy,
    #[error("{} failed existence validation{}", role.label(), describe_actor(*actor))]
    ValidationFailure {
        role: ActorRole,
        actor: Option<ActorRef>,
    },
    #[error("fault during {phase} phase")]
    RuntimeFault {
        phase: Phase,
        #[source]
        source: SurfaceError,
    },
}

impl SceneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SceneError::Busy => ErrorKind::Busy,
            SceneError::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            SceneError::RuntimeFault { .. } => ErrorKind::RuntimeFault,
        }
    }
}

fn describe_actor(actor: Option<ActorRef>) -> String {
    match actor {
        Some(actor) => format!(" ({actor})"),
        None => " (unresolved)".to_string(),
    }
}

/// Rejected sequence script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("{phase} phase must last at least one frame")]
    ZeroDuration { phase: Phase },
    #[error("cue {index} at offset {offset} precedes the previous cue at {previous}")]
    UnorderedCue {
        index: usize,
        offset: u32,
        previous: u32,
    },
    #[error("cue {index} at offset {offset} falls outside the {duration}-frame camera phase")]
    CueOutOfRange {
        index: usize,
        offset: u32,
        duration: u32,
    },
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn runtime_fault_keeps_surface_error_as_source() {
        let err = SceneError::RuntimeFault {
            phase: Phase::Interaction,
            source: SurfaceError::MissingActor(ActorRef(4)),
        };
        assert_eq!(err.kind(), ErrorKind::RuntimeFault);
        assert_eq!(err.to_string(), "fault during interaction phase");
        let source = err.source().expect("fault carries its cause");
        assert_eq!(source.to_string(), "actor#4 is not available");
    }

    #[test]
    fn validation_failure_names_the_role() {
        let err = SceneError::ValidationFailure {
            role: ActorRole::Initiator,
            actor: None,
        };
        assert_eq!(
            err.to_string(),
            "initiator failed existence validation (unresolved)"
        );
    }
}
