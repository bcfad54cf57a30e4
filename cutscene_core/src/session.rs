use std::fmt;

use glam::Vec3;
use serde::Serialize;

use crate::surfaces::{ActorRef, CameraHandle};

/// Stages of a cutscene, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Movement,
    Interaction,
    CameraAndAudio,
    Cleanup,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Setup,
        Phase::Movement,
        Phase::Interaction,
        Phase::CameraAndAudio,
        Phase::Cleanup,
    ];

    /// Phase that follows this one; `None` once Cleanup is reached.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Setup => Some(Phase::Movement),
            Phase::Movement => Some(Phase::Interaction),
            Phase::Interaction => Some(Phase::CameraAndAudio),
            Phase::CameraAndAudio => Some(Phase::Cleanup),
            Phase::Cleanup => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Movement => "movement",
            Phase::Interaction => "interaction",
            Phase::CameraAndAudio => "camera_and_audio",
            Phase::Cleanup => "cleanup",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One flag per phase, set once that phase's entry action has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryGuards([bool; 5]);

impl EntryGuards {
    pub fn has_entered(&self, phase: Phase) -> bool {
        self.0[phase.index()]
    }

    /// Marks `phase` as entered and reports whether this was the first time.
    pub(crate) fn claim(&mut self, phase: Phase) -> bool {
        let slot = &mut self.0[phase.index()];
        !std::mem::replace(slot, true)
    }
}

/// How a session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Completed,
    ValidationFailure,
    RuntimeFault,
    Stopped,
}

impl EndReason {
    pub fn label(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::ValidationFailure => "validation_failure",
            EndReason::RuntimeFault => "runtime_fault",
            EndReason::Stopped => "stopped",
        }
    }
}

#[derive(Debug)]
pub(crate) struct CutsceneSession {
    pub(crate) phase: Phase,
    pub(crate) phase_frame: u32,
    pub(crate) subject: ActorRef,
    pub(crate) initiator: ActorRef,
    pub(crate) guards: EntryGuards,
    pub(crate) movement_target: Vec3,
    pub(crate) movement_initialized: bool,
    pub(crate) camera: Option<CameraHandle>,
    pub(crate) camera_acquired: bool,
    pub(crate) cue_index: usize,
    pub(crate) visited: Vec<Phase>,
    pub(crate) total_ticks: u32,
}

impl CutsceneSession {
    pub(crate) fn new(subject: ActorRef, initiator: ActorRef) -> Self {
        Self {
            phase: Phase::Setup,
            phase_frame: 0,
            subject,
            initiator,
            guards: EntryGuards::default(),
            movement_target: Vec3::ZERO,
            movement_initialized: false,
            camera: None,
            camera_acquired: false,
            cue_index: 0,
            visited: vec![Phase::Setup],
            total_ticks: 0,
        }
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_frame = 0;
        self.visited.push(phase);
    }

    pub(crate) fn into_report(self, reason: EndReason) -> SessionReport {
        SessionReport {
            subject: self.subject,
            initiator: self.initiator,
            phases: self.visited,
            reason,
            cues_fired: self.cue_index,
            camera_acquired: self.camera_acquired,
            total_ticks: self.total_ticks,
        }
    }
}

/// Read-only view of the live session.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    session: &'a CutsceneSession,
}

impl<'a> SessionView<'a> {
    pub(crate) fn new(session: &'a CutsceneSession) -> Self {
        Self { session }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn phase_frame(&self) -> u32 {
        self.session.phase_frame
    }

    pub fn subject(&self) -> ActorRef {
        self.session.subject
    }

    pub fn initiator(&self) -> ActorRef {
        self.session.initiator
    }

    pub fn guards(&self) -> EntryGuards {
        self.session.guards
    }

    pub fn movement_target(&self) -> Option<Vec3> {
        self.session
            .guards
            .has_entered(Phase::Movement)
            .then_some(self.session.movement_target)
    }

    pub fn movement_initialized(&self) -> bool {
        self.session.movement_initialized
    }

    pub fn camera(&self) -> Option<CameraHandle> {
        self.session.camera
    }

    pub fn cue_index(&self) -> usize {
        self.session.cue_index
    }
}

/// Summary kept after a session has been cleaned up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub subject: ActorRef,
    pub initiator: ActorRef,
    pub phases: Vec<Phase>,
    pub reason: EndReason,
    pub cues_fired: usize,
    pub camera_acquired: bool,
    pub total_ticks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_declared_order() {
        let mut walked = vec![Phase::Setup];
        let mut current = Phase::Setup;
        while let Some(next) = current.next() {
            walked.push(next);
            current = next;
        }
        assert_eq!(walked, Phase::ALL.to_vec());
    }

    #[test]
    fn entry_guard_claims_once() {
        let mut guards = EntryGuards::default();
        assert!(guards.claim(Phase::Interaction));
        assert!(!guards.claim(Phase::Interaction));
        assert!(guards.has_entered(Phase::Interaction));
        assert!(!guards.has_entered(Phase::Setup));
    }

    #[test]
    fn movement_target_hidden_until_entered() {
        let mut session = CutsceneSession::new(ActorRef(1), ActorRef(2));
        assert!(SessionView::new(&session).movement_target().is_none());
        session.guards.claim(Phase::Movement);
        session.movement_target = Vec3::new(1.0, 2.0, 0.0);
        assert_eq!(
            SessionView::new(&session).movement_target(),
            Some(Vec3::new(1.0, 2.0, 0.0))
        );
    }
}
