//! Frame-driven cutscene orchestration.
//!
//! A [`CutsceneController`] plays one scripted interaction between two actors
//! (setup, movement, interaction, camera framing with timed audio cues, then
//! cleanup). The host calls [`CutsceneController::tick`] once per frame; the
//! controller never blocks and reaches the world only through the capability
//! surfaces in [`surfaces`].

mod controller;
pub mod error;
pub mod geometry;
pub mod sandbox;
mod script;
mod session;
pub mod surfaces;

pub use controller::CutsceneController;
pub use error::{ActorRole, ErrorKind, SceneError, ScriptError, SurfaceError};
pub use script::{
    AudioCue, CameraFraming, InteractionClips, MovementSettings, PhaseDurations, SequenceScript,
};
pub use session::{EndReason, EntryGuards, Phase, SessionReport, SessionView};
pub use surfaces::{ActorRef, CameraHandle, ControlAxis, Surfaces};
