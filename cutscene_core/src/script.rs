use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::session::Phase;
use crate::surfaces::{AnimationClip, ControlAxis};

/// Frame budgets per phase. Cleanup always completes in a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    pub setup: u32,
    pub movement: u32,
    pub interaction: u32,
    pub camera_and_audio: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            setup: 5,
            movement: 30,
            interaction: 20,
            camera_and_audio: 150,
        }
    }
}

impl PhaseDurations {
    pub fn frames(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Setup => self.setup,
            Phase::Movement => self.movement,
            Phase::Interaction => self.interaction,
            Phase::CameraAndAudio => self.camera_and_audio,
            Phase::Cleanup => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Distance in front of the initiator where the subject is sent.
    pub offset: f32,
    pub speed: f32,
    pub timeout_ms: u32,
    pub tolerance: f32,
    /// Distance at which the subject counts as arrived.
    pub arrival_radius: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            offset: 1.5,
            speed: 1.0,
            timeout_ms: 5000,
            tolerance: 0.5,
            arrival_radius: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionClips {
    pub subject: AnimationClip,
    pub initiator: AnimationClip,
}

impl Default for InteractionClips {
    fn default() -> Self {
        Self {
            subject: AnimationClip {
                dictionary: "interaction@subject".to_string(),
                name: "react_accept".to_string(),
                blend_rate: 8.0,
                duration_ms: 3000,
            },
            initiator: AnimationClip {
                dictionary: "interaction@initiator".to_string(),
                name: "gesture_accept".to_string(),
                blend_rate: 8.0,
                duration_ms: 3000,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraFraming {
    /// Height of the camera above the actors' midpoint.
    pub lift: f32,
    pub fov: f32,
}

impl Default for CameraFraming {
    fn default() -> Self {
        Self {
            lift: 2.0,
            fov: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    /// Frame of the camera phase on or after which the cue fires.
    pub offset: u32,
    pub set_id: String,
    pub cue_id: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

const DEFAULT_CUE_SET: &str = "CUTSCENE_AMBIENT";

fn default_cues() -> Vec<AudioCue> {
    [
        (20, "AMBIENT_0", 0.8),
        (50, "AMBIENT_1", 0.8),
        (80, "AMBIENT_2", 0.9),
        (120, "AMBIENT_0", 0.6),
    ]
    .into_iter()
    .map(|(offset, cue_id, volume)| AudioCue {
        offset,
        set_id: DEFAULT_CUE_SET.to_string(),
        cue_id: cue_id.to_string(),
        volume,
    })
    .collect()
}

fn default_axes() -> Vec<ControlAxis> {
    vec![
        ControlAxis::MoveUpDown,
        ControlAxis::MoveLeftRight,
        ControlAxis::LookUpDown,
        ControlAxis::LookLeftRight,
        ControlAxis::Sprint,
    ]
}

/// Timing and content of one cutscene run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceScript {
    pub durations: PhaseDurations,
    pub movement: MovementSettings,
    pub clips: InteractionClips,
    pub camera: CameraFraming,
    pub cues: Vec<AudioCue>,
    pub suppressed_axes: Vec<ControlAxis>,
}

impl Default for SequenceScript {
    fn default() -> Self {
        Self {
            durations: PhaseDurations::default(),
            movement: MovementSettings::default(),
            clips: InteractionClips::default(),
            camera: CameraFraming::default(),
            cues: default_cues(),
            suppressed_axes: default_axes(),
        }
    }
}

impl SequenceScript {
    pub fn validate(&self) -> Result<(), ScriptError> {
        for phase in [
            Phase::Setup,
            Phase::Movement,
            Phase::Interaction,
            Phase::CameraAndAudio,
        ] {
            if self.durations.frames(phase) == 0 {
                return Err(ScriptError::ZeroDuration { phase });
            }
        }

        let movement = &self.movement;
        for (field, value) in [
            ("movement.speed", movement.speed),
            ("movement.tolerance", movement.tolerance),
            ("movement.arrival_radius", movement.arrival_radius),
            ("camera.fov", self.camera.fov),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ScriptError::NonPositive { field, value });
            }
        }

        let duration = self.durations.camera_and_audio;
        let mut previous = 0;
        for (index, cue) in self.cues.iter().enumerate() {
            if cue.offset < previous {
                return Err(ScriptError::UnorderedCue {
                    index,
                    offset: cue.offset,
                    previous,
                });
            }
            if cue.offset > duration {
                return Err(ScriptError::CueOutOfRange {
                    index,
                    offset: cue.offset,
                    duration,
                });
            }
            previous = cue.offset;
        }
        Ok(())
    }
}
