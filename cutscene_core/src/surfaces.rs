//! Capability surfaces the controller drives.
//!
//! The host owns actors, cameras and audio; the controller only ever holds
//! opaque handles and issues commands through these traits. Methods take
//! `&self` so a single host object can be shared behind `Rc` by every
//! surface slot.

use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;

/// Non-owning reference to an actor in the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRef(pub u32);

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Handle to a scripted camera allocated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraHandle(pub u32);

impl fmt::Display for CameraHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera#{}", self.0)
    }
}

/// Player control axes that can be suppressed for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAxis {
    MoveUpDown,
    MoveLeftRight,
    LookUpDown,
    LookLeftRight,
    Sprint,
}

/// Parameters of a single straight-line move order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveOrder {
    pub target: Vec3,
    pub speed: f32,
    pub timeout_ms: u32,
    pub tolerance: f32,
}

/// Opaque animation clip identifier plus playback parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub dictionary: String,
    pub name: String,
    pub blend_rate: f32,
    pub duration_ms: u32,
}

pub trait ActorSurface {
    fn exists(&self, actor: ActorRef) -> bool;
    /// Actor that starts interactions (the local player in a game host).
    fn initiator(&self) -> Option<ActorRef>;
    fn position(&self, actor: ActorRef) -> Result<Vec3, SurfaceError>;
    /// Heading in degrees.
    fn heading(&self, actor: ActorRef) -> Result<f32, SurfaceError>;
    fn move_to(&self, actor: ActorRef, order: MoveOrder) -> Result<(), SurfaceError>;
    fn play_animation(&self, actor: ActorRef, clip: &AnimationClip) -> Result<(), SurfaceError>;
    fn set_invincible(&self, actor: ActorRef, enabled: bool) -> Result<(), SurfaceError>;
    fn clear_pending_tasks(&self, actor: ActorRef) -> Result<(), SurfaceError>;
    fn face(&self, actor: ActorRef, other: ActorRef) -> Result<(), SurfaceError>;
}

pub trait CameraSurface {
    fn create(
        &self,
        position: Vec3,
        rotation: Vec3,
        fov: f32,
    ) -> Result<CameraHandle, SurfaceError>;
    fn point_at(&self, camera: CameraHandle, target: Vec3) -> Result<(), SurfaceError>;
    /// `None` restores the default gameplay camera.
    fn set_active_render_camera(&self, camera: Option<CameraHandle>) -> Result<(), SurfaceError>;
    fn destroy(&self, camera: CameraHandle) -> Result<(), SurfaceError>;
}

pub trait AudioSurface {
    fn trigger_cue(&self, set_id: &str, cue_id: &str, volume_hint: f32) -> Result<(), SurfaceError>;
}

pub trait InputSurface {
    /// Disables `axis` for the current frame only.
    fn suppress_control(&self, axis: ControlAxis);
}

/// Bundle of the capability surfaces handed to a controller.
#[derive(Clone)]
pub struct Surfaces {
    pub actors: Rc<dyn ActorSurface>,
    pub camera: Rc<dyn CameraSurface>,
    pub audio: Rc<dyn AudioSurface>,
    pub input: Rc<dyn InputSurface>,
}

impl Surfaces {
    /// Uses one host object for every surface.
    pub fn from_host<H>(host: Rc<H>) -> Self
    where
        H: ActorSurface + CameraSurface + AudioSurface + InputSurface + 'static,
    {
        Self {
            actors: host.clone(),
            camera: host.clone(),
            audio: host.clone(),
            input: host,
        }
    }
}
