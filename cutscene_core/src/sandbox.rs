//! In-memory host that implements every capability surface.
//!
//! `SandboxWorld` keeps a tiny actor/camera model, advances move orders one
//! frame at a time and records every command it receives so callers can
//! assert on (or dump) exactly what a cutscene asked the host to do.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;
use serde::Serialize;

use crate::error::SurfaceError;
use crate::geometry::heading_towards;
use crate::surfaces::{
    ActorRef, ActorSurface, AnimationClip, AudioSurface, CameraHandle, CameraSurface, ControlAxis,
    InputSurface, MoveOrder,
};

/// Simulated seconds per [`SandboxWorld::advance_frame`].
pub const SANDBOX_FRAME_SECONDS: f32 = 1.0 / 30.0;

/// How an injected fault manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    Error,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceCall {
    MoveTo {
        actor: ActorRef,
        target: [f32; 3],
        speed: f32,
        timeout_ms: u32,
        tolerance: f32,
    },
    PlayAnimation {
        actor: ActorRef,
        dictionary: String,
        clip: String,
        blend_rate: f32,
        duration_ms: u32,
    },
    SetInvincible {
        actor: ActorRef,
        enabled: bool,
    },
    ClearTasks {
        actor: ActorRef,
    },
    Face {
        actor: ActorRef,
        other: ActorRef,
    },
    CameraCreate {
        camera: CameraHandle,
        position: [f32; 3],
        fov: f32,
    },
    CameraPointAt {
        camera: CameraHandle,
        target: [f32; 3],
    },
    CameraActivate {
        camera: Option<CameraHandle>,
    },
    CameraDestroy {
        camera: CameraHandle,
    },
    TriggerCue {
        set_id: String,
        cue_id: String,
        volume: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub frame: u32,
    #[serde(flatten)]
    pub call: SurfaceCall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveMove {
    pub order: MoveOrder,
    pub issued_frame: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxActor {
    pub label: String,
    pub model: String,
    pub position: Vec3,
    pub heading: f32,
    pub present: bool,
    pub invincible: bool,
    pub move_order: Option<ActiveMove>,
    pub animation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandboxCamera {
    pub position: Vec3,
    pub look_at: Option<Vec3>,
    pub fov: f32,
}

#[derive(Debug, Default)]
struct SandboxState {
    frame: u32,
    actors: BTreeMap<ActorRef, SandboxActor>,
    initiator: Option<ActorRef>,
    next_actor: u32,
    cameras: BTreeMap<CameraHandle, SandboxCamera>,
    active_camera: Option<CameraHandle>,
    next_camera: u32,
    faults: BTreeMap<&'static str, FaultMode>,
    calls: Vec<RecordedCall>,
    suppressed: BTreeMap<ControlAxis, u32>,
}

impl SandboxState {
    fn record(&mut self, call: SurfaceCall) {
        let frame = self.frame;
        self.calls.push(RecordedCall { frame, call });
    }

    fn present_actor_mut(&mut self, actor: ActorRef) -> Result<&mut SandboxActor, SurfaceError> {
        self.actors
            .get_mut(&actor)
            .filter(|entry| entry.present)
            .ok_or(SurfaceError::MissingActor(actor))
    }

    fn present_actor(&self, actor: ActorRef) -> Result<&SandboxActor, SurfaceError> {
        self.actors
            .get(&actor)
            .filter(|entry| entry.present)
            .ok_or(SurfaceError::MissingActor(actor))
    }
}

/// Shared handle to the sandbox; clones observe the same world.
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    state: Rc<RefCell<SandboxState>>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_actor(&self, label: &str, model: &str, position: Vec3, heading: f32) -> ActorRef {
        let mut state = self.state.borrow_mut();
        state.next_actor += 1;
        let actor = ActorRef(state.next_actor);
        state.actors.insert(
            actor,
            SandboxActor {
                label: label.to_string(),
                model: model.to_string(),
                position,
                heading,
                present: true,
                invincible: false,
                move_order: None,
                animation: None,
            },
        );
        actor
    }

    pub fn set_initiator(&self, actor: ActorRef) {
        self.state.borrow_mut().initiator = Some(actor);
    }

    /// Removes `actor` from the world; its reference stays dangling.
    pub fn despawn(&self, actor: ActorRef) {
        if let Some(entry) = self.state.borrow_mut().actors.get_mut(&actor) {
            entry.present = false;
            entry.move_order = None;
        }
    }

    pub fn actor(&self, actor: ActorRef) -> Option<SandboxActor> {
        self.state.borrow().actors.get(&actor).cloned()
    }

    /// Present actors within `radius` of `center`, ordered by handle.
    pub fn actors_within(&self, center: Vec3, radius: f32) -> Vec<(ActorRef, SandboxActor)> {
        self.state
            .borrow()
            .actors
            .iter()
            .filter(|(_, entry)| entry.present && entry.position.distance(center) <= radius)
            .map(|(actor, entry)| (*actor, entry.clone()))
            .collect()
    }

    /// Makes every later call of `operation` fail in the given way.
    pub fn fail_operation(&self, operation: &'static str, mode: FaultMode) {
        self.state.borrow_mut().faults.insert(operation, mode);
    }

    pub fn clear_fault(&self, operation: &str) {
        self.state.borrow_mut().faults.remove(operation);
    }

    pub fn frame(&self) -> u32 {
        self.state.borrow().frame
    }

    /// Steps outstanding move orders by one frame.
    pub fn advance_frame(&self) {
        let mut state = self.state.borrow_mut();
        state.frame += 1;
        let frame = state.frame;
        for entry in state.actors.values_mut().filter(|entry| entry.present) {
            let Some(active) = entry.move_order else {
                continue;
            };
            let order = active.order;
            let delta = order.target - entry.position;
            let distance = delta.length();
            let elapsed_ms = (frame - active.issued_frame) as f32 * SANDBOX_FRAME_SECONDS * 1000.0;
            if distance <= order.tolerance || elapsed_ms >= order.timeout_ms as f32 {
                entry.move_order = None;
                continue;
            }
            let step = (order.speed * SANDBOX_FRAME_SECONDS).min(distance);
            if let Some(heading) = heading_towards(entry.position, order.target) {
                entry.heading = heading;
            }
            entry.position += delta / distance * step;
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    pub fn active_camera(&self) -> Option<CameraHandle> {
        self.state.borrow().active_camera
    }

    pub fn camera(&self, camera: CameraHandle) -> Option<SandboxCamera> {
        self.state.borrow().cameras.get(&camera).copied()
    }

    pub fn live_cameras(&self) -> Vec<CameraHandle> {
        self.state.borrow().cameras.keys().copied().collect()
    }

    /// Frames for which `axis` has been suppressed.
    pub fn suppressed_frames(&self, axis: ControlAxis) -> u32 {
        self.state
            .borrow()
            .suppressed
            .get(&axis)
            .copied()
            .unwrap_or(0)
    }

    fn check_fault(&self, operation: &'static str) -> Result<(), SurfaceError> {
        let mode = self.state.borrow().faults.get(operation).copied();
        match mode {
            None => Ok(()),
            Some(FaultMode::Error) => Err(SurfaceError::Rejected {
                operation,
                reason: "injected fault".to_string(),
            }),
            Some(FaultMode::Panic) => panic!("injected panic in {operation}"),
        }
    }
}

impl ActorSurface for SandboxWorld {
    fn exists(&self, actor: ActorRef) -> bool {
        self.state
            .borrow()
            .actors
            .get(&actor)
            .map(|entry| entry.present)
            .unwrap_or(false)
    }

    fn initiator(&self) -> Option<ActorRef> {
        self.state.borrow().initiator
    }

    fn position(&self, actor: ActorRef) -> Result<Vec3, SurfaceError> {
        self.check_fault("actor.position")?;
        Ok(self.state.borrow().present_actor(actor)?.position)
    }

    fn heading(&self, actor: ActorRef) -> Result<f32, SurfaceError> {
        self.check_fault("actor.heading")?;
        Ok(self.state.borrow().present_actor(actor)?.heading)
    }

    fn move_to(&self, actor: ActorRef, order: MoveOrder) -> Result<(), SurfaceError> {
        self.check_fault("actor.move_to")?;
        let mut state = self.state.borrow_mut();
        let issued_frame = state.frame;
        state.present_actor_mut(actor)?.move_order = Some(ActiveMove {
            order,
            issued_frame,
        });
        state.record(SurfaceCall::MoveTo {
            actor,
            target: order.target.to_array(),
            speed: order.speed,
            timeout_ms: order.timeout_ms,
            tolerance: order.tolerance,
        });
        Ok(())
    }

    fn play_animation(&self, actor: ActorRef, clip: &AnimationClip) -> Result<(), SurfaceError> {
        self.check_fault("actor.play_animation")?;
        let mut state = self.state.borrow_mut();
        state.present_actor_mut(actor)?.animation =
            Some(format!("{}/{}", clip.dictionary, clip.name));
        state.record(SurfaceCall::PlayAnimation {
            actor,
            dictionary: clip.dictionary.clone(),
            clip: clip.name.clone(),
            blend_rate: clip.blend_rate,
            duration_ms: clip.duration_ms,
        });
        Ok(())
    }

    fn set_invincible(&self, actor: ActorRef, enabled: bool) -> Result<(), SurfaceError> {
        self.check_fault("actor.set_invincible")?;
        let mut state = self.state.borrow_mut();
        state.present_actor_mut(actor)?.invincible = enabled;
        state.record(SurfaceCall::SetInvincible { actor, enabled });
        Ok(())
    }

    fn clear_pending_tasks(&self, actor: ActorRef) -> Result<(), SurfaceError> {
        self.check_fault("actor.clear_tasks")?;
        let mut state = self.state.borrow_mut();
        let entry = state.present_actor_mut(actor)?;
        entry.move_order = None;
        entry.animation = None;
        state.record(SurfaceCall::ClearTasks { actor });
        Ok(())
    }

    fn face(&self, actor: ActorRef, other: ActorRef) -> Result<(), SurfaceError> {
        self.check_fault("actor.face")?;
        let mut state = self.state.borrow_mut();
        let target = state.present_actor(other)?.position;
        let entry = state.present_actor_mut(actor)?;
        if let Some(heading) = heading_towards(entry.position, target) {
            entry.heading = heading;
        }
        state.record(SurfaceCall::Face { actor, other });
        Ok(())
    }
}

impl CameraSurface for SandboxWorld {
    fn create(
        &self,
        position: Vec3,
        _rotation: Vec3,
        fov: f32,
    ) -> Result<CameraHandle, SurfaceError> {
        self.check_fault("camera.create")?;
        let mut state = self.state.borrow_mut();
        state.next_camera += 1;
        let camera = CameraHandle(state.next_camera);
        state.cameras.insert(
            camera,
            SandboxCamera {
                position,
                look_at: None,
                fov,
            },
        );
        state.record(SurfaceCall::CameraCreate {
            camera,
            position: position.to_array(),
            fov,
        });
        Ok(camera)
    }

    fn point_at(&self, camera: CameraHandle, target: Vec3) -> Result<(), SurfaceError> {
        self.check_fault("camera.point_at")?;
        let mut state = self.state.borrow_mut();
        state
            .cameras
            .get_mut(&camera)
            .ok_or(SurfaceError::MissingCamera(camera))?
            .look_at = Some(target);
        state.record(SurfaceCall::CameraPointAt {
            camera,
            target: target.to_array(),
        });
        Ok(())
    }

    fn set_active_render_camera(&self, camera: Option<CameraHandle>) -> Result<(), SurfaceError> {
        self.check_fault("camera.activate")?;
        let mut state = self.state.borrow_mut();
        if let Some(handle) = camera {
            if !state.cameras.contains_key(&handle) {
                return Err(SurfaceError::MissingCamera(handle));
            }
        }
        state.active_camera = camera;
        state.record(SurfaceCall::CameraActivate { camera });
        Ok(())
    }

    fn destroy(&self, camera: CameraHandle) -> Result<(), SurfaceError> {
        self.check_fault("camera.destroy")?;
        let mut state = self.state.borrow_mut();
        if state.active_camera == Some(camera) {
            return Err(SurfaceError::Rejected {
                operation: "camera.destroy",
                reason: format!("{camera} is still the active render camera"),
            });
        }
        state
            .cameras
            .remove(&camera)
            .ok_or(SurfaceError::MissingCamera(camera))?;
        state.record(SurfaceCall::CameraDestroy { camera });
        Ok(())
    }
}

impl AudioSurface for SandboxWorld {
    fn trigger_cue(
        &self,
        set_id: &str,
        cue_id: &str,
        volume_hint: f32,
    ) -> Result<(), SurfaceError> {
        self.check_fault("audio.trigger_cue")?;
        self.state.borrow_mut().record(SurfaceCall::TriggerCue {
            set_id: set_id.to_string(),
            cue_id: cue_id.to_string(),
            volume: volume_hint,
        });
        Ok(())
    }
}

impl InputSurface for SandboxWorld {
    fn suppress_control(&self, axis: ControlAxis) {
        *self.state.borrow_mut().suppressed.entry(axis).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_order_walks_actor_to_target() {
        let world = SandboxWorld::new();
        let actor = world.spawn_actor("walker", "pedestrian", Vec3::ZERO, 0.0);
        world
            .move_to(
                actor,
                MoveOrder {
                    target: Vec3::new(0.5, 0.0, 0.0),
                    speed: 3.0,
                    timeout_ms: 5000,
                    tolerance: 0.05,
                },
            )
            .expect("move accepted");

        for _ in 0..20 {
            world.advance_frame();
        }
        let state = world.actor(actor).expect("actor tracked");
        assert!(state.position.distance(Vec3::new(0.5, 0.0, 0.0)) <= 0.05);
        assert!(state.move_order.is_none());
    }

    #[test]
    fn move_order_is_abandoned_after_timeout() {
        let world = SandboxWorld::new();
        let actor = world.spawn_actor("walker", "pedestrian", Vec3::ZERO, 0.0);
        world
            .move_to(
                actor,
                MoveOrder {
                    target: Vec3::new(100.0, 0.0, 0.0),
                    speed: 1.0,
                    timeout_ms: 100,
                    tolerance: 0.5,
                },
            )
            .expect("move accepted");
        for _ in 0..4 {
            world.advance_frame();
        }
        let state = world.actor(actor).expect("actor tracked");
        assert!(state.move_order.is_none());
        assert!(state.position.x < 1.0);
    }

    #[test]
    fn destroying_active_camera_is_rejected() {
        let world = SandboxWorld::new();
        let camera = world.create(Vec3::ZERO, Vec3::ZERO, 50.0).expect("camera");
        world
            .set_active_render_camera(Some(camera))
            .expect("activate");
        assert!(matches!(
            world.destroy(camera),
            Err(SurfaceError::Rejected { .. })
        ));

        world.set_active_render_camera(None).expect("deactivate");
        world.destroy(camera).expect("destroy");
        assert!(world.live_cameras().is_empty());
        assert_eq!(world.destroy(camera), Err(SurfaceError::MissingCamera(camera)));
    }

    #[test]
    fn despawned_actor_rejects_commands() {
        let world = SandboxWorld::new();
        let actor = world.spawn_actor("ghost", "pedestrian", Vec3::ZERO, 0.0);
        world.despawn(actor);
        assert!(!world.exists(actor));
        assert_eq!(
            world.set_invincible(actor, true),
            Err(SurfaceError::MissingActor(actor))
        );
        assert!(world.calls().is_empty());
    }

    #[test]
    fn injected_error_fails_operation() {
        let world = SandboxWorld::new();
        world.fail_operation("audio.trigger_cue", FaultMode::Error);
        assert!(world.trigger_cue("SET", "CUE", 1.0).is_err());
        world.clear_fault("audio.trigger_cue");
        world.trigger_cue("SET", "CUE", 1.0).expect("cue");
        assert_eq!(world.calls().len(), 1);
    }

    #[test]
    fn recorded_calls_serialize_with_kind_tag() {
        let world = SandboxWorld::new();
        world.trigger_cue("SET", "CUE", 0.5).expect("cue");
        let json = serde_json::to_value(world.calls()).expect("serialize calls");
        assert_eq!(json[0]["kind"], "trigger_cue");
        assert_eq!(json[0]["frame"], 0);
        assert_eq!(json[0]["cue_id"], "CUE");
    }
}
