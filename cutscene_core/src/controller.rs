use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use glam::Vec3;
use log::{debug, error, info, warn};

use crate::error::{ActorRole, SceneError, ScriptError, SurfaceError};
use crate::geometry::{heading_direction, midpoint};
use crate::script::SequenceScript;
use crate::session::{CutsceneSession, EndReason, Phase, SessionReport, SessionView};
use crate::surfaces::{ActorRef, CameraHandle, MoveOrder, Surfaces};

/// Plays one scripted cutscene at a time, advanced by [`tick`](Self::tick).
///
/// `begin` only allocates the session; every side effect on the host happens
/// from `tick`, one phase step per call, so the host's frame callback never
/// waits on the controller.
pub struct CutsceneController {
    surfaces: Surfaces,
    script: SequenceScript,
    session: Option<CutsceneSession>,
    last_report: Option<SessionReport>,
}

impl CutsceneController {
    pub fn new(surfaces: Surfaces) -> Self {
        Self {
            surfaces,
            script: SequenceScript::default(),
            session: None,
            last_report: None,
        }
    }

    pub fn with_script(surfaces: Surfaces, script: SequenceScript) -> Result<Self, ScriptError> {
        script.validate()?;
        Ok(Self {
            script,
            ..Self::new(surfaces)
        })
    }

    pub fn script(&self) -> &SequenceScript {
        &self.script
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<SessionView<'_>> {
        self.session.as_ref().map(SessionView::new)
    }

    /// Report of the most recently finished session.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Starts a session with `subject`; logs and returns `false` on rejection.
    pub fn begin(&mut self, subject: ActorRef) -> bool {
        match self.try_begin(subject) {
            Ok(()) => true,
            Err(err) => {
                warn!("cutscene.begin rejected [{:?}]: {}", err.kind(), err);
                false
            }
        }
    }

    pub fn try_begin(&mut self, subject: ActorRef) -> Result<(), SceneError> {
        if self.session.is_some() {
            return Err(SceneError::Busy);
        }

        let actors = self.surfaces.actors.as_ref();
        if !actors.exists(subject) {
            return Err(SceneError::ValidationFailure {
                role: ActorRole::Subject,
                actor: Some(subject),
            });
        }
        let initiator = actors.initiator();
        let initiator = match initiator {
            Some(actor) if actors.exists(actor) => actor,
            _ => {
                return Err(SceneError::ValidationFailure {
                    role: ActorRole::Initiator,
                    actor: initiator,
                })
            }
        };
        if initiator == subject {
            return Err(SceneError::ValidationFailure {
                role: ActorRole::Subject,
                actor: Some(subject),
            });
        }

        self.session = Some(CutsceneSession::new(subject, initiator));
        info!("cutscene.begin subject={subject} initiator={initiator}");
        Ok(())
    }

    /// Advances the active session by one frame. Never fails and never
    /// unwinds into the caller.
    pub fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        // Every phase has already run once the session sits in Cleanup.
        if session.phase != Phase::Cleanup {
            if let Err(err) = validate_participants(&self.surfaces, session) {
                warn!("cutscene.validation [{:?}]: {}", err.kind(), err);
                self.cleanup(EndReason::ValidationFailure);
                return;
            }
        }

        session.total_ticks += 1;
        session.phase_frame += 1;
        let phase = session.phase;
        if phase == Phase::Cleanup {
            self.cleanup(EndReason::Completed);
            return;
        }

        let runner = PhaseRunner {
            surfaces: &self.surfaces,
            script: &self.script,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.run(session)))
            .unwrap_or_else(|payload| {
                Err(SceneError::RuntimeFault {
                    phase,
                    source: SurfaceError::Panicked(panic_message(payload)),
                })
            });
        if let Err(err) = outcome {
            error!("cutscene.fault [{:?}]: {}: {}", err.kind(), err, fault_cause(&err));
            self.cleanup(EndReason::RuntimeFault);
            return;
        }

        for axis in &self.script.suppressed_axes {
            self.surfaces.input.suppress_control(*axis);
        }

        if session.phase_frame >= self.script.durations.frames(phase) {
            if let Some(next) = phase.next() {
                session.enter(next);
                info!("cutscene.phase {next}");
            }
        }
    }

    /// Forces cleanup of the active session from whatever phase it is in.
    pub fn stop(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        info!("cutscene.stop during {}", session.phase);
        self.cleanup(EndReason::Stopped);
    }

    fn cleanup(&mut self, reason: EndReason) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if session.phase != Phase::Cleanup {
            session.enter(Phase::Cleanup);
        }

        release_resources(&self.surfaces, &mut session);

        let report = session.into_report(reason);
        info!(
            "cutscene.end {} after {} ticks ({} cues)",
            reason.label(),
            report.total_ticks,
            report.cues_fired
        );
        self.last_report = Some(report);
    }
}

fn validate_participants(surfaces: &Surfaces, session: &CutsceneSession) -> Result<(), SceneError> {
    let actors = surfaces.actors.as_ref();
    for (role, actor) in [
        (ActorRole::Subject, session.subject),
        (ActorRole::Initiator, session.initiator),
    ] {
        if !actors.exists(actor) {
            return Err(SceneError::ValidationFailure {
                role,
                actor: Some(actor),
            });
        }
    }
    Ok(())
}

/// Releases everything a session may hold. Each step runs on its own, so an
/// error or panic in one never skips the ones after it.
fn release_resources(surfaces: &Surfaces, session: &mut CutsceneSession) {
    if let Some(camera) = session.camera.take() {
        // Unset the render camera before destroying it.
        release_step("camera.deactivate", || {
            surfaces.camera.set_active_render_camera(None)
        });
        release_step("camera.destroy", || surfaces.camera.destroy(camera));
        debug!("cutscene.cleanup released {camera}");
    }

    let actors = surfaces.actors.as_ref();
    let initiator = session.initiator;
    if actors.exists(initiator) {
        release_step("actor.set_invincible", || {
            actors.set_invincible(initiator, false)
        });
        release_step("actor.clear_tasks", || actors.clear_pending_tasks(initiator));
    } else {
        debug!("cutscene.cleanup initiator {initiator} already gone");
    }

    let subject = session.subject;
    if actors.exists(subject) {
        release_step("actor.clear_tasks", || actors.clear_pending_tasks(subject));
    } else {
        debug!("cutscene.cleanup subject {subject} already gone");
    }
}

fn release_step(step: &str, release: impl FnOnce() -> Result<(), SurfaceError>) {
    match panic::catch_unwind(AssertUnwindSafe(release)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("cutscene.cleanup {step} failed: {err}"),
        Err(payload) => error!(
            "cutscene.cleanup {step} panicked: {}",
            panic_message(payload)
        ),
    }
}

fn fault_cause(err: &SceneError) -> String {
    match err {
        SceneError::RuntimeFault { source, .. } => source.to_string(),
        _ => String::from("-"),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Per-frame logic for the non-terminal phases.
struct PhaseRunner<'a> {
    surfaces: &'a Surfaces,
    script: &'a SequenceScript,
}

impl PhaseRunner<'_> {
    fn run(&self, session: &mut CutsceneSession) -> Result<(), SceneError> {
        let phase = session.phase;
        let result = match phase {
            Phase::Setup => self.setup(session),
            Phase::Movement => self.movement(session),
            Phase::Interaction => self.interaction(session),
            Phase::CameraAndAudio => self.camera_and_audio(session),
            Phase::Cleanup => Ok(()),
        };
        result.map_err(|source| SceneError::RuntimeFault { phase, source })
    }

    fn setup(&self, session: &mut CutsceneSession) -> Result<(), SurfaceError> {
        if !session.guards.claim(Phase::Setup) {
            return Ok(());
        }
        let actors = self.surfaces.actors.as_ref();
        actors.set_invincible(session.initiator, true)?;
        actors.clear_pending_tasks(session.initiator)?;
        actors.clear_pending_tasks(session.subject)?;
        info!("cutscene.setup {} invincible, tasks cleared", session.initiator);
        Ok(())
    }

    fn movement(&self, session: &mut CutsceneSession) -> Result<(), SurfaceError> {
        let actors = self.surfaces.actors.as_ref();
        let settings = &self.script.movement;

        if session.guards.claim(Phase::Movement) {
            let origin = actors.position(session.initiator)?;
            let heading = actors.heading(session.initiator)?;
            let target = origin + heading_direction(heading) * settings.offset;
            session.movement_target = target;
            actors.move_to(
                session.subject,
                MoveOrder {
                    target,
                    speed: settings.speed,
                    timeout_ms: settings.timeout_ms,
                    tolerance: settings.tolerance,
                },
            )?;
            session.movement_initialized = true;
            info!(
                "cutscene.move {} -> {:.3},{:.3},{:.3}",
                session.subject, target.x, target.y, target.z
            );
            return Ok(());
        }

        // Arrival only clears the outstanding-order flag; the order is not
        // reissued and the phase still ends on its frame budget.
        if session.movement_initialized {
            let position = actors.position(session.subject)?;
            if position.distance(session.movement_target) <= settings.arrival_radius {
                session.movement_initialized = false;
                debug!(
                    "cutscene.move.arrived {} at frame {}",
                    session.subject, session.phase_frame
                );
            }
        }
        Ok(())
    }

    fn interaction(&self, session: &mut CutsceneSession) -> Result<(), SurfaceError> {
        if !session.guards.claim(Phase::Interaction) {
            return Ok(());
        }
        let actors = self.surfaces.actors.as_ref();
        let clips = &self.script.clips;
        actors.face(session.subject, session.initiator)?;
        actors.face(session.initiator, session.subject)?;
        actors.play_animation(session.subject, &clips.subject)?;
        actors.play_animation(session.initiator, &clips.initiator)?;
        info!(
            "cutscene.animate {}={} {}={}",
            session.subject, clips.subject.name, session.initiator, clips.initiator.name
        );
        Ok(())
    }

    fn camera_and_audio(&self, session: &mut CutsceneSession) -> Result<(), SurfaceError> {
        if session.guards.claim(Phase::CameraAndAudio) {
            session.cue_index = 0;
            if session.camera.is_none() {
                // Camera failures degrade to an unframed sequence.
                if let Err(err) = self.acquire_camera(session) {
                    warn!("cutscene.camera unavailable [RuntimeFault]: {err}");
                }
            }
        }
        self.fire_due_cues(session)
    }

    fn acquire_camera(&self, session: &mut CutsceneSession) -> Result<CameraHandle, SurfaceError> {
        let actors = self.surfaces.actors.as_ref();
        let camera = self.surfaces.camera.as_ref();
        let focus = midpoint(
            actors.position(session.subject)?,
            actors.position(session.initiator)?,
        );
        let position = focus + Vec3::Z * self.script.camera.lift;

        let handle = camera.create(position, Vec3::ZERO, self.script.camera.fov)?;
        session.camera = Some(handle);
        session.camera_acquired = true;
        camera.point_at(handle, focus)?;
        camera.set_active_render_camera(Some(handle))?;
        info!(
            "cutscene.camera {handle} at {:.3},{:.3},{:.3}",
            position.x, position.y, position.z
        );
        Ok(handle)
    }

    fn fire_due_cues(&self, session: &mut CutsceneSession) -> Result<(), SurfaceError> {
        while let Some(cue) = self.script.cues.get(session.cue_index) {
            if session.phase_frame < cue.offset {
                break;
            }
            self.surfaces
                .audio
                .trigger_cue(&cue.set_id, &cue.cue_id, cue.volume)?;
            info!(
                "cutscene.cue {} {}/{} at frame {}",
                session.cue_index, cue.set_id, cue.cue_id, session.phase_frame
            );
            session.cue_index += 1;
        }
        Ok(())
    }
}
