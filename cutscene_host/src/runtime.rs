use std::{env, fs, path::Path, rc::Rc};

use anyhow::{Context, Result};
use cutscene_core::sandbox::{FaultMode, SandboxWorld};
use cutscene_core::{CutsceneController, SessionReport, Surfaces};
use glam::Vec3;
use log::{debug, info, warn};
use serde::Serialize;

use crate::cli::RunArgs;
use crate::config::HostConfig;
use crate::detection::{Candidate, CandidateKind, CandidateScanner};
use crate::triggers::{map_triggers, ButtonFrame, InputScript, Trigger};

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        frames,
        accept_at,
        cancel_at,
        despawn_subject_at,
        fail_camera,
        config,
        event_log_json,
        report_json,
    } = args;

    let working_dir = env::current_dir().context("resolving working directory")?;
    let config = HostConfig::load(config.as_deref(), &working_dir)?;

    let world = SandboxWorld::new();
    seed_demo_world(&world);
    if fail_camera {
        info!("world.fault camera.create armed for this run");
        world.fail_operation("camera.create", FaultMode::Error);
    }

    let input = InputScript::new(&accept_at, &cancel_at);
    let mut host = Host::new(world, config)?;
    for frame in 0..frames {
        host.step(frame, &input.buttons(frame));
        if despawn_subject_at == Some(frame) {
            host.despawn_subject();
        }
    }

    if let Some(view) = host.controller.session() {
        println!(
            "cutscene.unfinished phase={} frame={}",
            view.phase(),
            view.phase_frame()
        );
    }
    for report in &host.reports {
        println!("{}", describe_report(report));
    }

    if let Some(path) = event_log_json.as_ref() {
        write_json(path, &host.world.calls(), "event log")?;
    }
    if let Some(path) = report_json.as_ref() {
        write_json(path, &host.reports, "session reports")?;
    }
    Ok(())
}

/// Frame loop state: the sandbox, the controller it drives and the
/// collaborators that decide when a cutscene starts or stops.
struct Host {
    world: SandboxWorld,
    controller: CutsceneController,
    scanner: CandidateScanner,
    config: HostConfig,
    nearby: Vec<Candidate>,
    reports: Vec<SessionReport>,
}

impl Host {
    fn new(world: SandboxWorld, config: HostConfig) -> Result<Self> {
        let surfaces = Surfaces::from_host(Rc::new(world.clone()));
        let controller = CutsceneController::with_script(surfaces, config.sequence.clone())
            .context("validating sequence script")?;
        let mut scanner = CandidateScanner::from_config(&config);
        let nearby = scanner.scan(&world);
        Ok(Self {
            world,
            controller,
            scanner,
            config,
            nearby,
            reports: Vec::new(),
        })
    }

    fn step(&mut self, frame: u32, buttons: &ButtonFrame) {
        let was_active = self.controller.is_active();
        self.controller.tick();
        self.note_session_end(was_active);

        for trigger in map_triggers(buttons) {
            match trigger {
                Trigger::Accept => self.accept(frame),
                Trigger::Cancel => self.cancel(frame),
            }
        }

        self.nearby = self.scanner.scan(&self.world);
        self.world.advance_frame();
    }

    fn accept(&mut self, frame: u32) {
        info!("trigger.accept frame {frame}");
        let Some(candidate) = self.nearby.first() else {
            println!("trigger.accept ignored: no candidate nearby");
            return;
        };
        let enabled = match candidate.kind {
            CandidateKind::Listed => self.config.enable_candidate_accept,
            CandidateKind::Generic => self.config.enable_generic_accept,
        };
        if !enabled {
            println!(
                "trigger.accept ignored: {} accept disabled in config",
                candidate.kind.label()
            );
            return;
        }
        if self.controller.begin(candidate.actor) {
            println!(
                "cutscene.start {} ({}, model {}) frame={frame}",
                candidate.label, candidate.actor, candidate.model
            );
        } else {
            println!("cutscene.rejected {} frame={frame}", candidate.actor);
        }
    }

    fn cancel(&mut self, frame: u32) {
        if !self.controller.is_active() {
            debug!("trigger.cancel frame {frame} with no active cutscene");
            return;
        }
        info!("trigger.cancel frame {frame}");
        self.controller.stop();
        self.note_session_end(true);
    }

    fn despawn_subject(&mut self) {
        let Some(subject) = self.controller.session().map(|view| view.subject()) else {
            warn!("world.despawn skipped: no active cutscene");
            return;
        };
        self.world.despawn(subject);
        println!("world.despawn {subject}");
    }

    fn note_session_end(&mut self, was_active: bool) {
        if !was_active || self.controller.is_active() {
            return;
        }
        if let Some(report) = self.controller.last_report() {
            self.reports.push(report.clone());
        }
    }
}

fn seed_demo_world(world: &SandboxWorld) {
    let player = world.spawn_actor("player", "player", Vec3::ZERO, 90.0);
    world.set_initiator(player);
    world.spawn_actor("companion", "companion", Vec3::new(1.5, 2.5, 0.0), 200.0);
    world.spawn_actor("walker", "pedestrian_a", Vec3::new(5.0, 0.0, 0.0), 180.0);
    world.spawn_actor("distant", "companion", Vec3::new(40.0, 0.0, 0.0), 0.0);
}

fn describe_report(report: &SessionReport) -> String {
    let phases: Vec<&str> = report.phases.iter().map(|phase| phase.label()).collect();
    format!(
        "cutscene.report subject={} reason={} phases={} cues={} camera={} ticks={}",
        report.subject,
        report.reason.label(),
        phases.join(">"),
        report.cues_fired,
        report.camera_acquired,
        report.total_ticks
    )
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutscene_core::{EndReason, Phase};

    fn host() -> Host {
        let world = SandboxWorld::new();
        seed_demo_world(&world);
        Host::new(world, HostConfig::default()).expect("default config is valid")
    }

    fn run(host: &mut Host, input: &InputScript, frames: u32) {
        for frame in 0..frames {
            host.step(frame, &input.buttons(frame));
        }
    }

    #[test]
    fn accept_starts_nearest_candidate() {
        let mut host = host();
        assert_eq!(host.nearby.len(), 1);
        let input = InputScript::new(&[2], &[]);
        run(&mut host, &input, 3);
        let view = host.controller.session().expect("session started");
        assert_eq!(view.subject(), host.nearby[0].actor);
        assert_eq!(view.phase(), Phase::Setup);
    }

    #[test]
    fn disabled_accept_leaves_controller_idle() {
        let world = SandboxWorld::new();
        seed_demo_world(&world);
        let config = HostConfig {
            enable_candidate_accept: false,
            ..HostConfig::default()
        };
        let mut host = Host::new(world, config).expect("valid config");
        run(&mut host, &InputScript::new(&[1], &[]), 5);
        assert!(!host.controller.is_active());
        assert!(host.reports.is_empty());
    }

    #[test]
    fn cancel_records_a_stopped_report() {
        let mut host = host();
        run(&mut host, &InputScript::new(&[1], &[20]), 30);
        assert_eq!(host.reports.len(), 1);
        assert_eq!(host.reports[0].reason, EndReason::Stopped);
    }

    #[test]
    fn completed_session_is_reported_once() {
        let mut host = host();
        run(&mut host, &InputScript::new(&[1, 50], &[]), 260);
        assert_eq!(host.reports.len(), 1);
        let report = &host.reports[0];
        assert_eq!(report.reason, EndReason::Completed);
        assert_eq!(
            describe_report(report),
            "cutscene.report subject=actor#2 reason=completed \
             phases=setup>movement>interaction>camera_and_audio>cleanup \
             cues=4 camera=true ticks=206"
        );
    }
}
