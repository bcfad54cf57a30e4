use cutscene_core::sandbox::SandboxWorld;
use cutscene_core::surfaces::ActorSurface;
use cutscene_core::ActorRef;
use log::{debug, info};

use crate::config::HostConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Model matched one of `candidate_models`.
    Listed,
    /// Model matched `generic_models` while generic accept is enabled.
    Generic,
}

impl CandidateKind {
    pub fn label(self) -> &'static str {
        match self {
            CandidateKind::Listed => "listed",
            CandidateKind::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub actor: ActorRef,
    pub label: String,
    pub model: String,
    pub distance: f32,
    pub kind: CandidateKind,
}

/// Finds actors near the initiator that may be offered a cutscene.
#[derive(Debug, Clone)]
pub struct CandidateScanner {
    radius: f32,
    candidate_models: Vec<String>,
    generic_models: Vec<String>,
    generic_enabled: bool,
    last_count: usize,
}

impl CandidateScanner {
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            radius: config.detection_radius,
            candidate_models: lowercase_all(&config.candidate_models),
            generic_models: lowercase_all(&config.generic_models),
            generic_enabled: config.enable_generic_accept,
            last_count: 0,
        }
    }

    /// Candidates ordered nearest first.
    pub fn scan(&mut self, world: &SandboxWorld) -> Vec<Candidate> {
        let origin = world
            .initiator()
            .and_then(|initiator| world.actor(initiator).map(|entry| (initiator, entry)))
            .filter(|(_, entry)| entry.present);
        let Some((initiator, origin)) = origin else {
            self.note_count(0);
            return Vec::new();
        };

        let mut found: Vec<Candidate> = world
            .actors_within(origin.position, self.radius)
            .into_iter()
            .filter(|(actor, _)| *actor != initiator)
            .filter_map(|(actor, entry)| {
                let kind = self.classify(&entry.model)?;
                Some(Candidate {
                    actor,
                    distance: entry.position.distance(origin.position),
                    label: entry.label,
                    model: entry.model,
                    kind,
                })
            })
            .collect();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.note_count(found.len());
        found
    }

    fn classify(&self, model: &str) -> Option<CandidateKind> {
        let model = model.to_ascii_lowercase();
        if self
            .candidate_models
            .iter()
            .any(|pattern| model.contains(pattern.as_str()))
        {
            return Some(CandidateKind::Listed);
        }
        if self.generic_enabled && self.generic_models.iter().any(|name| *name == model) {
            return Some(CandidateKind::Generic);
        }
        None
    }

    fn note_count(&mut self, count: usize) {
        if count == self.last_count {
            return;
        }
        if count > 0 {
            info!("detection.found {count} candidate(s)");
        } else {
            debug!("detection.found none");
        }
        self.last_count = count;
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .collect()
}
