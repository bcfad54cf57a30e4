use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

const DEFAULT_ACCEPT_FRAME: u32 = 10;

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that drives the cutscene controller against a sandbox world",
    version
)]
pub struct Args {
    /// Number of host frames to simulate
    #[arg(long, default_value_t = 260)]
    pub frames: u32,

    /// Frame on which the accept chord is pressed (repeatable; default 10)
    #[arg(long = "accept-at", value_name = "FRAME")]
    pub accept_at: Vec<u32>,

    /// Frame on which the cancel button is pressed (repeatable)
    #[arg(long = "cancel-at", value_name = "FRAME")]
    pub cancel_at: Vec<u32>,

    /// Remove the current cutscene subject from the world on this frame
    #[arg(long, value_name = "FRAME")]
    pub despawn_subject_at: Option<u32>,

    /// Make every camera creation request fail
    #[arg(long)]
    pub fail_camera: bool,

    /// Config JSON to load instead of searching the working directory
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to write every recorded surface call as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the finished session reports as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunArgs {
    pub frames: u32,
    pub accept_at: Vec<u32>,
    pub cancel_at: Vec<u32>,
    pub despawn_subject_at: Option<u32>,
    pub fail_camera: bool,
    pub config: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        if self.frames == 0 {
            bail!("--frames must be at least 1");
        }

        let accept_at = if self.accept_at.is_empty() {
            vec![DEFAULT_ACCEPT_FRAME]
        } else {
            self.accept_at
        };

        let scheduled = accept_at
            .iter()
            .map(|frame| ("--accept-at", *frame))
            .chain(self.cancel_at.iter().map(|frame| ("--cancel-at", *frame)))
            .chain(
                self.despawn_subject_at
                    .map(|frame| ("--despawn-subject-at", frame)),
            );
        for (flag, frame) in scheduled {
            if frame >= self.frames {
                bail!(
                    "{flag} {frame} is past the last simulated frame ({})",
                    self.frames - 1
                );
            }
        }

        Ok(RunArgs {
            frames: self.frames,
            accept_at,
            cancel_at: self.cancel_at,
            despawn_subject_at: self.despawn_subject_at,
            fail_camera: self.fail_camera,
            config: self.config,
            event_log_json: self.event_log_json,
            report_json: self.report_json,
        })
    }
}
