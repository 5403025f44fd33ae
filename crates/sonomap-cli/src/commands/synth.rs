//! Scene synthesis command.

use super::common::{MapOverrides, load_scene};
use anyhow::Context;
use clap::Args;
use sonomap_io::write_time_series;
use std::path::PathBuf;

/// Synthesize a scene into a multichannel recording.
#[derive(Args)]
pub struct SynthArgs {
    /// Scene file (default: the built-in reference scene)
    #[arg(value_name = "SCENE")]
    pub scene: Option<PathBuf>,

    /// Output recording (32-bit float WAV, one channel per microphone)
    #[arg(short, long, default_value = "recording.wav")]
    pub output: PathBuf,
}

/// Run the synth command.
pub fn run(args: SynthArgs) -> anyhow::Result<()> {
    let scene = load_scene(args.scene.as_deref(), &MapOverrides::default())?;
    let recording = scene
        .render_recording()
        .context("failed to synthesize scene")?;
    write_time_series(&args.output, &recording)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Wrote {} channels x {} samples at {} Hz to {}",
        recording.num_channels(),
        recording.num_samples(),
        recording.sample_rate(),
        args.output.display()
    );
    Ok(())
}
