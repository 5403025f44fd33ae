//! Beamforming command for stored recordings.

use super::common::{
    MapOutputArgs, MapOverrides, map_recording, print_summary, read_scene, write_outputs,
};
use anyhow::Context;
use clap::Args;
use sonomap_io::read_time_series;
use std::path::PathBuf;

/// Map sources in a stored recording.
#[derive(Args)]
pub struct BeamformArgs {
    /// Recording written by `sonomap synth`
    #[arg(value_name = "RECORDING")]
    pub input: PathBuf,

    /// Scene file holding the array and analysis settings
    #[arg(long)]
    pub scene: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: MapOverrides,

    #[command(flatten)]
    pub outputs: MapOutputArgs,
}

/// Run the beamform command.
pub fn run(args: BeamformArgs) -> anyhow::Result<()> {
    let mut scene = read_scene(args.scene.as_deref(), &args.overrides)?;
    let recording = read_time_series(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    // bands are checked against the recording's Nyquist frequency
    if recording.sample_rate() != scene.sample_rate {
        tracing::warn!(
            recording = recording.sample_rate(),
            scene = scene.sample_rate,
            "recording rate differs from scene; analysing at the recording's rate"
        );
        scene.sample_rate = recording.sample_rate();
    }
    scene.validate().context("invalid scene")?;

    let maps = map_recording(&scene, &recording)?;
    print_summary(&maps, &scene.constants);
    write_outputs(&maps, &scene.constants, &args.outputs)
}
