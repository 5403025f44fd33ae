//! Synthesize-and-map command.

use super::common::{
    MapOutputArgs, MapOverrides, load_scene, map_recording, print_summary, write_outputs,
};
use anyhow::Context;
use clap::Args;
use sonomap_io::write_time_series;
use std::path::PathBuf;

/// Synthesize and map a scene in one pass.
#[derive(Args)]
pub struct RunArgs {
    /// Scene file (default: the built-in reference scene)
    #[arg(value_name = "SCENE")]
    pub scene: Option<PathBuf>,

    /// Also store the synthesized recording
    #[arg(long, value_name = "WAV")]
    pub save_recording: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: MapOverrides,

    #[command(flatten)]
    pub outputs: MapOutputArgs,
}

/// Run the run command.
pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let scene = load_scene(args.scene.as_deref(), &args.overrides)?;
    let recording = scene
        .render_recording()
        .context("failed to synthesize scene")?;

    if let Some(path) = &args.save_recording {
        write_time_series(path, &recording)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote recording to {}", path.display());
    }

    let maps = map_recording(&scene, &recording)?;
    print_summary(&maps, &scene.constants);
    write_outputs(&maps, &scene.constants, &args.outputs)
}
