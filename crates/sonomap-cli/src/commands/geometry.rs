//! Microphone geometry inspection and export.

use anyhow::Context;
use clap::Args;
use sonomap_config::{BUILTIN_GEOMETRY_NAMES, builtin_geometry, resolve_geometry, save_geometry};
use std::path::PathBuf;

/// Show or export a microphone geometry.
#[derive(Args)]
pub struct GeometryArgs {
    /// Built-in name or geometry file; lists the built-ins when omitted
    #[arg(value_name = "NAME|PATH")]
    pub name: Option<String>,

    /// Write the geometry as a TOML file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the geometry command.
pub fn run(args: GeometryArgs) -> anyhow::Result<()> {
    let Some(name) = args.name else {
        println!("Built-in geometries:\n");
        for name in BUILTIN_GEOMETRY_NAMES {
            if let Some(geometry) = builtin_geometry(name) {
                println!(
                    "  {:<8} {} microphones, aperture {:.3} m",
                    name,
                    geometry.len(),
                    geometry.aperture()
                );
            }
        }
        return Ok(());
    };

    let geometry = resolve_geometry(&name, None)?;
    println!("Geometry:  {name}");
    println!("Mics:      {}", geometry.len());
    println!("Centroid:  {}", geometry.centroid());
    println!("Aperture:  {:.3} m\n", geometry.aperture());
    println!("  {:>3}  {:>9}  {:>9}  {:>9}", "#", "x", "y", "z");
    for (i, p) in geometry.positions().iter().enumerate() {
        println!("  {:>3}  {:>9.4}  {:>9.4}  {:>9.4}", i + 1, p.x, p.y, p.z);
    }

    if let Some(path) = &args.output {
        save_geometry(&geometry, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nWrote geometry to {}", path.display());
    }

    Ok(())
}
