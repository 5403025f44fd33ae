//! Display recording metadata.

use anyhow::Context;
use clap::Args;
use sonomap_config::resolve_geometry;
use sonomap_io::read_time_series_info;
use std::path::PathBuf;

/// Display recording information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the recording
    pub file: PathBuf,

    /// Check the channel count against this geometry (name or file)
    #[arg(long)]
    pub geometry: Option<String>,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_time_series_info(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", info.format.label(), info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    if let Some(name) = &args.geometry {
        let geometry = resolve_geometry(name, None)?;
        let verdict = if geometry.len() == usize::from(info.channels) {
            "matches"
        } else {
            "does NOT match"
        };
        println!(
            "Geometry:    {name} ({} microphones) {verdict}",
            geometry.len()
        );
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
