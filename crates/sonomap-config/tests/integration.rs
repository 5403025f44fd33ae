//! Integration tests for sonomap-config: scene files on disk driving the
//! full synthesize, store, and map pipeline.

use sonomap_analysis::{Beamformer, SpectralEstimator};
use sonomap_config::{ConfigError, SceneConfig, builtin_geometry, save_geometry};
use sonomap_core::Point3;
use sonomap_io::{read_time_series, write_time_series};
use std::fs;
use tempfile::tempdir;

#[test]
fn scene_file_maps_source_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scene.toml");
    fs::write(
        &path,
        r#"
geometry = "3x3"
num_samples = 8192

[propagation]
interpolation = "linear"

[grid]
increment = 0.05

[beamformer]
gamma = 10.0

[band]
frequency = 4000.0
fraction = 3

[[sources]]
kind = "white_noise"
seed = 5
location = [0.1, -0.1, 0.3]
"#,
    )
    .unwrap();

    let scene = SceneConfig::load(&path).unwrap();
    scene.validate().unwrap();

    let recording = scene.render_recording().unwrap();
    let stored = dir.path().join("recording.wav");
    write_time_series(&stored, &recording).unwrap();
    let recording = read_time_series(&stored).unwrap();

    let spectra = SpectralEstimator::new(scene.spectra_config().unwrap())
        .unwrap()
        .estimate(&recording)
        .unwrap();
    let beamformer = Beamformer::new(
        scene.beamformer_config().unwrap(),
        &scene.array_geometry().unwrap(),
        &scene.scan_grid().unwrap(),
        scene.acoustic_constants().unwrap(),
    )
    .unwrap();
    let map = beamformer
        .synthetic(&spectra, scene.band.frequency, scene.band.fraction)
        .unwrap();

    let (_, peak, _) = map.peak();
    let expected = Point3::new(0.1, -0.1, 0.3);
    assert!(peak.distance(&expected) < 0.051, "peak at {peak}");
}

#[test]
fn geometry_file_next_to_scene() {
    let dir = tempdir().unwrap();
    save_geometry(&builtin_geometry("ring8").unwrap(), dir.path().join("ring.toml")).unwrap();
    fs::write(
        dir.path().join("scene.toml"),
        "geometry = \"ring.toml\"\nnum_samples = 512\n",
    )
    .unwrap();

    let scene = SceneConfig::load(dir.path().join("scene.toml")).unwrap();
    assert_eq!(scene.array_geometry().unwrap().len(), 8);
    assert_eq!(scene.render_recording().unwrap().num_channels(), 8);
}

#[test]
fn malformed_toml_reports_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[grid\nincrement = 0.1").unwrap();
    assert!(matches!(
        SceneConfig::load(&path),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn missing_scene_file() {
    let dir = tempdir().unwrap();
    let err = SceneConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn source_on_microphone_fails_to_render() {
    let mut scene = SceneConfig::default();
    scene.num_samples = 256;
    scene.sources[0].location = [0.0, 0.0, 0.0];
    assert!(matches!(
        scene.render_recording(),
        Err(ConfigError::Core(sonomap_core::Error::DegenerateGeometry(_)))
    ));
}
