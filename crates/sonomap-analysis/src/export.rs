//! Export formats for power maps.
//!
//! - Point CSV: one row per grid point, `x,y,z,power,level_db`
//! - Level matrix CSV: 2D grids only, rows of constant y, columns of x

use crate::PowerMap;
use sonomap_core::AcousticConstants;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export a power map to point CSV.
///
/// # Example
///
/// ```rust,ignore
/// use sonomap_analysis::export::export_power_map_csv;
///
/// let map = beamformer.synthetic(&spectra, 5000.0, 20)?;
/// export_power_map_csv(&map, &AcousticConstants::AIR, "map.csv")?;
/// ```
pub fn export_power_map_csv(
    map: &PowerMap,
    constants: &AcousticConstants,
    path: impl AsRef<Path>,
) -> std::io::Result<()> {
    let mut file = BufWriter::new(std::fs::File::create(path)?);

    writeln!(file, "x,y,z,power,level_db")?;
    for (i, &power) in map.values().iter().enumerate() {
        let p = map.grid().point(i);
        writeln!(
            file,
            "{:.6},{:.6},{:.6},{:.6e},{:.3}",
            p.x,
            p.y,
            p.z,
            power,
            constants.level_db(power)
        )?;
    }

    file.flush()
}

/// Export the level map of a planar grid as a matrix.
///
/// Comment lines starting with `#` carry the frequency band and the extent
/// `x_min,x_max,y_min,y_max` for rendering. The first row (y = y_min) is the
/// bottom of the image.
pub fn export_level_matrix_csv(
    map: &PowerMap,
    constants: &AcousticConstants,
    path: impl AsRef<Path>,
) -> std::io::Result<()> {
    if !map.grid().is_planar() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "level matrix export needs a planar grid",
        ));
    }
    let mut file = BufWriter::new(std::fs::File::create(path)?);

    let [x_min, x_max, y_min, y_max] = map.grid().extent();
    let (low, high) = map.band();
    writeln!(
        file,
        "# sonomap level map, {:.1} Hz ({low:.1}-{high:.1} Hz), dB re {} Pa",
        map.center_frequency(),
        constants.reference_pressure
    )?;
    writeln!(file, "# extent {x_min},{x_max},{y_min},{y_max}")?;

    for row in map.as_2d() {
        let line: Vec<String> = row
            .iter()
            .map(|&p| format!("{:.3}", constants.level_db(p)))
            .collect();
        writeln!(file, "{}", line.join(","))?;
    }

    file.flush()
}
