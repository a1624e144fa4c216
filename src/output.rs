use std::{fs::File, io::BufWriter};

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::spectrum::Spectrum;


/// Formats a spectrum as a fixed-width table with one row per wavelength.
pub fn format_table(spectrum: &Spectrum) -> String {
    let mut table = format!(
        "{:>12} {:>24} {:>24} {:>10} {:>10}",
        "wavelength", "reflectance", "transmittance", "R", "T"
    );
    for point in &spectrum.points {
        let s = &point.scattering;
        table.push_str(&format!(
            "\n{:>12.3} {:>24} {:>24} {:>10.6} {:>10.6}",
            point.wavelength,
            format!("{:.6}", s.reflectance),
            format!("{:.6}", s.transmittance),
            s.reflected_power(),
            s.transmitted_power(),
        ));
    }
    table
}

/// Writes any serialisable result to `path` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
