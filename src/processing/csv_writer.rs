use nalgebra::{Complex, DVector};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Write equal-length columns to a CSV file with a header row.
pub fn write_columns<P: AsRef<Path>>(
    path: P,
    headers: &[&str],
    columns: &[&[f64]],
) -> io::Result<()> {
    if headers.len() != columns.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match data columns ({})",
                headers.len(),
                columns.len()
            ),
        ));
    }
    let n_rows = columns.first().map_or(0, |c| c.len());
    if let Some(col) = columns.iter().find(|c| c.len() != n_rows) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Column lengths differ ({} vs {})", col.len(), n_rows),
        ));
    }

    let mut file = File::create(path)?;
    writeln!(file, "{}", headers.join(","))?;
    for i in 0..n_rows {
        let row: Vec<String> = columns.iter().map(|c| format!("{:.15e}", c[i])).collect();
        writeln!(file, "{}", row.join(","))?;
    }
    Ok(())
}

/// Sounding curve: frequency, period, apparent resistivity and phase.
pub fn write_sounding<P: AsRef<Path>>(
    path: P,
    frequencies: &[f64],
    app_res: &[f64],
    phase: &[f64],
) -> io::Result<()> {
    let periods: Vec<f64> = frequencies.iter().map(|f| 1.0 / f).collect();
    write_columns(
        path,
        &["frequency_hz", "period_s", "app_res_ohm_m", "phase_deg"],
        &[frequencies, &periods, app_res, phase],
    )
}

/// Layered model as (top depth, bottom depth, conductivity) per cell,
/// listed from the surface down.
pub fn write_model<P: AsRef<Path>>(path: P, nodes: &[f64], sigma: &[f64]) -> io::Result<()> {
    if nodes.len() != sigma.len() + 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Expected {} nodes for {} cells, got {}",
                sigma.len() + 1,
                sigma.len(),
                nodes.len()
            ),
        ));
    }
    let top: Vec<f64> = nodes[1..].iter().rev().map(|z| -z).collect();
    let bottom: Vec<f64> = nodes[..sigma.len()].iter().rev().map(|z| -z).collect();
    let sigma: Vec<f64> = sigma.iter().rev().cloned().collect();
    write_columns(
        path,
        &["top_m", "bottom_m", "sigma_s_per_m"],
        &[&top, &bottom, &sigma],
    )
}

/// Complex field profile against depth: depth (positive down), real part,
/// imaginary part and magnitude.
pub fn write_profile<P: AsRef<Path>>(
    path: P,
    positions: &[f64],
    values: &DVector<Complex<f64>>,
) -> io::Result<()> {
    let depth: Vec<f64> = positions.iter().map(|z| -z).collect();
    let re: Vec<f64> = values.iter().map(|v| v.re).collect();
    let im: Vec<f64> = values.iter().map(|v| v.im).collect();
    let abs: Vec<f64> = values.iter().map(|v| v.norm()).collect();
    write_columns(
        path,
        &["depth_m", "real", "imag", "abs"],
        &[&depth, &re, &im, &abs],
    )
}
