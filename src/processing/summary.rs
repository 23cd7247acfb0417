use crate::discretization::generator::skin_depth;
use crate::discretization::mesh::Mesh;
use crate::survey::Survey;
use nalgebra::DVector;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub struct SimulationSummary {
    // Mesh info
    pub num_cells: usize,
    pub num_faces: usize,
    pub depth: f64,
    pub min_cell_width: f64,
    pub max_cell_width: f64,

    // Survey info
    pub num_sources: usize,
    pub num_receivers: usize,
    pub receiver_elevations: (f64, f64),
    pub num_data: usize,
    pub frequency_band: (f64, f64),

    // Model info
    pub sigma_range: (f64, f64),
    pub skin_depth_range: (f64, f64),

    // Sensitivity check
    pub adjoint_mismatch: Option<f64>,
    pub app_res_range: Option<(f64, f64)>,
}

impl SimulationSummary {
    pub fn from_problem(mesh: &Mesh, survey: &Survey, sigma: &DVector<f64>) -> Self {
        let min_width = mesh.widths.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_width = mesh.widths.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let sigma_min = sigma.iter().cloned().fold(f64::INFINITY, f64::min);
        let sigma_max = sigma.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let receiver_elevations = survey
            .receivers()
            .map(|rx| rx.location())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), z| {
                (lo.min(z), hi.max(z))
            });

        let freqs = survey.frequencies();
        let f_min = freqs.first().copied().unwrap_or(f64::NAN);
        let f_max = freqs.last().copied().unwrap_or(f64::NAN);

        // Skin depths bracketing the model: resistive ground at the lowest
        // frequency, conductive ground at the highest.
        let skin_depth_range = (
            skin_depth(1.0 / sigma_max, f_max),
            skin_depth(1.0 / sigma_min, f_min),
        );

        Self {
            num_cells: mesh.n_cells(),
            num_faces: mesh.n_faces(),
            depth: mesh.depth(),
            min_cell_width: min_width,
            max_cell_width: max_width,
            num_sources: survey.sources().len(),
            num_receivers: survey.receivers().count(),
            receiver_elevations,
            num_data: survey.n_data(),
            frequency_band: (f_min, f_max),
            sigma_range: (sigma_min, sigma_max),
            skin_depth_range,
            adjoint_mismatch: None,
            app_res_range: None,
        }
    }

    pub fn add_sounding(&mut self, app_res: &[f64]) {
        let lo = app_res.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = app_res.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        self.app_res_range = Some((lo, hi));
    }

    /// Record `|w.Jv - v.Jtw| / max(|w.Jv|, |v.Jtw|)`.
    pub fn add_adjoint_check(&mut self, w_jv: f64, v_jtw: f64) {
        let scale = w_jv.abs().max(v_jtw.abs());
        self.adjoint_mismatch = Some(if scale > 0.0 {
            (w_jv - v_jtw).abs() / scale
        } else {
            0.0
        });
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "1D MT SIMULATION SUMMARY")?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file)?;

        writeln!(file, "MESH STATISTICS")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Number of cells:     {}", self.num_cells)?;
        writeln!(file, "Number of faces:     {}", self.num_faces)?;
        writeln!(file, "Depth extent:        {:.6e} m", self.depth)?;
        writeln!(file, "Min cell width:      {:.6e} m", self.min_cell_width)?;
        writeln!(file, "Max cell width:      {:.6e} m", self.max_cell_width)?;
        writeln!(file)?;

        writeln!(file, "SURVEY")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Sources:             {}", self.num_sources)?;
        writeln!(file, "Receivers:           {}", self.num_receivers)?;
        writeln!(
            file,
            "Receiver elevation:  {:.3} to {:.3} m",
            self.receiver_elevations.0, self.receiver_elevations.1
        )?;
        writeln!(file, "Data:                {}", self.num_data)?;
        writeln!(
            file,
            "Frequency band:      {:.6e} to {:.6e} Hz",
            self.frequency_band.0, self.frequency_band.1
        )?;
        writeln!(file)?;

        writeln!(file, "MODEL")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(
            file,
            "Conductivity:        {:.6e} to {:.6e} S/m",
            self.sigma_range.0, self.sigma_range.1
        )?;
        writeln!(
            file,
            "Skin depth:          {:.6e} to {:.6e} m",
            self.skin_depth_range.0, self.skin_depth_range.1
        )?;
        if self.skin_depth_range.1 > self.depth {
            writeln!(file, "  warning: mesh is shallower than the largest skin depth")?;
        }
        writeln!(file)?;

        if let Some((lo, hi)) = self.app_res_range {
            writeln!(file, "SOUNDING")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(file, "Apparent resistivity: {:.6e} to {:.6e} Ohm m", lo, hi)?;
            writeln!(file)?;
        }

        if let Some(mismatch) = self.adjoint_mismatch {
            writeln!(file, "SENSITIVITY CHECK")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(file, "Adjoint mismatch:    {:.6e}", mismatch)?;
            writeln!(file)?;
        }

        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn print_to_console(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SIMULATION SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Mesh:          {} cells, {:.1} m deep",
            self.num_cells, self.depth
        );
        println!(
            "Survey:        {} data, {:.3e} to {:.3e} Hz",
            self.num_data, self.frequency_band.0, self.frequency_band.1
        );
        if let Some((lo, hi)) = self.app_res_range {
            println!("App. res.:     {:.3} to {:.3} Ohm m", lo, hi);
        }
        if let Some(mismatch) = self.adjoint_mismatch {
            println!("Adjoint test:  {:.3e}", mismatch);
        }
        println!("{}\n", "=".repeat(60));
    }
}
