//! Comma-separated text streams written during a run.
//!
//! Records use the same number formats as C's `printf`: `%f` for times and
//! state values, `%e` for the MSD and the density.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SimError;

pub struct OutputStreams<W: Write> {
    pub trajectory: Option<W>,
    pub velocity: Option<W>,
    pub activity: Option<W>,
    pub msd: W,
    pub density: W,
}

impl OutputStreams<BufWriter<File>> {

    /// Open every stream below `prefix`, e.g. `data/run1-density.csv`.
    pub fn create(prefix: &str, write_trajectories: bool) -> Result<Self, SimError> {
        if let Some(parent) = Path::new(prefix).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| SimError::OutputOpen{
                    path: parent.to_path_buf(), source
                })?;
            }
        }

        let density = open_buffer(prefix, "density")?;
        let msd = open_buffer(prefix, "misc_measurements")?;
        let (trajectory, velocity, activity) = if write_trajectories {
            (Some(open_buffer(prefix, "trajectories")?),
             Some(open_buffer(prefix, "velocity")?),
             Some(open_buffer(prefix, "activity")?))
        } else {
            (None, None, None)
        };

        Ok(OutputStreams{trajectory, velocity, activity, msd, density})
    }
}

impl OutputStreams<Vec<u8>> {

    pub fn in_memory(write_trajectories: bool) -> Self {
        let state = || if write_trajectories { Some(Vec::new()) } else { None };
        OutputStreams{
            trajectory: state(),
            velocity: state(),
            activity: state(),
            msd: Vec::new(),
            density: Vec::new(),
        }
    }
}

impl<W: Write> OutputStreams<W> {

    pub fn writes_trajectories(&self) -> bool {
        self.trajectory.is_some()
    }

    /// One record per state stream, each prefixed by the time.
    pub fn write_state(&mut self, t: f64, x: &[f64], v: &[f64], n: &[f64]) -> std::io::Result<()> {
        if let Some(file) = self.trajectory.as_mut() {
            write_row(file, t, x)?;
        }
        if let Some(file) = self.velocity.as_mut() {
            write_row(file, t, v)?;
        }
        if let Some(file) = self.activity.as_mut() {
            write_row(file, t, n)?;
        }
        Ok(())
    }

    pub fn write_msd(&mut self, t: f64, msd: f64) -> std::io::Result<()> {
        writeln!(self.msd, "{}, {}", sci(t), sci(msd))
    }

    pub fn write_density(&mut self, rows: &[(f64, f64)]) -> std::io::Result<()> {
        for (center, p) in rows {
            writeln!(self.density, "{:.6}, {}", center, sci(*p))?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> std::io::Result<()> {
        let state = vec![self.trajectory.as_mut(), self.velocity.as_mut(), self.activity.as_mut()];
        for file in state.into_iter().flatten() {
            file.flush()?;
        }
        self.msd.flush()?;
        self.density.flush()
    }
}

pub fn stream_path(prefix: &str, name: &str) -> PathBuf {
    PathBuf::from(format!("{}-{}.csv", prefix, name))
}

fn open_buffer(prefix: &str, name: &str) -> Result<BufWriter<File>, SimError> {
    let path = stream_path(prefix, name);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|source| SimError::OutputOpen{path: path.clone(), source})?;
    debug!("opened {}", path.display());
    Ok(BufWriter::new(file))
}

fn write_row<W: Write>(file: &mut W, t: f64, values: &[f64]) -> std::io::Result<()> {
    write!(file, "{:.6}", t)?;
    for value in values {
        write!(file, ", {:.6}", value)?;
    }
    writeln!(file)
}

/// Format like C's `%e`: six digit mantissa, signed exponent with at least two digits.
pub fn sci(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let formatted = format!("{:.6e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}
