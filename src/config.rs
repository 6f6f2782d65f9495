use clap::{Arg, App, ArgMatches};
use serde::{Serialize, Deserialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SimError;
use crate::histogram::{bin_count, MAX_BINS};

/// Configuration file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "setup.toml";

/// Validated parameter bundle consumed by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub num: usize,
    pub diff: f64,
    pub dt: f64,
    pub tf: f64,
    pub teq: f64,
    pub tau: f64,
    pub f0: f64,
    pub delta: f64,
    pub tf_trajectory: f64,
    pub seed: u64,
    pub write_trajectories: bool,
    pub reset_histogram: bool,
    pub bins_per_unit: usize,
    pub half_width: usize,
    pub log_step: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params{
            num: 20,
            diff: 1.0,
            dt: 0.001,
            tf: 2000.0,
            teq: 1000.0,
            tau: 1.0,
            f0: 0.01,
            delta: 0.0,
            tf_trajectory: 1.0,
            seed: 0,
            write_trajectories: true,
            reset_histogram: true,
            bins_per_unit: 10,
            half_width: 101,
            log_step: 0,
        }
    }
}

impl Params {

    /// Reject values the update rule cannot work with.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num == 0 {
            return Err(SimError::invalid("num", "at least one realization is required"));
        }
        positive("dt", self.dt)?;
        positive("tau", self.tau)?;
        positive("tf_trajectory", self.tf_trajectory)?;
        non_negative("diff", self.diff)?;
        non_negative("teq", self.teq)?;
        non_negative("tf", self.tf)?;
        finite("f0", self.f0)?;
        finite("delta", self.delta)?;
        if self.bins_per_unit == 0 {
            return Err(SimError::invalid("bins_per_unit", "must be at least 1"));
        }
        if self.half_width == 0 {
            return Err(SimError::invalid("half_width", "must be at least 1"));
        }
        if bin_count(self.bins_per_unit, self.half_width).is_none() {
            return Err(SimError::invalid("half_width", format!(
                "histogram of 2 * {} * {} bins exceeds the limit of {} bins",
                self.bins_per_unit, self.half_width, MAX_BINS)));
        }
        Ok(())
    }

    // format output file suffix with configuration data
    pub fn format_file_suffix(&self) -> String {
        format!("n{}_D{}_dt{}_tau{}_f{}_delta{}_seed{}",
                self.num, self.diff, self.dt, self.tau,
                self.f0, self.delta, self.seed)
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), SimError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be finite, got {}", value)))
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SimError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be positive, got {}", value)))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), SimError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must not be negative, got {}", value)))
    }
}

/// Parameters as they appear in the TOML configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub num: usize,
    pub diff: f64,
    pub dt: f64,
    pub tf: f64,
    pub teq: f64,
    pub tau: f64,
    pub f0: f64,
    pub delta: f64,
    pub tf_trajectory: f64,
    pub seed: u64,
    pub write_trajectories: bool,
    pub reset_histogram: bool,
    pub bins_per_unit: usize,
    pub half_width: usize,
    pub log_step: usize,
    pub prefix: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig::from_params(&Params::default(), None)
    }
}

impl FileConfig {

    fn from_params(p: &Params, prefix: Option<String>) -> FileConfig {
        FileConfig{num: p.num, diff: p.diff, dt: p.dt, tf: p.tf, teq: p.teq, tau: p.tau,
                f0: p.f0, delta: p.delta, tf_trajectory: p.tf_trajectory, seed: p.seed,
                write_trajectories: p.write_trajectories, reset_histogram: p.reset_histogram,
                bins_per_unit: p.bins_per_unit, half_width: p.half_width,
                log_step: p.log_step, prefix: prefix}
    }

    fn into_params(self) -> (Params, Option<String>) {
        let params = Params{num: self.num, diff: self.diff, dt: self.dt, tf: self.tf,
                teq: self.teq, tau: self.tau, f0: self.f0, delta: self.delta,
                tf_trajectory: self.tf_trajectory, seed: self.seed,
                write_trajectories: self.write_trajectories,
                reset_histogram: self.reset_histogram, bins_per_unit: self.bins_per_unit,
                half_width: self.half_width, log_step: self.log_step};
        (params, self.prefix)
    }

    pub fn load(path: &Path) -> Result<FileConfig, SimError> {
        if !path.exists() {
            return Err(SimError::MissingConfig(path.to_path_buf()));
        }
        Ok(confy::load_path(path)?)
    }
}

/// Everything the binary needs: validated parameters and where to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub params: Params,
    pub prefix: String,
    pub config_file: Option<PathBuf>,
}

impl Config {

    // initialize configuration from command line arguments
    pub fn new() -> Result<Config, SimError> {
        let matches = Config::app().get_matches();
        Config::from_matches(&matches)
    }

    pub fn from_args<I, T>(args: I) -> Result<Config, SimError>
        where I: IntoIterator<Item = T>, T: Into<OsString> + Clone {
        let matches = Config::app().get_matches_from_safe(args)?;
        Config::from_matches(&matches)
    }

    fn app() -> App<'static, 'static> {
        App::new("Langevin dynamics of active particles with dry friction")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Integrates an ensemble of independent active particles subject to Coulomb friction and thermal noise. \
                    Writes trajectories, mean-squared displacement and the stationary velocity density.")
            .arg(Arg::with_name("NUM")
                .short("N")
                .long("num")
                .help("Number of realizations [default: 20]")
                .takes_value(true))
            .arg(Arg::with_name("DIFF")
                .short("D")
                .long("diff")
                .help("Diffusion constant [default: 1.0]")
                .takes_value(true))
            .arg(Arg::with_name("DT")
                .long("dt")
                .help("Time step of the Euler-Maruyama scheme [default: 0.001]")
                .takes_value(true))
            .arg(Arg::with_name("TF")
                .short("t")
                .long("tf")
                .help("Duration of the measurement run [default: 2000]")
                .takes_value(true))
            .arg(Arg::with_name("TEQ")
                .long("teq")
                .help("Equilibration time before sampling starts [default: 1000]")
                .takes_value(true))
            .arg(Arg::with_name("TAU")
                .long("tau")
                .help("Persistence time of the activity [default: 1.0]")
                .takes_value(true))
            .arg(Arg::with_name("F0")
                .long("f0")
                .help("Activity amplitude [default: 0.01]")
                .takes_value(true))
            .arg(Arg::with_name("DELTA")
                .long("delta")
                .help("Strength of the Coulomb friction [default: 0]")
                .takes_value(true))
            .arg(Arg::with_name("TFTRAJ")
                .long("tf-trajectory")
                .help("Output period of the trajectories and first MSD interval [default: 1.0]")
                .takes_value(true))
            .arg(Arg::with_name("SEED")
                .long("seed")
                .help("Random seed [default: 0]")
                .takes_value(true))
            .arg(Arg::with_name("PREFIX")
                .short("o")
                .long("prefix")
                .help("Path prefix for the output files")
                .takes_value(true))
            .arg(Arg::with_name("BINS")
                .long("bins-per-unit")
                .help("Histogram bins per unit velocity [default: 10]")
                .takes_value(true))
            .arg(Arg::with_name("HALFWIDTH")
                .long("half-width")
                .help("Histogram covers velocities in (-w, w) [default: 101]")
                .takes_value(true))
            .arg(Arg::with_name("IO")
                .short("i")
                .long("iostep")
                .help("Number of steps between progress messages, 0 disables [default: 0]")
                .takes_value(true))
            .arg(Arg::with_name("NOTRAJ")
                .long("no-trajectories")
                .help("Do not write trajectory, velocity and activity files"))
            .arg(Arg::with_name("KEEPHIST")
                .long("keep-equilibration-histogram")
                .help("Include velocities sampled during equilibration in the density"))
            .arg(Arg::with_name("CONFIG")
                .short("c")
                .long("config")
                .help("TOML configuration file [default: setup.toml when present]")
                .takes_value(true))
    }

    fn from_matches(matches: &ArgMatches) -> Result<Config, SimError> {
        let config_file = match matches.value_of("CONFIG") {
            Some(path) => Some(PathBuf::from(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
            None => None,
        };
        let file = match &config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let (mut params, file_prefix) = file.into_params();

        override_with(matches, "NUM", &mut params.num)?;
        override_with(matches, "DIFF", &mut params.diff)?;
        override_with(matches, "DT", &mut params.dt)?;
        override_with(matches, "TF", &mut params.tf)?;
        override_with(matches, "TEQ", &mut params.teq)?;
        override_with(matches, "TAU", &mut params.tau)?;
        override_with(matches, "F0", &mut params.f0)?;
        override_with(matches, "DELTA", &mut params.delta)?;
        override_with(matches, "TFTRAJ", &mut params.tf_trajectory)?;
        override_with(matches, "SEED", &mut params.seed)?;
        override_with(matches, "BINS", &mut params.bins_per_unit)?;
        override_with(matches, "HALFWIDTH", &mut params.half_width)?;
        override_with(matches, "IO", &mut params.log_step)?;
        if matches.is_present("NOTRAJ") {
            params.write_trajectories = false;
        }
        if matches.is_present("KEEPHIST") {
            params.reset_histogram = false;
        }

        params.validate()?;

        let prefix = matches.value_of("PREFIX").map(String::from)
            .or(file_prefix)
            .unwrap_or_else(|| format!("dry_{}", params.format_file_suffix()));

        Ok(Config{params, prefix, config_file})
    }
}

// convert a present match to the type of the field it replaces
fn override_with<T>(matches: &ArgMatches, tag: &'static str, field: &mut T) -> Result<(), SimError>
    where T: FromStr, <T as FromStr>::Err: std::fmt::Display {
    if let Some(raw) = matches.value_of(tag) {
        *field = FromStr::from_str(raw)
            .map_err(|e: T::Err| SimError::invalid(tag, format!("cannot parse `{}`: {}", raw, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let params = Params::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.num, 20);
        assert_eq!(params.delta, 0.0);
        assert_eq!(params.tf_trajectory, 1.0);
    }

    #[test]
    fn rejects_bad_values() {
        let cases: Vec<(&str, Params)> = vec![
            ("num", Params{num: 0, ..Params::default()}),
            ("dt", Params{dt: 0.0, ..Params::default()}),
            ("dt", Params{dt: -1e-3, ..Params::default()}),
            ("tau", Params{tau: 0.0, ..Params::default()}),
            ("tf_trajectory", Params{tf_trajectory: f64::NAN, ..Params::default()}),
            ("diff", Params{diff: -1.0, ..Params::default()}),
            ("teq", Params{teq: -1.0, ..Params::default()}),
            ("f0", Params{f0: f64::INFINITY, ..Params::default()}),
            ("half_width", Params{half_width: 0, ..Params::default()}),
            ("half_width", Params{half_width: usize::MAX, ..Params::default()}),
            ("half_width", Params{bins_per_unit: 1000, half_width: 1_000_000, ..Params::default()}),
        ];
        for (expected, params) in cases {
            match params.validate() {
                Err(SimError::InvalidParameter{name, ..}) => assert_eq!(name, expected),
                other => panic!("expected invalid {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn command_line_overrides_defaults() {
        let config = Config::from_args(vec![
            "md-dryfric", "-N", "3", "--dt", "0.01", "--delta", "0.5",
            "--no-trajectories", "--keep-equilibration-histogram", "-o", "out/run",
        ]).unwrap();
        assert_eq!(config.params.num, 3);
        assert_eq!(config.params.dt, 0.01);
        assert_eq!(config.params.delta, 0.5);
        assert_eq!(config.params.diff, 1.0);
        assert!(!config.params.write_trajectories);
        assert!(!config.params.reset_histogram);
        assert_eq!(config.prefix, "out/run");
    }

    #[test]
    fn oversized_histogram_is_rejected() {
        let err = Config::from_args(vec![
            "md-dryfric", "--half-width", "9223372036854775807", "-N", "1",
        ]).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter{name: "half_width", ..}));
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = Config::from_args(vec!["md-dryfric", "--tau", "slow"]).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter{name: "TAU", ..}));
    }

    #[test]
    fn invalid_value_fails_fast() {
        let err = Config::from_args(vec!["md-dryfric", "-N", "0"]).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter{name: "num", ..}));
    }

    #[test]
    fn default_prefix_carries_suffix() {
        let config = Config::from_args(vec!["md-dryfric", "--seed", "4"]).unwrap();
        assert_eq!(config.prefix, "dry_n20_D1_dt0.001_tau1_f0.01_delta0_seed4");
    }

    #[test]
    fn file_then_command_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("setup.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "num = 7\ntau = 2.5\nprefix = \"from_file\"").unwrap();
        drop(file);

        let path_arg = path.to_str().unwrap().to_string();
        let config = Config::from_args(vec![
            "md-dryfric".to_string(), "-c".to_string(), path_arg, "--tau".to_string(), "3.0".to_string(),
        ]).unwrap();
        assert_eq!(config.params.num, 7);
        assert_eq!(config.params.tau, 3.0);
        assert_eq!(config.params.dt, 0.001);
        assert_eq!(config.prefix, "from_file");
    }

    #[test]
    fn missing_config_file() {
        let err = Config::from_args(vec!["md-dryfric", "-c", "/nonexistent/setup.toml"]).unwrap_err();
        assert!(matches!(err, SimError::MissingConfig(_)));
    }
}
