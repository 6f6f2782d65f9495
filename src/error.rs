//! Error types for the simulation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// A parameter that the update rule cannot work with
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An output stream could not be opened before the run
    #[error("unable to open output file {}: {source}", .path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a record failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration file {} does not exist", .0.display())]
    MissingConfig(PathBuf),

    #[error("configuration file error: {0}")]
    ConfigFile(#[from] confy::ConfyError),

    #[error("{0}")]
    Cli(#[from] clap::Error),
}

impl SimError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
