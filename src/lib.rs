//! Euler–Maruyama integration of an ensemble of active particles subject to
//! dry (Coulomb) friction, a persistent activity process and thermal noise.

pub mod config;
pub mod error;
pub mod histogram;
pub mod kahan;
pub mod noise;
pub mod output;
pub mod simulation;
