use anyhow::{Context, Result};
use log::info;

use md_dryfric::config::Config;
use md_dryfric::noise::GaussianNoise;
use md_dryfric::output::OutputStreams;
use md_dryfric::simulation::{simulate, Simulation};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // parse command line options and configuration file
    let config = Config::new().context("invalid configuration")?;
    let p = &config.params;

    if let Some(path) = &config.config_file {
        info!("configuration file: {}", path.display());
    }
    info!("realizations: {}, seed: {}, output prefix: {}", p.num, p.seed, config.prefix);
    info!("D: {}, tau: {}, f0: {}, delta: {}", p.diff, p.tau, p.f0, p.delta);
    info!("dt: {}, teq: {}, tf: {}, tfTrajectory: {}", p.dt, p.teq, p.tf, p.tf_trajectory);

    // open every stream before any work is done
    let mut out = OutputStreams::create(&config.prefix, p.write_trajectories)
        .context("cannot prepare output files")?;

    let mut sim = Simulation::new(p.clone(), GaussianNoise::from_seed(p.seed));
    simulate(&mut sim, &mut out).context("simulation failed")?;

    info!("done");
    Ok(())
}
