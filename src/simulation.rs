use std::io::Write;
use std::time::Instant;

use log::{debug, info};

use crate::config::Params;
use crate::error::SimError;
use crate::histogram::VelocityHistogram;
use crate::kahan::KahanAdder;
use crate::noise::NoiseSource;
use crate::output::OutputStreams;

/// Factor by which the interval between MSD samples grows after each sample.
pub const MSD_GROWTH: f64 = 1.1;

/// Lock-step ensemble of independent active particles with dry friction.
pub struct Simulation<R: NoiseSource> {
    x: Vec<f64>,
    v: Vec<f64>,
    n: Vec<f64>,
    x_init: Vec<f64>,
    hist: VelocityHistogram,
    t: f64,
    params: Params,
    var_noise: f64,
    activity_noise: f64,
    noise: R,
    steps: usize,
}

/// Which outputs are due after a step.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Emission {
    pub trajectory: bool,
    pub msd: bool,
}

/// The two output cadences of a measurement run: trajectories every
/// `trajectory_period`, MSD samples at geometrically growing intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSchedule {
    since_trajectory: f64,
    trajectory_period: f64,
    since_msd: f64,
    msd_interval: f64,
}

impl MeasurementSchedule {

    pub fn new(trajectory_period: f64) -> MeasurementSchedule {
        MeasurementSchedule{since_trajectory: 0.0, trajectory_period,
                since_msd: 0.0, msd_interval: trajectory_period}
    }

    pub fn msd_interval(&self) -> f64 {
        self.msd_interval
    }

    pub fn advance(&mut self, dt: f64) -> Emission {
        let mut due = Emission::default();

        self.since_trajectory += dt;
        if self.since_trajectory >= self.trajectory_period {
            self.since_trajectory = 0.0;
            due.trajectory = true;
        }

        self.since_msd += dt;
        if self.since_msd >= self.msd_interval {
            self.since_msd = 0.0;
            self.msd_interval *= MSD_GROWTH;
            due.msd = true;
        }
        due
    }
}

/// Sign of the friction force: zero exactly at rest.
pub fn friction_sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    }
    else if v < 0.0 {
        -1.0
    }
    else {
        0.0
    }
}

impl<R: NoiseSource> Simulation<R> {

    // allocate the ensemble and bring it to the initial state
    pub fn new(params: Params, noise: R) -> Simulation<R> {
        let num = params.num;
        let hist = VelocityHistogram::new(params.bins_per_unit, params.half_width);
        let mut sim = Simulation{x: vec![0.0; num], v: vec![0.0; num], n: vec![0.0; num],
                x_init: vec![0.0; num], hist: hist, t: 0.0, params: params,
                var_noise: 0.0, activity_noise: 0.0, noise: noise, steps: 0};
        sim.init();
        sim
    }

    /// Zero the state and histogram and compute the noise amplitudes.
    pub fn init(&mut self) {
        for buf in vec![&mut self.x, &mut self.v, &mut self.n, &mut self.x_init] {
            for value in buf.iter_mut() {
                *value = 0.0;
            }
        }
        self.hist.reset();

        let dt = self.params.dt;
        self.var_noise = (2.0*self.params.diff*dt).sqrt();
        self.activity_noise = (2.0*dt/self.params.tau).sqrt();
        self.t = 0.0;
        self.steps = 0;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn positions(&self) -> &[f64] {
        &self.x
    }

    pub fn velocities(&self) -> &[f64] {
        &self.v
    }

    pub fn activities(&self) -> &[f64] {
        &self.n
    }

    // slices keep every per-realization buffer at length N
    pub fn positions_mut(&mut self) -> &mut [f64] {
        &mut self.x
    }

    pub fn velocities_mut(&mut self) -> &mut [f64] {
        &mut self.v
    }

    pub fn activities_mut(&mut self) -> &mut [f64] {
        &mut self.n
    }

    pub fn initial_positions(&self) -> &[f64] {
        &self.x_init
    }

    pub fn histogram(&self) -> &VelocityHistogram {
        &self.hist
    }

    pub fn noise_amplitudes(&self) -> (f64, f64) {
        (self.var_noise, self.activity_noise)
    }

    /// Advance every realization by one time step.
    pub fn step(&mut self) {
        let dt = self.params.dt;
        let delta = self.params.delta;
        let f0 = self.params.f0;
        let tau = self.params.tau;

        // apply Euler–Maruyama method to every realization
        for i in 0..(self.x.len()) {
            let v = self.v[i];
            self.x[i] += dt*v;

            // friction can stop a particle but never push it backwards
            let friction = friction_sign(v)*(dt*delta).min(v.abs());
            self.v[i] += dt*self.n[i]*f0 - friction + self.var_noise*self.noise.standard_normal();

            let n = self.n[i];
            self.n[i] += dt*(-n/tau) + self.activity_noise*self.noise.standard_normal();

            self.hist.record(self.v[i]);
        }

        self.t += dt;
        self.steps += 1;

        let log_step = self.params.log_step;
        if log_step > 0 && self.steps % log_step == 0 {
            info!("step {} t = {:.3}", self.steps, self.t);
        }
    }

    /// Integrate without measuring until `teq`, then take the displacement origin.
    pub fn equilibrate(&mut self, teq: f64) {
        self.t = 0.0;
        self.steps = 0;
        while self.t < teq {
            self.step();
        }
        self.x_init.copy_from_slice(&self.x);
        debug!("equilibrated after {} steps, t = {}", self.steps, self.t);
    }

    /// Mean-squared displacement from the post-equilibration positions.
    pub fn msd(&self) -> f64 {
        let sum: KahanAdder = self.x.iter()
            .zip(&self.x_init)
            .map(|(x, x0)| (x - x0)*(x - x0))
            .collect();
        sum.result()/(self.x.len() as f64)
    }

    /// One measurement step: integrate, then write whatever the schedule says is due.
    pub fn measure_step<W: Write>(&mut self, schedule: &mut MeasurementSchedule,
            out: &mut OutputStreams<W>) -> Result<Emission, SimError> {
        self.step();
        let due = schedule.advance(self.params.dt);

        if due.trajectory && self.params.write_trajectories {
            out.write_state(self.t, &self.x, &self.v, &self.n)?;
        }
        if due.msd {
            out.write_msd(self.t, self.msd())?;
        }
        Ok(due)
    }

    /// Measurement run of length `tf`, finished by the velocity density.
    pub fn run<W: Write>(&mut self, tf: f64, out: &mut OutputStreams<W>) -> Result<(), SimError> {
        self.t = 0.0;
        self.steps = 0;
        let mut schedule = MeasurementSchedule::new(self.params.tf_trajectory);

        while self.t < tf {
            self.measure_step(&mut schedule, out)?;
        }

        out.write_density(&self.hist.density())?;
        out.finish()?;
        Ok(())
    }
}

/// Equilibrate, optionally drop the equilibration histogram, then measure.
pub fn simulate<R: NoiseSource, W: Write>(sim: &mut Simulation<R>,
        out: &mut OutputStreams<W>) -> Result<(), SimError> {
    let teq = sim.params().teq;
    let tf = sim.params().tf;

    let start = Instant::now();
    sim.equilibrate(teq);
    info!("equilibration finished in {:.3} s", start.elapsed().as_secs_f64());

    if sim.params().reset_histogram {
        sim.hist.reset();
    }

    let start = Instant::now();
    sim.run(tf, out)?;
    info!("measurement finished in {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}
