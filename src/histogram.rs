//! Online histogram of the particle velocities.
//!
//! Counts are kept in a flat buffer of `2 * bins_per_unit * half_width` bins
//! covering the open interval `(-half_width, half_width)`. The density is only
//! computed once, at the end of a run.

use log::warn;

/// Upper bound on the number of histogram bins (1 GiB of counts).
pub const MAX_BINS: usize = 1 << 27;

/// Number of bins for the given resolution and range, None when it overflows
/// or exceeds [`MAX_BINS`].
pub fn bin_count(bins_per_unit: usize, half_width: usize) -> Option<usize> {
    bins_per_unit.checked_mul(half_width)
        .and_then(|bins| bins.checked_mul(2))
        .filter(|bins| *bins <= MAX_BINS)
}

pub struct VelocityHistogram {
    counts: Vec<u64>,
    bins_per_unit: usize,
    half_width: usize,
}

impl VelocityHistogram {

    // sizes are checked by `Params::validate` through `bin_count`
    pub fn new(bins_per_unit: usize, half_width: usize) -> VelocityHistogram {
        VelocityHistogram{counts: vec![0; 2*bins_per_unit*half_width], bins_per_unit, half_width}
    }

    pub fn bins_per_unit(&self) -> usize {
        self.bins_per_unit
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bin_width(&self) -> f64 {
        1.0/(self.bins_per_unit as f64)
    }

    // bin of a velocity, None outside the representable range
    pub fn bin_index(&self, v: f64) -> Option<usize> {
        let hw = self.half_width as f64;
        if !(v.abs() < hw) {
            return None;
        }
        let idx = ((v + hw)*(self.bins_per_unit as f64)).round() as usize;
        if idx < self.counts.len() {
            Some(idx)
        } else {
            None
        }
    }

    pub fn record(&mut self, v: f64) {
        if let Some(idx) = self.bin_index(v) {
            self.counts[idx] += 1;
        }
    }

    pub fn reset(&mut self) {
        for c in self.counts.iter_mut() {
            *c = 0;
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bin_center(&self, idx: usize) -> f64 {
        (idx as f64 - (self.bins_per_unit*self.half_width) as f64)/(self.bins_per_unit as f64)
    }

    /// Normalized probability density, one `(bin_center, density)` pair per bin.
    ///
    /// The densities integrate to one over the bin width. An empty histogram
    /// yields zero density everywhere.
    pub fn density(&self) -> Vec<(f64, f64)> {
        let total = self.total();
        if total == 0 {
            warn!("velocity histogram is empty, density is zero everywhere");
        }
        let scale = if total == 0 { 0.0 } else { self.bins_per_unit as f64/total as f64 };
        self.counts.iter()
            .enumerate()
            .map(|(i, &c)| (self.bin_center(i), c as f64*scale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let hist = VelocityHistogram::new(10, 101);
        assert_eq!(hist.counts().len(), 2020);
        assert_eq!(hist.bin_center(0), -101.0);
        assert_eq!(hist.bin_center(1010), 0.0);
        assert_eq!(hist.bin_index(0.0), Some(1010));
        assert_eq!(hist.bin_index(0.04), Some(1010));
        assert_eq!(hist.bin_index(-0.06), Some(1009));
    }

    #[test]
    fn bin_count_limits() {
        assert_eq!(bin_count(10, 101), Some(2020));
        assert_eq!(bin_count(1, MAX_BINS/2), Some(MAX_BINS));
        assert_eq!(bin_count(1, MAX_BINS/2 + 1), None);
        assert_eq!(bin_count(10, usize::MAX), None);
        assert_eq!(bin_count(usize::MAX/2 + 1, 1), None);
    }

    #[test]
    fn out_of_range_is_dropped() {
        let mut hist = VelocityHistogram::new(10, 101);
        hist.record(101.0);
        hist.record(-101.0);
        hist.record(250.0);
        hist.record(f64::NAN);
        // rounds to the buffer length
        hist.record(100.97);
        assert_eq!(hist.total(), 0);
        hist.record(-100.97);
        assert_eq!(hist.total(), 1);
        assert_eq!(hist.counts()[0], 1);
    }

    #[test]
    fn density_integrates_to_one() {
        let mut hist = VelocityHistogram::new(10, 5);
        for k in 0..1000 {
            hist.record(((k as f64)*0.37).sin()*3.0);
        }
        let integral: f64 = hist.density().iter().map(|(_, p)| p*hist.bin_width()).sum();
        assert!((integral - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_density_is_zero() {
        let hist = VelocityHistogram::new(2, 1);
        let density = hist.density();
        assert_eq!(density.len(), 4);
        assert!(density.iter().all(|(_, p)| *p == 0.0));
    }

    #[test]
    fn reset_clears_counts() {
        let mut hist = VelocityHistogram::new(10, 1);
        hist.record(0.5);
        hist.record(0.5);
        assert_eq!(hist.total(), 2);
        hist.reset();
        assert_eq!(hist.total(), 0);
    }
}
