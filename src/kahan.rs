use std::iter::FromIterator;
use std::ops::AddAssign;

/// Compensated (Kahan) summation, keeps the ensemble averages accurate for
/// large realization counts.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct KahanAdder {
    accum: f64,
    comp: f64
}

impl KahanAdder {

    pub fn new() -> Self {
        KahanAdder{accum: 0.0, comp: 0.0}
    }

    pub fn add(&mut self, num: f64) {
        let y = num - self.comp;
        let t = self.accum + y;
        self.comp = (t - self.accum) - y;
        self.accum = t;
    }

    pub fn result(&self) -> f64 {
        self.accum
    }
}

impl AddAssign<f64> for KahanAdder {
    fn add_assign(&mut self, other: f64) {
        self.add(other);
    }
}

impl FromIterator<f64> for KahanAdder {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut adder = KahanAdder::new();
        for num in iter {
            adder += num;
        }
        adder
    }
}
