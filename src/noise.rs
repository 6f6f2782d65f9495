use rand::prelude::*;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

/// Source of independent standard-normal deviates.
pub trait NoiseSource {
    fn standard_normal(&mut self) -> f64;
}

/// Gaussian white noise from a seeded PCG generator.
pub struct GaussianNoise {
    rng: Pcg64,
}

impl GaussianNoise {

    pub fn from_seed(seed: u64) -> GaussianNoise {
        GaussianNoise{rng: Pcg64::seed_from_u64(seed)}
    }
}

impl NoiseSource for GaussianNoise {
    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

impl<R: NoiseSource + ?Sized> NoiseSource for &mut R {
    fn standard_normal(&mut self) -> f64 {
        (**self).standard_normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = GaussianNoise::from_seed(7);
        let mut b = GaussianNoise::from_seed(7);
        for _ in 0..100 {
            assert_eq!(a.standard_normal(), b.standard_normal());
        }
    }

    #[test]
    fn moments_are_standard() {
        let mut noise = GaussianNoise::from_seed(1);
        let samples: Vec<f64> = (0..200_000).map(|_| noise.standard_normal()).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.01, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.02, "variance {}", var);
    }
}
