// ============================================================
// Layer 4 — Random Augmentations
// ============================================================
// Stochastic transforms registered under `utils.aug`. They are
// used to build the two views of each sample during SSL
// pre-training; the supervised path never applies them.
//
// Each augmentation owns its distribution, built and validated at
// construction time, and draws from the thread-local RNG so data
// loader workers never contend on a shared generator.

use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::domain::error::{AssemblyError, AssemblyResult};
use crate::domain::traits::{Signal, Transform};

fn default_sigma() -> f32 {
    0.1
}

/// Constructor arguments shared by the Gaussian augmentations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigmaArgs {
    #[serde(default = "default_sigma")]
    pub sigma: f32,
}

/// `Normal::new` takes a negative sigma as a mirrored
/// distribution, so the sign is checked here.
fn normal(class: &str, mean: f32, sigma: f32) -> AssemblyResult<Normal<f32>> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(AssemblyError::invalid(
            class,
            format!("sigma must be a finite non-negative number, got {sigma}"),
        ));
    }
    Normal::new(mean, sigma).map_err(|e| AssemblyError::invalid(class, e.to_string()))
}

// ─── Jitter ───────────────────────────────────────────────────────────────────
/// Additive Gaussian noise, N(0, sigma) per sample point.
#[derive(Debug, Clone)]
pub struct Jitter {
    noise: Normal<f32>,
}

impl Jitter {
    pub fn new(sigma: f32) -> AssemblyResult<Self> {
        Ok(Self { noise: normal("Jitter", 0.0, sigma)? })
    }
}

impl Transform for Jitter {
    fn name(&self) -> &str {
        "Jitter"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        let mut rng = rand::thread_rng();
        signal.iter_mut().for_each(|x| *x += self.noise.sample(&mut rng));
        signal
    }
}

// ─── Scale ────────────────────────────────────────────────────────────────────
/// Multiplies the whole sample by one factor drawn from N(1, sigma).
#[derive(Debug, Clone)]
pub struct Scale {
    factor: Normal<f32>,
}

impl Scale {
    pub fn new(sigma: f32) -> AssemblyResult<Self> {
        Ok(Self { factor: normal("Scale", 1.0, sigma)? })
    }
}

impl Transform for Scale {
    fn name(&self) -> &str {
        "Scale"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        let factor = self.factor.sample(&mut rand::thread_rng());
        signal.iter_mut().for_each(|x| *x *= factor);
        signal
    }
}

// ─── TimeShift ────────────────────────────────────────────────────────────────
/// Circular shift by a uniform offset in [-max_shift, max_shift].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeShift {
    #[serde(default = "default_max_shift")]
    pub max_shift: usize,
}

fn default_max_shift() -> usize {
    1600
}

impl Transform for TimeShift {
    fn name(&self) -> &str {
        "TimeShift"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        let len = signal.len();
        if len == 0 || self.max_shift == 0 {
            return signal;
        }
        let max   = self.max_shift.min(len - 1) as i64;
        let shift = rand::thread_rng().gen_range(-max..=max);
        let by    = shift.rem_euclid(len as i64) as usize;
        signal.rotate_right(by);
        signal
    }
}

// ─── Gain ─────────────────────────────────────────────────────────────────────
/// Random gain in decibels, uniform in [min_db, max_db].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gain {
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
}

fn default_min_db() -> f32 {
    -6.0
}

fn default_max_db() -> f32 {
    6.0
}

impl Gain {
    pub fn new(min_db: f32, max_db: f32) -> AssemblyResult<Self> {
        if !(min_db <= max_db) {
            return Err(AssemblyError::invalid(
                "Gain",
                format!("min_db ({min_db}) must not exceed max_db ({max_db})"),
            ));
        }
        Ok(Self { min_db, max_db })
    }
}

impl Transform for Gain {
    fn name(&self) -> &str {
        "Gain"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        let db = if self.min_db == self.max_db {
            self.min_db
        } else {
            rand::thread_rng().gen_range(self.min_db..=self.max_db)
        };
        let factor = 10f32.powf(db / 20.0);
        signal.iter_mut().for_each(|x| *x *= factor);
        signal
    }
}

// ─── RandomApply ──────────────────────────────────────────────────────────────
/// Applies the wrapped augmentation with the given probability.
#[derive(Debug, Clone)]
pub struct RandomApply {
    inner:       Arc<dyn Transform>,
    probability: f64,
}

impl RandomApply {
    pub fn new(inner: Arc<dyn Transform>, probability: f64) -> AssemblyResult<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(AssemblyError::invalid(
                inner.name(),
                format!("probability {probability} outside [0, 1]"),
            ));
        }
        Ok(Self { inner, probability })
    }
}

impl Transform for RandomApply {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn apply(&self, signal: Signal) -> Signal {
        if rand::thread_rng().gen_bool(self.probability) {
            self.inner.apply(signal)
        } else {
            signal
        }
    }
}
