// ============================================================
// Layer 4 — Deterministic Transforms and Composition
// ============================================================
// `Compose` is the pipeline object: an ordered list of shared
// transforms applied in insertion order. An empty `Compose` is
// the identity.
//
// The built-in deterministic transforms registered under the
// `utils.transforms` module live here too. Each one derives
// `Deserialize` so its constructor arguments can be decoded
// straight from a descriptor's kwargs; unknown kwargs are
// rejected just like an unexpected keyword argument would be.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::error::{AssemblyError, AssemblyResult};
use crate::domain::traits::{Signal, Transform};

// ─── Compose ──────────────────────────────────────────────────────────────────
/// An ordered, composed sequence of transforms.
#[derive(Debug, Clone, Default)]
pub struct Compose {
    steps: Vec<Arc<dyn Transform>>,
}

impl Compose {
    pub fn new(steps: Vec<Arc<dyn Transform>>) -> Self {
        Self { steps }
    }

    /// The pipeline that leaves every sample unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Arc<dyn Transform>] {
        &self.steps
    }

    /// Names of the member transforms, in application order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Transform for Compose {
    fn name(&self) -> &str {
        "Compose"
    }

    fn apply(&self, signal: Signal) -> Signal {
        self.steps.iter().fold(signal, |acc, step| step.apply(acc))
    }
}

// ─── Normalize ────────────────────────────────────────────────────────────────
/// Peak normalisation into [-1, 1]. Silent input is left as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Normalize {}

impl Transform for Normalize {
    fn name(&self) -> &str {
        "Normalize"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        let peak = signal.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        if peak > 0.0 {
            signal.iter_mut().for_each(|x| *x /= peak);
        }
        signal
    }
}

// ─── Standardize ──────────────────────────────────────────────────────────────
/// Zero mean, unit variance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Standardize {
    #[serde(default = "default_eps")]
    pub eps: f32,
}

fn default_eps() -> f32 {
    1e-8
}

impl Transform for Standardize {
    fn name(&self) -> &str {
        "Standardize"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        if signal.is_empty() {
            return signal;
        }
        let n    = signal.len() as f32;
        let mean = signal.iter().sum::<f32>() / n;
        let var  = signal.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
        let std  = var.sqrt().max(self.eps);
        signal.iter_mut().for_each(|x| *x = (*x - mean) / std);
        signal
    }
}

// ─── PadOrCrop ────────────────────────────────────────────────────────────────
/// Fix the sample length: trailing zero padding or truncation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PadOrCrop {
    pub length: usize,
}

impl PadOrCrop {
    pub fn new(length: usize) -> AssemblyResult<Self> {
        if length == 0 {
            return Err(AssemblyError::invalid("PadOrCrop", "length must be positive"));
        }
        Ok(Self { length })
    }
}

impl Transform for PadOrCrop {
    fn name(&self) -> &str {
        "PadOrCrop"
    }

    fn apply(&self, mut signal: Signal) -> Signal {
        signal.resize(self.length, 0.0);
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_compose_is_identity() {
        let signal = vec![0.5, -1.0, 2.0];
        assert_eq!(Compose::identity().apply(signal.clone()), signal);
    }

    #[test]
    fn compose_applies_in_insertion_order() {
        // Crop first then normalise, versus normalise then crop
        let crop: Arc<dyn Transform> = Arc::new(PadOrCrop::new(2).unwrap());
        let norm: Arc<dyn Transform> = Arc::new(Normalize {});

        let a = Compose::new(vec![crop.clone(), norm.clone()]);
        let b = Compose::new(vec![norm, crop]);

        let signal = vec![1.0, 2.0, 4.0];
        assert_eq!(a.apply(signal.clone()), vec![0.5, 1.0]);
        assert_eq!(b.apply(signal), vec![0.25, 0.5]);
        assert_eq!(a.names(), vec!["PadOrCrop", "Normalize"]);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        assert_eq!(Normalize {}.apply(vec![0.0; 4]), vec![0.0; 4]);
    }

    #[test]
    fn standardize_gives_zero_mean() {
        let out = Standardize { eps: 1e-8 }.apply(vec![1.0, 2.0, 3.0, 4.0]);
        let mean: f32 = out.iter().sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 1e-6);
    }

    #[test]
    fn pad_or_crop_fixes_length() {
        let t = PadOrCrop::new(4).unwrap();
        assert_eq!(t.apply(vec![1.0, 2.0]), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(t.apply(vec![1.0; 6]).len(), 4);
        assert!(PadOrCrop::new(0).is_err());
    }
}
