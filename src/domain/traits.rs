// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Every pipeline member, whether a deterministic transform or a
// random augmentation, implements `Transform`. Pipelines hold
// them as `Arc<dyn Transform>` so that one instance can sit in
// both the train and the test pipeline, and so the data loader
// workers can share them across threads.

use std::fmt::Debug;

/// A single-channel signal sample: amplitude values in time order.
pub type Signal = Vec<f32>;

/// A step applied to one sample.
pub trait Transform: Debug + Send + Sync {
    /// Short name used in logs (the registered class name).
    fn name(&self) -> &str;

    /// Apply the step, consuming the input sample.
    fn apply(&self, signal: Signal) -> Signal;
}
