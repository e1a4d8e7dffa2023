// ============================================================
// Layer 5 — Training Callbacks
// ============================================================
// Two callbacks watch one epoch-level metric:
//
//   EarlyStopping   — stops the fit after `patience` epochs
//                     without improvement
//   ModelCheckpoint — marks the epoch whose weights should be
//                     kept as "best"
//
// Metrics ending in `loss` are minimised, all others maximised.

use anyhow::{bail, Result};

use crate::infra::metrics::{EpochMetrics, KNOWN_METRICS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    Min,
    Max,
}

impl MonitorMode {
    pub fn for_metric(metric: &str) -> Self {
        if metric.ends_with("loss") { MonitorMode::Min } else { MonitorMode::Max }
    }
}

/// Tracks the best value seen so far for one metric.
#[derive(Debug, Clone)]
pub struct Monitor {
    metric: String,
    mode:   MonitorMode,
    best:   Option<f64>,
}

impl Monitor {
    pub fn new(metric: impl Into<String>) -> Self {
        let metric = metric.into();
        let mode   = MonitorMode::for_metric(&metric);
        Self { metric, mode, best: None }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Record `value`; true if it beats the best so far. NaN never improves.
    pub fn update(&mut self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let improved = match (self.best, self.mode) {
            (None, _)                   => true,
            (Some(b), MonitorMode::Min) => value < b,
            (Some(b), MonitorMode::Max) => value > b,
        };
        if improved {
            self.best = Some(value);
        }
        improved
    }
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    monitor:  Monitor,
    patience: usize,
    wait:     usize,
}

impl EarlyStopping {
    pub fn new(metric: impl Into<String>, patience: usize) -> Self {
        Self { monitor: Monitor::new(metric), patience, wait: 0 }
    }

    /// Returns true when training should stop after this epoch.
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> bool {
        let Some(value) = metrics.get(self.monitor.metric()) else {
            return false;
        };
        if self.monitor.update(value) {
            self.wait = 0;
            return false;
        }
        self.wait += 1;
        self.wait >= self.patience
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

#[derive(Debug, Clone)]
pub struct ModelCheckpoint {
    monitor: Monitor,
}

impl ModelCheckpoint {
    pub fn new(metric: impl Into<String>) -> Self {
        Self { monitor: Monitor::new(metric) }
    }

    /// Returns true when this epoch's weights become the new best.
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> bool {
        metrics
            .get(self.monitor.metric())
            .is_some_and(|v| self.monitor.update(v))
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

#[derive(Debug, Clone)]
pub struct Callbacks {
    pub early_stopping: EarlyStopping,
    pub checkpoint:     Option<ModelCheckpoint>,
}

/// Build the callback set for a run. `no_ckpt` disables best-model
/// checkpointing; early stopping is always active.
pub fn setup_callbacks(early_stopping_metric: &str, no_ckpt: bool, patience: usize) -> Result<Callbacks> {
    if !KNOWN_METRICS.contains(&early_stopping_metric) {
        bail!(
            "Unknown early stopping metric '{early_stopping_metric}' (expected one of {:?})",
            KNOWN_METRICS
        );
    }

    Ok(Callbacks {
        early_stopping: EarlyStopping::new(early_stopping_metric, patience),
        checkpoint:     (!no_ckpt).then(|| ModelCheckpoint::new(early_stopping_metric)),
    })
}
