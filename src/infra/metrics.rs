// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Writes one CSV row per epoch to `<run dir>/metrics.csv`. The
// file is started fresh for every run:
//
//   epoch,train_loss,val_loss,val_acc
//   1,2.079400,2.071100,0.125000
//   2,1.993200,2.010500,0.187500
//
// `val_acc` is empty for SSL runs, which have no labels to score.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches
    pub train_loss: f64,

    /// Mean loss over all validation batches
    pub val_loss: f64,

    /// Fraction of validation samples classified correctly, if the
    /// objective has labels
    pub val_acc: Option<f64>,
}

impl EpochMetrics {
    /// Look a metric up by the name callbacks monitor it under.
    pub fn get(&self, metric: &str) -> Option<f64> {
        match metric {
            "train_loss" => Some(self.train_loss),
            "val_loss"   => Some(self.val_loss),
            "val_acc"    => self.val_acc,
            _            => None,
        }
    }
}

/// Names accepted by [`EpochMetrics::get`].
pub const KNOWN_METRICS: [&str; 3] = ["train_loss", "val_loss", "val_acc"];

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, truncating any earlier `metrics.csv` to
    /// just the header.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss,val_acc")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let acc = m.val_acc.map(|a| format!("{a:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{:.6},{}", m.epoch, m.train_loss, m.val_loss, acc)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
