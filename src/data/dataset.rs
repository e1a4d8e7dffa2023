use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::transforms::Compose;
use crate::domain::traits::{Signal, Transform};

/// One row of a split file: a WAV path and its integer class id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub path:  String,
    pub label: i64,
}

impl SignalRecord {
    /// Resolve `path` against `root` unless it is already absolute.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let p = Path::new(&self.path);
        if p.is_absolute() { p.to_path_buf() } else { root.join(p) }
    }
}

/// Read every record of a `path,label` CSV file.
pub fn read_records(csv_path: &Path) -> Result<Vec<SignalRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Cannot open split file '{}'", csv_path.display()))?;

    reader
        .deserialize()
        .collect::<Result<Vec<SignalRecord>, _>>()
        .with_context(|| format!("Malformed row in '{}'", csv_path.display()))
}

/// Write records back out with a `path,label` header.
pub fn write_records(csv_path: &Path, records: &[SignalRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Cannot create split file '{}'", csv_path.display()))?;
    for r in records {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

/// A decoded signal together with its label.
#[derive(Debug, Clone)]
pub struct LabelledSignal {
    pub signal: Signal,
    pub label:  i32,
}

/// What the data loader hands to the batcher: `n_views`
/// independently transformed copies of one signal.
#[derive(Debug, Clone)]
pub struct SignalItem {
    pub views: Vec<Signal>,
    pub label: i32,
}

/// In-memory split. Cloning shares the decoded signals.
#[derive(Debug, Clone)]
pub struct SignalDataset {
    samples:   Arc<Vec<LabelledSignal>>,
    transform: Compose,
    n_views:   usize,
}

impl SignalDataset {
    pub fn new(samples: Vec<LabelledSignal>, transform: Compose, n_views: usize) -> Self {
        Self {
            samples: Arc::new(samples),
            transform,
            n_views: n_views.max(1),
        }
    }

    /// Every label of the split, in order.
    pub fn labels(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples.iter().map(|s| s.label)
    }
}

impl Dataset<SignalItem> for SignalDataset {
    fn get(&self, index: usize) -> Option<SignalItem> {
        let sample = self.samples.get(index)?;
        let views = (0..self.n_views)
            .map(|_| self.transform.apply(sample.signal.clone()))
            .collect();
        Some(SignalItem { views, label: sample.label })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
