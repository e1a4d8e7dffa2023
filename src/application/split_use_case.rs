// ============================================================
// Layer 2 — SplitUseCase
// ============================================================
// Turns one dataset index (`path,label` CSV) into the three
// split files the training commands read:
//
//   index.csv ──seeded shuffle──► train.csv / val.csv / test.csv
//
// The same seed always produces the same files.

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};

use crate::data::{
    dataset::{read_records, write_records, SignalRecord},
    splitter::{split_train_val_test, Splits},
};

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub index:          PathBuf,
    pub out_dir:        PathBuf,
    pub train_fraction: f64,
    pub val_fraction:   f64,
    pub seed:           u64,
}

/// Shuffle `records` and split them, rejecting fractions that do
/// not leave a valid partition.
pub fn init_random_split(
    records:        Vec<SignalRecord>,
    train_fraction: f64,
    val_fraction:   f64,
    seed:           u64,
) -> Result<Splits<SignalRecord>> {
    if !(0.0..=1.0).contains(&train_fraction) || !(0.0..=1.0).contains(&val_fraction) {
        bail!("Split fractions must lie in [0, 1] (train={train_fraction}, val={val_fraction})");
    }
    if train_fraction + val_fraction > 1.0 {
        bail!("train + val fractions exceed 1 ({})", train_fraction + val_fraction);
    }
    Ok(split_train_val_test(records, train_fraction, val_fraction, seed))
}

pub struct SplitUseCase {
    config: SplitConfig,
}

impl SplitUseCase {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Write the split files and return their sizes.
    pub fn execute(&self) -> Result<Splits<SignalRecord>> {
        let cfg = &self.config;

        let records = read_records(&cfg.index)?;
        tracing::info!("Read {} records from '{}'", records.len(), cfg.index.display());

        let splits = init_random_split(records, cfg.train_fraction, cfg.val_fraction, cfg.seed)?;

        fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.out_dir.display()))?;
        for (name, part) in [("train", &splits.train), ("val", &splits.val), ("test", &splits.test)] {
            let path = cfg.out_dir.join(format!("{name}.csv"));
            write_records(&path, part)?;
            tracing::debug!("Wrote {} rows to '{}'", part.len(), path.display());
        }

        tracing::info!(
            "Split: {} train, {} val, {} test",
            splits.train.len(),
            splits.val.len(),
            splits.test.len()
        );
        Ok(splits)
    }
}
