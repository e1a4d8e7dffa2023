// ============================================================
// Layer 4 — Data Module
// ============================================================
// Owns the three splits of a run and hands out Burn data
// loaders for them:
//
//   split CSVs ──► SignalRecord ──load_wav──► LabelledSignal
//                                                │
//             train: train_transforms (+ augmentations)
//             val:   test_transforms  (+ augmentations)
//             test:  test_transforms
//                                                │
//                                   SignalDataset ──► DataLoader
//
// Augmentations only reach the splits used for the SSL
// objective; the test split is always seen through the plain
// test pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    audio::{load_wav, AudioFormat},
    batcher::{SignalBatch, SignalBatcher},
    dataset::{read_records, LabelledSignal, SignalDataset},
    transforms::Compose,
};

/// Locations of the three split files, relative to the data root.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPaths {
    pub train: PathBuf,
    pub val:   PathBuf,
    pub test:  PathBuf,
}

impl Default for SplitPaths {
    fn default() -> Self {
        Self {
            train: PathBuf::from("outputs/train.csv"),
            val:   PathBuf::from("outputs/val.csv"),
            test:  PathBuf::from("outputs/test.csv"),
        }
    }
}

/// Everything the data module needs to build its splits.
#[derive(Debug, Clone)]
pub struct DataModuleConfig {
    pub root:             PathBuf,
    pub batch_size:       usize,
    pub split:            SplitPaths,
    pub train_transforms: Compose,
    pub test_transforms:  Compose,
    pub augmentations:    Option<Compose>,
    pub n_views:          usize,
    pub num_workers:      usize,
    pub format:           AudioFormat,
    pub seed:             u64,
}

pub struct SupervisedDataModule {
    cfg:   DataModuleConfig,
    train: SignalDataset,
    val:   SignalDataset,
    test:  SignalDataset,
}

impl SupervisedDataModule {
    /// Read every split file and decode its audio into memory.
    pub fn load(cfg: DataModuleConfig) -> Result<Self> {
        let train_signals = load_split(&cfg.root, &cfg.split.train, cfg.format)?;
        let val_signals   = load_split(&cfg.root, &cfg.split.val, cfg.format)?;
        let test_signals  = load_split(&cfg.root, &cfg.split.test, cfg.format)?;
        Ok(Self::from_signals(cfg, train_signals, val_signals, test_signals))
    }

    /// Build the module from already-decoded splits.
    pub fn from_signals(
        cfg:   DataModuleConfig,
        train: Vec<LabelledSignal>,
        val:   Vec<LabelledSignal>,
        test:  Vec<LabelledSignal>,
    ) -> Self {
        let train_pipeline = with_augmentations(&cfg.train_transforms, &cfg.augmentations);
        let val_pipeline   = with_augmentations(&cfg.test_transforms, &cfg.augmentations);

        tracing::info!(
            "Data module ready: {} train, {} val, {} test samples",
            train.len(),
            val.len(),
            test.len(),
        );

        Self {
            train: SignalDataset::new(train, train_pipeline, cfg.n_views),
            val:   SignalDataset::new(val, val_pipeline, cfg.n_views),
            test:  SignalDataset::new(test, cfg.test_transforms.clone(), cfg.n_views),
            cfg,
        }
    }

    /// Fail unless every label of every split is a class id in
    /// `0..num_classes`.
    pub fn validate_labels(&self, num_classes: usize) -> Result<()> {
        for (name, split) in [("train", &self.train), ("val", &self.val), ("test", &self.test)] {
            if let Some(bad) = split
                .labels()
                .find(|&l| l < 0 || l as usize >= num_classes)
            {
                bail!("Label {bad} in the {name} split is outside 0..{num_classes}");
            }
        }
        Ok(())
    }

    pub fn train_loader<B: Backend>(&self, device: &B::Device) -> Arc<dyn DataLoader<SignalBatch<B>>> {
        DataLoaderBuilder::new(SignalBatcher::<B>::new(device.clone()))
            .batch_size(self.cfg.batch_size)
            .shuffle(self.cfg.seed)
            .num_workers(self.cfg.num_workers)
            .build(self.train.clone())
    }

    pub fn val_loader<B: Backend>(&self, device: &B::Device) -> Arc<dyn DataLoader<SignalBatch<B>>> {
        self.eval_loader(self.val.clone(), device)
    }

    pub fn test_loader<B: Backend>(&self, device: &B::Device) -> Arc<dyn DataLoader<SignalBatch<B>>> {
        self.eval_loader(self.test.clone(), device)
    }

    fn eval_loader<B: Backend>(
        &self,
        dataset: SignalDataset,
        device:  &B::Device,
    ) -> Arc<dyn DataLoader<SignalBatch<B>>> {
        DataLoaderBuilder::new(SignalBatcher::<B>::new(device.clone()))
            .batch_size(self.cfg.batch_size)
            .num_workers(self.cfg.num_workers)
            .build(dataset)
    }
}

fn with_augmentations(base: &Compose, augmentations: &Option<Compose>) -> Compose {
    match augmentations {
        Some(aug) if !aug.is_empty() => Compose::new(vec![Arc::new(base.clone()), Arc::new(aug.clone())]),
        _ => base.clone(),
    }
}

fn load_split(root: &Path, csv: &Path, format: AudioFormat) -> Result<Vec<LabelledSignal>> {
    let records = read_records(&root.join(csv))?;
    tracing::info!("Decoding {} clips listed in '{}'", records.len(), csv.display());

    records
        .iter()
        .map(|r| {
            let label = i32::try_from(r.label).with_context(|| {
                format!("Label {} of '{}' does not fit a class id", r.label, r.path)
            })?;
            let signal = load_wav(&r.resolve(root), format)?;
            Ok(LabelledSignal { signal, label })
        })
        .collect()
}
