// ============================================================
// Layer 5 — Trainer
// ============================================================
// A fit/test loop shared by the supervised and SSL entry points.
//
//   fit(model, datamodule):
//     for each epoch
//       train phase  — Autodiff backend, Adam step per batch
//       valid phase  — model.valid() on the inner backend
//       metrics.csv row, "last" checkpoint
//       ModelCheckpoint → "best" checkpoint on improvement
//       EarlyStopping   → break once patience is exhausted
//
//   test(model, datamodule, ckpt):
//     load the selected weights, evaluate the test split
//
// Any model that can turn a `SignalBatch` into a loss (the
// `StepModel` trait) can be trained here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;

use crate::data::{batcher::SignalBatch, datamodule::SupervisedDataModule};
use crate::infra::checkpoint::{BestCheckpoint, CheckpointManager, CkptSelection};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::callbacks::Callbacks;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Loss of one batch plus, for labelled objectives, how many
/// samples were classified correctly.
pub struct StepOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub correct: Option<usize>,
    pub count:   usize,
}

/// A model the trainer can optimise.
pub trait StepModel<B: Backend> {
    fn step(&self, batch: SignalBatch<B>) -> StepOutput<B>;
}

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub max_epochs:       usize,
    pub lr:               f64,
    pub seed:             u64,
    pub deterministic:    bool,
    pub default_root_dir: PathBuf,
}

/// Loss and accuracy over one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalMetrics {
    pub loss:     f64,
    pub accuracy: Option<f64>,
    pub samples:  usize,
}

pub struct Trainer<B: AutodiffBackend> {
    cfg:       TrainerConfig,
    callbacks: Callbacks,
    device:    B::Device,
    ckpt:      CheckpointManager,
    metrics:   MetricsLogger,
    history:   Vec<EpochMetrics>,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(cfg: TrainerConfig, callbacks: Callbacks, device: B::Device) -> Result<Self> {
        let ckpt    = CheckpointManager::new(&cfg.default_root_dir)?;
        let metrics = MetricsLogger::new(&cfg.default_root_dir)?;
        Ok(Self { cfg, callbacks, device, ckpt, metrics, history: Vec::new() })
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.ckpt
    }

    /// Per-epoch metrics of the last `fit`.
    pub fn history(&self) -> &[EpochMetrics] {
        &self.history
    }

    /// Train `model` on the data module's train split, validating
    /// after every epoch. Returns the model as of the final epoch.
    pub fn fit<M>(&mut self, model: M, datamodule: &SupervisedDataModule) -> Result<M>
    where
        M: AutodiffModule<B> + StepModel<B>,
        M::InnerModule: StepModel<B::InnerBackend>,
    {
        if self.cfg.deterministic {
            B::seed(self.cfg.seed);
        }

        let mut model = model;
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        let train_loader = datamodule.train_loader::<B>(&self.device);
        let val_loader   = datamodule.val_loader::<B::InnerBackend>(&self.device);

        self.history.clear();
        tracing::info!("Fitting for up to {} epochs", self.cfg.max_epochs);

        for epoch in 1..=self.cfg.max_epochs {
            // ── Training phase ────────────────────────────────────────────────
            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;

            for batch in train_loader.iter() {
                let out = model.step(batch);
                if out.count == 0 {
                    continue;
                }
                loss_sum += out.loss.clone().into_scalar().elem::<f64>();
                batches  += 1;

                let grads = out.loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(self.cfg.lr, model, grads);
            }
            let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

            // ── Validation phase ──────────────────────────────────────────────
            let val = evaluate(&model.valid(), val_loader.as_ref());

            let metrics = EpochMetrics {
                epoch,
                train_loss,
                val_loss: val.loss,
                val_acc:  val.accuracy,
            };
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4}{}",
                epoch,
                self.cfg.max_epochs,
                train_loss,
                val.loss,
                val.accuracy.map(|a| format!(" | val_acc={:.1}%", a * 100.0)).unwrap_or_default(),
            );
            self.metrics.log(&metrics)?;
            self.ckpt.save_last::<B, M>(&model)?;

            if let Some(checkpoint) = self.callbacks.checkpoint.as_mut() {
                if checkpoint.on_epoch_end(&metrics) {
                    let monitor = checkpoint.monitor();
                    let best = BestCheckpoint {
                        epoch,
                        metric: monitor.metric().to_string(),
                        value:  monitor.best().unwrap_or(f64::NAN),
                    };
                    self.ckpt.save_best::<B, M>(&model, &best)?;
                }
            }

            let stop = self.callbacks.early_stopping.on_epoch_end(&metrics);
            self.history.push(metrics);
            if stop {
                tracing::info!(
                    "Early stopping at epoch {} ({} did not improve)",
                    epoch,
                    self.callbacks.early_stopping.monitor().metric(),
                );
                break;
            }
        }

        tracing::info!("Training complete!");
        Ok(model)
    }

    /// Evaluate the selected weights on the test split.
    pub fn test<M>(&self, model: &M, datamodule: &SupervisedDataModule, selection: &CkptSelection) -> Result<EvalMetrics>
    where
        M: AutodiffModule<B>,
        M::InnerModule: StepModel<B::InnerBackend>,
    {
        let selection = match selection {
            CkptSelection::Best if self.callbacks.checkpoint.is_none() => {
                tracing::warn!("Checkpointing disabled; testing the last epoch instead of the best");
                CkptSelection::Last
            }
            other => other.clone(),
        };

        let model = self
            .ckpt
            .load::<B, M>(model.clone(), &selection, &self.device)
            .context("Cannot restore weights for testing")?;

        let loader  = datamodule.test_loader::<B::InnerBackend>(&self.device);
        let metrics = evaluate(&model.valid(), loader.as_ref());
        tracing::info!("Test metrics: {:?}", metrics);
        Ok(metrics)
    }
}

/// One pass over `loader` without gradients. The loss is the
/// per-sample mean, so a short final batch weighs only as much as
/// the samples it holds.
pub fn evaluate<B, M>(model: &M, loader: &dyn DataLoader<SignalBatch<B>>) -> EvalMetrics
where
    B: Backend,
    M: StepModel<B>,
{
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;
    let mut labelled = false;

    for batch in loader.iter() {
        let out = model.step(batch);
        if out.count == 0 {
            continue;
        }
        loss_sum += out.loss.into_scalar().elem::<f64>() * out.count as f64;
        samples  += out.count;
        if let Some(c) = out.correct {
            correct += c;
            labelled = true;
        }
    }

    EvalMetrics {
        loss:     if samples > 0 { loss_sum / samples as f64 } else { f64::NAN },
        accuracy: (labelled && samples > 0).then(|| correct as f64 / samples as f64),
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        audio::AudioFormat,
        datamodule::{DataModuleConfig, SplitPaths},
        dataset::LabelledSignal,
        transforms::Compose,
    };
    use crate::ml::callbacks::setup_callbacks;
    use crate::ml::classifier::{ClassificationModel, LinearClassifierConfig};
    use crate::ml::encoders::{Cnn1d1LConfig, Encoder};
    use burn::backend::{Autodiff, NdArray};
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn toy_datamodule() -> SupervisedDataModule {
        // Class 0: negative constant, class 1: positive constant
        let split = |n: usize| -> Vec<LabelledSignal> {
            (0..n)
                .map(|i| {
                    let label = (i % 2) as i32;
                    let v = if label == 0 { -1.0 } else { 1.0 };
                    LabelledSignal { signal: vec![v; 16], label }
                })
                .collect()
        };
        let cfg = DataModuleConfig {
            root:             PathBuf::from("."),
            batch_size:       4,
            split:            SplitPaths::default(),
            train_transforms: Compose::identity(),
            test_transforms:  Compose::identity(),
            augmentations:    None,
            n_views:          1,
            num_workers:      1,
            format:           AudioFormat { target_sr: 16, signal_len: 16 },
            seed:             3,
        };
        SupervisedDataModule::from_signals(cfg, split(8), split(4), split(4))
    }

    fn model(device: &<TestBackend as Backend>::Device) -> ClassificationModel<TestBackend> {
        let encoder = Encoder::Cnn1d1L(Cnn1d1LConfig::new(16, 4, 3).init(device).unwrap());
        let head    = LinearClassifierConfig::new(encoder.out_size(), 2).init(device);
        ClassificationModel::new(encoder, head)
    }

    fn trainer(dir: &TempDir, epochs: usize, patience: usize) -> Trainer<TestBackend> {
        let cfg = TrainerConfig {
            max_epochs:       epochs,
            lr:               1e-2,
            seed:             42,
            deterministic:    true,
            default_root_dir: dir.path().to_path_buf(),
        };
        Trainer::new(cfg, setup_callbacks("val_loss", false, patience).unwrap(), Default::default()).unwrap()
    }

    #[test]
    fn fit_logs_every_epoch_and_writes_checkpoints() {
        let dir = TempDir::new().unwrap();
        let dm  = toy_datamodule();
        let mut trainer = trainer(&dir, 3, 10);

        let fitted = trainer.fit(model(&Default::default()), &dm).unwrap();

        assert_eq!(trainer.history().len(), 3);
        assert!(trainer.history().iter().all(|m| m.val_acc.is_some()));
        assert!(dir.path().join("checkpoints/last.mpk.gz").exists());
        assert!(trainer.checkpoints().best().is_ok());

        let test = trainer.test(&fitted, &dm, &CkptSelection::Best).unwrap();
        assert_eq!(test.samples, 4);
        assert!(test.accuracy.is_some());
    }

    /// Scores each sample by its own value, so the mean is easy to
    /// compute by hand.
    struct SignalMean;

    impl<B: Backend> StepModel<B> for SignalMean {
        fn step(&self, batch: SignalBatch<B>) -> StepOutput<B> {
            let count = batch.batch_size();
            let x     = batch.views[0].clone();
            StepOutput { loss: x.mean().reshape([1]), correct: None, count }
        }
    }

    #[test]
    fn evaluate_weights_loss_by_samples_not_batches() {
        // batches of 2: [1, 1] [1, 1] [10] → per-sample mean 14 / 5
        let values = [1.0, 1.0, 1.0, 1.0, 10.0];
        let samples: Vec<LabelledSignal> = values
            .iter()
            .map(|&v| LabelledSignal { signal: vec![v; 4], label: 0 })
            .collect();
        let cfg = DataModuleConfig {
            root:             PathBuf::from("."),
            batch_size:       2,
            split:            SplitPaths::default(),
            train_transforms: Compose::identity(),
            test_transforms:  Compose::identity(),
            augmentations:    None,
            n_views:          1,
            num_workers:      1,
            format:           AudioFormat { target_sr: 4, signal_len: 4 },
            seed:             0,
        };
        let dm = SupervisedDataModule::from_signals(cfg, Vec::new(), Vec::new(), samples);

        let loader  = dm.test_loader::<NdArray>(&Default::default());
        let metrics = evaluate(&SignalMean, loader.as_ref());
        assert_eq!(metrics.samples, 5);
        assert!((metrics.loss - 14.0 / 5.0).abs() < 1e-5, "loss={}", metrics.loss);
        assert!(metrics.accuracy.is_none());
    }

    #[test]
    fn a_second_trainer_in_the_same_directory_starts_clean() {
        let dir = TempDir::new().unwrap();
        let dm  = toy_datamodule();
        let mut first = trainer(&dir, 2, 10);
        first.fit(model(&Default::default()), &dm).unwrap();
        assert!(first.checkpoints().best().is_ok());

        let second = trainer(&dir, 2, 10);
        assert!(second.checkpoints().best().is_err());
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn early_stopping_ends_fit_before_max_epochs() {
        let dir = TempDir::new().unwrap();
        let dm  = toy_datamodule();
        // lr 0 keeps val_loss flat, so no epoch after the first improves
        let mut trainer = trainer(&dir, 10, 2);
        trainer.cfg.lr = 0.0;

        trainer.fit(model(&Default::default()), &dm).unwrap();
        assert_eq!(trainer.history().len(), 3);
    }
}
