// ============================================================
// Layer 2 — SupervisedUseCase
// ============================================================
// Orchestrates a supervised training run in order:
//
//   Step 1: Read sup_config / pre_processing_config   (Layer 6 - infra)
//   Step 2: Build train/test transform pipelines      (Layer 2b - assembly)
//   Step 3: Load the split files into a data module   (Layer 4 - data)
//   Step 4: Build CNN1D encoder + linear head         (Layer 5 - ml)
//   Step 5: Set up callbacks and the trainer          (Layer 5 - ml)
//   Step 6: Fit, then test the best checkpoint        (Layer 5 - ml)
//
// Every run gets its own directory:
//   <main>/outputs/Sup_Training/Sup_<timestamp>/
//
// The encoder is built directly from its config rather than
// through the registry; augmentations are not used here.

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::assembly::{catalog::Components, transforms::init_transforms};
use crate::data::{
    audio::AudioFormat,
    datamodule::{DataModuleConfig, SplitPaths, SupervisedDataModule},
};
use crate::infra::{
    checkpoint::CkptSelection,
    settings::{generate_experiment_id, Settings},
};
use crate::ml::{
    callbacks::setup_callbacks,
    classifier::{ClassificationModel, LinearClassifierConfig},
    encoders::{Cnn1dConfig, Encoder},
    trainer::{EvalMetrics, TrainBackend, Trainer, TrainerConfig},
};

// ─── Supervised Configuration ────────────────────────────────────────────────
// Run options that are not part of the settings document.
#[derive(Debug, Clone)]
pub struct SupervisedConfig {
    pub seed:                  u64,
    pub num_classes:           usize,
    pub n_views:               usize,
    pub num_workers:           usize,
    pub early_stopping_metric: String,
    pub no_ckpt:               bool,
    pub patience:              usize,
    pub ckpt:                  CkptSelection,
}

impl Default for SupervisedConfig {
    fn default() -> Self {
        Self {
            seed:                  42,
            num_classes:           8,
            n_views:               2,
            num_workers:           2,
            early_stopping_metric: "val_loss".to_string(),
            no_ckpt:               false,
            patience:              15,
            ckpt:                  CkptSelection::Best,
        }
    }
}

// ─── SupervisedUseCase ───────────────────────────────────────────────────────
pub struct SupervisedUseCase<'a> {
    settings: &'a Settings,
    config:   SupervisedConfig,
}

impl<'a> SupervisedUseCase<'a> {
    pub fn new(settings: &'a Settings, config: SupervisedConfig) -> Self {
        Self { settings, config }
    }

    /// Run on the default GPU backend.
    pub fn execute(&self) -> Result<EvalMetrics> {
        self.execute_on::<TrainBackend>(Default::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<EvalMetrics> {
        let cfg    = &self.config;
        let custom = &self.settings.custom;

        // ── Step 1: Settings sections ─────────────────────────────────────────
        let sup = custom.sup_config()?;
        let pre = custom.pre_processing_config()?;

        // ── Step 2: Transform pipelines ───────────────────────────────────────
        let components = Components::<B>::builtin();
        let (train_transforms, test_transforms) =
            init_transforms(&components.transforms, custom.transforms.as_deref())?;

        // ── Step 3: Data module ───────────────────────────────────────────────
        let format = AudioFormat::new(pre.max_length, pre.target_sr);
        let datamodule = SupervisedDataModule::load(DataModuleConfig {
            root:             self.settings.folders.main.clone(),
            batch_size:       sup.batch_size,
            split:            SplitPaths::default(),
            train_transforms,
            test_transforms,
            augmentations:    None,
            n_views:          cfg.n_views,
            num_workers:      cfg.num_workers,
            format,
            seed:             cfg.seed,
        })?;
        datamodule.validate_labels(cfg.num_classes)?;

        // ── Step 4: Encoder + classification head ─────────────────────────────
        let encoder = Cnn1dConfig::new(format.signal_len, vec![2, 2, 2], vec![7, 7, 7])
            .with_in_channels(1)
            .with_stride(4)
            .init::<B>(&device)
            .map_err(anyhow::Error::msg)
            .context("Cannot build the CNN1D encoder")?;
        let encoder    = Encoder::Cnn1d(encoder);
        let classifier = LinearClassifierConfig::new(encoder.out_size(), cfg.num_classes).init(&device);
        let model      = ClassificationModel::new(encoder, classifier);

        // ── Step 5: Callbacks and trainer ─────────────────────────────────────
        let callbacks = setup_callbacks(&cfg.early_stopping_metric, cfg.no_ckpt, cfg.patience)?;
        let experiment_id = generate_experiment_id("Sup");
        let run_dir = self
            .settings
            .folders
            .main
            .join("outputs")
            .join("Sup_Training")
            .join(&experiment_id);
        tracing::info!("Experiment {} → '{}'", experiment_id, run_dir.display());
        let mut trainer = Trainer::<B>::new(
            TrainerConfig {
                max_epochs:       sup.epochs,
                lr:               sup.lr,
                seed:             cfg.seed,
                deterministic:    true,
                default_root_dir: run_dir,
            },
            callbacks,
            device,
        )?;
        trainer.checkpoints().snapshot_settings(custom)?;

        // ── Step 6: Fit and report test metrics ───────────────────────────────
        let model   = trainer.fit(model, &datamodule)?;
        let metrics = trainer.test(&model, &datamodule, &cfg.ckpt)?;
        Ok(metrics)
    }
}
