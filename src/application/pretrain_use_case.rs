// ============================================================
// Layer 2 — PretrainUseCase
// ============================================================
// Self-supervised pre-training of an encoder:
//
//   Step 1: Read ssl_config / ssl_model / pre_processing_config
//   Step 2: Transforms + random augmentations (train and val)
//   Step 3: Two-view data module over the split files
//   Step 4: init_encoder (optionally pretrained) → setup_ssl_model
//   Step 5: Fit, restore the best weights, test
//   Step 6: Save the encoder for later supervised runs
//
// Every run gets its own directory:
//   <outputs>/ssl_training/<framework>_<timestamp>/

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::assembly::{
    catalog::Components,
    models::{init_encoder, setup_ssl_model},
    transforms::{init_augmentations, init_transforms},
};
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
    trainer::{EvalMetrics, TrainBackend, Trainer, TrainerConfig},
};

#[derive(Debug, Clone)]
pub struct PretrainConfig {
    /// Encoder weights to start from instead of a random init
    pub pretrained:  Option<PathBuf>,
    pub seed:        u64,
    pub n_views:     usize,
    pub no_ckpt:     bool,
}

impl Default for PretrainConfig {
    fn default() -> Self {
        Self { pretrained: None, seed: 42, n_views: 2, no_ckpt: false }
    }
}

/// Where a finished pre-training run left its results.
#[derive(Debug, Clone)]
pub struct PretrainOutcome {
    pub experiment_id: String,
    pub run_dir:       PathBuf,
    /// Encoder weights, without the recorder's file extension
    pub encoder_path:  PathBuf,
    pub test_metrics:  EvalMetrics,
}

pub struct PretrainUseCase<'a> {
    settings: &'a Settings,
    config:   PretrainConfig,
}

impl<'a> PretrainUseCase<'a> {
    pub fn new(settings: &'a Settings, config: PretrainConfig) -> Self {
        Self { settings, config }
    }

    pub fn execute(&self) -> Result<PretrainOutcome> {
        self.execute_on::<TrainBackend>(Default::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<PretrainOutcome> {
        let cfg    = &self.config;
        let custom = &self.settings.custom;

        let ssl_cfg   = custom.ssl_config()?;
        let ssl_model = custom.ssl_model()?;
        let pre       = custom.pre_processing_config()?;

        let components = Components::<B>::builtin();
        let (train_transforms, test_transforms) =
            init_transforms(&components.transforms, custom.transforms.as_deref())?;
        let augmentations =
            init_augmentations(&components.transforms, custom.augmentations.as_deref())?;

        let datamodule = SupervisedDataModule::load(DataModuleConfig {
            root:             self.settings.folders.main.clone(),
            batch_size:       ssl_model.ssl.batch_size,
            split:            SplitPaths::default(),
            train_transforms,
            test_transforms,
            augmentations:    Some(augmentations),
            n_views:          cfg.n_views,
            num_workers:      ssl_cfg.num_workers,
            format:           AudioFormat::new(pre.max_length, pre.target_sr),
            seed:             cfg.seed,
        })?;

        let encoder = init_encoder(
            &components.encoders,
            &ssl_model.encoder,
            cfg.pretrained.as_deref(),
            &device,
        )?;
        let model = setup_ssl_model(&components.ssl, encoder, &ssl_model.ssl, &device)?;

        let experiment_id = generate_experiment_id(model.framework_name());
        let run_dir       = self.settings.folders.component_output().join(&experiment_id);
        tracing::info!("Experiment {} → '{}'", experiment_id, run_dir.display());

        let callbacks = setup_callbacks("val_loss", cfg.no_ckpt, ssl_cfg.patience)?;
        let mut trainer = Trainer::<B>::new(
            TrainerConfig {
                max_epochs:       ssl_cfg.epochs,
                lr:               ssl_cfg.lr,
                seed:             cfg.seed,
                deterministic:    true,
                default_root_dir: run_dir.clone(),
            },
            callbacks,
            device.clone(),
        )?;
        trainer.checkpoints().snapshot_settings(custom)?;

        let model = trainer.fit(model, &datamodule)?;
        let selection = if cfg.no_ckpt { CkptSelection::Last } else { CkptSelection::Best };
        let test_metrics = trainer.test(&model, &datamodule, &selection)?;

        let model = trainer
            .checkpoints()
            .load::<B, _>(model, &selection, &device)
            .context("Cannot restore the selected SSL weights")?;

        let encoder_path = run_dir.join("encoder");
        model.into_encoder().save(&encoder_path)?;
        tracing::info!("Encoder weights saved to '{}'", encoder_path.display());

        Ok(PretrainOutcome { experiment_id, run_dir, encoder_path, test_metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::{fs, path::Path};
    use tempfile::TempDir;

    use crate::data::dataset::{write_records, SignalRecord};
    use crate::domain::descriptor::EncoderDescriptor;
    use crate::infra::settings::Folders;

    const SETTINGS: &str = r#"{
        "pre_processing_config": { "max_length": 0.05, "target_sr": 1000 },
        "transforms": [
            { "from_module": "transforms", "class_name": "Standardize", "in_test": true }
        ],
        "augmentations": [
            { "from_module": "aug", "class_name": "Jitter", "kwargs": { "sigma": 0.05 } },
            { "from_module": "aug", "class_name": "TimeShift", "kwargs": { "max_shift": 5 }, "probability": 0.5 }
        ],
        "ssl_config": { "epochs": 1, "num_workers": 1 },
        "ssl_model": {
            "encoder": {
                "from_module": "encoders.cnn1d",
                "class_name":  "CNN1D1L",
                "kwargs":      { "len_seq": 50, "out_channels": 4, "kernel_size": 5 }
            },
            "ssl": {
                "from_module":   "models.simclr",
                "ssl_framework": "SimCLR",
                "batch_size":    2,
                "kwargs":        { "hidden_dim": 8, "projection_dim": 4 }
            }
        }
    }"#;

    fn write_noise(path: &Path, seed: usize) {
        let spec = hound::WavSpec {
            channels:        1,
            sample_rate:     1_000,
            bits_per_sample: 16,
            sample_format:   hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..50 {
            w.write_sample((((i * 37 + seed * 101) % 200) as i16 - 100) * 50).unwrap();
        }
        w.finalize().unwrap();
    }

    fn workspace() -> (TempDir, Settings) {
        let dir  = TempDir::new().unwrap();
        let main = dir.path();
        fs::create_dir_all(main.join("outputs")).unwrap();
        fs::create_dir_all(main.join("audio")).unwrap();

        for (split, n) in [("train", 4), ("val", 2), ("test", 2)] {
            let records: Vec<SignalRecord> = (0..n)
                .map(|i| {
                    let rel = format!("audio/{split}_{i}.wav");
                    write_noise(&main.join(&rel), i);
                    SignalRecord { path: rel, label: 0 }
                })
                .collect();
            write_records(&main.join(format!("outputs/{split}.csv")), &records).unwrap();
        }

        fs::write(main.join("configuration.json"), SETTINGS).unwrap();
        let settings = Settings::from_folders(Folders::from_lookup(|_| None, main.to_path_buf())).unwrap();
        (dir, settings)
    }

    #[test]
    fn test_pretraining_saves_a_reusable_encoder() {
        let (dir, settings) = workspace();
        let device = Default::default();

        let outcome = PretrainUseCase::new(&settings, PretrainConfig::default())
            .execute_on::<Autodiff<NdArray>>(device)
            .unwrap();

        assert!(outcome.experiment_id.starts_with("SimCLR_"));
        assert!(outcome.run_dir.starts_with(dir.path().join("outputs/ssl_training")));
        assert!(outcome.test_metrics.accuracy.is_none());
        assert_eq!(outcome.test_metrics.samples, 2);

        // the saved weights load back into a fresh encoder of the same class
        let components = Components::<NdArray>::builtin();
        let desc: &EncoderDescriptor = &settings.custom.ssl_model().unwrap().encoder;
        let encoder = init_encoder(&components.encoders, desc, Some(outcome.encoder_path.as_path()), &Default::default());
        assert!(encoder.is_ok());
    }

    #[test]
    fn test_missing_ssl_sections_are_reported() {
        let (_dir, mut settings) = workspace();
        settings.custom.ssl_model = None;

        let err = PretrainUseCase::new(&settings, PretrainConfig::default())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("ssl_model"));
    }
}
