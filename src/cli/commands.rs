// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `supervised`, `pretrain`, `split` and
// `show-config`, and all their flags.
//
// Everything the settings document already carries (batch size,
// epochs, descriptors, ...) is read from there, not from flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{
    pretrain_use_case::PretrainConfig,
    split_use_case::SplitConfig,
    supervised_use_case::SupervisedConfig,
};
use crate::infra::{checkpoint::CkptSelection, settings::Folders};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CNN1D encoder with a linear head on the labelled splits
    Supervised(SupervisedArgs),

    /// Self-supervised pre-training of the configured encoder
    Pretrain(PretrainArgs),

    /// Write train/val/test CSVs from a dataset index
    Split(SplitArgs),

    /// Print the resolved folders and settings document
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct SupervisedArgs {
    /// Seed for weight init and data shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of output classes of the linear head
    #[arg(long, default_value_t = 8)]
    pub num_classes: usize,

    /// Metric watched by early stopping and checkpointing
    #[arg(long, default_value = "val_loss")]
    pub early_stopping_metric: String,

    /// Epochs without improvement before stopping
    #[arg(long, default_value_t = 15)]
    pub patience: usize,

    /// Disable best-model checkpointing
    #[arg(long)]
    pub no_ckpt: bool,

    /// Data loader worker threads
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Weights to test with: `best`, `last` or a file path
    #[arg(long, default_value = "best")]
    pub ckpt_path: CkptSelection,
}

impl From<SupervisedArgs> for SupervisedConfig {
    fn from(a: SupervisedArgs) -> Self {
        SupervisedConfig {
            seed:                  a.seed,
            num_classes:           a.num_classes,
            early_stopping_metric: a.early_stopping_metric,
            patience:              a.patience,
            no_ckpt:               a.no_ckpt,
            num_workers:           a.num_workers,
            ckpt:                  a.ckpt_path,
            ..SupervisedConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct PretrainArgs {
    /// Encoder weights to continue from (as written by a previous run)
    #[arg(long)]
    pub pretrained: Option<PathBuf>,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Disable best-model checkpointing; the last epoch is kept
    #[arg(long)]
    pub no_ckpt: bool,
}

impl From<PretrainArgs> for PretrainConfig {
    fn from(a: PretrainArgs) -> Self {
        PretrainConfig {
            pretrained: a.pretrained,
            seed:       a.seed,
            no_ckpt:    a.no_ckpt,
            ..PretrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Dataset index CSV (`path,label`); defaults to <datasets>/index.csv
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Output directory for the split files; defaults to <outputs>
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl SplitArgs {
    /// Fill the unset paths from the environment folders.
    pub fn into_config(self, folders: &Folders) -> SplitConfig {
        SplitConfig {
            index:          self.index.unwrap_or_else(|| folders.datasets.join("index.csv")),
            out_dir:        self.out_dir.unwrap_or_else(|| folders.outputs.clone()),
            train_fraction: self.train_fraction,
            val_fraction:   self.val_fraction,
            seed:           self.seed,
        }
    }
}
