// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores module weights at full precision with
// Burn's NamedMpkGzFileRecorder (MessagePack + gzip, `.mpk.gz`).
//
// Layout of a run directory:
//   <run dir>/
//     checkpoints/
//       last.mpk.gz      ← weights after the most recent epoch
//       best.mpk.gz      ← weights of the best monitored epoch
//       best.json        ← which epoch that was, and its score
//     settings.json      ← snapshot of the settings used
//     metrics.csv
//
// A new manager removes checkpoint files left in the directory by
// an earlier run, so `best` can only ever name this run's weights.
//
// The free functions `save_module` / `load_module` work on any
// Burn module and are also used for encoder weights exchanged
// between SSL pre-training and later runs (`pretrained`).

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Files a run directory's `checkpoints/` may hold.
const CHECKPOINT_FILES: [&str; 3] = ["last.mpk.gz", "best.mpk.gz", "best.json"];

/// Write a module's parameters to `path` (the recorder adds `.mpk.gz`).
pub fn save_module<B: Backend, M: Module<B>>(module: &M, path: &Path) -> Result<()> {
    WeightsRecorder::new()
        .record(module.clone().into_record(), path.to_path_buf())
        .with_context(|| format!("Failed to save weights to '{}'", path.display()))
}

/// Load parameters from `path` into `module`.
pub fn load_module<B: Backend, M: Module<B>>(module: M, path: &Path, device: &B::Device) -> Result<M> {
    let record = WeightsRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Cannot load weights from '{}'", path.display()))?;
    Ok(module.load_record(record))
}

/// Which stored weights `Trainer::test` should evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CkptSelection {
    /// The best epoch according to the checkpoint callback
    Best,
    /// The final epoch
    Last,
    /// An explicit weights file
    Path(PathBuf),
}

impl std::str::FromStr for CkptSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "best" => CkptSelection::Best,
            "last" => CkptSelection::Last,
            other  => CkptSelection::Path(PathBuf::from(other)),
        })
    }
}

/// Metadata of the best checkpoint written so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:  usize,
    pub metric: String,
    pub value:  f64,
}

/// Manages the checkpoint files of one run directory.
pub struct CheckpointManager {
    run_dir: PathBuf,
}

impl CheckpointManager {
    /// Creates `<run_dir>/checkpoints` and clears any weights a
    /// previous run left there.
    pub fn new(run_dir: impl Into<PathBuf>) -> Result<Self> {
        let run_dir = run_dir.into();
        let ckpt_dir = run_dir.join("checkpoints");
        fs::create_dir_all(&ckpt_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        for name in CHECKPOINT_FILES {
            let stale = ckpt_dir.join(name);
            if stale.exists() {
                fs::remove_file(&stale)
                    .with_context(|| format!("Cannot remove stale checkpoint '{}'", stale.display()))?;
                tracing::warn!("Removed checkpoint left by an earlier run: '{}'", stale.display());
            }
        }
        Ok(Self { run_dir })
    }

    fn weights_path(&self, name: &str) -> PathBuf {
        self.run_dir.join("checkpoints").join(name)
    }

    pub fn save_last<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        save_module::<B, M>(model, &self.weights_path("last"))
    }

    /// Store `model` as the best checkpoint and record why.
    pub fn save_best<B: Backend, M: Module<B>>(&self, model: &M, best: &BestCheckpoint) -> Result<()> {
        save_module::<B, M>(model, &self.weights_path("best"))?;

        let path = self.weights_path("best.json");
        fs::write(&path, serde_json::to_string_pretty(best)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved best checkpoint: epoch {} ({}={:.4})", best.epoch, best.metric, best.value);
        Ok(())
    }

    pub fn best(&self) -> Result<BestCheckpoint> {
        let path = self.weights_path("best.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Was checkpointing disabled?", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the selected weights into `model`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model:     M,
        selection: &CkptSelection,
        device:    &B::Device,
    ) -> Result<M> {
        let path = match selection {
            CkptSelection::Best    => self.weights_path("best"),
            CkptSelection::Last    => self.weights_path("last"),
            CkptSelection::Path(p) => p.clone(),
        };
        tracing::info!("Loading weights from '{}'", path.display());
        load_module::<B, M>(model, &path, device)
    }

    /// Copy the settings document used for this run next to its weights.
    pub fn snapshot_settings<T: Serialize>(&self, settings: &T) -> Result<PathBuf> {
        let path = self.run_dir.join("settings.json");
        fs::write(&path, serde_json::to_string_pretty(settings)?)
            .with_context(|| format!("Cannot write settings snapshot '{}'", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};
    use tempfile::TempDir;

    type TestBackend = NdArray;

    #[test]
    fn selection_parses_keywords_and_paths() {
        assert_eq!("best".parse::<CkptSelection>().unwrap(), CkptSelection::Best);
        assert_eq!("last".parse::<CkptSelection>().unwrap(), CkptSelection::Last);
        assert_eq!(
            "runs/x/encoder".parse::<CkptSelection>().unwrap(),
            CkptSelection::Path(PathBuf::from("runs/x/encoder"))
        );
    }

    #[test]
    fn best_checkpoint_round_trips() {
        let dir    = TempDir::new().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();

        let saved: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let best = BestCheckpoint { epoch: 4, metric: "val_loss".into(), value: 0.25 };
        ckpt.save_best::<TestBackend, _>(&saved, &best).unwrap();
        assert_eq!(ckpt.best().unwrap(), best);

        let fresh: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let loaded = ckpt.load::<TestBackend, _>(fresh, &CkptSelection::Best, &device).unwrap();
        let a: Vec<f32> = saved.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.weight.val().into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn weights_are_written_as_mpk_gz_at_full_precision() {
        let dir    = TempDir::new().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();

        let saved: Linear<TestBackend> = LinearConfig::new(4, 4).init(&device);
        ckpt.save_last::<TestBackend, _>(&saved).unwrap();
        assert!(dir.path().join("checkpoints/last.mpk.gz").exists());

        let fresh: Linear<TestBackend> = LinearConfig::new(4, 4).init(&device);
        let loaded = ckpt.load::<TestBackend, _>(fresh, &CkptSelection::Last, &device).unwrap();
        let a: Vec<f32> = saved.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.weight.val().into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn new_manager_discards_an_earlier_runs_checkpoints() {
        let dir    = TempDir::new().unwrap();
        let device = Default::default();

        let first = CheckpointManager::new(dir.path()).unwrap();
        let model: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let best = BestCheckpoint { epoch: 1, metric: "val_loss".into(), value: 0.1 };
        first.save_last::<TestBackend, _>(&model).unwrap();
        first.save_best::<TestBackend, _>(&model, &best).unwrap();

        let second = CheckpointManager::new(dir.path()).unwrap();
        assert!(second.best().is_err());
        assert!(!dir.path().join("checkpoints/best.mpk.gz").exists());
        assert!(!dir.path().join("checkpoints/last.mpk.gz").exists());
        assert!(second.load::<TestBackend, _>(model, &CkptSelection::Best, &device).is_err());
    }

    #[test]
    fn missing_best_is_an_error() {
        let dir  = TempDir::new().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.best().is_err());
    }
}
