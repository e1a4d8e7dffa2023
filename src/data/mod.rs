// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from split files on disk to tensor batches:
//
//   split CSVs (path,label)
//       │
//       ▼
//   audio            → WAV decode, downmix, resample, pad/crop
//       │
//       ▼
//   transforms       → deterministic per-sample pipeline (Compose)
//   augmentations    → random per-view pipeline (SSL only)
//       │
//       ▼
//   dataset          → implements Burn's Dataset trait
//       │
//       ▼
//   batcher          → stacks views into [batch, 1, len] tensors
//       │
//       ▼
//   datamodule       → train / val / test DataLoaders
//
// splitter produces the split CSVs from a single dataset index.

/// WAV decoding and resampling
pub mod audio;

/// Deterministic transforms and the Compose pipeline
pub mod transforms;

/// Random augmentations
pub mod augmentations;

/// Split records and the in-memory Dataset
pub mod dataset;

/// Burn Batcher for multi-view signals
pub mod batcher;

/// Train/val/test data loaders
pub mod datamodule;

/// Seeded train/val/test splitting
pub mod splitter;
