// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All neural-network code lives here:
//
//   encoders.rs   — CNN1D / CNN1D1L feature encoders and the
//                   `Encoder` enum the registry builds
//
//   classifier.rs — linear head and the supervised
//                   encoder + classifier model
//
//   ssl.rs        — SimCLR wrapper, NT-Xent loss and the
//                   `SslModel` enum the registry builds
//
//   callbacks.rs  — early stopping and best-model checkpointing
//
//   trainer.rs    — fit / test loop over any `StepModel`

/// 1-D convolutional encoders
pub mod encoders;

/// Classification head and supervised model
pub mod classifier;

/// Self-supervised frameworks
pub mod ssl;

/// Early stopping and checkpoint callbacks
pub mod callbacks;

/// Fit / test loop
pub mod trainer;
