// ============================================================
// Layer 2b — Assembly Layer
// ============================================================
// Builds live components from the descriptors found in the
// settings document:
//
//   registry.rs   — module → class → factory lookup
//
//   catalog.rs    — the built-in transforms, augmentations,
//                   encoders and SSL frameworks
//
//   transforms.rs — train / test pipelines and the random
//                   augmentation pipeline
//
//   models.rs     — encoders (optionally pretrained) and the
//                   SSL wrapper around them

pub mod registry;

pub mod catalog;

pub mod transforms;

pub mod models;
