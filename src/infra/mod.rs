// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   settings.rs   — environment folders and the JSON settings
//                   document, loaded once at startup.
//
//   checkpoint.rs — saving and loading module weights with
//                   Burn's CompactRecorder, best / last
//                   checkpoint bookkeeping, settings snapshot.
//
//   metrics.rs    — per-epoch metrics appended to a CSV file.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Environment folders and the custom settings document
pub mod settings;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
