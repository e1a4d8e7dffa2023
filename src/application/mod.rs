// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one run: supervised training, SSL pre-training, or writing
// the split files.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Supervised training: encoder + linear head
pub mod supervised_use_case;

// Self-supervised pre-training of an encoder
pub mod pretrain_use_case;

// Dataset index → train / val / test CSVs
pub mod split_use_case;
