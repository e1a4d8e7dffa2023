// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe *what* gets built:
//
//   descriptor.rs — configuration fragments naming a component
//                   (module path + class name + kwargs)
//   error.rs      — typed failures of the resolve/construct step
//   traits.rs     — the Transform abstraction every pipeline
//                   member implements
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits

/// Component descriptors consumed from the settings document
pub mod descriptor;

/// Resolution and construction errors
pub mod error;

/// Core abstractions shared by the data and assembly layers
pub mod traits;
