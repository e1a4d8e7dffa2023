// ============================================================
// Layer 2b — Component Registry (the Resolver)
// ============================================================
// Maps a (module path, class name) pair to a constructor
// function. Registries are populated once at startup and are
// read-only afterwards; every `resolve` hands back the factory
// and every factory call builds a brand new instance, so nothing
// is cached or shared between calls.
//
//   "utils.aug"      ─┬─ "Jitter" → fn(&Kwargs) -> Jitter
//                     └─ "Scale"  → fn(&Kwargs) -> Scale
//   "encoders.cnn1d" ─┬─ "CNN1D"  → fn(&Kwargs, pretrained, device) -> Encoder
//                     └─ ...
//
// The factory signature is a type parameter, so each component
// kind gets its own registry with its own extra arguments.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::descriptor::Kwargs;
use crate::domain::error::{AssemblyError, AssemblyResult, ResolutionError};

/// Decode constructor arguments into the component's argument type.
pub fn from_kwargs<T: DeserializeOwned>(class: &str, kwargs: &Kwargs) -> AssemblyResult<T> {
    serde_json::from_value(Value::Object(kwargs.clone()))
        .map_err(|e| AssemblyError::construction(class, e))
}

pub struct Registry<F> {
    kind:    &'static str,
    modules: BTreeMap<String, BTreeMap<String, F>>,
}

impl<F: Copy> Registry<F> {
    /// An empty registry for components of the given kind
    /// ("transform", "encoder", ...), used in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self { kind, modules: BTreeMap::new() }
    }

    /// Register `factory` as `module.class`, replacing any earlier entry.
    pub fn register(&mut self, module: &str, class: &str, factory: F) -> &mut Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(class.to_string(), factory);
        self
    }

    /// Look up the constructor for `module.class`.
    pub fn resolve(&self, module: &str, class: &str) -> Result<F, ResolutionError> {
        let classes = self.modules.get(module).ok_or_else(|| ResolutionError::UnknownModule {
            kind:      self.kind,
            module:    module.to_string(),
            available: self.module_names().join(", "),
        })?;

        classes.get(class).copied().ok_or_else(|| ResolutionError::UnknownClass {
            kind:   self.kind,
            module: module.to_string(),
            class:  class.to_string(),
        })
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }
}
