// ============================================================
// Layer 2b — Transform / Augmentation Assembler
// ============================================================
// Turns a list of descriptors into pipelines:
//
//   descriptors ──resolve+build──▶ [t1, t2, t3]
//                                   │   │   │
//   train pipeline  ◀───────────────┴───┴───┘   (all of them)
//   test  pipeline  ◀── only those with in_test = true
//
// Both pipelines hold the *same* instances (`Arc`), in the
// order the descriptors were given.

use std::sync::Arc;

use crate::assembly::catalog::TransformFactory;
use crate::assembly::registry::Registry;
use crate::data::augmentations::RandomApply;
use crate::data::transforms::Compose;
use crate::domain::descriptor::{AugmentationDescriptor, ComponentDescriptor};
use crate::domain::error::AssemblyResult;
use crate::domain::traits::Transform;

/// Module paths in the settings may omit the `utils.` prefix
/// (`"aug"` and `"utils.aug"` name the same module).
pub fn qualify_module(module: &str) -> String {
    if module.starts_with("utils.") {
        module.to_string()
    } else {
        format!("utils.{module}")
    }
}

fn build_one(
    registry:   &Registry<TransformFactory>,
    descriptor: &ComponentDescriptor,
) -> AssemblyResult<Arc<dyn Transform>> {
    let module  = qualify_module(&descriptor.from_module);
    let factory = registry.resolve(&module, &descriptor.class_name)?;
    factory(&descriptor.kwargs_or_empty())
}

/// Build the train and test pipelines.
///
/// `None` and an empty slice both give two identity pipelines.
pub fn init_transforms(
    registry:    &Registry<TransformFactory>,
    descriptors: Option<&[ComponentDescriptor]>,
) -> AssemblyResult<(Compose, Compose)> {
    let mut train = Vec::new();
    let mut test  = Vec::new();

    for descriptor in descriptors.unwrap_or_default() {
        let transform = build_one(registry, descriptor)?;
        tracing::info!("added {} transformation", descriptor.class_name);

        if descriptor.in_test {
            test.push(Arc::clone(&transform));
        }
        train.push(transform);
    }

    Ok((Compose::new(train), Compose::new(test)))
}

/// Gate every augmentation behind its own application probability
/// and compose them in order.
pub fn compose_random_augmentations(
    augmentations: Vec<(Arc<dyn Transform>, f64)>,
) -> AssemblyResult<Compose> {
    let steps = augmentations
        .into_iter()
        .map(|(aug, p)| RandomApply::new(aug, p).map(|r| Arc::new(r) as Arc<dyn Transform>))
        .collect::<AssemblyResult<Vec<_>>>()?;
    Ok(Compose::new(steps))
}

/// Build the augmentation pipeline (train and validation only).
pub fn init_augmentations(
    registry:    &Registry<TransformFactory>,
    descriptors: Option<&[AugmentationDescriptor]>,
) -> AssemblyResult<Compose> {
    let mut built = Vec::new();
    for descriptor in descriptors.unwrap_or_default() {
        let aug = build_one(registry, &descriptor.component)?;
        tracing::info!(
            "added {} augmentation (p = {})",
            descriptor.component.class_name,
            descriptor.probability
        );
        built.push((aug, descriptor.probability));
    }
    compose_random_augmentations(built)
}
