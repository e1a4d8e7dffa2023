// ============================================================
// Layer 2b — Encoder / Model Assembler
// ============================================================
// `init_encoder`     descriptor + optional checkpoint → Encoder
// `setup_ssl_model`  encoder (moved) + SSL descriptor → SslModel
//
// The SSL wrapper takes ownership of the encoder; it is handed
// back with `SslModel::into_encoder` once pre-training is done.

use std::path::Path;

use burn::prelude::*;

use crate::assembly::catalog::{EncoderFactory, SslFactory};
use crate::assembly::registry::Registry;
use crate::domain::descriptor::{EncoderDescriptor, SslFrameworkDescriptor};
use crate::domain::error::AssemblyResult;
use crate::ml::encoders::Encoder;
use crate::ml::ssl::SslModel;

/// Build the encoder named by `model_cfg`.
///
/// `ckpt_path = None` trains from scratch; otherwise the weights
/// stored at that path are loaded into the new encoder.
pub fn init_encoder<B: Backend>(
    registry:  &Registry<EncoderFactory<B>>,
    model_cfg: &EncoderDescriptor,
    ckpt_path: Option<&Path>,
    device:    &B::Device,
) -> AssemblyResult<Encoder<B>> {
    let factory = registry.resolve(&model_cfg.from_module, &model_cfg.class_name)?;
    let encoder = factory(&model_cfg.kwargs, ckpt_path, device)?;

    tracing::info!(
        "Encoder {} ready ({} features{})",
        model_cfg.class_name,
        encoder.out_size(),
        if ckpt_path.is_some() { ", pretrained" } else { "" }
    );
    Ok(encoder)
}

/// Wrap `encoder` in the SSL framework named by `model_cfg`.
pub fn setup_ssl_model<B: Backend>(
    registry:  &Registry<SslFactory<B>>,
    encoder:   Encoder<B>,
    model_cfg: &SslFrameworkDescriptor,
    device:    &B::Device,
) -> AssemblyResult<SslModel<B>> {
    let factory = registry.resolve(&model_cfg.from_module, &model_cfg.ssl_framework)?;
    let model   = factory(encoder, model_cfg.batch_size, &model_cfg.kwargs, device)?;

    tracing::info!(
        "SSL framework {} ready (ssl_batch_size = {})",
        model.framework_name(),
        model.ssl_batch_size()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::assembly::catalog::Components;
    use crate::domain::descriptor::Kwargs;
    use crate::domain::error::{AssemblyError, ResolutionError};

    type TestBackend = NdArray;

    fn kwargs(value: serde_json::Value) -> Kwargs {
        value.as_object().cloned().unwrap_or_default()
    }

    fn cnn1d_descriptor() -> EncoderDescriptor {
        EncoderDescriptor {
            from_module: "encoders.cnn1d".into(),
            class_name:  "CNN1D".into(),
            kwargs:      kwargs(json!({
                "len_seq":      64,
                "out_channels": [2, 2],
                "kernel_sizes": [3, 3],
                "stride":       2
            })),
        }
    }

    fn input(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        Tensor::random([2, 1, 64], burn::tensor::Distribution::Normal(0.0, 1.0), device)
    }

    #[test]
    fn test_init_encoder_builds_requested_class() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();

        let encoder = init_encoder(&comps.encoders, &cnn1d_descriptor(), None, &device).unwrap();
        assert_eq!(encoder.class_name(), "CNN1D");
        // 64 → 31 → 15, two channels
        assert_eq!(encoder.out_size(), 30);
        assert_eq!(encoder.forward(input(&device)).dims(), [2, 30]);
    }

    #[test]
    fn test_two_calls_give_independent_encoders() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();
        let desc   = cnn1d_descriptor();

        let a = init_encoder(&comps.encoders, &desc, None, &device).unwrap();
        let b = init_encoder(&comps.encoders, &desc, None, &device).unwrap();

        let x = input(&device);
        let ya: Vec<f32> = a.forward(x.clone()).into_data().to_vec().unwrap();
        let yb: Vec<f32> = b.forward(x).into_data().to_vec().unwrap();
        assert_ne!(ya, yb, "fresh encoders should not share weights");
    }

    #[test]
    fn test_pretrained_weights_are_loaded() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();
        let desc   = cnn1d_descriptor();
        let dir    = TempDir::new().unwrap();
        let path   = dir.path().join("encoder");

        let trained = init_encoder(&comps.encoders, &desc, None, &device).unwrap();
        trained.save(&path).unwrap();

        let restored = init_encoder(&comps.encoders, &desc, Some(path.as_path()), &device).unwrap();
        let x = input(&device);
        trained
            .forward(x.clone())
            .into_data()
            .assert_approx_eq(&restored.forward(x).into_data(), 5);
    }

    #[test]
    fn test_missing_checkpoint_is_a_pretrained_error() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();
        let dir    = TempDir::new().unwrap();
        let path   = dir.path().join("absent");

        let err = init_encoder(&comps.encoders, &cnn1d_descriptor(), Some(path.as_path()), &device).unwrap_err();
        assert!(matches!(err, AssemblyError::Pretrained { ref class, .. } if class == "CNN1D"));
    }

    #[test]
    fn test_unknown_encoder_class() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();
        let mut desc = cnn1d_descriptor();
        desc.class_name = "ResNet".into();

        let err = init_encoder(&comps.encoders, &desc, None, &device).unwrap_err();
        assert_eq!(
            err.to_string(),
            ResolutionError::UnknownClass {
                kind:   "encoder",
                module: "encoders.cnn1d".into(),
                class:  "ResNet".into(),
            }
            .to_string()
        );
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let device = Default::default();
        let comps  = Components::<TestBackend>::builtin();
        let mut desc = cnn1d_descriptor();
        desc.kwargs = kwargs(json!({ "len_seq": 4, "out_channels": [2], "kernel_sizes": [7] }));

        let err = init_encoder(&comps.encoders, &desc, None, &device).unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidArguments { .. }));
    }

    #[test]
    fn test_setup_ssl_model_wraps_encoder() {
        let device  = Default::default();
        let comps   = Components::<TestBackend>::builtin();
        let encoder = init_encoder(&comps.encoders, &cnn1d_descriptor(), None, &device).unwrap();

        let ssl_cfg = SslFrameworkDescriptor {
            from_module:   "models.simclr".into(),
            ssl_framework: "SimCLR".into(),
            batch_size:    16,
            kwargs:        kwargs(json!({ "projection_dim": 8, "hidden_dim": 16 })),
        };

        let model = setup_ssl_model(&comps.ssl, encoder, &ssl_cfg, &device).unwrap();
        assert_eq!(model.framework_name(), "SimCLR");
        assert_eq!(model.ssl_batch_size(), 16);
        assert_eq!(model.encoder().out_size(), 30);
    }

    #[test]
    fn test_unknown_ssl_framework() {
        let device  = Default::default();
        let comps   = Components::<TestBackend>::builtin();
        let encoder = init_encoder(&comps.encoders, &cnn1d_descriptor(), None, &device).unwrap();

        let ssl_cfg = SslFrameworkDescriptor {
            from_module:   "models.byol".into(),
            ssl_framework: "BYOL".into(),
            batch_size:    16,
            kwargs:        Kwargs::new(),
        };

        let err = setup_ssl_model(&comps.ssl, encoder, &ssl_cfg, &device).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Resolution(ResolutionError::UnknownModule { .. })
        ));
    }
}
