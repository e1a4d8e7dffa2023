// ============================================================
// Layer 2b — Built-in Component Catalog
// ============================================================
// Every class the settings document may name, registered under
// the module path it is addressed by:
//
//   utils.transforms  Normalize, Standardize, PadOrCrop
//   utils.aug         Jitter, Scale, TimeShift, Gain
//   encoders.cnn1d    CNN1D, CNN1D1L
//   models.simclr     SimCLR
//
// Factories decode their kwargs into an argument struct, validate
// them, and only then construct the component.

use std::path::Path;
use std::sync::Arc;

use burn::prelude::*;
use serde::Deserialize;

use crate::assembly::registry::{from_kwargs, Registry};
use crate::data::augmentations::{Gain, Jitter, Scale, SigmaArgs, TimeShift};
use crate::data::transforms::{Normalize, PadOrCrop, Standardize};
use crate::domain::descriptor::Kwargs;
use crate::domain::error::{AssemblyError, AssemblyResult};
use crate::domain::traits::Transform;
use crate::infra::checkpoint::load_module;
use crate::ml::encoders::{Cnn1d1LConfig, Cnn1dConfig, Encoder};
use crate::ml::ssl::{SimClrConfig, SslModel};

pub type TransformFactory = fn(&Kwargs) -> AssemblyResult<Arc<dyn Transform>>;

pub type EncoderFactory<B> =
    fn(&Kwargs, Option<&Path>, &<B as Backend>::Device) -> AssemblyResult<Encoder<B>>;

pub type SslFactory<B> =
    fn(Encoder<B>, usize, &Kwargs, &<B as Backend>::Device) -> AssemblyResult<SslModel<B>>;

/// The three registries a run resolves components from.
pub struct Components<B: Backend> {
    pub transforms: Registry<TransformFactory>,
    pub encoders:   Registry<EncoderFactory<B>>,
    pub ssl:        Registry<SslFactory<B>>,
}

impl<B: Backend> Components<B> {
    pub fn builtin() -> Self {
        let mut transforms = Registry::<TransformFactory>::new("transform");
        transforms
            .register("utils.transforms", "Normalize", build_normalize)
            .register("utils.transforms", "Standardize", build_standardize)
            .register("utils.transforms", "PadOrCrop", build_pad_or_crop)
            .register("utils.aug", "Jitter", build_jitter)
            .register("utils.aug", "Scale", build_scale)
            .register("utils.aug", "TimeShift", build_time_shift)
            .register("utils.aug", "Gain", build_gain);

        let mut encoders = Registry::<EncoderFactory<B>>::new("encoder");
        encoders
            .register("encoders.cnn1d", "CNN1D", build_cnn1d::<B>)
            .register("encoders.cnn1d", "CNN1D1L", build_cnn1d_1l::<B>);

        let mut ssl = Registry::<SslFactory<B>>::new("SSL framework");
        ssl.register("models.simclr", "SimCLR", build_simclr::<B>);

        Self { transforms, encoders, ssl }
    }
}

// ─── Transforms ───────────────────────────────────────────────────────────────
fn build_normalize(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    Ok(Arc::new(from_kwargs::<Normalize>("Normalize", kwargs)?))
}

fn build_standardize(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    Ok(Arc::new(from_kwargs::<Standardize>("Standardize", kwargs)?))
}

fn build_pad_or_crop(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    let args = from_kwargs::<PadOrCrop>("PadOrCrop", kwargs)?;
    Ok(Arc::new(PadOrCrop::new(args.length)?))
}

// ─── Augmentations ────────────────────────────────────────────────────────────
fn build_jitter(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    let args = from_kwargs::<SigmaArgs>("Jitter", kwargs)?;
    Ok(Arc::new(Jitter::new(args.sigma)?))
}

fn build_scale(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    let args = from_kwargs::<SigmaArgs>("Scale", kwargs)?;
    Ok(Arc::new(Scale::new(args.sigma)?))
}

fn build_time_shift(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    Ok(Arc::new(from_kwargs::<TimeShift>("TimeShift", kwargs)?))
}

fn build_gain(kwargs: &Kwargs) -> AssemblyResult<Arc<dyn Transform>> {
    let args = from_kwargs::<Gain>("Gain", kwargs)?;
    Ok(Arc::new(Gain::new(args.min_db, args.max_db)?))
}

// ─── Encoders ─────────────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Cnn1dArgs {
    len_seq:      usize,
    out_channels: Vec<usize>,
    kernel_sizes: Vec<usize>,
    #[serde(default = "one")]
    in_channels:  usize,
    #[serde(default = "one")]
    stride:       usize,
    #[serde(default = "default_dropout")]
    dropout:      f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Cnn1d1LArgs {
    len_seq:      usize,
    out_channels: usize,
    kernel_size:  usize,
    #[serde(default = "one")]
    in_channels:  usize,
    #[serde(default = "one")]
    stride:       usize,
}

fn one() -> usize {
    1
}

fn default_dropout() -> f64 {
    0.1
}

/// Apply `pretrained` weights to a freshly built module.
fn with_pretrained<B: Backend, M: Module<B>>(
    class:      &str,
    module:     M,
    pretrained: Option<&Path>,
    device:     &B::Device,
) -> AssemblyResult<M> {
    match pretrained {
        None => Ok(module),
        Some(path) => {
            tracing::info!("Loading pretrained {} weights from '{}'", class, path.display());
            load_module::<B, M>(module, path, device).map_err(|e| AssemblyError::Pretrained {
                class:  class.to_string(),
                path:   path.display().to_string(),
                reason: format!("{e:#}"),
            })
        }
    }
}

fn build_cnn1d<B: Backend>(
    kwargs:     &Kwargs,
    pretrained: Option<&Path>,
    device:     &B::Device,
) -> AssemblyResult<Encoder<B>> {
    let args = from_kwargs::<Cnn1dArgs>("CNN1D", kwargs)?;
    let cfg  = Cnn1dConfig::new(args.len_seq, args.out_channels, args.kernel_sizes)
        .with_in_channels(args.in_channels)
        .with_stride(args.stride)
        .with_dropout(args.dropout);
    let model = cfg.init::<B>(device).map_err(|e| AssemblyError::invalid("CNN1D", e))?;
    Ok(Encoder::Cnn1d(with_pretrained::<B, _>("CNN1D", model, pretrained, device)?))
}

fn build_cnn1d_1l<B: Backend>(
    kwargs:     &Kwargs,
    pretrained: Option<&Path>,
    device:     &B::Device,
) -> AssemblyResult<Encoder<B>> {
    let args = from_kwargs::<Cnn1d1LArgs>("CNN1D1L", kwargs)?;
    let cfg  = Cnn1d1LConfig::new(args.len_seq, args.out_channels, args.kernel_size)
        .with_in_channels(args.in_channels)
        .with_stride(args.stride);
    let model = cfg.init::<B>(device).map_err(|e| AssemblyError::invalid("CNN1D1L", e))?;
    Ok(Encoder::Cnn1d1L(with_pretrained::<B, _>("CNN1D1L", model, pretrained, device)?))
}

// ─── SSL frameworks ───────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimClrArgs {
    #[serde(default = "default_hidden_dim")]
    hidden_dim:     usize,
    #[serde(default = "default_projection_dim")]
    projection_dim: usize,
    #[serde(default = "default_temperature")]
    temperature:    f64,
}

fn default_hidden_dim() -> usize {
    128
}

fn default_projection_dim() -> usize {
    64
}

fn default_temperature() -> f64 {
    0.1
}

fn build_simclr<B: Backend>(
    encoder:        Encoder<B>,
    ssl_batch_size: usize,
    kwargs:         &Kwargs,
    device:         &B::Device,
) -> AssemblyResult<SslModel<B>> {
    let args = from_kwargs::<SimClrArgs>("SimCLR", kwargs)?;
    let model = SimClrConfig::new(ssl_batch_size)
        .with_hidden_dim(args.hidden_dim)
        .with_projection_dim(args.projection_dim)
        .with_temperature(args.temperature)
        .init(encoder, device)
        .map_err(|e| AssemblyError::invalid("SimCLR", e))?;
    Ok(SslModel::SimClr(model))
}
