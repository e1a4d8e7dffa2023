// ============================================================
// Layer 5 — Self-Supervised Frameworks
// ============================================================
// An SSL framework wraps an encoder and trains it without
// labels. The wrapper takes ownership of the encoder for the
// duration of training and gives it back afterwards through
// `into_encoder`.
//
// SimCLR:
//   two augmented views ──encoder──► h1, h2
//                       ──projector (Linear-ReLU-Linear)──► z1, z2
//   loss = NT-Xent(z1, z2, temperature)
//
// NT-Xent treats (z1[i], z2[i]) as the positive pair and every
// other projection in the 2N batch as a negative.

use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig, Relu},
    prelude::*,
};

use crate::data::batcher::SignalBatch;
use crate::ml::encoders::Encoder;
use crate::ml::trainer::{StepModel, StepOutput};

// ─── SimCLR ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SimClrConfig {
    pub ssl_batch_size: usize,
    #[config(default = 128)]
    pub hidden_dim:     usize,
    #[config(default = 64)]
    pub projection_dim: usize,
    #[config(default = 0.1)]
    pub temperature:    f64,
}

impl SimClrConfig {
    pub fn init<B: Backend>(&self, encoder: Encoder<B>, device: &B::Device) -> Result<SimClr<B>, String> {
        if self.temperature <= 0.0 {
            return Err(format!("temperature must be positive, got {}", self.temperature));
        }
        if self.hidden_dim == 0 || self.projection_dim == 0 {
            return Err("projection sizes must be positive".into());
        }

        let projector_in  = LinearConfig::new(encoder.out_size(), self.hidden_dim).init(device);
        let projector_out = LinearConfig::new(self.hidden_dim, self.projection_dim).init(device);

        Ok(SimClr {
            encoder,
            projector_in,
            activation: Relu::new(),
            projector_out,
            temperature: self.temperature,
            ssl_batch_size: self.ssl_batch_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct SimClr<B: Backend> {
    pub encoder:        Encoder<B>,
    pub projector_in:   Linear<B>,
    pub activation:     Relu,
    pub projector_out:  Linear<B>,
    pub temperature:    f64,
    pub ssl_batch_size: usize,
}

impl<B: Backend> SimClr<B> {
    /// [batch, 1, len] → projections [batch, projection_dim]
    pub fn project(&self, signals: Tensor<B, 3>) -> Tensor<B, 2> {
        let h = self.encoder.forward(signals);
        self.projector_out
            .forward(self.activation.forward(self.projector_in.forward(h)))
    }
}

impl<B: Backend> StepModel<B> for SimClr<B> {
    fn step(&self, batch: SignalBatch<B>) -> StepOutput<B> {
        let count  = batch.batch_size();
        let device = batch.labels.device();
        let mut views = batch.views.into_iter();

        // A single view is contrasted against itself, which leaves
        // only the uniformity term of the loss.
        let (a, b) = match (views.next(), views.next()) {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None)    => (a.clone(), a),
            (None, _)          => {
                return StepOutput { loss: Tensor::zeros([1], &device), correct: None, count: 0 };
            }
        };

        let loss = nt_xent_loss(self.project(a), self.project(b), self.temperature);
        StepOutput { loss, correct: None, count }
    }
}

/// Normalised-temperature cross entropy over a batch of positive pairs.
///
/// `z1` and `z2` are [n, d]; row i of each forms the positive pair.
pub fn nt_xent_loss<B: Backend>(z1: Tensor<B, 2>, z2: Tensor<B, 2>, temperature: f64) -> Tensor<B, 1> {
    let [n, d] = z1.dims();
    let device = z1.device();
    let total  = 2 * n;

    let z    = Tensor::cat(vec![z1, z2], 0);
    let norm = z.clone().powf_scalar(2.0).sum_dim(1).sqrt().clamp_min(1e-8);
    let z    = z / norm.expand([total, d]);

    let similarity = z.clone().matmul(z.transpose()).div_scalar(temperature);

    // A sample is never its own negative
    let idx  = Tensor::<B, 1, Int>::arange(0..total as i64, &device);
    let rows = idx.clone().reshape([total, 1]).expand([total, total]);
    let cols = idx.reshape([1, total]).expand([total, total]);
    let similarity = similarity.mask_fill(rows.equal(cols), -1e9);

    let targets: Vec<i32> = (0..total).map(|i| ((i + n) % total) as i32).collect();
    let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &device);

    CrossEntropyLossConfig::new()
        .init(&device)
        .forward(similarity, targets)
}

// ─── SslModel ─────────────────────────────────────────────────────────────────
/// The closed set of SSL frameworks the registry can build.
#[derive(Module, Debug)]
pub enum SslModel<B: Backend> {
    SimClr(SimClr<B>),
}

impl<B: Backend> SslModel<B> {
    pub fn encoder(&self) -> &Encoder<B> {
        match self {
            SslModel::SimClr(m) => &m.encoder,
        }
    }

    /// Release the trained encoder.
    pub fn into_encoder(self) -> Encoder<B> {
        match self {
            SslModel::SimClr(m) => m.encoder,
        }
    }

    pub fn ssl_batch_size(&self) -> usize {
        match self {
            SslModel::SimClr(m) => m.ssl_batch_size,
        }
    }

    pub fn framework_name(&self) -> &'static str {
        match self {
            SslModel::SimClr(_) => "SimCLR",
        }
    }
}

impl<B: Backend> StepModel<B> for SslModel<B> {
    fn step(&self, batch: SignalBatch<B>) -> StepOutput<B> {
        match self {
            SslModel::SimClr(m) => m.step(batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoders::Cnn1d1LConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn encoder(device: &<TestBackend as Backend>::Device) -> Encoder<TestBackend> {
        Encoder::Cnn1d1L(Cnn1d1LConfig::new(16, 4, 3).init(device).unwrap())
    }

    #[test]
    fn aligned_pairs_have_lower_loss_than_shuffled_pairs() {
        let device = Default::default();
        let z1 = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]], &device);
        let z2 = z1.clone();
        let z2_shuffled =
            Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0], [-1.0, 0.0], [1.0, 0.0]], &device);

        let aligned: f32  = nt_xent_loss(z1.clone(), z2, 0.5).into_scalar();
        let shuffled: f32 = nt_xent_loss(z1, z2_shuffled, 0.5).into_scalar();
        assert!(aligned < shuffled);
    }

    #[test]
    fn simclr_step_on_two_views() {
        let device = Default::default();
        let model  = SimClrConfig::new(4).init(encoder(&device), &device).unwrap();
        let batch  = SignalBatch {
            views: vec![
                Tensor::<TestBackend, 3>::random([4, 1, 16], burn::tensor::Distribution::Default, &device),
                Tensor::<TestBackend, 3>::random([4, 1, 16], burn::tensor::Distribution::Default, &device),
            ],
            labels: Tensor::<TestBackend, 1, Int>::zeros([4], &device),
        };
        let out = SslModel::SimClr(model).step(batch);
        assert_eq!(out.count, 4);
        assert!(out.correct.is_none());
        let loss: f32 = out.loss.into_scalar();
        assert!(loss.is_finite());
    }

    #[test]
    fn wrapper_owns_and_returns_encoder() {
        let device = Default::default();
        let model  = SslModel::SimClr(SimClrConfig::new(8).init(encoder(&device), &device).unwrap());
        assert_eq!(model.ssl_batch_size(), 8);
        assert_eq!(model.encoder().out_size(), 4);
        assert_eq!(model.into_encoder().class_name(), "CNN1D1L");
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        let device = Default::default();
        let cfg = SimClrConfig::new(8).with_temperature(0.0);
        assert!(cfg.init(encoder(&device), &device).is_err());
    }
}
