// ============================================================
// Layer 5 — Feature Encoders
// ============================================================
// Two 1-D convolutional encoders map a raw signal
// [batch, in_channels, len_seq] to a flat feature vector
// [batch, out_size]:
//
//   CNN1D   — a stack of valid-padded strided convolutions,
//             ReLU + dropout after each, flattened at the end
//             out_size = out_channels.last() * final_length
//
//   CNN1D1L — one convolution followed by global average
//             pooling over time
//             out_size = out_channels
//
// `Encoder` is the closed set of encoders the registry can
// build; SSL frameworks and the classification model hold it.
//
// Before each strided convolution the input is cropped to the
// span the kernel actually covers, (len - k) / stride * stride + k
// samples. The output length is unchanged; the dropped tail never
// reached any kernel window.

use std::path::Path;

use anyhow::Result;
use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        pool::{AdaptiveAvgPool1d, AdaptiveAvgPool1dConfig},
        Dropout, DropoutConfig, PaddingConfig1d, Relu,
    },
    prelude::*,
};

use crate::infra::checkpoint::save_module;

// ─── CNN1D ────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct Cnn1dConfig {
    pub len_seq:      usize,
    pub out_channels: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
    #[config(default = 1)]
    pub in_channels:  usize,
    #[config(default = 1)]
    pub stride:       usize,
    #[config(default = 0.1)]
    pub dropout:      f64,
}

impl Cnn1dConfig {
    /// Sequence length after every convolution, or an error if the
    /// layer description is inconsistent.
    pub fn layer_lengths(&self) -> Result<Vec<usize>, String> {
        if self.out_channels.is_empty() {
            return Err("out_channels must not be empty".into());
        }
        if self.out_channels.len() != self.kernel_sizes.len() {
            return Err(format!(
                "out_channels ({}) and kernel_sizes ({}) differ in length",
                self.out_channels.len(),
                self.kernel_sizes.len()
            ));
        }
        if self.stride == 0 {
            return Err("stride must be positive".into());
        }

        let mut len     = self.len_seq;
        let mut lengths = Vec::with_capacity(self.kernel_sizes.len());
        for &k in &self.kernel_sizes {
            if k == 0 || k > len {
                return Err(format!("kernel size {k} does not fit sequence length {len}"));
            }
            len = (len - k) / self.stride + 1;
            lengths.push(len);
        }
        Ok(lengths)
    }

    /// Flattened feature size of the encoder output.
    pub fn out_size(&self) -> Result<usize, String> {
        let lengths = self.layer_lengths()?;
        // layer_lengths guarantees both vectors are non-empty
        Ok(self.out_channels[self.out_channels.len() - 1] * lengths[lengths.len() - 1])
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Cnn1d<B>, String> {
        let out_size = self.out_size()?;

        let mut in_ch = self.in_channels;
        let convs = self
            .out_channels
            .iter()
            .zip(&self.kernel_sizes)
            .map(|(&out_ch, &k)| {
                let conv = Conv1dConfig::new(in_ch, out_ch, k)
                    .with_stride(self.stride)
                    .with_padding(PaddingConfig1d::Valid)
                    .init(device);
                in_ch = out_ch;
                conv
            })
            .collect();

        Ok(Cnn1d {
            convs,
            activation: Relu::new(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            stride:     self.stride,
            out_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct Cnn1d<B: Backend> {
    pub convs:      Vec<Conv1d<B>>,
    pub activation: Relu,
    pub dropout:    Dropout,
    pub stride:     usize,
    pub out_size:   usize,
}

impl<B: Backend> Cnn1d<B> {
    /// [batch, in_channels, len_seq] → [batch, out_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut x = x;
        for conv in &self.convs {
            let x_in = crop_to_span(x, kernel_size(conv), self.stride);
            x = self.dropout.forward(self.activation.forward(conv.forward(x_in)));
        }
        x.flatten(1, 2)
    }
}

fn kernel_size<B: Backend>(conv: &Conv1d<B>) -> usize {
    // weight: [out_channels, in_channels, kernel_size]
    conv.weight.val().dims()[2]
}

/// Samples a valid strided convolution reads from a sequence of `len`.
pub fn covered_span(len: usize, kernel: usize, stride: usize) -> usize {
    if len < kernel || stride == 0 {
        return len;
    }
    (len - kernel) / stride * stride + kernel
}

fn crop_to_span<B: Backend>(x: Tensor<B, 3>, kernel: usize, stride: usize) -> Tensor<B, 3> {
    let [batch, channels, len] = x.dims();
    let span = covered_span(len, kernel, stride);
    if span == len {
        x
    } else {
        x.slice([0..batch, 0..channels, 0..span])
    }
}

// ─── CNN1D1L ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct Cnn1d1LConfig {
    pub len_seq:      usize,
    pub out_channels: usize,
    pub kernel_size:  usize,
    #[config(default = 1)]
    pub in_channels:  usize,
    #[config(default = 1)]
    pub stride:       usize,
}

impl Cnn1d1LConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Cnn1d1L<B>, String> {
        if self.out_channels == 0 {
            return Err("out_channels must be positive".into());
        }
        if self.stride == 0 {
            return Err("stride must be positive".into());
        }
        if self.kernel_size == 0 || self.kernel_size > self.len_seq {
            return Err(format!(
                "kernel size {} does not fit sequence length {}",
                self.kernel_size, self.len_seq
            ));
        }

        Ok(Cnn1d1L {
            conv: Conv1dConfig::new(self.in_channels, self.out_channels, self.kernel_size)
                .with_stride(self.stride)
                .with_padding(PaddingConfig1d::Valid)
                .init(device),
            activation: Relu::new(),
            pool:       AdaptiveAvgPool1dConfig::new(1).init(),
            stride:     self.stride,
            out_size:   self.out_channels,
        })
    }
}

#[derive(Module, Debug)]
pub struct Cnn1d1L<B: Backend> {
    pub conv:       Conv1d<B>,
    pub activation: Relu,
    pub pool:       AdaptiveAvgPool1d,
    pub stride:     usize,
    pub out_size:   usize,
}

impl<B: Backend> Cnn1d1L<B> {
    /// [batch, in_channels, len_seq] → [batch, out_channels]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = crop_to_span(x, kernel_size(&self.conv), self.stride);
        let x = self.activation.forward(self.conv.forward(x));
        self.pool.forward(x).flatten(1, 2)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub enum Encoder<B: Backend> {
    Cnn1d(Cnn1d<B>),
    Cnn1d1L(Cnn1d1L<B>),
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        match self {
            Encoder::Cnn1d(m)   => m.forward(x),
            Encoder::Cnn1d1L(m) => m.forward(x),
        }
    }

    pub fn out_size(&self) -> usize {
        match self {
            Encoder::Cnn1d(m)   => m.out_size,
            Encoder::Cnn1d1L(m) => m.out_size,
        }
    }

    /// Registered class name of the wrapped architecture.
    pub fn class_name(&self) -> &'static str {
        match self {
            Encoder::Cnn1d(_)   => "CNN1D",
            Encoder::Cnn1d1L(_) => "CNN1D1L",
        }
    }

    /// Persist the wrapped architecture's weights; the file can be
    /// handed back to the matching encoder as `pretrained`.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Encoder::Cnn1d(m)   => save_module::<B, _>(m, path),
            Encoder::Cnn1d1L(m) => save_module::<B, _>(m, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn cnn1d_out_size_follows_valid_convolutions() {
        // 48000 → (48000-7)/4+1 = 11999 → 2999 → 749
        let cfg = Cnn1dConfig::new(48_000, vec![2, 2, 2], vec![7, 7, 7]).with_stride(4);
        assert_eq!(cfg.layer_lengths().unwrap(), vec![11_999, 2_999, 749]);
        assert_eq!(cfg.out_size().unwrap(), 2 * 749);
    }

    #[test]
    fn covered_span_drops_the_unread_tail() {
        assert_eq!(covered_span(200, 7, 4), 199);
        assert_eq!(covered_span(203, 7, 4), 203);
        assert_eq!(covered_span(48_000, 7, 4), 47_999);
        assert_eq!(covered_span(10, 3, 1), 10);
        assert_eq!(covered_span(2, 3, 4), 2);
    }

    #[test]
    fn cnn1d_backward_on_lengths_not_aligned_to_stride() {
        type AdBackend = burn::backend::Autodiff<NdArray>;
        let device = Default::default();

        for len_seq in [200, 203, 1_000, 48_000] {
            let cfg = Cnn1dConfig::new(len_seq, vec![2, 2, 2], vec![7, 7, 7]).with_stride(4);
            let model: Cnn1d<AdBackend> = cfg.init(&device).unwrap();

            let x   = Tensor::<AdBackend, 3>::ones([2, 1, len_seq], &device);
            let out = model.forward(x);
            assert_eq!(out.dims(), [2, cfg.out_size().unwrap()]);

            let grads = out.sum().backward();
            assert!(model.convs[0].weight.grad(&grads).is_some(), "len_seq={len_seq}");
        }
    }

    #[test]
    fn cnn1d1l_backward_with_stride() {
        type AdBackend = burn::backend::Autodiff<NdArray>;
        let device = Default::default();
        let model: Cnn1d1L<AdBackend> = Cnn1d1LConfig::new(50, 4, 5)
            .with_stride(3)
            .init(&device)
            .unwrap();

        let grads = model.forward(Tensor::ones([2, 1, 50], &device)).sum().backward();
        assert!(model.conv.weight.grad(&grads).is_some());
    }

    #[test]
    fn cnn1d_rejects_mismatched_layers() {
        let cfg = Cnn1dConfig::new(100, vec![2, 2], vec![7]);
        assert!(cfg.out_size().is_err());
        let cfg = Cnn1dConfig::new(5, vec![2], vec![7]);
        assert!(cfg.out_size().is_err());
    }

    #[test]
    fn cnn1d_forward_shape_matches_out_size() {
        let device = Default::default();
        let cfg    = Cnn1dConfig::new(64, vec![3, 4], vec![5, 3]).with_stride(2);
        let model: Cnn1d<TestBackend> = cfg.init(&device).unwrap();

        let x   = Tensor::<TestBackend, 3>::zeros([2, 1, 64], &device);
        let out = Encoder::Cnn1d(model).forward(x);
        assert_eq!(out.dims(), [2, cfg.out_size().unwrap()]);
    }

    #[test]
    fn cnn1d1l_pools_over_time() {
        let device = Default::default();
        let model: Cnn1d1L<TestBackend> = Cnn1d1LConfig::new(32, 6, 4).init(&device).unwrap();
        let encoder = Encoder::Cnn1d1L(model);

        let out = encoder.forward(Tensor::zeros([3, 1, 32], &device));
        assert_eq!(out.dims(), [3, 6]);
        assert_eq!(encoder.out_size(), 6);
        assert_eq!(encoder.class_name(), "CNN1D1L");
    }
}
