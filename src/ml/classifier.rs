// ============================================================
// Layer 5 — Classification Model
// ============================================================
// The supervised model: an encoder followed by a linear head.
//
//   signal [batch, 1, len] ──encoder──► [batch, out_size]
//                          ──linear──►  [batch, num_classes]
//
// Loss is cross-entropy over the class logits; accuracy is
// counted from the arg-max prediction.

use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::batcher::SignalBatch;
use crate::ml::encoders::Encoder;
use crate::ml::trainer::{StepModel, StepOutput};

#[derive(Config, Debug)]
pub struct LinearClassifierConfig {
    pub in_size:     usize,
    pub num_classes: usize,
}

impl LinearClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearClassifier<B> {
        LinearClassifier {
            linear: LinearConfig::new(self.in_size, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LinearClassifier<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> LinearClassifier<B> {
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(features)
    }
}

#[derive(Module, Debug)]
pub struct ClassificationModel<B: Backend> {
    pub encoder:    Encoder<B>,
    pub classifier: LinearClassifier<B>,
}

impl<B: Backend> ClassificationModel<B> {
    pub fn new(encoder: Encoder<B>, classifier: LinearClassifier<B>) -> Self {
        Self { encoder, classifier }
    }

    /// [batch, 1, len] → logits [batch, num_classes]
    pub fn forward(&self, signals: Tensor<B, 3>) -> Tensor<B, 2> {
        self.classifier.forward(self.encoder.forward(signals))
    }
}

impl<B: Backend> StepModel<B> for ClassificationModel<B> {
    fn step(&self, batch: SignalBatch<B>) -> StepOutput<B> {
        let count = batch.batch_size();
        let SignalBatch { mut views, labels } = batch;
        let signals = views.swap_remove(0);

        let logits = self.forward(signals);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels.clone());

        // argmax(1) is [batch, 1]; flatten to [batch] before comparing
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predicted
            .equal(labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        StepOutput { loss, correct: Some(correct as usize), count }
    }
}
