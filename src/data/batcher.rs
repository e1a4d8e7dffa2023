// ============================================================
// Layer 4 — Signal Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks `SignalItem`s into
// tensors of shape [batch, 1, signal_len] (one tensor per view)
// plus a [batch] label tensor.
//
// All signals in a split share one length (the data module pads
// or crops on load), so the flat buffer reshapes directly.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SignalItem;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SignalBatch<B: Backend> {
    /// One tensor per view, each [batch, 1, signal_len]
    pub views: Vec<Tensor<B, 3>>,

    /// Class ids, [batch]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> SignalBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct SignalBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SignalBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SignalItem, SignalBatch<B>> for SignalBatcher<B> {
    fn batch(&self, items: Vec<SignalItem>) -> SignalBatch<B> {
        let batch_size = items.len();
        let n_views    = items.first().map_or(0, |i| i.views.len());
        let signal_len = items
            .first()
            .and_then(|i| i.views.first())
            .map_or(0, |v| v.len());

        let views = (0..n_views)
            .map(|v| {
                let flat: Vec<f32> = items
                    .iter()
                    .flat_map(|item| item.views[v].iter().copied())
                    .collect();
                Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
                    .reshape([batch_size, 1, signal_len])
            })
            .collect();

        let labels: Vec<i32> = items.iter().map(|i| i.label).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        SignalBatch { views, labels }
    }
}
