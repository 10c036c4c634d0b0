use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::{
    dataset::PositionRecord,
    error::Result,
    position::{encode, Position, INPUT_DIM},
    weighting::{depth_weight, LabelTransform},
};

/// Encoded examples of one partition, row-major `[len, INPUT_DIM]`.
pub struct Examples {
    inputs: Vec<f32>,
    labels: Vec<f32>,
    weights: Vec<f32>,
}

/// One mini-batch, copied out of `Examples` in iteration order.
#[derive(Default)]
pub struct Batch {
    pub inputs: Vec<f32>,
    pub labels: Vec<f32>,
    pub weights: Vec<f32>,
    pub size: usize,
}

impl Batch {
    fn clear(&mut self) {
        self.inputs.clear();
        self.labels.clear();
        self.weights.clear();
        self.size = 0;
    }
}

impl Examples {
    /// Encodes `records[i]` for every `i` in `indices`. A board that does not
    /// encode is corrupt input and aborts the build.
    pub fn build(
        records: &[PositionRecord],
        indices: &[usize],
        transform: LabelTransform,
        depth_multiplier: f32,
    ) -> Result<Self> {
        let mut inputs = Vec::with_capacity(indices.len() * INPUT_DIM);
        let mut labels = Vec::with_capacity(indices.len());
        let mut weights = Vec::with_capacity(indices.len());

        for &i in indices {
            let r = &records[i];
            let pos: Position = r.fen.parse()?;
            inputs.extend_from_slice(&encode(&pos)?);
            labels.push(transform.label(r.score_cp));
            weights.push(depth_weight(r.depth, depth_multiplier));
        }

        Ok(Self { inputs, labels, weights })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn input(&self, i: usize) -> &[f32] {
        &self.inputs[i * INPUT_DIM..(i + 1) * INPUT_DIM]
    }

    pub fn label(&self, i: usize) -> f32 {
        self.labels[i]
    }

    /// Visits the examples in chunks of `batch_size`, in a fresh seeded
    /// permutation when `rng` is given, in stored order otherwise.
    pub fn map_batches<F: FnMut(&Batch) -> Result<()>>(
        &self,
        batch_size: usize,
        rng: Option<&mut ChaCha8Rng>,
        mut f: F,
    ) -> Result<()> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }

        let mut batch = Batch::default();
        for chunk in order.chunks(batch_size.max(1)) {
            batch.clear();
            for &i in chunk {
                batch.inputs.extend_from_slice(self.input(i));
                batch.labels.push(self.labels[i]);
                batch.weights.push(self.weights[i]);
            }
            batch.size = chunk.len();

            f(&batch)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{error::Error, position::TEMPO};

    fn record(fen: &str, score_cp: f32, depth: u32) -> PositionRecord {
        PositionRecord { fen: fen.to_string(), score_cp, depth, pair_key: None, features: None }
    }

    fn examples() -> Examples {
        let records: Vec<PositionRecord> = (0..10)
            .map(|i| {
                let side = if i % 2 == 0 { "w" } else { "b" };
                record(&format!("8/8/8/8/8/8/8/K6k {side} - - 0 1"), 300.0 * i as f32, i)
            })
            .collect();
        let indices: Vec<usize> = (0..10).collect();
        Examples::build(&records, &indices, LabelTransform::new(1000.0), 0.5).unwrap()
    }

    #[test]
    fn build_encodes_labels_and_weights() {
        let ex = examples();
        assert_eq!(ex.len(), 10);
        assert_eq!(ex.label(1), 0.3);
        assert_eq!(ex.label(9), 1.0);
        assert_eq!(ex.input(1)[TEMPO], -1.0);
        assert_eq!(ex.weights[0], 1.0);
        assert_eq!(ex.weights[7], 3.5);
    }

    #[test]
    fn build_rejects_corrupt_board() {
        let records = vec![record("8/8/8/8/8/8/8/K5k w - - 0 1", 0.0, 5)];
        assert!(matches!(
            Examples::build(&records, &[0], LabelTransform::new(1000.0), 0.5),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn batches_cover_every_example_once() {
        let ex = examples();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut sizes = Vec::new();
        let mut seen = Vec::new();

        ex.map_batches(4, Some(&mut rng), |b| {
            assert_eq!(b.inputs.len(), b.size * INPUT_DIM);
            sizes.push(b.size);
            seen.extend(b.labels.iter().copied());
            Ok(())
        })
        .unwrap();

        assert_eq!(sizes, vec![4, 4, 2]);
        seen.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..10).map(|i| ex.label(i)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn unshuffled_batches_keep_order() {
        let ex = examples();
        let mut labels = Vec::new();
        ex.map_batches(3, None, |b| {
            labels.extend(b.labels.iter().copied());
            Ok(())
        })
        .unwrap();
        let expected: Vec<f32> = (0..10).map(|i| ex.label(i)).collect();
        assert_eq!(labels, expected);
    }
}
