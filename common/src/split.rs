use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dataset::{group_indices, PositionRecord};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub groups: usize,
}

/// Assigns whole key groups to validation: the first
/// `floor(groups * val_frac)` keys after a seeded shuffle.
pub fn split(records: &[PositionRecord], val_frac: f64, seed: u64) -> Split {
    let groups = group_indices(records);

    let mut order: Vec<usize> = (0..groups.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let cutoff = (groups.len() as f64 * val_frac).floor() as usize;
    let mut is_val = vec![false; groups.len()];
    for &g in &order[..cutoff.min(groups.len())] {
        is_val[g] = true;
    }

    let mut out = Split { groups: groups.len(), ..Split::default() };
    for (g, (_, members)) in groups.into_iter().enumerate() {
        if is_val[g] {
            out.val.extend(members);
        } else {
            out.train.extend(members);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{dataset::augment, pairkey::canonical_key};

    fn records(n: usize) -> Vec<PositionRecord> {
        let base = (0..n)
            .map(|i| PositionRecord {
                fen: format!("8/8/8/8/8/8/8/{} w - - 0 1", ["K6k", "k6K", "1K5k", "1k5K", "2K4k"][i % 5]),
                score_cp: i as f32,
                depth: 5,
                pair_key: Some(format!("game-{}", i / 3)),
                features: None,
            })
            .collect();
        augment(base).unwrap()
    }

    #[test]
    fn groups_never_straddle() {
        let rs = records(60);
        let s = split(&rs, 0.25, 9);

        assert_eq!(s.groups, 20);
        assert_eq!(s.train.len() + s.val.len(), rs.len());

        let val_keys: HashSet<String> = s.val.iter().map(|&i| canonical_key(&rs[i])).collect();
        let train_keys: HashSet<String> = s.train.iter().map(|&i| canonical_key(&rs[i])).collect();
        assert_eq!(val_keys.len(), 5);
        assert!(val_keys.is_disjoint(&train_keys));
    }

    #[test]
    fn deterministic_per_seed() {
        let rs = records(90);
        assert_eq!(split(&rs, 0.2, 4), split(&rs, 0.2, 4));
        assert_ne!(split(&rs, 0.2, 4), split(&rs, 0.2, 5));
    }

    #[test]
    fn zero_fraction_keeps_everything_in_train() {
        let rs = records(10);
        let s = split(&rs, 0.0, 1);
        assert!(s.val.is_empty());
        assert_eq!(s.train.len(), rs.len());
    }
}
