use std::collections::HashMap;

use crate::dataset::PositionRecord;

const PERCENTILES: [u32; 8] = [0, 10, 25, 50, 75, 90, 95, 99];
const TOP_DEPTHS: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub mean: f64,
    pub std: f64,
    pub percentiles: Vec<(u32, f64)>,
    /// Most common depths first, ties broken by lower depth.
    pub depths: Vec<(u32, usize)>,
}

impl Summary {
    pub fn of(records: &[PositionRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let mut scores: Vec<f64> = records.iter().map(|r| f64::from(r.score_cp)).collect();
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        scores.sort_by(f64::total_cmp);
        let percentiles = PERCENTILES.iter().map(|&q| (q, percentile(&scores, q))).collect();

        let mut hist: HashMap<u32, usize> = HashMap::new();
        for r in records {
            *hist.entry(r.depth).or_default() += 1;
        }
        let mut depths: Vec<(u32, usize)> = hist.into_iter().collect();
        depths.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        depths.truncate(TOP_DEPTHS);

        Some(Self { rows: records.len(), mean, std: var.sqrt(), percentiles, depths })
    }

    pub fn log(records: &[PositionRecord], title: &str) {
        log::info!("{title}: N={}", records.len());
        let Some(s) = Self::of(records) else {
            return;
        };

        log::info!("  score_cp mean/std: {:.3} {:.3}", s.mean, s.std);
        for (q, v) in &s.percentiles {
            log::info!("  p{q:02}: {v:.1}");
        }
        log::info!("  depth hist (top): {:?}", s.depths);
    }
}

/// Linear interpolation between closest ranks over sorted data.
fn percentile(sorted: &[f64], q: u32) -> f64 {
    let pos = f64::from(q) / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score_cp: f32, depth: u32) -> PositionRecord {
        PositionRecord { fen: String::new(), score_cp, depth, pair_key: None, features: None }
    }

    #[test]
    fn empty_has_no_summary() {
        assert!(Summary::of(&[]).is_none());
    }

    #[test]
    fn stats_and_histogram() {
        let rows: Vec<PositionRecord> =
            [(10.0, 4), (20.0, 4), (30.0, 6), (40.0, 4), (50.0, 6)].iter().map(|&(s, d)| record(s, d)).collect();
        let s = Summary::of(&rows).unwrap();

        assert_eq!(s.rows, 5);
        assert!((s.mean - 30.0).abs() < 1e-9);
        assert!((s.std - 200f64.sqrt()).abs() < 1e-9);
        assert_eq!(s.percentiles[0], (0, 10.0));
        assert_eq!(s.percentiles[3], (50, 30.0));
        assert!((s.percentiles[1].1 - 14.0).abs() < 1e-9);
        assert!((s.percentiles[7].1 - 49.6).abs() < 1e-9);
        assert_eq!(s.depths, vec![(4, 3), (6, 2)]);
    }
}
