use std::path::PathBuf;

use clap::Parser;
use common::Config;

/// Train the square one-hot value MLP on JSONL position/score samples.
#[derive(Debug, Parser)]
#[command(name = "train-value", version, about)]
pub struct Args {
    /// Input samples (`.jsonl` or `.jsonl.gz`), one `{fen, score_cp, depth}` object per line
    #[arg(long, default_value = "chess_samples.jsonl")]
    pub jsonl: PathBuf,

    #[arg(long, default_value_t = 16)]
    pub epochs: usize,

    #[arg(long = "batch", default_value_t = 1024)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 192)]
    pub hidden: usize,

    #[arg(long, default_value_t = 0.10)]
    pub dropout: f64,

    #[arg(long, default_value_t = 8e-4)]
    pub lr: f64,

    /// Floor for plateau halving
    #[arg(long, default_value_t = 2e-4)]
    pub min_lr: f64,

    /// Rows shallower than this are skipped while loading
    #[arg(long, default_value_t = 3)]
    pub min_depth: u32,

    /// Second depth floor, applied after augmentation
    #[arg(long)]
    pub train_min_depth: Option<u32>,

    #[arg(long, default_value_t = 3000.0)]
    pub max_abs_cp: f32,

    /// Labels are clipped to +-score_clip and divided by it
    #[arg(long, default_value_t = 1000.0)]
    pub score_clip: f32,

    /// Upper bound on curated rows, 0 for no cap
    #[arg(long, default_value_t = 0)]
    pub cap_rows: usize,

    #[arg(long, default_value_t = 0.20)]
    pub val_frac: f64,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long, default_value_t = 1e-3)]
    pub weight_decay: f64,

    /// Per-depth weight bonus, weights are clamped to [1, 3.5]
    #[arg(long, default_value_t = 0.5)]
    pub depth_weight: f32,

    #[arg(long, default_value_t = 3)]
    pub lr_patience: usize,

    #[arg(long, default_value_t = 6)]
    pub early_stop_patience: usize,

    /// Max gradient norm, 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub grad_clip: f64,

    #[arg(long, default_value = "../models/mlp_best.json")]
    pub out_best: PathBuf,

    #[arg(long, default_value = "../models/mlp_last.json")]
    pub out_last: PathBuf,

    #[arg(long, default_value = "../models/mlp_square1h.json")]
    pub out_json: PathBuf,
}

impl From<Args> for Config {
    fn from(a: Args) -> Self {
        Self {
            jsonl: a.jsonl,
            epochs: a.epochs,
            batch_size: a.batch_size,
            hidden: a.hidden,
            dropout: a.dropout,
            lr: a.lr,
            min_lr: a.min_lr,
            min_depth: a.min_depth,
            train_min_depth: a.train_min_depth,
            max_abs_cp: a.max_abs_cp,
            score_clip: a.score_clip,
            cap_rows: a.cap_rows,
            val_frac: a.val_frac,
            seed: a.seed,
            weight_decay: a.weight_decay,
            depth_weight: a.depth_weight,
            lr_patience: a.lr_patience,
            early_stop_patience: a.early_stop_patience,
            grad_clip: a.grad_clip,
            out_best: a.out_best,
            out_last: a.out_last,
            out_json: a.out_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config() {
        let cfg: Config = Args::parse_from(["train-value"]).into();
        let def = Config::default();

        assert_eq!(cfg.epochs, def.epochs);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.hidden, def.hidden);
        assert_eq!(cfg.lr, def.lr);
        assert_eq!(cfg.min_lr, def.min_lr);
        assert_eq!(cfg.score_clip, def.score_clip);
        assert_eq!(cfg.val_frac, def.val_frac);
        assert_eq!(cfg.train_min_depth, None);
        assert_eq!(cfg.out_json, def.out_json);
    }

    #[test]
    fn flags_override() {
        let cfg: Config =
            Args::parse_from(["train-value", "--batch", "64", "--cap-rows", "5000", "--train-min-depth", "4", "--seed", "9"])
                .into();

        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.cap_rows, 5000);
        assert_eq!(cfg.train_min_depth, Some(4));
        assert_eq!(cfg.seed, 9);
    }
}
