use std::path::PathBuf;

use serde::Serialize;

/// Every knob of a training run. Built once (by the CLI or a test) and passed
/// by reference; nothing in the crate reads process-wide defaults.
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    pub jsonl: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden: usize,
    pub dropout: f64,
    pub lr: f64,
    pub min_lr: f64,
    /// Depth floor applied while loading, before augmentation.
    pub min_depth: u32,
    /// Optional second depth floor applied after augmentation.
    pub train_min_depth: Option<u32>,
    pub max_abs_cp: f32,
    /// Labels are clipped to `±score_clip` and divided by it.
    pub score_clip: f32,
    /// 0 disables capping.
    pub cap_rows: usize,
    pub val_frac: f64,
    pub seed: u64,
    pub weight_decay: f64,
    pub depth_weight: f32,
    pub lr_patience: usize,
    pub early_stop_patience: usize,
    /// Max gradient norm per step; 0 disables clipping.
    pub grad_clip: f64,
    pub out_best: PathBuf,
    pub out_last: PathBuf,
    pub out_json: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jsonl: PathBuf::from("chess_samples.jsonl"),
            epochs: 16,
            batch_size: 1024,
            hidden: 192,
            dropout: 0.10,
            lr: 8e-4,
            min_lr: 2e-4,
            min_depth: 3,
            train_min_depth: None,
            max_abs_cp: 3000.0,
            score_clip: 1000.0,
            cap_rows: 0,
            val_frac: 0.20,
            seed: 0,
            weight_decay: 1e-3,
            depth_weight: 0.5,
            lr_patience: 3,
            early_stop_patience: 6,
            grad_clip: 1.0,
            out_best: PathBuf::from("../models/mlp_best.json"),
            out_last: PathBuf::from("../models/mlp_last.json"),
            out_json: PathBuf::from("../models/mlp_square1h.json"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.epochs == 0 {
            return Err("at least one epoch is required".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch size must be at least 1".to_string());
        }
        if self.hidden == 0 {
            return Err("hidden width must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(format!("dropout {} outside [0, 1)", self.dropout));
        }
        if !(0.0..1.0).contains(&self.val_frac) {
            return Err(format!("validation fraction {} outside [0, 1)", self.val_frac));
        }
        if self.lr <= 0.0 || self.min_lr < 0.0 {
            return Err(format!("invalid learning rates lr={} min_lr={}", self.lr, self.min_lr));
        }
        if self.grad_clip < 0.0 || !self.grad_clip.is_finite() {
            return Err(format!("gradient clip must be >= 0 (0 disables), got {}", self.grad_clip));
        }
        if self.score_clip <= 0.0 || !self.score_clip.is_finite() {
            return Err(format!("score clip must be positive, got {}", self.score_clip));
        }
        Ok(())
    }
}
