pub const MAX_TRUSTED_DEPTH: u32 = 5;
pub const MIN_WEIGHT: f32 = 1.0;
pub const MAX_WEIGHT: f32 = 3.5;

/// Transition width of the smooth L1 loss, in scaled label units.
pub const HUBER_BETA: f64 = 0.5;

/// Clip to `±scale_cp`, then map onto [-1, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelTransform {
    pub scale_cp: f32,
}

impl LabelTransform {
    pub fn new(scale_cp: f32) -> Self {
        Self { scale_cp }
    }

    pub fn label(&self, score_cp: f32) -> f32 {
        score_cp.clamp(-self.scale_cp, self.scale_cp) / self.scale_cp
    }

    pub fn to_cp(&self, label: f32) -> f32 {
        label * self.scale_cp
    }
}

/// Deeper searches are trusted more; the bonus saturates at depth 5.
pub fn depth_weight(depth: u32, multiplier: f32) -> f32 {
    let d = depth.min(MAX_TRUSTED_DEPTH) as f32;
    (1.0 + multiplier * d).clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Quadratic inside `beta`, linear outside.
pub fn smooth_l1(diff: f32, beta: f32) -> f32 {
    let a = diff.abs();
    if a < beta {
        0.5 * a * a / beta
    } else {
        a - 0.5 * beta
    }
}
