//! Validation-driven schedules. The LR plateau counter and the early-stop
//! counter both watch validation loss but are kept independent.

const REL_THRESHOLD: f64 = 1e-4;
const MIN_LR_STEP: f64 = 1e-8;

/// Halves the learning rate once validation loss has failed to improve for
/// more than `patience` consecutive epochs.
#[derive(Clone, Debug)]
pub struct PlateauScheduler {
    lr: f64,
    min_lr: f64,
    factor: f64,
    patience: usize,
    best: f64,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(lr: f64, min_lr: f64, patience: usize) -> Self {
        Self { lr, min_lr, factor: 0.5, patience, best: f64::INFINITY, bad_epochs: 0 }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Returns `Some((old, new))` when the rate changed.
    pub fn step(&mut self, val_loss: f64) -> Option<(f64, f64)> {
        if !val_loss.is_finite() {
            log::warn!("val_loss is not finite; skipping plateau update");
            return None;
        }

        if val_loss < self.best * (1.0 - REL_THRESHOLD) {
            self.best = val_loss;
            self.bad_epochs = 0;
            return None;
        }

        self.bad_epochs += 1;
        if self.bad_epochs <= self.patience {
            return None;
        }

        self.bad_epochs = 0;
        let old = self.lr;
        let new = (old * self.factor).max(self.min_lr);
        if old - new > MIN_LR_STEP {
            self.lr = new;
            Some((old, new))
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    Improved,
    Stalled(usize),
    Stop,
}

#[derive(Clone, Debug)]
pub struct EarlyStopping {
    best: f32,
    best_epoch: Option<usize>,
    stale: usize,
    patience: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { best: f32::INFINITY, best_epoch: None, stale: 0, patience }
    }

    pub fn best(&self) -> f32 {
        self.best
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn update(&mut self, epoch: usize, val_loss: f32) -> Verdict {
        if val_loss < self.best {
            self.best = val_loss;
            self.best_epoch = Some(epoch);
            self.stale = 0;
            return Verdict::Improved;
        }

        self.stale += 1;
        if self.stale >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Stalled(self.stale)
        }
    }
}
