pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod loader;
pub mod pairkey;
pub mod position;
pub mod schedule;
pub mod split;
pub mod summary;
pub mod weighting;

pub use checkpoint::{Checkpoint, NamedTensor, ParameterState};
pub use config::Config;
pub use error::{Error, Result};
pub use export::ExportedModel;
pub use loader::{Batch, Examples};

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use schedule::{EarlyStopping, PlateauScheduler, Verdict};
use weighting::{smooth_l1, LabelTransform, HUBER_BETA};

/// A trainable value network, independent of the tensor backend behind it.
pub trait Network {
    /// Forward, backward and one optimiser step in training mode. Returns the
    /// depth-weighted mean loss of the batch.
    fn run_batch(&mut self, batch: &Batch) -> Result<f32>;

    /// Scaled predictions in evaluation mode, without gradient tracking.
    fn predict(&mut self, batch: &Batch) -> Result<Vec<f32>>;

    fn set_lr(&mut self, lr: f64);

    fn state(&self) -> Result<ParameterState>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EpochStats {
    pub train_loss: f32,
    pub val_loss: f32,
    pub mae_cp: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainOutcome {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f32,
    pub stopped_early: bool,
    pub history: Vec<EpochStats>,
}

/// Unweighted smooth L1 and absolute error in centipawns over `examples`.
/// An empty partition scores zero on both.
pub fn evaluate<N: Network>(net: &mut N, examples: &Examples, batch_size: usize, scale: LabelTransform) -> Result<(f32, f32)> {
    if examples.is_empty() {
        return Ok((0.0, 0.0));
    }

    let mut loss_sum = 0.0f64;
    let mut abs_sum = 0.0f64;
    examples.map_batches(batch_size, None, |batch| {
        let preds = net.predict(batch)?;
        for (pred, label) in preds.iter().zip(&batch.labels) {
            let diff = pred - label;
            loss_sum += f64::from(smooth_l1(diff, HUBER_BETA as f32));
            abs_sum += f64::from(diff.abs());
        }
        Ok(())
    })?;

    let n = examples.len() as f64;
    Ok(((loss_sum / n) as f32, scale.to_cp((abs_sum / n) as f32)))
}

/// Runs epochs until `cfg.epochs` or early stopping. The best checkpoint is
/// rewritten at `cfg.out_best` on every strict improvement of validation loss;
/// the final parameters go to `cfg.out_last`. A run in which no epoch
/// improved fails with `Error::NoImprovement`, leaving `cfg.out_best` alone.
pub fn train<N: Network>(net: &mut N, train: &Examples, val: &Examples, cfg: &Config) -> Result<TrainOutcome> {
    let scale = LabelTransform::new(cfg.score_clip);
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut plateau = PlateauScheduler::new(cfg.lr, cfg.min_lr, cfg.lr_patience);
    let mut stopper = EarlyStopping::new(cfg.early_stop_patience);

    net.set_lr(plateau.lr());
    log::info!(
        "training: {} train / {} val examples, batch {}, {} epochs max",
        train.len(),
        val.len(),
        cfg.batch_size,
        cfg.epochs
    );

    let mut history = Vec::with_capacity(cfg.epochs);
    let mut stopped_early = false;

    for epoch in 1..=cfg.epochs {
        let t = Instant::now();

        let mut weighted = 0.0f64;
        train.map_batches(cfg.batch_size, Some(&mut rng), |batch| {
            let loss = net.run_batch(batch)?;
            weighted += f64::from(loss) * batch.size as f64;
            Ok(())
        })?;
        let train_loss = if train.is_empty() { 0.0 } else { (weighted / train.len() as f64) as f32 };

        let (val_loss, mae_cp) = evaluate(net, val, cfg.batch_size, scale)?;
        let stats = EpochStats { train_loss, val_loss, mae_cp };
        history.push(stats);

        let mut line = format!("epoch {epoch:02} train {train_loss:.4} val {val_loss:.4} | mae_cp {mae_cp:.1}");
        if let Some((old, new)) = plateau.step(f64::from(val_loss)) {
            net.set_lr(new);
            line.push_str(&format!(" | lr {old:.2e} → {new:.2e}"));
        }
        log::info!("{line}");
        log::debug!("epoch {epoch:02} took {:.2}s", t.elapsed().as_secs_f32());

        match stopper.update(epoch, val_loss) {
            Verdict::Improved => {
                Checkpoint::new(net.state()?, cfg.score_clip).save(&cfg.out_best)?;
                log::debug!("saved best checkpoint to {}", cfg.out_best.display());
            }
            Verdict::Stalled(n) => log::debug!("no improvement for {n} epoch(s)"),
            Verdict::Stop => {
                log::info!("early stop at epoch {epoch:02} (best {:.4})", stopper.best());
                stopped_early = true;
                break;
            }
        }
    }

    Checkpoint::new(net.state()?, cfg.score_clip).save(&cfg.out_last)?;
    log::info!("saved last checkpoint to {}", cfg.out_last.display());

    let Some(best_epoch) = stopper.best_epoch() else {
        return Err(Error::NoImprovement { epochs: history.len() });
    };

    Ok(TrainOutcome {
        epochs_run: history.len(),
        best_epoch,
        best_val_loss: stopper.best(),
        stopped_early,
        history,
    })
}
