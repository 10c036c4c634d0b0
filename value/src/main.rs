mod args;
mod arch;
mod loader;
mod save;

use anyhow::{Context, Result};
use clap::Parser;

use arch::Trainable;
use args::Args;
use common::{
    dataset,
    position::encode,
    split::split,
    summary::Summary,
    weighting::LabelTransform,
    Checkpoint, Config, Examples, ExportedModel,
};

const SAMPLE_FENS: [(&str, &str); 5] = [
    ("startpos", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
    ("startpos, black to move", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1"),
    ("white up a queen", "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
    ("black up a rook", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/1NBQKBNR w Kkq - 0 1"),
    ("kiwipete", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"),
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg: Config = Args::parse().into();
    cfg.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;

    tch::set_num_threads(1);
    tch::manual_seed(cfg.seed as i64);
    log::info!("config: {}", serde_json::to_string(&cfg)?);

    let (records, _) = dataset::load_path(&cfg.jsonl, cfg.min_depth)
        .with_context(|| format!("failed to load {}", cfg.jsonl.display()))?;
    let records = dataset::augment(records)?;
    Summary::log(&records, "after augment");
    dataset::ensure_non_empty(&records, "after load/augment")?;

    let records = dataset::filter(records, cfg.max_abs_cp, cfg.train_min_depth);
    let records = dataset::cap(records, cfg.cap_rows, cfg.seed);
    Summary::log(&records, "after filter/cap");
    dataset::ensure_non_empty(&records, "after filter/cap")?;

    let parts = split(&records, cfg.val_frac, cfg.seed);
    log::info!("split: {} groups -> train {} / val {} rows", parts.groups, parts.train.len(), parts.val.len());

    let scale = LabelTransform::new(cfg.score_clip);
    let train_set = Examples::build(&records, &parts.train, scale, cfg.depth_weight)?;
    let val_set = Examples::build(&records, &parts.val, scale, cfg.depth_weight)?;
    drop(records);

    let mut model = Trainable::new(&cfg)?;
    let outcome = common::train(&mut model, &train_set, &val_set, &cfg)?;
    log::info!("best val {:.4} at epoch {:02}", outcome.best_val_loss, outcome.best_epoch);

    let best = Checkpoint::load(&cfg.out_best)
        .with_context(|| format!("failed to read best checkpoint {}", cfg.out_best.display()))?;
    let exported = ExportedModel::from_checkpoint(&best)?;
    exported
        .save(&cfg.out_json)
        .with_context(|| format!("failed to write {}", cfg.out_json.display()))?;
    log::info!("exported {} to {}", exported.basis, cfg.out_json.display());

    run_sample_fens(&exported)
}

fn run_sample_fens(model: &ExportedModel) -> Result<()> {
    for (name, fen) in SAMPLE_FENS {
        let x = encode(&fen.parse()?)?;
        log::info!("{:>+8.1} cp  {name}", model.predict_cp(&x)?);
    }

    Ok(())
}
