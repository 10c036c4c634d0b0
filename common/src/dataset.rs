//! JSONL loading and the leakage-safe curation steps.
//!
//! Scores are side-to-move POV on disk and stay that way; nothing here flips
//! them except `augment`, which negates the score of each colour-swapped twin.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    pairkey::{canonical_key, GroupKey},
    position::{color_swap, Position},
};

const READER_BUF_CAP: usize = 128 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct PositionRecord {
    pub fen: String,
    pub score_cp: f32,
    pub depth: u32,
    pub pair_key: Option<String>,
    /// Precomputed feature signature, only consulted when `fen` is empty.
    pub features: Option<Vec<f32>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub lines: usize,
    pub kept: usize,
    pub blank: usize,
    pub malformed: usize,
    pub missing: usize,
    pub bad_score: usize,
    pub shallow: usize,
}

enum Rejection {
    Malformed,
    Missing,
    BadScore,
    Shallow,
}

pub fn open_reader<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    let f = File::open(p)?;
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();

    if ext == "gz" {
        let dec = flate2::read::GzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

pub fn load_path<P: AsRef<Path>>(path: P, min_depth: u32) -> Result<(Vec<PositionRecord>, LoadStats)> {
    load(open_reader(path)?, min_depth)
}

/// Reads one JSON object per line. Rows that cannot be used are dropped and
/// counted, never reported as errors; only I/O failures propagate.
pub fn load<R: BufRead>(reader: R, min_depth: u32) -> Result<(Vec<PositionRecord>, LoadStats)> {
    let mut stats = LoadStats::default();
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        stats.lines += 1;

        let s = line.trim();
        if s.is_empty() {
            stats.blank += 1;
            continue;
        }

        match parse_row(s, min_depth) {
            Ok(record) => records.push(record),
            Err(Rejection::Malformed) => stats.malformed += 1,
            Err(Rejection::Missing) => stats.missing += 1,
            Err(Rejection::BadScore) => stats.bad_score += 1,
            Err(Rejection::Shallow) => stats.shallow += 1,
        }
    }

    stats.kept = records.len();
    log::info!("rows: {} (min_depth={min_depth}, pov=side-to-move)", records.len());
    log::debug!(
        "dropped: blank={} malformed={} missing={} bad_score={} shallow={}",
        stats.blank,
        stats.malformed,
        stats.missing,
        stats.bad_score,
        stats.shallow
    );

    Ok((records, stats))
}

fn parse_row(line: &str, min_depth: u32) -> std::result::Result<PositionRecord, Rejection> {
    let row: Value = serde_json::from_str(line).map_err(|_| Rejection::Malformed)?;
    let row = row.as_object().ok_or(Rejection::Malformed)?;

    let fen = match row.get("fen") {
        None | Some(Value::Null) => return Err(Rejection::Missing),
        Some(Value::String(fen)) if fen.trim().is_empty() => return Err(Rejection::Missing),
        Some(Value::String(fen)) => fen.clone(),
        Some(_) => return Err(Rejection::Malformed),
    };

    let score = match row.get("score_cp") {
        None | Some(Value::Null) => return Err(Rejection::Missing),
        Some(v) => as_f64(v).ok_or(Rejection::BadScore)?,
    };

    let depth = match row.get("depth") {
        None => 0,
        Some(v) => as_depth(v).ok_or(Rejection::Malformed)?,
    };

    if depth < i64::from(min_depth) {
        return Err(Rejection::Shallow);
    }

    let score_cp = score as f32;
    if !score_cp.is_finite() {
        return Err(Rejection::BadScore);
    }

    let pair_key = row.get("pair_key").and_then(pair_key_of);

    let features = row.get("features").and_then(Value::as_array).map(|values| {
        values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect()
    });

    Ok(PositionRecord {
        fen,
        score_cp,
        depth: u32::try_from(depth).map_err(|_| Rejection::Malformed)?,
        pair_key,
        features,
    })
}

/// Falsy keys (`0`, `false`, `""`, empty containers) fall back to the board.
fn pair_key_of(v: &Value) -> Option<String> {
    match v {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("True".to_string()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_depth(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Appends a colour-swapped twin with negated score for every record.
pub fn augment(records: Vec<PositionRecord>) -> Result<Vec<PositionRecord>> {
    let mut twins = Vec::with_capacity(records.len());

    for r in &records {
        let pos: Position = r.fen.parse()?;
        twins.push(PositionRecord {
            fen: color_swap(&pos).to_string(),
            score_cp: -r.score_cp,
            depth: r.depth,
            pair_key: r.pair_key.clone(),
            features: None,
        });
    }

    let mut out = records;
    out.extend(twins);
    Ok(out)
}

pub fn filter(records: Vec<PositionRecord>, max_abs_cp: f32, min_depth: Option<u32>) -> Vec<PositionRecord> {
    records
        .into_iter()
        .filter(|r| r.score_cp.abs() <= max_abs_cp)
        .filter(|r| min_depth.map_or(true, |d| r.depth >= d))
        .collect()
}

/// Training cannot start from nothing; `stage` names the step that emptied it.
pub fn ensure_non_empty(records: &[PositionRecord], stage: &'static str) -> Result<()> {
    if records.is_empty() {
        return Err(Error::EmptyDataset { stage });
    }
    Ok(())
}

/// Record indices grouped by key, groups in order of first appearance.
pub fn group_indices(records: &[PositionRecord]) -> Vec<(GroupKey, Vec<usize>)> {
    let mut slot: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Vec<usize>)> = Vec::new();

    for (i, r) in records.iter().enumerate() {
        let key = canonical_key(r);
        match slot.get(&key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                slot.insert(key.clone(), groups.len());
                groups.push((key, vec![i]));
            }
        }
    }

    groups
}

/// Samples whole groups in seeded order until `cap_rows` is reached. A group
/// that would overflow is passed over, except the first one drawn.
pub fn cap(records: Vec<PositionRecord>, cap_rows: usize, seed: u64) -> Vec<PositionRecord> {
    if cap_rows == 0 || records.len() <= cap_rows {
        return records;
    }

    let mut groups = group_indices(&records);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    groups.shuffle(&mut rng);

    let mut selected: Vec<usize> = Vec::with_capacity(cap_rows);
    for (_, members) in &groups {
        if !selected.is_empty() && selected.len() + members.len() > cap_rows {
            continue;
        }

        selected.extend_from_slice(members);
        if selected.len() >= cap_rows {
            break;
        }
    }
    selected.truncate(cap_rows);

    let mut slots: Vec<Option<PositionRecord>> = records.into_iter().map(Some).collect();
    selected.into_iter().filter_map(|i| slots[i].take()).collect()
}
