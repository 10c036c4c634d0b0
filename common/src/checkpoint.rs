use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    position::INPUT_DIM,
};

pub const MODEL_POV: &str = "sidemove";
const FIRST_LAYER: &str = "l1.weight";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// Runtime-independent copy of every trainable parameter, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterState(pub Vec<NamedTensor>);

impl ParameterState {
    pub fn get(&self, name: &str) -> Result<&NamedTensor> {
        self.0.iter().find(|t| t.name == name).ok_or_else(|| Error::MissingTensor(name.to_string()))
    }

    pub fn expect_shape(&self, name: &str, shape: &[usize]) -> Result<&NamedTensor> {
        let t = self.get(name)?;
        if t.shape != shape || t.values.len() != shape.iter().product::<usize>() {
            return Err(Error::Shape { name: name.to_string(), expected: shape.to_vec(), actual: t.shape.clone() });
        }
        Ok(t)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub hidden: usize,
    pub input_dim: usize,
    pub scale_cp: f32,
    pub model_pov: String,
    pub state: ParameterState,
}

impl Checkpoint {
    /// Widths are read off `l1.weight` (`[hidden, input_dim]`); a state
    /// without it records `hidden = 0` and the encoder's input width.
    pub fn new(state: ParameterState, scale_cp: f32) -> Self {
        let (hidden, input_dim) = match state.get(FIRST_LAYER).map(|t| t.shape.as_slice()) {
            Ok([hidden, input_dim]) => (*hidden, *input_dim),
            _ => (0, INPUT_DIM),
        };
        Self { hidden, input_dim, scale_cp, model_pov: MODEL_POV.to_string(), state }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_atomic(path.as_ref(), self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path.as_ref())
    }
}

/// Writes into a temporary file beside `path` and renames it into place, so
/// an interrupted run never leaves a truncated file behind.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = std::io::BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
