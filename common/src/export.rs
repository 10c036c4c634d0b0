//! Portable inference blob: plain matrices and metadata, nothing that needs
//! the training runtime to read back.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    checkpoint::{read_json, write_json_atomic, Checkpoint, MODEL_POV},
    error::{Error, Result},
};

pub const BASIS: &str = "square1h";
pub const ACTIVATION: &str = "relu";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedLayer {
    /// `out x in`, row-major.
    #[serde(rename = "W")]
    pub weights: Vec<Vec<f32>>,
    #[serde(rename = "b")]
    pub biases: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedModel {
    pub basis: String,
    pub activation: String,
    pub model_pov: String,
    pub layers: Vec<ExportedLayer>,
    pub scale_cp: f32,
}

impl ExportedLayer {
    fn from_state(ckpt: &Checkpoint, name: &str, inputs: usize, outputs: usize) -> Result<Self> {
        let w = ckpt.state.expect_shape(&format!("{name}.weight"), &[outputs, inputs])?;
        let b = ckpt.state.expect_shape(&format!("{name}.bias"), &[outputs])?;

        Ok(Self { weights: w.values.chunks(inputs).map(<[f32]>::to_vec).collect(), biases: b.values.clone() })
    }

    fn forward(&self, xs: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| row.iter().zip(xs).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

impl ExportedModel {
    /// Packs the two affine layers `l1` (`input_dim -> hidden`) and
    /// `l2` (`hidden -> 1`) of a checkpoint.
    pub fn from_checkpoint(ckpt: &Checkpoint) -> Result<Self> {
        let layers = vec![
            ExportedLayer::from_state(ckpt, "l1", ckpt.input_dim, ckpt.hidden)?,
            ExportedLayer::from_state(ckpt, "l2", ckpt.hidden, 1)?,
        ];

        Ok(Self {
            basis: BASIS.to_string(),
            activation: ACTIVATION.to_string(),
            model_pov: MODEL_POV.to_string(),
            layers,
            scale_cp: ckpt.scale_cp,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().and_then(|l| l.weights.first()).map_or(0, Vec::len)
    }

    /// Scaled output in [-1, 1] territory; ReLU between layers, none after
    /// the last.
    pub fn forward(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.input_dim() {
            return Err(Error::Shape {
                name: "features".to_string(),
                expected: vec![self.input_dim()],
                actual: vec![features.len()],
            });
        }

        let mut xs = features.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs);
            if i + 1 < self.layers.len() {
                xs.iter_mut().for_each(|x| *x = x.max(0.0));
            }
        }

        Ok(xs.first().copied().unwrap_or_default())
    }

    pub fn predict_cp(&self, features: &[f32]) -> Result<f32> {
        Ok(self.forward(features)? * self.scale_cp)
    }

    pub fn validate(&self) -> Result<()> {
        let mut width = self.input_dim();
        for (i, layer) in self.layers.iter().enumerate() {
            let name = format!("layers[{i}]");
            let rows = layer.weights.len();
            if rows != layer.biases.len() || layer.weights.iter().any(|r| r.len() != width) {
                return Err(Error::Shape {
                    name,
                    expected: vec![layer.biases.len(), width],
                    actual: vec![rows, layer.weights.first().map_or(0, Vec::len)],
                });
            }
            width = rows;
        }
        if width != 1 {
            return Err(Error::Shape { name: "output".to_string(), expected: vec![1], actual: vec![width] });
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_atomic(path.as_ref(), self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model: Self = read_json(path.as_ref())?;
        model.validate()?;
        Ok(model)
    }
}
