use common::{position::INPUT_DIM, weighting::HUBER_BETA, Batch, Config, ParameterState, Result};
use tch::{
    nn::{self, init, ModuleT, OptimizerConfig},
    Device, Kind, Reduction,
};

use crate::{
    loader::get_tensors,
    save::{backend, extract_state},
};

/// `INPUT_DIM -> hidden -> 1`, ReLU and dropout after the hidden layer.
#[derive(Debug)]
pub struct ValueNetwork {
    l1: nn::Linear,
    l2: nn::Linear,
    dropout: f64,
}

impl ValueNetwork {
    pub fn new(vs: &nn::Path, hidden: usize, dropout: f64) -> Self {
        let hidden = hidden as i64;

        Self {
            l1: nn::linear(vs / "l1", INPUT_DIM as i64, hidden, kaiming_uniform(init::NonLinearity::ReLU)),
            l2: nn::linear(vs / "l2", hidden, 1, kaiming_uniform(init::NonLinearity::Linear)),
            dropout,
        }
    }
}

/// Fan-in Kaiming uniform weights with the gain of the activation that
/// follows the layer, zero biases.
fn kaiming_uniform(non_linearity: init::NonLinearity) -> nn::LinearConfig {
    nn::LinearConfig {
        ws_init: nn::Init::Kaiming { dist: init::NormalOrUniform::Uniform, fan: init::FanInOut::FanIn, non_linearity },
        bs_init: Some(nn::Init::Const(0.0)),
        bias: true,
    }
}

impl ModuleT for ValueNetwork {
    fn forward_t(&self, xs: &tch::Tensor, train: bool) -> tch::Tensor {
        xs.apply(&self.l1).relu().dropout(self.dropout, train).apply(&self.l2).squeeze_dim(-1)
    }
}

/// A `ValueNetwork` together with the store and optimiser that own its
/// parameters.
pub struct Trainable {
    vs: nn::VarStore,
    net: ValueNetwork,
    opt: nn::Optimizer,
    grad_clip: f64,
    device: Device,
}

impl Trainable {
    pub fn new(cfg: &Config) -> Result<Self> {
        let device = Device::cuda_if_available();
        let vs = nn::VarStore::new(device);
        let net = ValueNetwork::new(&vs.root(), cfg.hidden, cfg.dropout);

        let opt = nn::Adam { wd: cfg.weight_decay, ..Default::default() }.build(&vs, cfg.lr).map_err(backend)?;

        log::info!("model: {INPUT_DIM} -> {} -> 1 on {device:?}", cfg.hidden);
        Ok(Self { vs, net, opt, grad_clip: cfg.grad_clip, device })
    }

    pub fn forward(&self, xs: &tch::Tensor) -> tch::Tensor {
        tch::no_grad(|| self.net.forward_t(&xs.to_device(self.device), false))
    }
}

impl common::Network for Trainable {
    fn run_batch(&mut self, batch: &Batch) -> Result<f32> {
        let (xs, labels, weights) = get_tensors(batch, self.device);

        let out = self.net.forward_t(&xs, true);
        let per_example = out.smooth_l1_loss(&labels, Reduction::None, HUBER_BETA);
        let loss = (per_example * weights).mean(Kind::Float);

        // a non-positive limit turns clipping off
        if self.grad_clip > 0.0 {
            self.opt.backward_step_clip_norm(&loss, self.grad_clip);
        } else {
            self.opt.backward_step(&loss);
        }

        f32::try_from(loss).map_err(backend)
    }

    fn predict(&mut self, batch: &Batch) -> Result<Vec<f32>> {
        let (xs, _, _) = get_tensors(batch, self.device);
        let out = self.forward(&xs).to_kind(Kind::Float).to_device(Device::Cpu);

        let mut preds = vec![0f32; batch.size];
        out.f_copy_data(&mut preds, batch.size).map_err(backend)?;
        Ok(preds)
    }

    fn set_lr(&mut self, lr: f64) {
        self.opt.set_lr(lr);
    }

    fn state(&self) -> Result<ParameterState> {
        extract_state(&self.vs)
    }
}
