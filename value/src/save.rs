use common::{Error, NamedTensor, ParameterState, Result};
use tch::{nn, Kind, TchError, Tensor};

pub fn backend(e: TchError) -> Error {
    Error::Backend(Box::new(e))
}

/// Copies every variable out of `vs`, sorted by name.
pub fn extract_state(vs: &nn::VarStore) -> Result<ParameterState> {
    let mut vars: Vec<(String, Tensor)> = vs.variables().into_iter().collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));

    let mut state = Vec::with_capacity(vars.len());
    for (name, t) in vars {
        let shape: Vec<usize> = t.size().iter().map(|&d| d as usize).collect();
        let numel = shape.iter().product::<usize>();

        let flat = tch::no_grad(|| t.detach().to_kind(Kind::Float).reshape([-1]).to_device(tch::Device::Cpu));
        let mut values = vec![0f32; numel];
        flat.f_copy_data(&mut values, numel).map_err(backend)?;

        state.push(NamedTensor { name, shape, values });
    }

    Ok(ParameterState(state))
}
