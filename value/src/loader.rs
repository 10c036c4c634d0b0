use common::{position::INPUT_DIM, Batch};
use tch::{Device, Tensor};

/// Inputs `[n, INPUT_DIM]`, labels `[n]` and weights `[n]` on `device`.
pub fn get_tensors(batch: &Batch, device: Device) -> (Tensor, Tensor, Tensor) {
    let n = batch.size as i64;

    let xs = Tensor::from_slice(&batch.inputs).reshape([n, INPUT_DIM as i64]).to_device(device);
    let labels = Tensor::from_slice(&batch.labels).to_device(device);
    let weights = Tensor::from_slice(&batch.weights).to_device(device);

    (xs, labels, weights)
}
