// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// CPU ndarray by default; build with `--features wgpu` to run on
// the GPU. Training wraps the chosen backend in Autodiff, and
// `model.valid()` hands back a model on the plain backend for
// evaluation. Both share the same device type.

use burn::tensor::backend::Backend;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<DefaultBackend>;

pub type DefaultDevice = <DefaultBackend as Backend>::Device;

pub fn default_device() -> DefaultDevice {
    let device = DefaultDevice::default();
    tracing::info!("Using device: {:?}", device);
    device
}
