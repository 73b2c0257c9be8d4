//! Compute device shared by the embedding and generation models.

use candle_core::Device;

/// Metal when the crate is built with the `metal` feature and a GPU is
/// present, otherwise CPU. `APP_DEVICE=cpu` forces the CPU.
pub fn select_device() -> Device {
    let force_cpu = std::env::var("APP_DEVICE").is_ok_and(|v| v.eq_ignore_ascii_case("cpu"));
    if !force_cpu {
        if let Some(device) = accelerator() {
            return device;
        }
    }
    tracing::info!(device = "cpu", "compute device selected");
    Device::Cpu
}

#[cfg(feature = "metal")]
fn accelerator() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!(device = "metal", "compute device selected");
            Some(device)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metal unavailable, using CPU");
            None
        }
    }
}

#[cfg(not(feature = "metal"))]
fn accelerator() -> Option<Device> {
    None
}
