use candle_core::Device;

/// Pick the compute device: CUDA, then Metal, then CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(dev) => { tracing::info!("device: CUDA"); return dev; }
            Err(e) => tracing::warn!(error = %e, "CUDA init failed, falling back"),
        }
    }
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { tracing::info!("device: Metal (MPS)"); return dev; }
            Err(e) => tracing::warn!(error = %e, "Metal init failed, falling back"),
        }
    }
    tracing::info!("device: CPU");
    Device::Cpu
}
