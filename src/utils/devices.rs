use burn::backend::libtorch::LibTorchDevice;

/// All visible CUDA devices, or the CPU when no GPU is available
pub fn libtorch_devices() -> Vec<LibTorchDevice> {
    if tch::Cuda::is_available() {
        let count = tch::Cuda::device_count().max(1) as usize;

        (0..count).map(LibTorchDevice::Cuda).collect()
    } else {
        vec![LibTorchDevice::Cpu]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_one_device() {
        let devices = libtorch_devices();

        assert!(!devices.is_empty());
        assert!(devices.iter().all(|device| match device {
            LibTorchDevice::Cuda(_) => tch::Cuda::is_available(),
            _ => true,
        }));
    }
}
