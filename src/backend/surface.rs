// Surface capability probing
//
// Pure query: what can this device present to this surface?

use ash::prelude::VkResult;
use ash::vk;

use super::driver::Driver;

#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// A swapchain needs at least one format and one present mode
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Probe a device/surface pair.
///
/// `Ok(None)` means the device cannot drive a swapchain on this surface.
/// That is a reason to skip the device, not an error.
pub fn probe<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> VkResult<Option<SurfaceSupport>> {
    let support = SurfaceSupport {
        capabilities: driver.surface_capabilities(device, surface)?,
        formats: driver.surface_formats(device, surface)?,
        present_modes: driver.surface_present_modes(device, surface)?,
    };

    Ok(support.is_adequate().then_some(support))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeGpu, RecordingDriver};
    use ash::vk::Handle;

    fn probe_gpu(gpu: FakeGpu) -> Option<SurfaceSupport> {
        let driver = RecordingDriver::new(vec![gpu]);
        probe(&driver, vk::PhysicalDevice::from_raw(1), vk::SurfaceKHR::from_raw(7)).unwrap()
    }

    #[test]
    fn adequate_surface_reports_everything() {
        let support = probe_gpu(FakeGpu::discrete("ok", 4096)).unwrap();
        assert_eq!(support.formats.len(), 1);
        assert_eq!(support.present_modes.len(), 2);
        assert_eq!(support.capabilities.min_image_count, 2);
    }

    #[test]
    fn no_formats_is_inadequate() {
        let mut gpu = FakeGpu::discrete("no formats", 4096);
        gpu.formats.clear();
        assert!(probe_gpu(gpu).is_none());
    }

    #[test]
    fn no_present_modes_is_inadequate() {
        let mut gpu = FakeGpu::discrete("no modes", 4096);
        gpu.present_modes.clear();
        assert!(probe_gpu(gpu).is_none());
    }
}
