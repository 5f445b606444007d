// Queue family resolution
//
// Finds a graphics-capable family and a family that can present to the
// bound surface. The two may be the same family.

use ash::prelude::VkResult;
use ash::vk;

use super::driver::Driver;

/// Partially or fully resolved queue roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

/// Both roles resolved. Only obtainable through `QueueFamilyIndices::complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQueues {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    pub fn complete(&self) -> Option<ResolvedQueues> {
        Some(ResolvedQueues {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

impl ResolvedQueues {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, ascending
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = vec![self.graphics, self.present];
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// Pick the first graphics family and the first presenting family.
///
/// `present_support[i]` answers whether family `i` can present to the
/// surface; missing entries count as "no".
pub fn resolve(
    families: &[vk::QueueFamilyProperties],
    present_support: &[bool],
) -> QueueFamilyIndices {
    let graphics = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32);

    let present = (0..families.len())
        .find(|&i| present_support.get(i).copied().unwrap_or(false))
        .map(|i| i as u32);

    QueueFamilyIndices { graphics, present }
}

/// Query a device's families and probe every one for presentation support
pub fn find_queue_families<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> VkResult<QueueFamilyIndices> {
    let families = driver.queue_families(device)?;
    let present_support = (0..families.len() as u32)
        .map(|i| driver.surface_support(device, i, surface))
        .collect::<VkResult<Vec<_>>>()?;

    Ok(resolve(&families, &present_support))
}
