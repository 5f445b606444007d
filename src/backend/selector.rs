// Physical device selection
//
// Every enumerated GPU is described, rated, and the best one wins.
// Rating is a pure function so it can be tested without hardware.
//
// Tie-break: the FIRST candidate (enumeration order) with the maximum
// score is selected.

use ash::prelude::VkResult;
use ash::vk;
use std::collections::BTreeSet;

use super::driver::{Driver, PhysicalDeviceInfo};
use super::error::{BootstrapError, Stage, StageContext};
use super::queue::{self, QueueFamilyIndices, ResolvedQueues};
use super::surface::{self, SurfaceSupport};

/// Device extensions the renderer cannot run without
pub const REQUIRED_DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];

/// Bonus for dedicated hardware
pub const DISCRETE_GPU_BONUS: u32 = 1000;

/// Everything the rating needs to know about one GPU
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub info: PhysicalDeviceInfo,
    pub queues: QueueFamilyIndices,
    pub missing_extensions: Vec<String>,
    /// `None` when not probed (missing extensions) or inadequate
    pub surface: Option<SurfaceSupport>,
}

/// Why a candidate scored zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingQueues,
    MissingExtensions(Vec<String>),
    InadequateSurface,
    MissingGeometryShader,
    /// A capability query on this device returned an error
    QueryFailed(vk::Result),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rating {
    Suitable { score: u32, queues: ResolvedQueues },
    Rejected(Rejection),
}

impl Rating {
    pub fn score(&self) -> u32 {
        match self {
            Rating::Suitable { score, .. } => *score,
            Rating::Rejected(_) => 0,
        }
    }
}

/// The winner of device selection
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub handle: vk::PhysicalDevice,
    pub info: PhysicalDeviceInfo,
    pub queues: ResolvedQueues,
    pub score: u32,
}

/// Required names the device does not advertise, sorted
pub fn missing_extensions(required: &[&str], advertised: &[String]) -> Vec<String> {
    let mut missing: BTreeSet<&str> = required.iter().copied().collect();
    for name in advertised {
        missing.remove(name.as_str());
    }
    missing.into_iter().map(str::to_owned).collect()
}

/// Score a candidate. Zero (rejected) unless every requirement holds.
pub fn rate(candidate: &DeviceCandidate) -> Rating {
    let Some(queues) = candidate.queues.complete() else {
        return Rating::Rejected(Rejection::MissingQueues);
    };
    if !candidate.missing_extensions.is_empty() {
        return Rating::Rejected(Rejection::MissingExtensions(
            candidate.missing_extensions.clone(),
        ));
    }
    if !candidate.surface.as_ref().is_some_and(SurfaceSupport::is_adequate) {
        return Rating::Rejected(Rejection::InadequateSurface);
    }
    // The renderer can't function without geometry shaders
    if !candidate.info.geometry_shader {
        return Rating::Rejected(Rejection::MissingGeometryShader);
    }

    let mut score = 0u32;
    if candidate.info.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score += DISCRETE_GPU_BONUS;
    }
    // Maximum possible texture size affects graphics quality
    score = score.saturating_add(candidate.info.max_image_dimension_2d);

    Rating::Suitable { score, queues }
}

/// Index of the first rating holding the maximum score, unless that score is 0
pub fn pick_best(ratings: &[Rating]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, rating) in ratings.iter().enumerate() {
        let score = rating.score();
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// Collect everything needed to rate one device against the bound surface
pub fn describe<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    required_extensions: &[&str],
) -> VkResult<DeviceCandidate> {
    let info = driver.physical_device_info(device)?;
    let queues = queue::find_queue_families(driver, device, surface)?;
    let advertised = driver.device_extensions(device)?;
    let missing = missing_extensions(required_extensions, &advertised);

    // Only a device with the swapchain extension can be asked about the surface
    let surface = if missing.is_empty() {
        surface::probe(driver, device, surface)?
    } else {
        None
    };

    Ok(DeviceCandidate {
        handle: device,
        info,
        queues,
        missing_extensions: missing,
        surface,
    })
}

/// Enumerate, rate and pick a GPU for the bound surface
pub fn select_device<D: Driver>(
    driver: &D,
    surface: vk::SurfaceKHR,
    required_extensions: &[&str],
) -> Result<SelectedDevice, BootstrapError> {
    let stage = Stage::DeviceSelection;
    let devices = driver.enumerate_physical_devices().at(stage)?;

    if devices.is_empty() {
        return Err(BootstrapError::NoCandidate {
            stage,
            reason: "failed to find GPUs with Vulkan support".into(),
        });
    }

    // A device whose queries fail is skipped, not fatal
    let mut candidates = Vec::with_capacity(devices.len());
    let mut ratings = Vec::with_capacity(devices.len());
    for &device in &devices {
        match describe(driver, device, surface, required_extensions) {
            Ok(candidate) => {
                let rating = rate(&candidate);
                match &rating {
                    Rating::Suitable { score, .. } => {
                        log::info!("GPU candidate '{}' scored {}", candidate.info.name, score)
                    }
                    Rating::Rejected(why) => {
                        log::debug!("GPU candidate '{}' rejected: {:?}", candidate.info.name, why)
                    }
                }
                candidates.push(Some(candidate));
                ratings.push(rating);
            }
            Err(result) => {
                log::debug!("GPU candidate {:?} rejected: query failed ({})", device, result);
                candidates.push(None);
                ratings.push(Rating::Rejected(Rejection::QueryFailed(result)));
            }
        }
    }

    let index = pick_best(&ratings).ok_or_else(|| BootstrapError::NoCandidate {
        stage,
        reason: "failed to find a suitable GPU".into(),
    })?;

    let rating = ratings[index].clone();
    let (Some(candidate), Rating::Suitable { score, queues }) = (&candidates[index], rating) else {
        unreachable!("pick_best only returns suitable candidates");
    };

    log::info!(
        "Selected GPU: {} (score {}, graphics family {}, present family {})",
        candidate.info.name,
        score,
        queues.graphics,
        queues.present
    );

    Ok(SelectedDevice {
        handle: candidate.handle,
        info: candidate.info.clone(),
        queues,
        score,
    })
}
