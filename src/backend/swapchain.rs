// Swapchain - Window presentation
//
// Negotiates format, present mode, extent and image count from what the
// surface advertises, and builds the create infos for the swapchain and
// its per-image views. Handles are created and owned by GpuContext.

use ash::vk;

use super::queue::ResolvedQueues;
use super::surface::SurfaceSupport;

pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Images requested on top of the surface minimum
pub const EXTRA_IMAGES: u32 = 5;

/// The negotiated presentation setup. Fixed once the swapchain exists.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainConfig {
    /// `None` only when the surface advertises no formats at all
    pub fn negotiate(support: &SurfaceSupport, framebuffer: (u32, u32)) -> Option<Self> {
        let caps = &support.capabilities;
        Some(Self {
            format: choose_surface_format(&support.formats)?,
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(caps, framebuffer),
            image_count: choose_image_count(caps),
            pre_transform: caps.current_transform,
        })
    }
}

/// Exact (format, color space) match on the preferred pair, else the first entry
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format
                && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, otherwise FIFO (always supported)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface's current extent, unless it is the "let the app decide"
/// sentinel (u32::MAX), in which case the framebuffer size is clamped
/// into the surface bounds.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    let (width, height) = framebuffer;
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// `min + EXTRA_IMAGES`, capped at max. A max of 0 means unbounded.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count.saturating_add(EXTRA_IMAGES);
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

/// Swapchain create info for a negotiated config.
///
/// `families` must outlive the builder; it is only referenced when the
/// graphics and present families differ (concurrent sharing).
pub fn swapchain_create_info<'a>(
    surface: vk::SurfaceKHR,
    config: &SwapchainConfig,
    queues: &ResolvedQueues,
    families: &'a [u32],
) -> vk::SwapchainCreateInfoKHRBuilder<'a> {
    let info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(config.image_count)
        .image_format(config.format.format)
        .image_color_space(config.format.color_space)
        .image_extent(config.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .pre_transform(config.pre_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(config.present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    if queues.is_shared() {
        info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
    } else {
        info.image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(families)
    }
}

/// 2-D color view over one swapchain image
pub fn image_view_create_info(image: vk::Image, format: vk::Format) -> vk::ImageViewCreateInfo {
    vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .build()
}
