// Vulkan driver - ash-backed implementation of the Driver seam
//
// Responsibilities:
// - Load the Vulkan library
// - Keep the instance/device dispatch tables and extension loaders
// - Forward every create/destroy/query call to ash
//
// Lifetimes are NOT managed here. GpuContext owns every handle and
// destroys them in reverse creation order.

use anyhow::{Context, Result};
use ash::extensions::{ext::DebugUtils, khr};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::ffi::CStr;
use std::os::raw::c_char;

use super::driver::{Driver, PhysicalDeviceInfo, WindowLayer};

/// Loaders that only exist once an instance does
struct InstanceFns {
    instance: ash::Instance,
    surface: khr::Surface,
    debug_utils: DebugUtils,
}

/// Loaders that only exist once a logical device does
struct DeviceFns {
    device: ash::Device,
    swapchain: khr::Swapchain,
}

pub struct VulkanDriver {
    entry: Entry,
    instance: Option<InstanceFns>,
    device: Option<DeviceFns>,
}

impl VulkanDriver {
    pub fn new() -> Result<Self> {
        let entry = unsafe { Entry::load() }
            .context("Failed to load Vulkan library. Is Vulkan installed?")?;
        Ok(Self {
            entry,
            instance: None,
            device: None,
        })
    }

    fn instance(&self) -> VkResult<&InstanceFns> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&DeviceFns> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

fn name_to_string(raw: &[c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

impl WindowLayer for winit::window::Window {
    fn required_instance_extensions(&self) -> VkResult<Vec<String>> {
        let names = ash_window::enumerate_required_extensions(self.raw_display_handle())?;
        Ok(names
            .iter()
            .map(|&name| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
            .collect())
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

impl Driver for VulkanDriver {
    type Window = winit::window::Window;

    fn available_layers(&self) -> VkResult<Vec<String>> {
        let layers = self.entry.enumerate_instance_layer_properties()?;
        Ok(layers.iter().map(|layer| name_to_string(&layer.layer_name)).collect())
    }

    fn create_instance(&mut self, info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance> {
        let instance = unsafe { self.entry.create_instance(info, None) }?;
        let handle = instance.handle();
        self.instance = Some(InstanceFns {
            surface: khr::Surface::new(&self.entry, &instance),
            debug_utils: DebugUtils::new(&self.entry, &instance),
            instance,
        });
        Ok(handle)
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        if let Some(fns) = self.instance.take() {
            unsafe { fns.instance.destroy_instance(None) };
        }
    }

    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let fns = self.instance()?;
        unsafe { fns.debug_utils.create_debug_utils_messenger(info, None) }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(fns) = &self.instance {
            unsafe { fns.debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        window: &winit::window::Window,
    ) -> VkResult<vk::SurfaceKHR> {
        let fns = self.instance()?;
        unsafe {
            ash_window::create_surface(
                &self.entry,
                &fns.instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Some(fns) = &self.instance {
            unsafe { fns.surface.destroy_surface(surface, None) };
        }
    }

    fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance()?.instance.enumerate_physical_devices() }
    }

    fn physical_device_info(&self, device: vk::PhysicalDevice) -> VkResult<PhysicalDeviceInfo> {
        let instance = &self.instance()?.instance;
        let props = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        Ok(PhysicalDeviceInfo {
            name: name_to_string(&props.device_name),
            device_type: props.device_type,
            max_image_dimension_2d: props.limits.max_image_dimension2_d,
            geometry_shader: features.geometry_shader == vk::TRUE,
        })
    }

    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        let instance = &self.instance()?.instance;
        Ok(unsafe { instance.get_physical_device_queue_family_properties(device) })
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        let instance = &self.instance()?.instance;
        let extensions = unsafe { instance.enumerate_device_extension_properties(device) }?;
        Ok(extensions
            .iter()
            .map(|ext| name_to_string(&ext.extension_name))
            .collect())
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let fns = self.instance()?;
        unsafe {
            fns.surface
                .get_physical_device_surface_support(device, queue_family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let fns = self.instance()?;
        unsafe {
            fns.surface
                .get_physical_device_surface_capabilities(device, surface)
        }
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let fns = self.instance()?;
        unsafe { fns.surface.get_physical_device_surface_formats(device, surface) }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let fns = self.instance()?;
        unsafe {
            fns.surface
                .get_physical_device_surface_present_modes(device, surface)
        }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo,
    ) -> VkResult<vk::Device> {
        let fns = self.instance()?;
        let device = unsafe { fns.instance.create_device(physical_device, info, None) }?;
        let swapchain = khr::Swapchain::new(&fns.instance, &device);
        let handle = device.handle();
        self.device = Some(DeviceFns { device, swapchain });
        Ok(handle)
    }

    fn device_queue(&self, queue_family: u32, index: u32) -> VkResult<vk::Queue> {
        let fns = self.device()?;
        Ok(unsafe { fns.device.get_device_queue(queue_family, index) })
    }

    fn wait_idle(&self) -> VkResult<()> {
        match &self.device {
            Some(fns) => unsafe { fns.device.device_wait_idle() },
            None => Ok(()),
        }
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        if let Some(fns) = self.device.take() {
            unsafe { fns.device.destroy_device(None) };
        }
    }

    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR,
    ) -> VkResult<vk::SwapchainKHR> {
        let fns = self.device()?;
        unsafe { fns.swapchain.create_swapchain(info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let fns = self.device()?;
        unsafe { fns.swapchain.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Some(fns) = &self.device {
            unsafe { fns.swapchain.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(&mut self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        let fns = self.device()?;
        unsafe { fns.device.create_image_view(info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Some(fns) = &self.device {
            unsafe { fns.device.destroy_image_view(view, None) };
        }
    }

    fn create_render_pass(&mut self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        let fns = self.device()?;
        unsafe { fns.device.create_render_pass(info, None) }
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        if let Some(fns) = &self.device {
            unsafe { fns.device.destroy_render_pass(render_pass, None) };
        }
    }

    fn create_shader_module(
        &mut self,
        info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule> {
        let fns = self.device()?;
        unsafe { fns.device.create_shader_module(info, None) }
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        if let Some(fns) = &self.device {
            unsafe { fns.device.destroy_shader_module(module, None) };
        }
    }

    fn create_pipeline_layout(
        &mut self,
        info: &vk::PipelineLayoutCreateInfo,
    ) -> VkResult<vk::PipelineLayout> {
        let fns = self.device()?;
        unsafe { fns.device.create_pipeline_layout(info, None) }
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        if let Some(fns) = &self.device {
            unsafe { fns.device.destroy_pipeline_layout(layout, None) };
        }
    }
}
