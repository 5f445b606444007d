// Driver seam
//
// Everything the bootstrap sequence asks of the graphics API goes through
// this trait. Implementations hold dispatch tables only: handles are
// returned to the caller, and the caller decides when they die.

use ash::prelude::VkResult;
use ash::vk;

/// What the bootstrap needs from the windowing layer
pub trait WindowLayer {
    /// Instance extensions the window system needs to create a surface
    fn required_instance_extensions(&self) -> VkResult<Vec<String>>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);
}

/// The subset of device properties and features used for scoring
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
    pub geometry_shader: bool,
}

pub trait Driver {
    type Window: WindowLayer + ?Sized;

    // Instance level

    fn available_layers(&self) -> VkResult<Vec<String>>;
    fn create_instance(&mut self, info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    fn create_debug_messenger(
        &mut self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);

    fn create_surface(
        &mut self,
        instance: vk::Instance,
        window: &Self::Window,
    ) -> VkResult<vk::SurfaceKHR>;
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    // Physical device queries

    fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn physical_device_info(&self, device: vk::PhysicalDevice) -> VkResult<PhysicalDeviceInfo>;
    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>>;
    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>>;
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // Device level

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo,
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, queue_family: u32, index: u32) -> VkResult<vk::Queue>;
    fn wait_idle(&self) -> VkResult<()>;
    fn destroy_device(&mut self, device: vk::Device);

    fn create_swapchain(&mut self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&mut self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&mut self, view: vk::ImageView);

    fn create_render_pass(&mut self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);

    fn create_shader_module(
        &mut self,
        info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&mut self, module: vk::ShaderModule);

    fn create_pipeline_layout(
        &mut self,
        info: &vk::PipelineLayoutCreateInfo,
    ) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout);
}
