// Test doubles for the Driver seam
//
// RecordingDriver hands out fresh handles, logs every create/destroy, and
// can be told to fail the N-th create call or a named device query.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use super::debug::{DiagnosticSink, Severity};
use super::driver::{Driver, PhysicalDeviceInfo, WindowLayer};
use super::shader::{ShaderSource, ShaderStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create(&'static str, u64),
    Destroy(&'static str, u64),
}

pub struct FakeWindow {
    pub extensions: Vec<String>,
    pub size: (u32, u32),
}

impl Default for FakeWindow {
    fn default() -> Self {
        Self {
            extensions: vec!["VK_KHR_surface".into(), "VK_KHR_xcb_surface".into()],
            size: (800, 600),
        }
    }
}

impl WindowLayer for FakeWindow {
    fn required_instance_extensions(&self) -> VkResult<Vec<String>> {
        Ok(self.extensions.clone())
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }
}

/// A synthetic GPU as seen through the physical-device queries
#[derive(Debug, Clone)]
pub struct FakeGpu {
    pub info: PhysicalDeviceInfo,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_support: Vec<bool>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Returned by the extension query instead of the list
    pub query_error: Option<vk::Result>,
}

impl FakeGpu {
    /// A discrete GPU with one family that does graphics and presentation
    pub fn discrete(name: &str, max_image_dimension_2d: u32) -> Self {
        Self {
            info: PhysicalDeviceInfo {
                name: name.into(),
                device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
                max_image_dimension_2d,
                geometry_shader: true,
            },
            queue_families: vec![family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)],
            present_support: vec![true],
            extensions: vec!["VK_KHR_swapchain".into()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            query_error: None,
        }
    }

    pub fn integrated(name: &str, max_image_dimension_2d: u32) -> Self {
        let mut gpu = Self::discrete(name, max_image_dimension_2d);
        gpu.info.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        gpu
    }
}

pub fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

pub struct RecordingDriver {
    pub log: Rc<RefCell<Vec<Call>>>,
    pub layers: Vec<String>,
    pub gpus: Vec<FakeGpu>,
    pub image_count: usize,
    /// Zero-based index of the create call that should fail
    pub fail_at: Option<usize>,
    /// Device-level query ("device queue", "swapchain images") that should fail
    pub fail_query: Option<&'static str>,
    creates: usize,
    next_handle: u64,
}

impl RecordingDriver {
    pub fn new(gpus: Vec<FakeGpu>) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            layers: vec!["VK_LAYER_KHRONOS_validation".into()],
            gpus,
            image_count: 3,
            fail_at: None,
            fail_query: None,
            creates: 0,
            next_handle: 0x1000,
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn failing_query(mut self, query: &'static str) -> Self {
        self.fail_query = Some(query);
        self
    }

    fn query(&self, name: &'static str) -> VkResult<()> {
        if self.fail_query == Some(name) {
            return Err(vk::Result::ERROR_DEVICE_LOST);
        }
        Ok(())
    }

    fn create(&mut self, kind: &'static str) -> VkResult<u64> {
        let index = self.creates;
        self.creates += 1;
        if self.fail_at == Some(index) {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        self.next_handle += 1;
        self.log.borrow_mut().push(Call::Create(kind, self.next_handle));
        Ok(self.next_handle)
    }

    fn destroy(&mut self, kind: &'static str, raw: u64) {
        self.log.borrow_mut().push(Call::Destroy(kind, raw));
    }

    fn gpu(&self, device: vk::PhysicalDevice) -> VkResult<&FakeGpu> {
        let index = device.as_raw().wrapping_sub(1) as usize;
        self.gpus.get(index).ok_or(vk::Result::ERROR_DEVICE_LOST)
    }
}

/// Split a log into its create and destroy sequences
pub fn split_log(log: &[Call]) -> (Vec<(&'static str, u64)>, Vec<(&'static str, u64)>) {
    let mut creates = Vec::new();
    let mut destroys = Vec::new();
    for call in log {
        match *call {
            Call::Create(kind, raw) => creates.push((kind, raw)),
            Call::Destroy(kind, raw) => destroys.push((kind, raw)),
        }
    }
    (creates, destroys)
}

impl Driver for RecordingDriver {
    type Window = FakeWindow;

    fn available_layers(&self) -> VkResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn create_instance(&mut self, _info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance> {
        self.create("instance").map(vk::Instance::from_raw)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.destroy("instance", instance.as_raw());
    }

    fn create_debug_messenger(
        &mut self,
        _info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        self.create("debug messenger")
            .map(vk::DebugUtilsMessengerEXT::from_raw)
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        self.destroy("debug messenger", messenger.as_raw());
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        _window: &FakeWindow,
    ) -> VkResult<vk::SurfaceKHR> {
        self.create("surface").map(vk::SurfaceKHR::from_raw)
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        self.destroy("surface", surface.as_raw());
    }

    fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((1..=self.gpus.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    fn physical_device_info(&self, device: vk::PhysicalDevice) -> VkResult<PhysicalDeviceInfo> {
        Ok(self.gpu(device)?.info.clone())
    }

    fn queue_families(
        &self,
        device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self.gpu(device)?.queue_families.clone())
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        let gpu = self.gpu(device)?;
        match gpu.query_error {
            Some(result) => Err(result),
            None => Ok(gpu.extensions.clone()),
        }
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let gpu = self.gpu(device)?;
        Ok(gpu
            .present_support
            .get(queue_family as usize)
            .copied()
            .unwrap_or(false))
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.gpu(device)?.capabilities)
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.gpu(device)?.formats.clone())
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.gpu(device)?.present_modes.clone())
    }

    fn create_device(
        &mut self,
        _physical_device: vk::PhysicalDevice,
        _info: &vk::DeviceCreateInfo,
    ) -> VkResult<vk::Device> {
        self.create("device").map(vk::Device::from_raw)
    }

    fn device_queue(&self, queue_family: u32, index: u32) -> VkResult<vk::Queue> {
        self.query("device queue")?;
        Ok(vk::Queue::from_raw(0x9000 + (queue_family as u64) * 16 + index as u64))
    }

    fn wait_idle(&self) -> VkResult<()> {
        Ok(())
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.destroy("device", device.as_raw());
    }

    fn create_swapchain(
        &mut self,
        _info: &vk::SwapchainCreateInfoKHR,
    ) -> VkResult<vk::SwapchainKHR> {
        self.create("swapchain").map(vk::SwapchainKHR::from_raw)
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.query("swapchain images")?;
        Ok((0..self.image_count as u64)
            .map(|i| vk::Image::from_raw(0x5000 + i))
            .collect())
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        self.destroy("swapchain", swapchain.as_raw());
    }

    fn create_image_view(&mut self, _info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        self.create("image view").map(vk::ImageView::from_raw)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy("image view", view.as_raw());
    }

    fn create_render_pass(&mut self, _info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        self.create("render pass").map(vk::RenderPass::from_raw)
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.destroy("render pass", render_pass.as_raw());
    }

    fn create_shader_module(
        &mut self,
        _info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule> {
        self.create("shader module").map(vk::ShaderModule::from_raw)
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.destroy("shader module", module.as_raw());
    }

    fn create_pipeline_layout(
        &mut self,
        _info: &vk::PipelineLayoutCreateInfo,
    ) -> VkResult<vk::PipelineLayout> {
        self.create("pipeline layout").map(vk::PipelineLayout::from_raw)
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.destroy("pipeline layout", layout.as_raw());
    }
}

/// A minimal valid SPIR-V blob (just the magic word)
pub fn spirv() -> Option<Vec<u8>> {
    Some(0x0723_0203u32.to_ne_bytes().to_vec())
}

/// In-memory shader bytes; `None` simulates an unreadable file
pub struct MemoryShaders {
    pub vertex: Option<Vec<u8>>,
    pub fragment: Option<Vec<u8>>,
}

impl Default for MemoryShaders {
    fn default() -> Self {
        Self {
            vertex: spirv(),
            fragment: spirv(),
        }
    }
}

impl ShaderSource for MemoryShaders {
    fn origin(&self, stage: ShaderStage) -> PathBuf {
        PathBuf::from(format!("memory/{:?}.spv", stage))
    }

    fn load(&self, stage: ShaderStage) -> io::Result<Vec<u8>> {
        let bytes = match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        };
        bytes
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "gone"))
    }
}

/// Diagnostic sink that remembers what it was told
#[derive(Default)]
pub struct CollectingSink(pub Mutex<Vec<(Severity, String)>>);

impl DiagnosticSink for CollectingSink {
    fn report(&self, severity: Severity, message: &str) {
        self.0.lock().push((severity, message.to_string()));
    }
}
