// GPU context bootstrap
//
// Brings a Vulkan context up in strict dependency order:
//
//   instance -> debug messenger (optional) -> surface -> device selection
//   -> logical device -> swapchain -> image views -> render pass
//   -> pipeline layout
//
// Every created handle is pushed onto a LIFO resource stack. Teardown, on
// failure or on drop, pops that stack, so destruction is always the exact
// reverse of creation and nothing is destroyed twice.

use ash::extensions::ext::DebugUtils;
use ash::vk;
use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use super::debug::{self, DiagnosticSink, SinkSlot};
use super::driver::{Driver, WindowLayer};
use super::error::{BootstrapError, Stage, StageContext};
use super::pipeline::{self, FixedFunctionState};
use super::selector::{self, SelectedDevice, REQUIRED_DEVICE_EXTENSIONS};
use super::shader::ShaderSource;
use super::surface;
use super::swapchain::{self, SwapchainConfig};

pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapState {
    Uninitialized,
    InstanceCreated,
    DebugHookArmed,
    SurfaceBound,
    DeviceSelected,
    LogicalDeviceCreated,
    SwapchainConfigured,
    ImageViewsCreated,
    RenderPassCreated,
    PipelineLayoutCreated,
    Ready,
    Destroyed,
}

/// Names used for the instance's application info
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub app_name: String,
    pub engine_name: String,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            app_name: "Hello Triangle".to_string(),
            engine_name: "No Engine".to_string(),
        }
    }
}

/// An owned handle waiting to be destroyed
#[derive(Debug, Clone, Copy)]
enum Resource {
    Instance(vk::Instance),
    DebugMessenger(vk::DebugUtilsMessengerEXT),
    Surface(vk::SurfaceKHR),
    Device(vk::Device),
    Swapchain(vk::SwapchainKHR),
    ImageView(vk::ImageView),
    RenderPass(vk::RenderPass),
    PipelineLayout(vk::PipelineLayout),
}

impl Resource {
    fn release<D: Driver>(self, driver: &mut D) {
        log::debug!("Destroying {:?}", self);
        match self {
            Resource::Instance(h) => driver.destroy_instance(h),
            Resource::DebugMessenger(h) => driver.destroy_debug_messenger(h),
            Resource::Surface(h) => driver.destroy_surface(h),
            Resource::Device(h) => driver.destroy_device(h),
            Resource::Swapchain(h) => driver.destroy_swapchain(h),
            Resource::ImageView(h) => driver.destroy_image_view(h),
            Resource::RenderPass(h) => driver.destroy_render_pass(h),
            Resource::PipelineLayout(h) => driver.destroy_pipeline_layout(h),
        }
    }
}

/// Last-in, first-out list of everything created so far
#[derive(Debug, Default)]
struct ResourceStack(Vec<Resource>);

impl ResourceStack {
    fn push(&mut self, resource: Resource) {
        self.0.push(resource);
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn unwind<D: Driver>(&mut self, driver: &mut D) {
        while let Some(resource) = self.0.pop() {
            resource.release(driver);
        }
    }
}

/// Device queues retrieved after logical device creation
#[derive(Debug, Clone, Copy)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// A fully bootstrapped (or torn down) Vulkan context.
///
/// Owns every handle it creates. Physical devices are only borrowed from
/// the instance and never destroyed.
pub struct GpuContext<D: Driver> {
    driver: D,
    resources: ResourceStack,
    state: BootstrapState,
    // Must stay alive until the messenger and instance are gone
    diagnostics: Option<SinkSlot>,

    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    physical_device: Option<SelectedDevice>,
    device: vk::Device,
    queues: Option<Queues>,
    swapchain: vk::SwapchainKHR,
    swapchain_config: Option<SwapchainConfig>,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    fixed_function: Option<FixedFunctionState>,
}

impl<D: Driver> GpuContext<D> {
    /// Run the whole bootstrap sequence.
    ///
    /// `diagnostics` enables the validation layer and the debug messenger.
    /// On failure everything created so far is destroyed before the error
    /// is returned.
    pub fn bootstrap(
        driver: D,
        window: &D::Window,
        settings: &BootstrapSettings,
        diagnostics: Option<Arc<dyn DiagnosticSink>>,
        shaders: &dyn ShaderSource,
    ) -> Result<Self, BootstrapError> {
        let mut context = Self {
            driver,
            resources: ResourceStack::default(),
            state: BootstrapState::Uninitialized,
            diagnostics: diagnostics.map(Box::new),
            instance: vk::Instance::null(),
            surface: vk::SurfaceKHR::null(),
            physical_device: None,
            device: vk::Device::null(),
            queues: None,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_config: None,
            images: Vec::new(),
            image_views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            fixed_function: None,
        };

        match context.run(window, settings, shaders) {
            Ok(()) => {
                context.state = BootstrapState::Ready;
                log::info!("Vulkan context ready");
                Ok(context)
            }
            Err(e) => {
                log::error!(
                    "Bootstrap failed in {} stage (last reached {:?}): {}",
                    e.stage(),
                    context.state,
                    e
                );
                context.teardown();
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        window: &D::Window,
        settings: &BootstrapSettings,
        shaders: &dyn ShaderSource,
    ) -> Result<(), BootstrapError> {
        self.create_instance(window, settings)?;
        self.setup_debug_messenger()?;
        self.create_surface(window)?;
        self.pick_physical_device()?;
        self.create_logical_device()?;
        self.create_swapchain(window)?;
        self.create_image_views()?;
        self.create_render_pass()?;
        self.create_pipeline_layout(shaders)?;
        Ok(())
    }

    fn advance(&mut self, state: BootstrapState) {
        log::info!("Bootstrap: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.is_some()
    }

    // =========================================================================
    // STAGES
    // =========================================================================

    fn create_instance(
        &mut self,
        window: &D::Window,
        settings: &BootstrapSettings,
    ) -> Result<(), BootstrapError> {
        let stage = Stage::Instance;

        // Check before any call that would need the layer
        let layers = if self.diagnostics_enabled() {
            let available = self.driver.available_layers().at(stage)?;
            if !available.iter().any(|name| name == VALIDATION_LAYER) {
                return Err(BootstrapError::Configuration {
                    stage,
                    reason: format!(
                        "validation layer {} requested but not available",
                        VALIDATION_LAYER
                    ),
                });
            }
            vec![VALIDATION_LAYER.to_string()]
        } else {
            Vec::new()
        };

        let mut extensions = window.required_instance_extensions().at(stage)?;
        if self.diagnostics_enabled() {
            extensions.push(DebugUtils::name().to_string_lossy().into_owned());
        }
        let mut flags = vk::InstanceCreateFlags::empty();
        if cfg!(target_os = "macos") {
            extensions.push(
                vk::KhrPortabilityEnumerationFn::name()
                    .to_string_lossy()
                    .into_owned(),
            );
            flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }
        log::debug!("Instance extensions: {:?}", extensions);

        let app_name = c_string(&settings.app_name, stage)?;
        let engine_name = c_string(&settings.engine_name, stage)?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_names = c_strings(&extensions, stage)?;
        let extension_ptrs: Vec<_> = extension_names.iter().map(|s| s.as_ptr()).collect();
        let layer_names = c_strings(&layers, stage)?;
        let layer_ptrs: Vec<_> = layer_names.iter().map(|s| s.as_ptr()).collect();

        // Chained so instance creation/destruction messages are captured too
        let mut debug_info = self
            .diagnostics
            .as_ref()
            .map(|slot| debug::messenger_create_info(debug::sink_user_data(slot)));

        let mut create_info = vk::InstanceCreateInfo::builder()
            .flags(flags)
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);
        if let Some(debug_info) = debug_info.as_mut() {
            create_info = create_info.push_next(debug_info);
        }

        let instance = self.driver.create_instance(&create_info).at(stage)?;
        self.resources.push(Resource::Instance(instance));
        self.instance = instance;
        self.advance(BootstrapState::InstanceCreated);
        Ok(())
    }

    fn setup_debug_messenger(&mut self) -> Result<(), BootstrapError> {
        let Some(slot) = self.diagnostics.as_ref() else {
            return Ok(());
        };

        let create_info = debug::messenger_create_info(debug::sink_user_data(slot));
        let messenger = self
            .driver
            .create_debug_messenger(&create_info)
            .at(Stage::DebugMessenger)?;
        self.resources.push(Resource::DebugMessenger(messenger));
        self.advance(BootstrapState::DebugHookArmed);
        Ok(())
    }

    fn create_surface(&mut self, window: &D::Window) -> Result<(), BootstrapError> {
        let surface = self
            .driver
            .create_surface(self.instance, window)
            .at(Stage::Surface)?;
        self.resources.push(Resource::Surface(surface));
        self.surface = surface;
        self.advance(BootstrapState::SurfaceBound);
        Ok(())
    }

    fn pick_physical_device(&mut self) -> Result<(), BootstrapError> {
        let selected =
            selector::select_device(&self.driver, self.surface, REQUIRED_DEVICE_EXTENSIONS)?;
        self.physical_device = Some(selected);
        self.advance(BootstrapState::DeviceSelected);
        Ok(())
    }

    fn selected(&self, stage: Stage) -> Result<&SelectedDevice, BootstrapError> {
        self.physical_device
            .as_ref()
            .ok_or_else(|| BootstrapError::Configuration {
                stage,
                reason: "no physical device selected".into(),
            })
    }

    fn create_logical_device(&mut self) -> Result<(), BootstrapError> {
        let stage = Stage::LogicalDevice;
        let selected = self.selected(stage)?;
        let physical_device = selected.handle;
        let queues = selected.queues;

        let queue_priorities = [1.0];
        let queue_create_infos: Vec<_> = queues
            .unique_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extensions: Vec<String> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect();
        let extension_names = c_strings(&extensions, stage)?;
        let extension_ptrs: Vec<_> = extension_names.iter().map(|s| s.as_ptr()).collect();

        let layers = if self.diagnostics_enabled() {
            vec![VALIDATION_LAYER.to_string()]
        } else {
            Vec::new()
        };
        let layer_names = c_strings(&layers, stage)?;
        let layer_ptrs: Vec<_> = layer_names.iter().map(|s| s.as_ptr()).collect();

        let features = vk::PhysicalDeviceFeatures::default();
        // enabled_layer_names is deprecated; kept for loaders that predate instance-only layers
        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .enabled_features(&features);

        let device = self
            .driver
            .create_device(physical_device, &create_info)
            .at(stage)?;
        self.resources.push(Resource::Device(device));
        self.device = device;

        self.queues = Some(Queues {
            graphics: self.driver.device_queue(queues.graphics, 0).at(stage)?,
            present: self.driver.device_queue(queues.present, 0).at(stage)?,
        });
        self.advance(BootstrapState::LogicalDeviceCreated);
        Ok(())
    }

    fn create_swapchain(&mut self, window: &D::Window) -> Result<(), BootstrapError> {
        let stage = Stage::Swapchain;
        let selected = self.selected(stage)?;
        let physical_device = selected.handle;
        let queues = selected.queues;

        let support = surface::probe(&self.driver, physical_device, self.surface)
            .at(stage)?
            .ok_or_else(|| BootstrapError::Configuration {
                stage,
                reason: "surface no longer reports any format or present mode".into(),
            })?;
        let config = SwapchainConfig::negotiate(&support, window.framebuffer_size()).ok_or_else(|| {
            BootstrapError::Configuration {
                stage,
                reason: "surface reports no formats".into(),
            }
        })?;
        log::info!(
            "Swapchain: {:?}/{:?}, {:?}, {}x{}, {} images requested",
            config.format.format,
            config.format.color_space,
            config.present_mode,
            config.extent.width,
            config.extent.height,
            config.image_count
        );

        let families = queues.unique_families();
        let create_info =
            swapchain::swapchain_create_info(self.surface, &config, &queues, &families);
        let swapchain = self.driver.create_swapchain(&create_info).at(stage)?;
        self.resources.push(Resource::Swapchain(swapchain));
        self.swapchain = swapchain;
        self.swapchain_config = Some(config);

        self.images = self.driver.swapchain_images(swapchain).at(stage)?;
        log::info!("Created swapchain with {} images", self.images.len());
        self.advance(BootstrapState::SwapchainConfigured);
        Ok(())
    }

    fn format(&self, stage: Stage) -> Result<vk::Format, BootstrapError> {
        self.swapchain_config
            .map(|config| config.format.format)
            .ok_or_else(|| BootstrapError::Configuration {
                stage,
                reason: "swapchain not configured".into(),
            })
    }

    fn create_image_views(&mut self) -> Result<(), BootstrapError> {
        let format = self.format(Stage::ImageViews)?;
        for &image in &self.images {
            let create_info = swapchain::image_view_create_info(image, format);
            let view = self
                .driver
                .create_image_view(&create_info)
                .at(Stage::ImageViews)?;
            self.resources.push(Resource::ImageView(view));
            self.image_views.push(view);
        }
        self.advance(BootstrapState::ImageViewsCreated);
        Ok(())
    }

    fn create_render_pass(&mut self) -> Result<(), BootstrapError> {
        let format = self.format(Stage::RenderPass)?;
        let render_pass =
            pipeline::create_render_pass(&mut self.driver, format).at(Stage::RenderPass)?;
        self.resources.push(Resource::RenderPass(render_pass));
        self.render_pass = render_pass;
        self.advance(BootstrapState::RenderPassCreated);
        Ok(())
    }

    fn create_pipeline_layout(&mut self, shaders: &dyn ShaderSource) -> Result<(), BootstrapError> {
        let stage = Stage::PipelineLayout;
        let extent = self
            .swapchain_config
            .map(|config| config.extent)
            .ok_or_else(|| BootstrapError::Configuration {
                stage,
                reason: "swapchain not configured".into(),
            })?;
        let fixed_function = FixedFunctionState::for_extent(extent);

        let layout = pipeline::create_pipeline_layout(&mut self.driver, shaders, &fixed_function)?;
        self.resources.push(Resource::PipelineLayout(layout));
        self.pipeline_layout = layout;
        self.fixed_function = Some(fixed_function);
        self.advance(BootstrapState::PipelineLayoutCreated);
        Ok(())
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Destroy everything in reverse creation order. Safe to call again.
    pub fn teardown(&mut self) {
        if self.resources.len() == 0 {
            self.state = BootstrapState::Destroyed;
            return;
        }

        log::info!("Destroying Vulkan context ({} handles)...", self.resources.len());
        if self.device != vk::Device::null() {
            if let Err(e) = self.driver.wait_idle() {
                log::warn!("Device wait failed before teardown: {}", e);
            }
        }

        self.resources.unwind(&mut self.driver);

        self.instance = vk::Instance::null();
        self.surface = vk::SurfaceKHR::null();
        self.physical_device = None;
        self.device = vk::Device::null();
        self.queues = None;
        self.swapchain = vk::SwapchainKHR::null();
        self.swapchain_config = None;
        self.images.clear();
        self.image_views.clear();
        self.render_pass = vk::RenderPass::null();
        self.pipeline_layout = vk::PipelineLayout::null();
        self.fixed_function = None;
        self.state = BootstrapState::Destroyed;
        log::info!("Vulkan context destroyed");
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    pub fn device(&self) -> vk::Device {
        self.device
    }

    pub fn queues(&self) -> Option<Queues> {
        self.queues
    }

    pub fn swapchain_config(&self) -> Option<&SwapchainConfig> {
        self.swapchain_config.as_ref()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub fn fixed_function(&self) -> Option<&FixedFunctionState> {
        self.fixed_function.as_ref()
    }
}

impl<D: Driver> Drop for GpuContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<D: Driver> fmt::Debug for GpuContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("state", &self.state)
            .field("handles", &self.resources.len())
            .field("physical_device", &self.physical_device)
            .field("swapchain_config", &self.swapchain_config)
            .finish()
    }
}

fn c_string(name: &str, stage: Stage) -> Result<CString, BootstrapError> {
    CString::new(name).map_err(|_| BootstrapError::Configuration {
        stage,
        reason: format!("name contains an interior NUL: {:?}", name),
    })
}

fn c_strings(names: &[String], stage: Stage) -> Result<Vec<CString>, BootstrapError> {
    names.iter().map(|name| c_string(name, stage)).collect()
}
