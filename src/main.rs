// =============================================================================
// VULKAN CONTEXT BOOTSTRAP
// =============================================================================
//
// Brings a Vulkan context all the way up to a render pass and pipeline
// layout for a single window, then idles until the window is closed.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (window, close requests)                      │
// │    └── GpuContext (owns every Vulkan handle)                    │
// │          └── VulkanDriver (ash dispatch tables)                 │
// │                └── DiagnosticSink (validation messages)         │
// └─────────────────────────────────────────────────────────────────┘
//
// BOOTSTRAP ORDER:
// 1. Instance (+ validation layer when enabled)
// 2. Debug messenger
// 3. Surface
// 4. Physical device selection
// 5. Logical device + queues
// 6. Swapchain + image views
// 7. Render pass + pipeline layout
//
// Teardown runs the same list backwards; the window goes last.
//
// =============================================================================

mod backend;
mod config;

use anyhow::{Context, Result};
use backend::{
    BootstrapSettings, DiagnosticSink, FileShaderSource, FileSink, GpuContext, VulkanDriver,
};
use config::Config;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Logger first so config problems are reported
    init_logging();

    // Load configuration from config.toml, then apply command-line overrides
    let mut config = Config::load();
    config.apply_args(std::env::args().skip(1))?;
    start_validation_log(&config);

    log::info!("Starting Vulkan bootstrap");
    log::info!(
        "Window: {}x{}, validation {}",
        config.window.width,
        config.window.height,
        if config.debug.validation_layers { "on" } else { "off" }
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // A failed bootstrap ends the loop early; surface it as a non-zero exit
    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Initialize logging (RUST_LOG overrides the info default)
fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();
    builder.init();
}

/// Start a fresh diagnostic log file when validation is on
fn start_validation_log(config: &Config) {
    if config.debug.validation_layers {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            let _ = writeln!(file, "=== Vulkan Validation Log ===");
            let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Owns the window and the Vulkan context.
///
/// The context must go before the window: the surface refers to it.
struct App {
    config: Config,
    context: Option<GpuContext<VulkanDriver>>,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: None,
            window: None,
            failure: None,
        }
    }

    fn init_vulkan(&self, window: &Window) -> Result<GpuContext<VulkanDriver>> {
        let driver = VulkanDriver::new()?;

        let diagnostics: Option<Arc<dyn DiagnosticSink>> = if self.config.debug.validation_layers {
            let sink = FileSink::open(&self.config.debug.log_file).with_context(|| {
                format!("Failed to open diagnostic log {:?}", self.config.debug.log_file)
            })?;
            log::info!("Validation messages go to {:?}", sink.path());
            Some(Arc::new(sink))
        } else {
            None
        };

        let shaders =
            FileShaderSource::new(&self.config.shaders.vertex, &self.config.shaders.fragment);
        let settings = BootstrapSettings::default();

        let context = GpuContext::bootstrap(driver, window, &settings, diagnostics, &shaders)?;
        Ok(context)
    }
}

/// Log what the bootstrap ended up with
fn log_context_summary(context: &GpuContext<VulkanDriver>) {
    log::info!("Vulkan context state: {:?}", context.state());
    if let Some(gpu) = context.physical_device() {
        log::info!(
            "  GPU: {} ({:?}, score {})",
            gpu.info.name,
            gpu.info.device_type,
            gpu.score
        );
    }
    log::info!("  Device: {:?}", context.device());
    if let Some(queues) = context.queues() {
        log::info!(
            "  Queues: graphics {:?}, present {:?}",
            queues.graphics,
            queues.present
        );
    }
    if let Some(config) = context.swapchain_config() {
        log::info!(
            "  Swapchain: {:?}, {}x{}, {:?}, {} image views",
            config.format.format,
            config.extent.width,
            config.extent.height,
            config.present_mode,
            context.image_views().len()
        );
    }
    log::info!(
        "  Render pass {:?}, pipeline layout {:?}",
        context.render_pass(),
        context.pipeline_layout()
    );
    if let Some(fixed) = context.fixed_function() {
        log::info!(
            "  Pipeline: {:?}, viewport {}x{}",
            fixed.topology,
            fixed.viewport.width,
            fixed.viewport.height
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        // Resizing would invalidate the swapchain, so it stays off
        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.window.width, self.config.window.height))
            .with_resizable(false);

        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                self.failure = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        match self.init_vulkan(&window) {
            Ok(context) => {
                log_context_summary(&context);
                self.context = Some(context);
            }
            Err(e) => {
                log::error!("Failed to initialize Vulkan: {:#}", e);
                self.failure = Some(e);
                event_loop.exit();
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down...");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Nothing is rendered; sleep until the next event
        event_loop.set_control_flow(ControlFlow::Wait);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up...");
        // Vulkan first, then the window-system resources
        drop(self.context.take());
        drop(self.window.take());
        log::info!("Cleanup complete");
    }
}
