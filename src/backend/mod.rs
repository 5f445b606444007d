// Backend module - Vulkan context bootstrap
//
// Design: pure negotiation/selection logic behind a thin Driver seam,
// with an ash-backed driver for the real thing

pub mod context;
pub mod debug;
pub mod device;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod selector;
pub mod shader;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
pub mod testing;

pub use context::{BootstrapSettings, GpuContext};
pub use debug::{DiagnosticSink, FileSink};
pub use device::VulkanDriver;
pub use shader::FileShaderSource;
