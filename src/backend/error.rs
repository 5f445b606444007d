// Bootstrap errors
//
// Every fatal failure names the stage it happened in. Rejected device
// candidates are not errors; see selector::Rejection.

use ash::vk;
use std::fmt;
use std::path::PathBuf;

/// The ordered stages of the bootstrap sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Instance,
    DebugMessenger,
    Surface,
    DeviceSelection,
    LogicalDevice,
    Swapchain,
    ImageViews,
    RenderPass,
    PipelineLayout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Instance => "instance",
            Stage::DebugMessenger => "debug messenger",
            Stage::Surface => "surface",
            Stage::DeviceSelection => "device selection",
            Stage::LogicalDevice => "logical device",
            Stage::Swapchain => "swapchain",
            Stage::ImageViews => "image views",
            Stage::RenderPass => "render pass",
            Stage::PipelineLayout => "pipeline layout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Something the user asked for is not available (layer, extension)
    #[error("[{stage}] configuration error: {reason}")]
    Configuration { stage: Stage, reason: String },

    /// Nothing to pick from, or nothing worth picking
    #[error("[{stage}] {reason}")]
    NoCandidate { stage: Stage, reason: String },

    /// A driver call returned a non-success status
    #[error("[{stage}] driver call failed: {result} ({code})", code = .result.as_raw())]
    Driver { stage: Stage, result: vk::Result },

    /// Shader byte-code could not be read
    #[error("[{stage}] failed to read {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    pub fn stage(&self) -> Stage {
        match self {
            BootstrapError::Configuration { stage, .. }
            | BootstrapError::NoCandidate { stage, .. }
            | BootstrapError::Driver { stage, .. }
            | BootstrapError::Io { stage, .. } => *stage,
        }
    }
}

/// Tag a raw driver result with the stage that produced it
pub trait StageContext<T> {
    fn at(self, stage: Stage) -> Result<T, BootstrapError>;
}

impl<T> StageContext<T> for Result<T, vk::Result> {
    fn at(self, stage: Stage) -> Result<T, BootstrapError> {
        self.map_err(|result| BootstrapError::Driver { stage, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_embeds_status_code() {
        let err: Result<(), _> =
            Err(vk::Result::ERROR_INITIALIZATION_FAILED).at(Stage::LogicalDevice);
        let message = err.unwrap_err().to_string();
        assert!(message.starts_with("[logical device]"), "{message}");
        assert!(message.contains("-3"), "{message}");
    }

    #[test]
    fn every_variant_reports_its_stage() {
        let err = BootstrapError::NoCandidate {
            stage: Stage::DeviceSelection,
            reason: "no suitable GPU".into(),
        };
        assert_eq!(err.stage(), Stage::DeviceSelection);
        assert_eq!(err.to_string(), "[device selection] no suitable GPU");
    }
}
