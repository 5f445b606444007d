// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml,
// plus the few command-line overrides (window size, validation on/off).
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub debug: DebugConfig,
    pub shaders: ShaderConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_file: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_file: PathBuf::from("vk_bootstrap_debug.log"),
        }
    }
}

/// Compiled SPIR-V locations
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/triangle.vert.spv"),
            fragment: PathBuf::from("shaders/triangle.frag.spv"),
        }
    }
}

impl Config {
    /// Load configuration from config.toml, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_or_default("config.toml")
    }

    /// Like `load_from_path`, but a bad file is a warning and yields defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load_from_path(path).unwrap_or_else(|e| {
            log::warn!("Failed to load {:?}: {:#}. Using defaults.", path, e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `--width N`, `--height N`, `--validation`, `--no-validation`
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--width" => self.window.width = dimension(&arg, args.next())?,
                "--height" => self.window.height = dimension(&arg, args.next())?,
                "--validation" => self.debug.validation_layers = true,
                "--no-validation" => self.debug.validation_layers = false,
                other => bail!("Unknown argument: {}", other),
            }
        }
        Ok(())
    }
}

fn dimension(flag: &str, value: Option<String>) -> Result<u32> {
    let value = value.with_context(|| format!("{} needs a value", flag))?;
    let parsed: u32 = value
        .parse()
        .with_context(|| format!("{} expects a positive integer, got {:?}", flag, value))?;
    if parsed == 0 {
        bail!("{} must be greater than zero", flag);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_the_classic_window() {
        let config = Config::default();
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert!(config.debug.validation_layers);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [window]
            width = 1280

            [debug]
            validation_layers = false
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert!(!config.debug.validation_layers);
        assert_eq!(config.shaders.vertex, PathBuf::from("shaders/triangle.vert.spv"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("[window\nwidth = ").is_err());
    }

    #[test]
    fn malformed_file_on_disk_falls_back_to_defaults() {
        let path = std::env::temp_dir()
            .join(format!("vk_bootstrap_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[window]\nwidth = \"wide\"\n").unwrap();

        assert!(Config::load_from_path(&path).is_err());
        let config = Config::load_or_default(&path);
        assert_eq!((config.window.width, config.window.height), (800, 600));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_means_defaults() {
        let path = std::env::temp_dir().join("vk_bootstrap_no_such_config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.debug.validation_layers);
    }

    #[test]
    fn command_line_overrides() {
        let mut config = Config::default();
        config
            .apply_args(args(&["--width", "1024", "--height", "768", "--no-validation"]))
            .unwrap();
        assert_eq!((config.window.width, config.window.height), (1024, 768));
        assert!(!config.debug.validation_layers);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Config::default().apply_args(args(&["--fullscreen"])).is_err());
        assert!(Config::default().apply_args(args(&["--width"])).is_err());
        assert!(Config::default().apply_args(args(&["--height", "0"])).is_err());
        assert!(Config::default().apply_args(args(&["--width", "wide"])).is_err());
    }
}
