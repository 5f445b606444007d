// Shader byte-code loading
//
// Vulkan consumes SPIR-V as 4-byte words. Bytes come from an injected
// ShaderSource so pipeline assembly can be tested without files on disk.

use ash::vk;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn flags(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

pub trait ShaderSource {
    /// Where the bytes for `stage` come from, for error messages
    fn origin(&self, stage: ShaderStage) -> PathBuf;

    fn load(&self, stage: ShaderStage) -> io::Result<Vec<u8>>;
}

/// Compiled SPIR-V files on disk
pub struct FileShaderSource {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl FileShaderSource {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl ShaderSource for FileShaderSource {
    fn origin(&self, stage: ShaderStage) -> PathBuf {
        match stage {
            ShaderStage::Vertex => self.vertex.clone(),
            ShaderStage::Fragment => self.fragment.clone(),
        }
    }

    fn load(&self, stage: ShaderStage) -> io::Result<Vec<u8>> {
        std::fs::read(self.origin(stage))
    }
}

/// Reinterpret SPIR-V bytes as words. Byte-swapped code is swapped back.
pub fn spirv_words(bytes: &[u8]) -> io::Result<Vec<u32>> {
    ash::util::read_spv(&mut io::Cursor::new(bytes))
}
