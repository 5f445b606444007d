// Render pass and pipeline layout
//
// Both derive from the swapchain format and a fixed pipeline description.
// Shader modules only live for the duration of pipeline-layout assembly.

use ash::prelude::VkResult;
use ash::vk;

use super::driver::Driver;
use super::error::{BootstrapError, Stage, StageContext};
use super::shader::{spirv_words, ShaderSource, ShaderStage};

/// Single color attachment in the swapchain format, presented at the end
pub fn create_render_pass<D: Driver>(
    driver: &mut D,
    format: vk::Format,
) -> VkResult<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let color_attachment_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let color_attachments = &[color_attachment_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .build();

    // Wait for the presentation engine to release the image before writing
    let dependency = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build();

    let attachments = &[color_attachment];
    let subpasses = &[subpass];
    let dependencies = &[dependency];

    let render_pass_info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(dependencies);

    driver.create_render_pass(&render_pass_info)
}

/// The hard-coded fixed-function part of the triangle pipeline
#[derive(Debug, Clone, Copy)]
pub struct FixedFunctionState {
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
    pub samples: vk::SampleCountFlags,
    pub blend_enable: bool,
    pub viewport: vk::Viewport,
    pub scissor: vk::Rect2D,
}

impl FixedFunctionState {
    pub fn for_extent(extent: vk::Extent2D) -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            line_width: 1.0,
            samples: vk::SampleCountFlags::TYPE_1,
            blend_enable: false,
            viewport: vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
        }
    }

    pub fn input_assembly(&self) -> vk::PipelineInputAssemblyStateCreateInfo {
        vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(false)
            .build()
    }

    pub fn rasterization(&self) -> vk::PipelineRasterizationStateCreateInfo {
        vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .line_width(self.line_width)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false)
            .build()
    }

    pub fn multisample(&self) -> vk::PipelineMultisampleStateCreateInfo {
        vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(self.samples)
            .build()
    }

    pub fn color_blend_attachment(&self) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(self.blend_enable)
            .build()
    }
}

fn load_module<D: Driver>(
    driver: &mut D,
    shaders: &dyn ShaderSource,
    stage: ShaderStage,
) -> Result<vk::ShaderModule, BootstrapError> {
    let io_error = |source: std::io::Error| BootstrapError::Io {
        stage: Stage::PipelineLayout,
        path: shaders.origin(stage),
        source,
    };

    let bytes = shaders.load(stage).map_err(io_error)?;
    let code = spirv_words(&bytes).map_err(io_error)?;
    let info = vk::ShaderModuleCreateInfo::builder().code(&code);

    driver.create_shader_module(&info).at(Stage::PipelineLayout)
}

/// Load both shader stages, describe the fixed-function state, then create
/// the (empty) pipeline layout.
///
/// Shader modules are destroyed before returning, on success and failure.
pub fn create_pipeline_layout<D: Driver>(
    driver: &mut D,
    shaders: &dyn ShaderSource,
    fixed: &FixedFunctionState,
) -> Result<vk::PipelineLayout, BootstrapError> {
    let vertex = load_module(driver, shaders, ShaderStage::Vertex)?;
    let fragment = match load_module(driver, shaders, ShaderStage::Fragment) {
        Ok(module) => module,
        Err(e) => {
            driver.destroy_shader_module(vertex);
            return Err(e);
        }
    };

    let entry_point = c"main";
    let stages = [(vertex, ShaderStage::Vertex), (fragment, ShaderStage::Fragment)]
        .map(|(module, stage)| {
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(stage.flags())
                .module(module)
                .name(entry_point)
                .build()
        });
    log::debug!("Pipeline shader stages: {:?}", stages.map(|s| s.stage));

    let viewports = [fixed.viewport];
    let scissors = [fixed.scissor];
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewports(&viewports)
        .scissors(&scissors);
    let input_assembly = fixed.input_assembly();
    let rasterization = fixed.rasterization();
    let multisample = fixed.multisample();
    let blend_attachment = fixed.color_blend_attachment();
    log::debug!(
        "Fixed-function state: {:?}, {:?}/{:?}/{:?}, {:?}, blend {}, {} viewport {}x{}",
        input_assembly.topology,
        rasterization.polygon_mode,
        rasterization.cull_mode,
        rasterization.front_face,
        multisample.rasterization_samples,
        blend_attachment.blend_enable == vk::TRUE,
        viewport_state.viewport_count,
        fixed.viewport.width,
        fixed.viewport.height
    );

    let layout_info = vk::PipelineLayoutCreateInfo::builder();
    let layout = driver.create_pipeline_layout(&layout_info).at(Stage::PipelineLayout);

    driver.destroy_shader_module(fragment);
    driver.destroy_shader_module(vertex);

    layout
}
