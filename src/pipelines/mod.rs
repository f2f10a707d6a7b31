//! Render pipeline definitions.
//!
//! Each demo owns the pipelines it needs; this module holds the shared
//! builder [`mk_render_pipeline`] and bind group layout helpers:
//!
//! - `cascaded`: depth-only cascade pass, shadowed forward pass, layer overlay
//! - `point`: cube face depth pass and the point light forward variants
//! - `welcome`: textured tiles drawn by the welcome screen

pub mod cascaded;
pub mod point;
pub mod welcome;

use crate::data_structures::texture::Texture;

/// Everything that differs between the pipelines of the demos.
///
/// [`PipelineDesc::new`] starts from an opaque, back-face culled, depth
/// tested pipeline with `vs_main` / `fs_main` entry points.
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub layout: &'a wgpu::PipelineLayout,
    pub shader: &'a wgpu::ShaderModule,
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
    pub vs_entry: &'a str,
    /// `None` builds a vertex-only pipeline.
    pub fs_entry: Option<&'a str>,
    /// `None` renders without colour attachments.
    pub color_format: Option<wgpu::TextureFormat>,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_bias: wgpu::DepthBiasState,
}

impl<'a> PipelineDesc<'a> {
    pub fn new(
        label: &'a str,
        layout: &'a wgpu::PipelineLayout,
        shader: &'a wgpu::ShaderModule,
        vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
    ) -> Self {
        Self {
            label,
            layout,
            shader,
            vertex_layouts,
            vs_entry: "vs_main",
            fs_entry: Some("fs_main"),
            color_format: Some(Texture::OUTPUT_FORMAT),
            blend: Some(wgpu::BlendState::REPLACE),
            cull_mode: Some(wgpu::Face::Back),
            depth_format: Some(Texture::DEPTH_FORMAT),
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }
}

pub fn mk_render_pipeline(device: &wgpu::Device, desc: &PipelineDesc) -> wgpu::RenderPipeline {
    let color_targets: Vec<Option<wgpu::ColorTargetState>> = desc
        .color_format
        .map(|format| wgpu::ColorTargetState {
            format,
            blend: desc.blend,
            write_mask: wgpu::ColorWrites::ALL,
        })
        .into_iter()
        .map(Some)
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.shader,
            entry_point: Some(desc.vs_entry),
            buffers: desc.vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: desc.fs_entry.map(|entry| wgpu::FragmentState {
            module: desc.shader,
            entry_point: Some(entry),
            targets: &color_targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: desc.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: desc.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}

pub fn mk_shader(device: &wgpu::Device, label: &str, source: &'static str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    dynamic_size: Option<u64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic_size.is_some(),
            min_binding_size: dynamic_size.and_then(wgpu::BufferSize::new),
        },
        count: None,
    }
}

pub fn depth_texture_entry(
    binding: u32,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Depth,
        },
        count: None,
    }
}

pub fn comparison_sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
        count: None,
    }
}

pub fn non_filtering_sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
        count: None,
    }
}

/// Dynamic uniform offsets are spaced by this many bytes, the largest
/// `min_uniform_buffer_offset_alignment` wgpu allows.
pub const UNIFORM_STRIDE: wgpu::BufferAddress = 256;
