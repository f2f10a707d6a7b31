use crate::{
    data_structures::model::{self, Vertex},
    pipelines::{PipelineDesc, mk_pipeline_layout, mk_render_pipeline, mk_shader, uniform_entry},
};

/// Interleaved float2 position (pixels) and float2 uv.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl Vertex for TileVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TileVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[derive(Debug)]
pub struct WelcomePipeline {
    pub camera_layout: wgpu::BindGroupLayout,
    pub tile_layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::RenderPipeline,
}

impl WelcomePipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("welcome camera layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, None)],
        });
        // same shape as a material: the demo output and its sampler
        let tile_layout = model::material_layout(device);

        let shader = mk_shader(device, "welcome shader", include_str!("welcome.wgsl"));
        let layout = mk_pipeline_layout(
            device,
            "welcome pipeline layout",
            &[&camera_layout, &tile_layout],
        );
        let vertex_layouts = [TileVertex::desc()];
        let mut desc = PipelineDesc::new("welcome pipeline", &layout, &shader, &vertex_layouts);
        desc.color_format = Some(surface_format);
        desc.cull_mode = None;
        desc.depth_format = None;
        let pipeline = mk_render_pipeline(device, &desc);

        Self {
            camera_layout,
            tile_layout,
            pipeline,
        }
    }
}
