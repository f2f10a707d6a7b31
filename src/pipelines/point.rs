use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{
        PipelineDesc, comparison_sampler_entry, depth_texture_entry, mk_pipeline_layout,
        mk_render_pipeline, mk_shader, uniform_entry,
    },
};

/// Mirrors `Face` in `point_depth.wgsl`, one per light and cube face.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeFaceUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz light position, w cutoff distance.
    pub light: [f32; 4],
}

/// Mirrors `PointLight` in `point_forward.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightUniform {
    /// xyz position, w cutoff distance.
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// Per-draw colour of a light caster.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CasterUniform {
    pub color: [f32; 4],
}

/// Pipelines and layouts of the point shadows demo.
#[derive(Debug)]
pub struct PointPipelines {
    pub face_layout: wgpu::BindGroupLayout,
    pub scene_layout: wgpu::BindGroupLayout,
    pub caster_layout: wgpu::BindGroupLayout,
    /// Perforated shells into a cube face, no culling.
    pub depth: wgpu::RenderPipeline,
    /// Room seen from inside: front faces culled, shaded and shadowed.
    pub room: wgpu::RenderPipeline,
    /// Solid centre spheres.
    pub solid: wgpu::RenderPipeline,
    /// Inner side of the shells in flat colour.
    pub shell_back: wgpu::RenderPipeline,
    /// Outer side of the shells, shaded.
    pub shell_front: wgpu::RenderPipeline,
}

impl PointPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let face_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point face layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                Some(std::mem::size_of::<CubeFaceUniform>() as u64),
            )],
        });
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point scene layout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    None,
                ),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT, None),
                depth_texture_entry(2, wgpu::TextureViewDimension::Cube),
                depth_texture_entry(3, wgpu::TextureViewDimension::Cube),
                comparison_sampler_entry(4),
            ],
        });
        let caster_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point caster layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                Some(std::mem::size_of::<CasterUniform>() as u64),
            )],
        });

        let mesh_layouts = [ModelVertex::desc(), InstanceRaw::desc()];

        let depth_shader = mk_shader(device, "point depth shader", include_str!("point_depth.wgsl"));
        let depth_pipeline_layout =
            mk_pipeline_layout(device, "point depth pipeline layout", &[&face_layout]);
        let mut depth_desc = PipelineDesc::new(
            "point depth pipeline",
            &depth_pipeline_layout,
            &depth_shader,
            &mesh_layouts,
        );
        depth_desc.color_format = None;
        depth_desc.cull_mode = None;
        let depth = mk_render_pipeline(device, &depth_desc);

        let forward_shader =
            mk_shader(device, "point forward shader", include_str!("point_forward.wgsl"));
        let forward_pipeline_layout = mk_pipeline_layout(
            device,
            "point forward pipeline layout",
            &[&scene_layout, &caster_layout],
        );
        let forward = |label: &str, fs_entry: &str, cull_mode: Option<wgpu::Face>| {
            let mut desc = PipelineDesc::new(
                label,
                &forward_pipeline_layout,
                &forward_shader,
                &mesh_layouts,
            );
            desc.fs_entry = Some(fs_entry);
            desc.cull_mode = cull_mode;
            mk_render_pipeline(device, &desc)
        };

        Self {
            room: forward("point room pipeline", "fs_room", Some(wgpu::Face::Front)),
            solid: forward("point solid pipeline", "fs_solid", Some(wgpu::Face::Back)),
            shell_back: forward("point shell back pipeline", "fs_shell_back", Some(wgpu::Face::Front)),
            shell_front: forward("point shell front pipeline", "fs_shell_front", Some(wgpu::Face::Back)),
            face_layout,
            scene_layout,
            caster_layout,
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_fit_one_dynamic_stride() {
        assert_eq!(std::mem::size_of::<CubeFaceUniform>(), 80);
        assert_eq!(std::mem::size_of::<PointLightUniform>(), 32);
        assert!(std::mem::size_of::<CubeFaceUniform>() as u64 <= crate::pipelines::UNIFORM_STRIDE);
    }
}
