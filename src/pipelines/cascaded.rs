use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{self, ModelVertex, Vertex},
    },
    pipelines::{
        PipelineDesc, comparison_sampler_entry, depth_texture_entry, mk_pipeline_layout,
        mk_render_pipeline, mk_shader, non_filtering_sampler_entry, uniform_entry,
    },
    shadow::MAX_CASCADES,
};

/// Mirrors `Settings` in `csm_mesh.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CascadeSettingsUniform {
    pub light_space: [[[f32; 4]; 4]; MAX_CASCADES],
    /// Far view depth of each cascade.
    pub cascade_ends: [f32; 4],
    /// Unit vector towards the sun.
    pub sun_direction: [f32; 4],
    /// rgb light colour, ambient term in w.
    pub light: [f32; 4],
    /// x cascade count, y shadow texel size, z cascade tint toggle.
    pub params: [f32; 4],
}

/// Pipelines and layouts of the cascaded shadows demo.
#[derive(Debug)]
pub struct CascadedPipelines {
    pub shadow_camera_layout: wgpu::BindGroupLayout,
    pub scene_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub overlay_layout: wgpu::BindGroupLayout,
    pub shadow: wgpu::RenderPipeline,
    pub forward: wgpu::RenderPipeline,
    pub overlay: wgpu::RenderPipeline,
}

impl CascadedPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let shadow_camera_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("cascade shadow camera layout"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX,
                    Some(std::mem::size_of::<[[f32; 4]; 4]>() as u64),
                )],
            });
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cascade scene layout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    None,
                ),
                uniform_entry(
                    1,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    None,
                ),
                depth_texture_entry(2, wgpu::TextureViewDimension::D2Array),
                comparison_sampler_entry(3),
            ],
        });
        let material_layout = model::material_layout(device);
        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cascade overlay layout"),
            entries: &[
                depth_texture_entry(0, wgpu::TextureViewDimension::D2Array),
                non_filtering_sampler_entry(1),
            ],
        });

        let mesh_layouts = [ModelVertex::desc(), InstanceRaw::desc()];

        let shadow_shader = mk_shader(device, "cascade shadow shader", include_str!("csm_shadow.wgsl"));
        let shadow_pipeline_layout =
            mk_pipeline_layout(device, "cascade shadow pipeline layout", &[&shadow_camera_layout]);
        let mut shadow_desc = PipelineDesc::new(
            "cascade shadow pipeline",
            &shadow_pipeline_layout,
            &shadow_shader,
            &mesh_layouts,
        );
        shadow_desc.fs_entry = None;
        shadow_desc.color_format = None;
        // thin casters such as the floor must still write depth
        shadow_desc.cull_mode = None;
        shadow_desc.depth_bias = wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        };
        let shadow = mk_render_pipeline(device, &shadow_desc);

        let forward_shader = mk_shader(device, "cascade mesh shader", include_str!("csm_mesh.wgsl"));
        let forward_pipeline_layout = mk_pipeline_layout(
            device,
            "cascade forward pipeline layout",
            &[&scene_layout, &material_layout],
        );
        let forward = mk_render_pipeline(
            device,
            &PipelineDesc::new(
                "cascade forward pipeline",
                &forward_pipeline_layout,
                &forward_shader,
                &mesh_layouts,
            ),
        );

        let overlay_shader = mk_shader(device, "cascade overlay shader", include_str!("csm_debug.wgsl"));
        let overlay_pipeline_layout =
            mk_pipeline_layout(device, "cascade overlay pipeline layout", &[&overlay_layout]);
        let mut overlay_desc = PipelineDesc::new(
            "cascade overlay pipeline",
            &overlay_pipeline_layout,
            &overlay_shader,
            &[],
        );
        overlay_desc.cull_mode = None;
        overlay_desc.depth_write = false;
        overlay_desc.depth_compare = wgpu::CompareFunction::Always;
        let overlay = mk_render_pipeline(device, &overlay_desc);

        Self {
            shadow_camera_layout,
            scene_layout,
            material_layout,
            overlay_layout,
            shadow,
            forward,
            overlay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_uniform_matches_wgsl_layout() {
        // 4 mat4x4 followed by 4 vec4
        assert_eq!(
            std::mem::size_of::<CascadeSettingsUniform>(),
            MAX_CASCADES * 64 + 4 * 16
        );
    }
}
