//! Cascaded shadow maps over a large outdoor scene.
//!
//! Twenty tall pillars stand on a circle around the origin, optionally joined
//! by animated models. The camera frustum is split into depth slices, each
//! gets its own orthographic light projection and its own layer of a depth
//! array texture. The forward pass picks the layer by view depth.

use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};
use wgpu::util::DeviceExt;
use winit::keyboard::KeyCode;

use crate::{
    camera::{ArcballCamera, Camera, CameraUniform},
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        model::{DrawMesh, Material, Mesh, PlacedModel},
        primitives,
        texture::{self, LayerKind, LayeredDepth, Texture},
    },
    demos::Demo,
    input::InputState,
    pipelines::{
        UNIFORM_STRIDE,
        cascaded::{CascadeSettingsUniform, CascadedPipelines},
    },
    resources,
    shadow::{
        CascadeSettings, MAX_CASCADES,
        cascade::{Cascade, compute_cascades},
    },
};

const CUBES_COUNT: usize = 20;
const CUBES_POS_RADIUS: f32 = 400.0;
const CUBE_SIZE: [f32; 3] = [10.0, 200.0, 10.0];
const FLOOR_SIZE: f32 = 1000.0;
const CAMERA_NEAR: f32 = 1.0;
const CAMERA_FAR: f32 = 1500.0;
const LIGHT_INTENSITY: f32 = 1.0;
const AMBIENT_INTENSITY: f32 = 0.4;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};
const CAMERA_DISTANCE: f32 = 300.0;
/// World units of zoom per unit of scroll.
const ZOOM_SPEED: f32 = 80.0;

/// Where configured models are put, cycled when more are given.
const MODEL_PLACEMENTS: [([f32; 3], f32); 3] = [
    ([-130.0, 0.0, 140.0], 0.0),
    ([100.0, 150.0, 0.0], -90.0),
    ([200.0, 0.0, 70.0], -9.0),
];

const DESCRIPTION: &str = "Cascaded shadow maps split the camera frustum into depth slices \
and render a separate shadow map for each one, so nearby shadows get as much resolution as \
distant ones. Drag to orbit, scroll to zoom and press D to show the cascade layers.";

pub struct CascadedShadows {
    camera: ArcballCamera,
    zoom: f32,
    settings: CascadeSettings,
    debug: bool,
    cascade_count: usize,

    pipelines: CascadedPipelines,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    settings_buffer: wgpu::Buffer,
    shadow_camera_buffer: wgpu::Buffer,
    shadow_camera_bind_group: wgpu::BindGroup,
    shadow_map: LayeredDepth,
    scene_bind_group: wgpu::BindGroup,
    overlay_bind_group: wgpu::BindGroup,

    white: Material,
    cube: Mesh,
    cube_instances: wgpu::Buffer,
    floor: Mesh,
    floor_instance: wgpu::Buffer,
    models: Vec<PlacedModel>,

    output: Texture,
    depth: Texture,
}

impl CascadedShadows {
    pub async fn new(ctx: InitContext) -> anyhow::Result<Self> {
        let InitContext {
            device,
            queue,
            size,
            config,
            ..
        } = ctx;
        let pipelines = CascadedPipelines::new(&device);

        let mut camera = ArcballCamera::new(CAMERA_DISTANCE);
        camera.near = CAMERA_NEAR;
        camera.far = CAMERA_FAR;
        camera.max_distance = 700.0;
        camera.max_polar_angle = -0.1;
        camera.rotation = Vector3::new(-0.6, std::f32::consts::FRAC_PI_4, 0.0);
        camera.resize(size[0], size[1]);
        camera.update(&InputState::default(), 0.0);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update(&camera);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cascade camera buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let settings_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cascade settings buffer"),
            size: std::mem::size_of::<CascadeSettingsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cascade shadow camera buffer"),
            size: MAX_CASCADES as wgpu::BufferAddress * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cascade shadow camera bind group"),
            layout: &pipelines.shadow_camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &shadow_camera_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<[[f32; 4]; 4]>() as u64),
                }),
            }],
        });

        let shadow_map = LayeredDepth::new(
            &device,
            config.shadow_resolution,
            MAX_CASCADES as u32,
            LayerKind::Array,
            "cascade shadow map",
        );
        let shadow_sampler = texture::create_shadow_sampler(&device);
        let depth_view_sampler = texture::create_depth_view_sampler(&device);
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cascade scene bind group"),
            layout: &pipelines.scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: settings_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.sampled),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let overlay_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cascade overlay bind group"),
            layout: &pipelines.overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.sampled),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&depth_view_sampler),
                },
            ],
        });

        let white = Material::solid(
            &device,
            &queue,
            "cascade white material",
            [255, 255, 255, 255],
            &pipelines.material_layout,
        );
        let cube = primitives::cuboid(CUBE_SIZE).upload(&device, "cascade pillar", 0);
        let cube_instances = pillar_instances()
            .iter()
            .map(Instance::to_raw)
            .collect::<Vec<_>>();
        let cube_instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cascade pillar instances"),
            contents: bytemuck::cast_slice(&cube_instances),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let floor = primitives::plane(FLOOR_SIZE, FLOOR_SIZE).upload(&device, "cascade floor", 0);
        let floor_instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cascade floor instance"),
            contents: bytemuck::cast_slice(&[Instance::new().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let loaded = futures::future::try_join_all(config.models.iter().map(|path| {
            let (device, queue, layout) = (&device, &queue, &pipelines.material_layout);
            async move {
                resources::load_model(path, device, queue, layout)
                    .await
                    .map_err(|e| e.context(format!("Failed to load model {path}")))
            }
        }))
        .await?;
        let models = loaded
            .into_iter()
            .enumerate()
            .map(|(i, model)| {
                log::info!("Placing model {} in the cascaded shadows scene", model.name);
                PlacedModel::new(&device, model, model_placement(i))
            })
            .collect();

        let output = Texture::create_render_target(&device, size, "cascade output");
        let depth = Texture::create_depth_texture(&device, size, "cascade depth");

        Ok(Self {
            camera,
            zoom: 0.0,
            settings: CascadeSettings::default(),
            debug: false,
            cascade_count: 0,
            pipelines,
            camera_uniform,
            camera_buffer,
            settings_buffer,
            shadow_camera_buffer,
            shadow_camera_bind_group,
            shadow_map,
            scene_bind_group,
            overlay_bind_group,
            white,
            cube,
            cube_instances,
            floor,
            floor_instance,
            models,
            output,
            depth,
        })
    }

    fn upload_cascades(&mut self, queue: &wgpu::Queue, cascades: &[Cascade]) {
        let mut uniform = CascadeSettingsUniform {
            light_space: [[[0.0; 4]; 4]; MAX_CASCADES],
            cascade_ends: [CAMERA_FAR; 4],
            sun_direction: self.settings.sun_position.normalize().extend(0.0).into(),
            light: [
                LIGHT_INTENSITY,
                LIGHT_INTENSITY,
                LIGHT_INTENSITY,
                AMBIENT_INTENSITY,
            ],
            params: [
                cascades.len() as f32,
                1.0 / self.shadow_map.size as f32,
                if self.debug { 1.0 } else { 0.0 },
                0.0,
            ],
        };
        for (i, cascade) in cascades.iter().enumerate().take(MAX_CASCADES) {
            uniform.light_space[i] = cascade.light_space.into();
            uniform.cascade_ends[i] = cascade.far;
            let matrix: [[f32; 4]; 4] = cascade.light_space.into();
            queue.write_buffer(
                &self.shadow_camera_buffer,
                i as wgpu::BufferAddress * UNIFORM_STRIDE,
                bytemuck::cast_slice(&[matrix]),
            );
        }
        queue.write_buffer(&self.settings_buffer, 0, bytemuck::cast_slice(&[uniform]));
        self.cascade_count = cascades.len().min(MAX_CASCADES);
    }

    /// Floor, pillars and models. The material is bound at `material_group`
    /// unless this is a depth-only pass.
    fn draw_scene(&self, render_pass: &mut wgpu::RenderPass<'_>, material_group: Option<u32>) {
        if let Some(group) = material_group {
            render_pass.set_bind_group(group, &self.white.bind_group, &[]);
        }
        render_pass.set_vertex_buffer(1, self.floor_instance.slice(..));
        render_pass.draw_mesh_instanced(&self.floor, 0..1);
        render_pass.set_vertex_buffer(1, self.cube_instances.slice(..));
        render_pass.draw_mesh_instanced(&self.cube, 0..CUBES_COUNT as u32);
        for model in &self.models {
            model.draw(render_pass, material_group);
        }
    }
}

/// The pillars, evenly spaced on a circle and standing on the floor.
fn pillar_instances() -> Vec<Instance> {
    let spacer = std::f32::consts::TAU / CUBES_COUNT as f32;
    (0..CUBES_COUNT)
        .map(|i| {
            let angle = i as f32 * spacer;
            Instance::from(Vector3::new(
                angle.cos() * CUBES_POS_RADIUS,
                CUBE_SIZE[1] * 0.5,
                angle.sin() * CUBES_POS_RADIUS,
            ))
        })
        .collect()
}

fn model_placement(index: usize) -> Instance {
    let (position, yaw) = MODEL_PLACEMENTS[index % MODEL_PLACEMENTS.len()];
    Instance::from(Vector3::from(position)).with_rotation(Quaternion::from_angle_y(Deg(yaw)))
}

impl Demo for CascadedShadows {
    fn name(&self) -> &str {
        "Cascaded Shadow Maps"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn output(&self) -> &Texture {
        &self.output
    }

    fn resize(&mut self, ctx: &Context, width: u32, height: u32) {
        self.output = Texture::create_render_target(&ctx.device, [width, height], "cascade output");
        self.depth = Texture::create_depth_texture(&ctx.device, [width, height], "cascade depth");
        self.camera.resize(width, height);
    }

    fn update(&mut self, ctx: &Context, input: Option<&InputState>, _elapsed: f32, dt: f32) {
        if let Some(input) = input {
            self.zoom += input.scroll * ZOOM_SPEED;
            self.camera.update(input, self.zoom);
            // keep zoom within the camera's distance limits
            self.zoom = self.camera.distance - CAMERA_DISTANCE;
        }
        for model in &mut self.models {
            model.update(&ctx.queue, dt);
        }

        self.camera_uniform.update(&self.camera);
        ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );

        match compute_cascades(
            self.camera.view_matrix(),
            self.camera.fov,
            self.camera.aspect,
            CAMERA_NEAR,
            CAMERA_FAR,
            &self.settings,
        ) {
            Ok(cascades) => self.upload_cascades(&ctx.queue, &cascades),
            Err(e) => log::warn!("Keeping the previous shadow cascades: {e:#}"),
        }
    }

    fn render(&self, encoder: &mut wgpu::CommandEncoder) {
        for (layer, view) in self
            .shadow_map
            .layers
            .iter()
            .enumerate()
            .take(self.cascade_count)
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cascade shadow pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            shadow_pass.set_pipeline(&self.pipelines.shadow);
            shadow_pass.set_bind_group(
                0,
                &self.shadow_camera_bind_group,
                &[(layer as wgpu::BufferAddress * UNIFORM_STRIDE) as u32],
            );
            self.draw_scene(&mut shadow_pass, None);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cascade forward pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.output.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        render_pass.set_pipeline(&self.pipelines.forward);
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
        self.draw_scene(&mut render_pass, Some(1));

        if self.debug {
            render_pass.set_pipeline(&self.pipelines.overlay);
            render_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
            render_pass.draw(0..6, 0..self.cascade_count as u32);
        }
    }

    fn on_key(&mut self, key: KeyCode) {
        if key == KeyCode::KeyD {
            self.debug = !self.debug;
            log::info!(
                "Cascade debug view {}",
                if self.debug { "on" } else { "off" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::MetricSpace;

    use super::*;

    #[test]
    fn pillars_stand_on_the_circle() {
        let pillars = pillar_instances();
        assert_eq!(pillars.len(), CUBES_COUNT);
        for pillar in &pillars {
            let ground = Vector3::new(pillar.position.x, 0.0, pillar.position.z);
            assert!((ground.distance(Vector3::new(0.0, 0.0, 0.0)) - CUBES_POS_RADIUS).abs() < 1e-3);
            // bottom face touches the floor
            assert!((pillar.position.y - CUBE_SIZE[1] * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn model_placements_cycle() {
        assert_eq!(model_placement(0), model_placement(MODEL_PLACEMENTS.len()));
        assert_ne!(model_placement(0), model_placement(1));
    }
}
