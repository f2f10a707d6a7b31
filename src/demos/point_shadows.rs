//! Omnidirectional shadows from two point lights.
//!
//! Each light sits inside a perforated sphere shell that orbits the centre of
//! a small room. Every frame both lights render the shells into the six faces
//! of their own depth cube; the room then samples both cubes with the
//! direction from the light, so light spills through the holes of the shells.

use cgmath::{Euler, Matrix4, Point3, Quaternion, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{ArcballCamera, Camera, CameraUniform},
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{DrawMesh, Mesh},
        primitives,
        texture::{self, LayerKind, LayeredDepth, Texture},
    },
    demos::Demo,
    input::InputState,
    pipelines::{
        UNIFORM_STRIDE,
        point::{CasterUniform, CubeFaceUniform, PointLightUniform, PointPipelines},
    },
    shadow::point::cube_view_projs,
};

const ROOM_SIZE: f32 = 2.0;
const MOVE_RADIUS: f32 = 0.4;
const SHELL_RADIUS: f32 = 0.2;
const CENTER_RADIUS: f32 = 0.05;
const LIGHT_CUTOFF: f32 = 1.3;
const LIGHT_NEAR: f32 = 0.01;
const CASTER_COLORS: [[f32; 3]; 2] = [[0.203, 0.596, 0.858], [0.905, 0.596, 0.235]];
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
const CAMERA_DISTANCE: f32 = 3.0;
const ZOOM_SPEED: f32 = 0.4;

const DESCRIPTION: &str = "Point lights cast shadows in every direction. Each light renders \
the scene six times into the faces of a depth cube map and the room looks the distance to the \
light up by direction. The lights hide inside perforated shells that throw patterned shadows \
onto the walls.";

/// Position and orientation of both casters at time `t`.
pub fn caster_transforms(t: f32) -> [(Vector3<f32>, Euler<Rad<f32>>); 2] {
    [
        (
            Vector3::new(t.sin(), (t + 10.0).sin(), t.cos()) * MOVE_RADIUS,
            Euler::new(Rad(t * 0.2), Rad(t * 0.2), Rad(-t)),
        ),
        (
            Vector3::new((-t).sin(), (t * 2.0).sin(), (-t + 10.0).cos()) * MOVE_RADIUS,
            Euler::new(Rad(-t * 0.8), Rad(t * 0.8), Rad(-t)),
        ),
    ]
}

pub struct PointShadows {
    camera: ArcballCamera,
    zoom: f32,

    pipelines: PointPipelines,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    face_buffer: wgpu::Buffer,
    face_bind_group: wgpu::BindGroup,
    caster_bind_group: wgpu::BindGroup,
    cubes: [LayeredDepth; 2],
    scene_bind_group: wgpu::BindGroup,

    room: Mesh,
    room_instance: wgpu::Buffer,
    shell: Mesh,
    shell_instances: wgpu::Buffer,
    center: Mesh,
    center_instances: wgpu::Buffer,

    output: Texture,
    depth: Texture,
}

impl PointShadows {
    pub fn new(ctx: InitContext) -> anyhow::Result<Self> {
        let InitContext {
            device,
            queue,
            size,
            config,
            ..
        } = ctx;
        let pipelines = PointPipelines::new(&device);

        let mut camera = ArcballCamera::new(CAMERA_DISTANCE);
        camera.min_distance = 0.5;
        camera.max_distance = 6.0;
        camera.rotation = Vector3::new(-0.3, 0.4, 0.0);
        camera.resize(size[0], size[1]);
        camera.update(&InputState::default(), 0.0);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update(&camera);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point camera buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point lights buffer"),
            size: std::mem::size_of::<[PointLightUniform; 2]>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // one slot per light and cube face
        let face_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point face buffer"),
            size: 12 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let face_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point face bind group"),
            layout: &pipelines.face_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &face_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<CubeFaceUniform>() as u64),
                }),
            }],
        });

        let mut caster_data = vec![0u8; 2 * UNIFORM_STRIDE as usize];
        for (i, color) in CASTER_COLORS.iter().enumerate() {
            let uniform = CasterUniform {
                color: [color[0], color[1], color[2], 1.0],
            };
            let start = i * UNIFORM_STRIDE as usize;
            caster_data[start..start + std::mem::size_of::<CasterUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        let caster_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point caster buffer"),
            contents: &caster_data,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let caster_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point caster bind group"),
            layout: &pipelines.caster_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &caster_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<CasterUniform>() as u64),
                }),
            }],
        });

        let cubes = [0, 1].map(|i| {
            LayeredDepth::new(
                &device,
                config.cube_shadow_resolution,
                6,
                LayerKind::Cube,
                &format!("point light {i} cube"),
            )
        });
        let shadow_sampler = texture::create_shadow_sampler(&device);
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point scene bind group"),
            layout: &pipelines.scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&cubes[0].sampled),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&cubes[1].sampled),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let room = primitives::cuboid([ROOM_SIZE; 3]).upload(&device, "point room", 0);
        let room_instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("point room instance"),
            contents: bytemuck::cast_slice(&[Instance::new().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let shell = primitives::uv_sphere(SHELL_RADIUS, 36, 72).upload(&device, "point shell", 0);
        let center =
            primitives::uv_sphere(CENTER_RADIUS, 12, 24).upload(&device, "point centre", 0);
        let instance_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: 2 * std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let shell_instances = instance_buffer("point shell instances");
        let center_instances = instance_buffer("point centre instances");

        let output = Texture::create_render_target(&device, size, "point output");
        let depth = Texture::create_depth_texture(&device, size, "point depth");

        let demo = Self {
            camera,
            zoom: 0.0,
            pipelines,
            camera_uniform,
            camera_buffer,
            lights_buffer,
            face_buffer,
            face_bind_group,
            caster_bind_group,
            cubes,
            scene_bind_group,
            room,
            room_instance,
            shell,
            shell_instances,
            center,
            center_instances,
            output,
            depth,
        };
        demo.upload_casters(&queue, 0.0);
        Ok(demo)
    }

    /// Move both casters and their lights to time `t`.
    fn upload_casters(&self, queue: &wgpu::Queue, t: f32) {
        let transforms = caster_transforms(t);

        let shells = transforms.map(|(position, rotation)| {
            Instance::from(position)
                .with_rotation(Quaternion::from(rotation))
                .to_raw()
        });
        let centers = transforms.map(|(position, _)| Instance::from(position).to_raw());
        queue.write_buffer(&self.shell_instances, 0, bytemuck::cast_slice(&shells));
        queue.write_buffer(&self.center_instances, 0, bytemuck::cast_slice(&centers));

        let lights = [0, 1].map(|i| {
            let p = transforms[i].0;
            let c = CASTER_COLORS[i];
            PointLightUniform {
                position: [p.x, p.y, p.z, LIGHT_CUTOFF],
                color: [c[0], c[1], c[2], 1.0],
            }
        });
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&lights));

        for (light, (position, _)) in transforms.iter().enumerate() {
            let faces = cube_view_projs(
                Point3::new(position.x, position.y, position.z),
                LIGHT_NEAR,
                LIGHT_CUTOFF,
            );
            for (face, view_proj) in faces.iter().enumerate() {
                let uniform = face_uniform(*view_proj, *position);
                queue.write_buffer(
                    &self.face_buffer,
                    (light * 6 + face) as wgpu::BufferAddress * UNIFORM_STRIDE,
                    bytemuck::bytes_of(&uniform),
                );
            }
        }
    }

    fn caster_offset(caster: usize) -> u32 {
        (caster as wgpu::BufferAddress * UNIFORM_STRIDE) as u32
    }
}

fn face_uniform(view_proj: Matrix4<f32>, position: Vector3<f32>) -> CubeFaceUniform {
    CubeFaceUniform {
        view_proj: view_proj.into(),
        light: [position.x, position.y, position.z, LIGHT_CUTOFF],
    }
}

impl Demo for PointShadows {
    fn name(&self) -> &str {
        "Point Light Shadows"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn output(&self) -> &Texture {
        &self.output
    }

    fn resize(&mut self, ctx: &Context, width: u32, height: u32) {
        self.output = Texture::create_render_target(&ctx.device, [width, height], "point output");
        self.depth = Texture::create_depth_texture(&ctx.device, [width, height], "point depth");
        self.camera.resize(width, height);
    }

    fn update(&mut self, ctx: &Context, input: Option<&InputState>, elapsed: f32, _dt: f32) {
        if let Some(input) = input {
            self.zoom += input.scroll * ZOOM_SPEED;
            self.camera.update(input, self.zoom);
            // keep zoom within the camera's distance limits
            self.zoom = self.camera.distance - CAMERA_DISTANCE;
        }
        self.camera_uniform.update(&self.camera);
        ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        self.upload_casters(&ctx.queue, elapsed);
    }

    fn render(&self, encoder: &mut wgpu::CommandEncoder) {
        for (light, cube) in self.cubes.iter().enumerate() {
            for (face, view) in cube.layers.iter().enumerate() {
                let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("point shadow pass"),
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
                shadow_pass.set_pipeline(&self.pipelines.depth);
                shadow_pass.set_bind_group(
                    0,
                    &self.face_bind_group,
                    &[((light * 6 + face) as wgpu::BufferAddress * UNIFORM_STRIDE) as u32],
                );
                shadow_pass.set_vertex_buffer(1, self.shell_instances.slice(..));
                shadow_pass.draw_mesh_instanced(&self.shell, 0..2);
            }
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("point forward pass"),
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
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

        render_pass.set_pipeline(&self.pipelines.room);
        render_pass.set_bind_group(1, &self.caster_bind_group, &[Self::caster_offset(0)]);
        render_pass.set_vertex_buffer(1, self.room_instance.slice(..));
        render_pass.draw_mesh_instanced(&self.room, 0..1);

        let casters: [(&wgpu::RenderPipeline, &Mesh, &wgpu::Buffer); 3] = [
            (&self.pipelines.solid, &self.center, &self.center_instances),
            (&self.pipelines.shell_back, &self.shell, &self.shell_instances),
            (&self.pipelines.shell_front, &self.shell, &self.shell_instances),
        ];
        for (pipeline, mesh, instances) in casters {
            render_pass.set_pipeline(pipeline);
            render_pass.set_vertex_buffer(1, instances.slice(..));
            for caster in 0..2u32 {
                render_pass.set_bind_group(
                    1,
                    &self.caster_bind_group,
                    &[Self::caster_offset(caster as usize)],
                );
                render_pass.draw_mesh_instanced(mesh, caster..caster + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn casters_stay_inside_the_room() {
        for step in 0..200 {
            let t = step as f32 * 0.37;
            for (position, _) in caster_transforms(t) {
                let reach = MOVE_RADIUS * 3f32.sqrt() + SHELL_RADIUS;
                assert!(position.magnitude() <= reach + 1e-5);
                assert!(reach < ROOM_SIZE * 0.5);
            }
        }
    }

    #[test]
    fn casters_start_apart() {
        let [(a, _), (b, _)] = caster_transforms(0.0);
        assert!((a - b).magnitude() > SHELL_RADIUS * 2.0);
    }
}
