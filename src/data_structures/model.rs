//! Meshes, materials and node-animated models.
//!
//! A [`Model`] is a set of GPU meshes plus the node hierarchy they hang off.
//! glTF files fill the hierarchy and its animation clips; OBJ files and
//! procedural primitives produce models without nodes whose meshes sit at
//! the model origin. [`PlacedModel`] puts a model into a scene and keeps the
//! per-mesh instance buffers in sync with its animation.

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        texture::Texture,
    },
    resources::animation::{AnimationClip, Sample},
};

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Bind group layout of [`Material`]: diffuse texture and its sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = match &diffuse_texture.sampler {
            Some(sampler) => sampler.clone(),
            None => crate::data_structures::texture::create_default_sampler(device),
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
        }
    }

    /// Material backed by a 1x1 texture of `rgba`.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        rgba: [u8; 4],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let texture = Texture::create_solid_color(rgba, 1, 1, device, queue);
        Self::new(device, name, texture, layout)
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
    /// Node whose world transform places this mesh, `None` for the model origin.
    pub node: Option<usize>,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
            node: None,
        }
    }
}

/// One node of a model hierarchy with its rest pose.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub local: Instance,
    pub children: Vec<usize>,
}

#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub animations: Vec<AnimationClip>,
}

impl Model {
    /// A model without node hierarchy.
    pub fn from_meshes(name: &str, meshes: Vec<Mesh>, materials: Vec<Material>) -> Self {
        Self {
            name: name.to_string(),
            meshes,
            materials,
            nodes: Vec::new(),
            roots: Vec::new(),
            animations: Vec::new(),
        }
    }

    pub fn duration(&self) -> f32 {
        self.animations
            .iter()
            .map(AnimationClip::duration)
            .fold(0.0, f32::max)
    }

    /// World matrix of every node with all animation clips applied at `time`.
    pub fn node_transforms(&self, time: f32) -> Vec<Matrix4<f32>> {
        let mut locals: Vec<Instance> = self.nodes.iter().map(|n| n.local.clone()).collect();
        for clip in &self.animations {
            let Some(local) = locals.get_mut(clip.node) else {
                continue;
            };
            match clip.sample(time) {
                Some(Sample::Translation(t)) => local.position = t,
                Some(Sample::Rotation(r)) => local.rotation = r,
                Some(Sample::Scale(s)) => local.scale = s,
                None => {}
            }
        }

        let mut world = vec![Matrix4::identity(); self.nodes.len()];
        let mut stack: Vec<(usize, Matrix4<f32>)> = self
            .roots
            .iter()
            .map(|&root| (root, Matrix4::identity()))
            .collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            let transform = parent * locals[index].to_matrix();
            world[index] = transform;
            stack.extend(node.children.iter().map(|&child| (child, transform)));
        }
        world
    }

    /// Model space transform of `mesh` given the node transforms.
    pub fn mesh_transform(&self, mesh: &Mesh, nodes: &[Matrix4<f32>]) -> Matrix4<f32> {
        mesh.node
            .and_then(|node| nodes.get(node).copied())
            .unwrap_or_else(Matrix4::identity)
    }
}

/// A [`Model`] placed in a scene with its own animation clock.
#[derive(Debug)]
pub struct PlacedModel {
    pub model: Model,
    pub placement: Instance,
    pub time: f32,
    instance_buffers: Vec<wgpu::Buffer>,
}

impl PlacedModel {
    pub fn new(device: &wgpu::Device, model: Model, placement: Instance) -> Self {
        let nodes = model.node_transforms(0.0);
        let base = placement.to_matrix();
        let instance_buffers = model
            .meshes
            .iter()
            .map(|mesh| {
                let raw = InstanceRaw::from_matrix(base * model.mesh_transform(mesh, &nodes));
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Instance Buffer", mesh.name)),
                    contents: bytemuck::cast_slice(&[raw]),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();
        Self {
            model,
            placement,
            time: 0.0,
            instance_buffers,
        }
    }

    /// Advance the animation clock and upload the new mesh transforms.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: f32) {
        if self.model.animations.is_empty() {
            return;
        }
        self.time += dt;
        let nodes = self.model.node_transforms(self.time);
        let base = self.placement.to_matrix();
        for (mesh, buffer) in self.model.meshes.iter().zip(&self.instance_buffers) {
            let raw = InstanceRaw::from_matrix(base * self.model.mesh_transform(mesh, &nodes));
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[raw]));
        }
    }

    /// Draw every mesh. The material bind group is set at `material_group`
    /// when given; depth-only passes pass `None`.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, material_group: Option<u32>) {
        for (mesh, buffer) in self.model.meshes.iter().zip(&self.instance_buffers) {
            if let Some(group) = material_group {
                let Some(material) = self.model.materials.get(mesh.material) else {
                    continue;
                };
                render_pass.set_bind_group(group, &material.bind_group, &[]);
            }
            render_pass.set_vertex_buffer(1, buffer.slice(..));
            render_pass.draw_mesh_instanced(mesh, 0..1);
        }
    }
}

pub trait DrawMesh {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: std::ops::Range<u32>);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    /// Binds the mesh to vertex slot 0; slot 1 must hold the instance buffer.
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: std::ops::Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector3, Vector4};

    use super::*;
    use crate::resources::animation::Keyframes;

    fn hierarchy() -> Model {
        let mut model = Model::from_meshes("empty", Vec::new(), Vec::new());
        model.nodes = vec![
            Node {
                name: "root".to_string(),
                local: Instance::from(Vector3::new(1.0, 0.0, 0.0)),
                children: vec![1],
            },
            Node {
                name: "child".to_string(),
                local: Instance::from(Vector3::new(0.0, 2.0, 0.0)),
                children: Vec::new(),
            },
        ];
        model.roots = vec![0];
        model
    }

    #[test]
    fn children_inherit_parent_transforms() {
        let model = hierarchy();
        let world = model.node_transforms(0.0);
        let origin = world[1] * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin, Vector4::new(1.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn animation_overrides_the_rest_pose() {
        let mut model = hierarchy();
        model.animations.push(AnimationClip {
            name: "lift".to_string(),
            node: 0,
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 10.0, 0.0),
            ]),
            timestamps: vec![0.0, 1.0],
        });
        assert_eq!(model.duration(), 1.0);
        let world = model.node_transforms(0.5);
        let origin = world[1] * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin, Vector4::new(0.0, 7.0, 0.0, 1.0));
    }
}
