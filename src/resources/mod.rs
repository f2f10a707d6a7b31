//! Loading of models and textures from asset files.
//!
//! - `texture` resolves asset paths and reads files, images and OBJ materials
//! - `mesh` turns OBJ meshes into GPU meshes
//! - `animation` holds node animation clips and their sampling

use std::io::{BufReader, Cursor};

use anyhow::Context as _;
use cgmath::{Quaternion, Vector3};

use crate::{
    data_structures::{
        instance::Instance,
        model::{self, Material, Mesh, Model, ModelVertex, Node},
        texture::Texture,
    },
    resources::{
        animation::{AnimationClip, Keyframes},
        texture::{load_binary, load_texture, sibling},
    },
};

pub mod animation;
pub mod mesh;
pub mod texture;

/// Load a model, picking the loader from the file extension.
pub async fn load_model(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => load_model_obj(file_name, device, queue, layout).await,
        Some("gltf" | "glb") => load_model_gltf(file_name, device, queue, layout).await,
        _ => anyhow::bail!("Unsupported model format: {file_name}"),
    }
}

pub async fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    let (materials, models) =
        texture::load_obj_materials(file_name, queue, device, layout).await?;
    let meshes = mesh::load_meshes(&models, file_name, materials.len(), device);
    anyhow::ensure!(!meshes.is_empty(), "{file_name} contains no meshes");
    log::info!(
        "Loaded {file_name}: {} meshes, {} materials",
        meshes.len(),
        materials.len()
    );
    Ok(Model::from_meshes(file_name, meshes, materials))
}

pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Model> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)
        .with_context(|| format!("Failed to parse {file_name}"))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name} references a missing binary chunk"))?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                anyhow::ensure!(
                    !uri.starts_with("data:"),
                    "{file_name}: embedded data URIs are not supported, export as GLB instead"
                );
                buffer_data.push(load_binary(&sibling(file_name, uri)).await?);
            }
        }
    }

    let animations = load_animations(&gltf, &buffer_data);

    // Load materials, the last one is the fallback for primitives without one
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let name = material.name().unwrap_or("gltf material").to_string();
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => match info.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => {
                    let data = buffer_data
                        .get(view.buffer().index())
                        .and_then(|buffer| buffer.get(view.offset()..view.offset() + view.length()))
                        .with_context(|| format!("{file_name}: image view out of bounds"))?;
                    Texture::from_bytes(device, queue, data, &name, mime_type.split('/').last())?
                }
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        &sibling(file_name, uri),
                        device,
                        queue,
                        mime_type.and_then(|mt| mt.split('/').last()),
                    )
                    .await?
                }
            },
            None => {
                let rgba = pbr
                    .base_color_factor()
                    .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                Texture::create_solid_color(rgba, 1, 1, device, queue)
            }
        };
        materials.push(Material::new(device, &name, diffuse_texture, layout));
    }
    let fallback_material = materials.len();
    materials.push(Material::solid(
        device,
        queue,
        "default",
        [204, 204, 204, 255],
        layout,
    ));

    let mut nodes = Vec::new();
    let mut meshes = Vec::new();
    for node in gltf.nodes() {
        let (translation, rotation, scale) = node.transform().decomposed();
        nodes.push(Node {
            name: node.name().unwrap_or("node").to_string(),
            local: Instance {
                position: translation.into(),
                rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
                scale: scale.into(),
            },
            children: node.children().map(|child| child.index()).collect(),
        });

        let Some(gltf_mesh) = node.mesh() else {
            continue;
        };
        for primitive in gltf_mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "{file_name}: skipping non-triangle primitive of mesh {}",
                    gltf_mesh.index()
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(positions) => positions.collect(),
                None => continue,
            };
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|normals| normals.collect())
                .unwrap_or_default();
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect())
                .unwrap_or_default();
            let vertices: Vec<ModelVertex> = positions
                .iter()
                .enumerate()
                .map(|(i, position)| ModelVertex {
                    position: *position,
                    tex_coords: tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                })
                .collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };
            let material = primitive
                .material()
                .index()
                .unwrap_or(fallback_material);
            let mut mesh = Mesh::new(
                device,
                &format!("{file_name}:{}", gltf_mesh.name().unwrap_or("mesh")),
                &vertices,
                &indices,
                material,
            );
            mesh.node = Some(node.index());
            meshes.push(mesh);
        }
    }
    anyhow::ensure!(!meshes.is_empty(), "{file_name} contains no triangle meshes");

    let roots: Vec<usize> = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => scene.nodes().map(|node| node.index()).collect(),
        None => (0..nodes.len()).collect(),
    };

    log::info!(
        "Loaded {file_name}: {} meshes, {} nodes, {} animation channels",
        meshes.len(),
        nodes.len(),
        animations.len()
    );
    Ok(model::Model {
        name: file_name.to_string(),
        meshes,
        materials,
        nodes,
        roots,
        animations,
    })
}

fn load_animations(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> Vec<AnimationClip> {
    let mut clips = Vec::new();
    for animation in gltf.animations() {
        let name = animation.name().unwrap_or("Default").to_string();
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let timestamps: Vec<f32> = match reader.read_inputs() {
                Some(times) => times.collect(),
                None => {
                    log::warn!("No timestamps found in channel {}", channel.index());
                    continue;
                }
            };
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                    Keyframes::Translation(translations.map(Vector3::from).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                    Keyframes::Rotation(
                        rotations
                            .into_f32()
                            .map(|q| Quaternion::new(q[3], q[0], q[1], q[2]))
                            .collect(),
                    )
                }
                Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                    Keyframes::Scale(scales.map(Vector3::from).collect())
                }
                // morph targets need skinning support
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => Keyframes::Other,
                None => {
                    log::warn!("No keyframes found in channel {}", channel.index());
                    continue;
                }
            };
            clips.push(AnimationClip {
                name: name.clone(),
                node: channel.target().node().index(),
                keyframes,
                timestamps,
            });
        }
    }
    clips
}
