//! render-dojo
//!
//! Real-time rendering technique demos on wgpu: cascaded shadow maps,
//! omnidirectional point-light shadows and a welcome grid presenting the
//! live output of every demo.
//!
//! High-level modules
//! - `camera`: perspective, arcball and orthographic cameras plus their uniform
//! - `capture`: GPU texture read-back and PNG screenshots
//! - `config`: command line configuration
//! - `context`: GPU device, queue and window surface
//! - `data_structures`: meshes, models, instances, textures and primitives
//! - `demos`: the demo scenes and the welcome grid
//! - `flow`: the winit event loop driving everything
//! - `input`: per-frame input snapshot
//! - `pipelines`: render pipelines and WGSL shaders
//! - `resources`: glTF/OBJ/image loading and node animation
//! - `shadow`: cascade splitting and cube face matrices
//!

pub mod camera;
pub mod capture;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod demos;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod resources;
pub mod shadow;
