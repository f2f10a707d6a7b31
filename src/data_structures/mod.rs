//! Scene data structures: models, textures, instances and primitives.
//!
//! - `model` contains meshes, materials, node hierarchies and placed models
//! - `texture` contains the GPU texture wrapper and layered depth targets
//! - `instance` holds per-instance transformation data
//! - `primitives` generates boxes, planes and spheres

pub mod instance;
pub mod model;
pub mod primitives;
pub mod texture;
