//! Shadow mapping math.
//!
//! - `cascade` splits a camera frustum into depth slices and fits one
//!   orthographic light projection around each slice
//! - `point` builds the six face matrices used to render an omnidirectional
//!   light into a depth cube map
//!
//! Everything here is CPU-side and free of GPU state.

pub mod cascade;
pub mod point;

pub use cascade::{Cascade, CascadeSettings, MAX_CASCADES};
pub use point::{CUBE_FACES, CubeFace};
