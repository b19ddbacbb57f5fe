//! Hash Field - deterministic parallel per-cell hashing for Bevy.
//!
//! The core computes one 32-bit hash per cell of a `resolution × resolution`
//! grid by quantizing each cell's coordinates to an integer lattice and
//! folding them through a seeded [`SmallXxHash`]. Rows are hashed in parallel
//! on rayon, and position-driven fields run as tasks on Bevy's compute pool
//! that await the task producing their positions.
//!
//! [`HashFieldPlugin`] wires the core into a Bevy app: it recomputes the field
//! when its inputs change and uploads it to textures.

pub mod buffer;
pub mod domain;
pub mod error;
pub mod field;
pub mod hash;
pub mod lattice;
pub mod plugin;
pub mod render;
pub mod settings;
pub mod shape;
#[cfg(feature = "tracy")]
mod tracy_init;

pub use buffer::{FieldBuffer, HASH_STRIDE, ShaderConfig, StagingBuffers, VECTOR_STRIDE, hash_color};
pub use domain::{Domain, DomainTransform};
pub use error::{ConfigError, FieldError};
pub use field::{
  FieldFailure, FieldFrame, HashField, HashFieldConfig, MAX_RESOLUTION, ParallelHashField,
  Resolution, SampleInput, compute_pool,
};
pub use hash::SmallXxHash;
pub use lattice::{EPSILON, GRID_FREQUENCY, LatticeCell, LatticeSource};
pub use plugin::{FieldInputs, HashFieldAnchor, HashFieldPlugin, HashFieldPreview, HashFieldState};
pub use render::{create_hash_texture, create_preview_texture, upload_hashes, upload_preview};
pub use settings::{HashFieldSettings, SampleMode};
pub use shape::{Plane, Shape, ShapeSamples, schedule_shape};
#[cfg(feature = "tracy")]
pub use tracy_init::init_tracy;
