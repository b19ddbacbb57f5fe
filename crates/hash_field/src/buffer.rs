//! Hand-off of computed fields to GPU-side storage.
//!
//! The layout is fixed: 4 bytes per hash and 12 bytes (three `f32`) per
//! position or normal, all little-endian and row-major. [`StagingBuffers`]
//! packs a frame into that layout once so the bytes can be copied straight
//! into a texture or storage buffer.

use bevy::math::{Vec3, Vec4};

use crate::field::{FieldFrame, Resolution};

/// Bytes per hash.
pub const HASH_STRIDE: usize = 4;
/// Bytes per position or normal.
pub const VECTOR_STRIDE: usize = 12;

/// Destination for computed fields.
///
/// Implementors receive copies; the field itself stays with the caller so
/// its allocation can be reused for the next computation.
pub trait FieldBuffer {
  fn upload_hashes(&mut self, hashes: &[u32]);

  fn upload_samples(&mut self, positions: &[Vec3], normals: &[Vec3]);

  /// Uploads the hashes and, in position mode, the samples they came from.
  fn upload_frame(&mut self, frame: &FieldFrame) {
    self.upload_hashes(frame.field.as_slice());
    if let Some(samples) = &frame.samples {
      self.upload_samples(&samples.positions, &samples.normals);
    }
  }
}

/// CPU-side byte buffers in GPU layout.
#[derive(Clone, Debug, Default)]
pub struct StagingBuffers {
  hashes: Vec<u8>,
  positions: Vec<u8>,
  normals: Vec<u8>,
}

impl StagingBuffers {
  pub fn hashes(&self) -> &[u8] {
    &self.hashes
  }

  pub fn positions(&self) -> &[u8] {
    &self.positions
  }

  pub fn normals(&self) -> &[u8] {
    &self.normals
  }

  pub fn hash_count(&self) -> usize {
    self.hashes.len() / HASH_STRIDE
  }

  pub fn sample_count(&self) -> usize {
    self.positions.len() / VECTOR_STRIDE
  }

  /// Drops any samples from an earlier position-mode frame.
  pub fn clear_samples(&mut self) {
    self.positions.clear();
    self.normals.clear();
  }
}

impl FieldBuffer for StagingBuffers {
  fn upload_hashes(&mut self, hashes: &[u32]) {
    self.hashes.clear();
    self.hashes.reserve(hashes.len() * HASH_STRIDE);
    for hash in hashes {
      self.hashes.extend_from_slice(&hash.to_le_bytes());
    }
  }

  fn upload_samples(&mut self, positions: &[Vec3], normals: &[Vec3]) {
    pack_vectors(positions, &mut self.positions);
    pack_vectors(normals, &mut self.normals);
  }
}

fn pack_vectors(vectors: &[Vec3], out: &mut Vec<u8>) {
  out.clear();
  out.reserve(vectors.len() * VECTOR_STRIDE);
  for v in vectors {
    for component in v.to_array() {
      out.extend_from_slice(&component.to_le_bytes());
    }
  }
}

/// Per-draw constants for the rendering stage.
///
/// `displacement` and `vertical_offset` are passed through untouched; the
/// hash computation never reads them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaderConfig {
  pub resolution: f32,
  pub inv_resolution: f32,
  pub displacement: f32,
  pub vertical_offset: f32,
}

impl ShaderConfig {
  pub fn new(resolution: Resolution, displacement: f32, vertical_offset: f32) -> Self {
    Self {
      resolution: resolution.get() as f32,
      inv_resolution: resolution.inv(),
      displacement,
      vertical_offset,
    }
  }

  /// Packed as `(resolution, 1 / resolution, displacement, vertical_offset)`.
  pub fn as_vec4(&self) -> Vec4 {
    Vec4::new(
      self.resolution,
      self.inv_resolution,
      self.displacement,
      self.vertical_offset,
    )
  }

  /// Offset of an instance along its normal, driven by the hash's top byte.
  ///
  /// Ranges over `vertical_offset ± displacement / 2`.
  pub fn offset_along_normal(&self, hash: u32) -> f32 {
    let t = (hash >> 24) as f32 / 255.0;
    self.vertical_offset + self.displacement * (t - 0.5)
  }
}

/// Opaque RGBA colour built from the low three bytes of a hash.
#[inline]
pub fn hash_color(hash: u32) -> [u8; 4] {
  let [r, g, b, _] = hash.to_le_bytes();
  [r, g, b, 255]
}
