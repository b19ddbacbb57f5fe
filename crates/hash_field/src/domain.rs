//! Affine domain transform applied to sample positions before quantization.
//!
//! A [`Domain`] is the user-facing description (scale, rotation in degrees,
//! translation). [`Domain::matrix`] bakes it into a [`DomainTransform`], an
//! immutable 3×4 affine matrix that is shared read-only by every worker of one
//! field computation.

use bevy::math::{Affine3A, EulerRot, Quat, Vec3};
use serde::Deserialize;

/// Scale, rotation and translation of the hashed domain.
///
/// Rotation is given in degrees and applied Z first, then X, then Y.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Domain {
  /// Per-axis scale. Zero components are allowed and collapse that axis.
  pub scale: [f32; 3],
  /// Euler angles in degrees.
  pub rotation: [f32; 3],
  pub translation: [f32; 3],
}

impl Default for Domain {
  fn default() -> Self {
    Self::uniform(8.0)
  }
}

impl Domain {
  /// Identity domain: unit scale, no rotation, no translation.
  pub const IDENTITY: Self = Self {
    scale: [1.0; 3],
    rotation: [0.0; 3],
    translation: [0.0; 3],
  };

  /// Creates a domain with uniform scale and no rotation or translation.
  pub fn uniform(scale: f32) -> Self {
    Self {
      scale: [scale; 3],
      ..Self::IDENTITY
    }
  }

  /// Sets the per-axis scale.
  pub fn with_scale(mut self, scale: Vec3) -> Self {
    self.scale = scale.to_array();
    self
  }

  /// Sets the rotation in degrees.
  pub fn with_rotation(mut self, degrees: Vec3) -> Self {
    self.rotation = degrees.to_array();
    self
  }

  /// Sets the translation.
  pub fn with_translation(mut self, translation: Vec3) -> Self {
    self.translation = translation.to_array();
    self
  }

  /// Builds the affine matrix for this domain.
  pub fn matrix(&self) -> DomainTransform {
    DomainTransform::build(
      Vec3::from_array(self.scale),
      Vec3::from_array(self.rotation),
      Vec3::from_array(self.translation),
    )
  }
}

/// Immutable 3×4 affine matrix: rotation and scale in the 3×3 block,
/// translation in the last column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainTransform(Affine3A);

impl Default for DomainTransform {
  fn default() -> Self {
    Self::IDENTITY
  }
}

impl DomainTransform {
  pub const IDENTITY: Self = Self(Affine3A::IDENTITY);

  /// Composes scale, rotation (Euler degrees, Z then X then Y) and
  /// translation into one matrix.
  pub fn build(scale: Vec3, rotation_degrees: Vec3, translation: Vec3) -> Self {
    let radians = rotation_degrees * (std::f32::consts::PI / 180.0);
    let rotation = Quat::from_euler(EulerRot::YXZ, radians.y, radians.x, radians.z);
    Self(Affine3A::from_scale_rotation_translation(
      scale,
      rotation,
      translation,
    ))
  }

  /// Wraps an existing affine transform.
  pub fn from_affine(affine: Affine3A) -> Self {
    Self(affine)
  }

  /// Transforms the homogeneous point `(p, 1)`.
  #[inline]
  pub fn apply(&self, point: Vec3) -> Vec3 {
    self.0.transform_point3(point)
  }

  /// Returns the matrix as three rows of four columns.
  pub fn rows(&self) -> [[f32; 4]; 3] {
    let m = self.0.matrix3;
    let t = self.0.translation;
    [
      [m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x],
      [m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y],
      [m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z],
    ]
  }

  pub fn affine(&self) -> Affine3A {
    self.0
  }
}
