//! Position sources feeding the hash field in position mode.
//!
//! A [`Shape`] maps a centered grid coordinate to a surface point and normal.
//! [`schedule_shape`] samples it for every cell of a grid in parallel on the
//! compute pool and returns the [`Task`] producing positions and normals,
//! which the field task awaits.
//!
//! Only the [`Plane`] is provided. Richer surfaces plug in through the trait.

use bevy::math::{Affine3A, Vec2, Vec3};
use bevy::tasks::Task;
use rayon::prelude::*;

use crate::field::{Resolution, compute_pool};
use crate::lattice::{centered, grid_coords};

/// Surface sampled once per grid cell.
pub trait Shape: Send + Sync + 'static {
  /// Returns `(position, normal)` for a centered coordinate in
  /// `[-0.5, 0.5)²`.
  fn sample(&self, uv: Vec2) -> (Vec3, Vec3);
}

/// Unit square in the XY plane at `z = 0`, facing +Z.
#[derive(Clone, Copy, Debug, Default)]
pub struct Plane;

impl Shape for Plane {
  #[inline]
  fn sample(&self, uv: Vec2) -> (Vec3, Vec3) {
    (uv.extend(0.0), Vec3::Z)
  }
}

/// Positions and normals for every cell of a grid, row-major.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeSamples {
  pub positions: Vec<Vec3>,
  pub normals: Vec<Vec3>,
}

impl ShapeSamples {
  pub fn new(resolution: Resolution) -> Self {
    let mut samples = Self::default();
    samples.resize(resolution);
    samples
  }

  /// Resizes both arrays to `resolution²`, keeping the allocation.
  pub fn resize(&mut self, resolution: Resolution) {
    self.positions.resize(resolution.cells(), Vec3::ZERO);
    self.normals.resize(resolution.cells(), Vec3::ZERO);
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }
}

/// Samples `shape` for every cell, transformed by `world`, one row per batch.
pub fn generate<S: Shape>(
  shape: &S,
  resolution: Resolution,
  world: Affine3A,
  samples: &mut ShapeSamples,
) {
  samples.resize(resolution);
  let normal_matrix = world.matrix3.inverse().transpose();
  let batch = resolution.get() as usize;

  samples
    .positions
    .par_chunks_mut(batch)
    .zip(samples.normals.par_chunks_mut(batch))
    .enumerate()
    .for_each(|(row, (positions, normals))| {
      let start = row * batch;
      for (offset, (position, normal)) in positions.iter_mut().zip(normals.iter_mut()).enumerate() {
        let uv = centered(grid_coords(start + offset, resolution), resolution);
        let (p, n) = shape.sample(uv);
        *position = world.transform_point3(p);
        *normal = (normal_matrix * n).normalize_or_zero();
      }
    });
}

/// Runs [`generate`] as a task, reusing the allocation in `samples`.
pub fn schedule_shape<S: Shape>(
  shape: S,
  resolution: Resolution,
  world: Affine3A,
  mut samples: ShapeSamples,
) -> Task<ShapeSamples> {
  compute_pool().spawn(async move {
    generate(&shape, resolution, world, &mut samples);
    samples
  })
}

#[cfg(test)]
mod tests {
  use bevy::math::Quat;

  use super::*;

  #[test]
  fn plane_spans_centered_unit_square() {
    let resolution = Resolution::new(4).unwrap();
    let mut samples = ShapeSamples::default();
    generate(&Plane, resolution, Affine3A::IDENTITY, &mut samples);

    assert_eq!(samples.len(), 16);
    assert_eq!(samples.positions[0], Vec3::new(-0.375, -0.375, 0.0));
    assert_eq!(samples.positions[15], Vec3::new(0.375, 0.375, 0.0));
    assert!(samples.normals.iter().all(|n| *n == Vec3::Z));
  }

  #[test]
  fn world_transform_moves_positions_and_turns_normals() {
    let resolution = Resolution::new(2).unwrap();
    let world = Affine3A::from_rotation_translation(
      Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
      Vec3::new(0.0, 1.0, 0.0),
    );
    let samples = bevy::tasks::block_on(schedule_shape(Plane, resolution, world, ShapeSamples::default()));

    for normal in &samples.normals {
      assert!(normal.abs_diff_eq(Vec3::NEG_Y, 1e-5), "{normal}");
    }
    assert!(samples.positions[0].abs_diff_eq(Vec3::new(-0.25, 1.0, -0.25), 1e-5));
  }
}
