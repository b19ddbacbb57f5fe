//! Quantization of continuous coordinates into integer lattice cells.
//!
//! Two addressing modes feed the hash accumulator:
//!
//! - **Positions**: an external position, moved through the kernel's domain
//!   transform, is floored per axis and fed x, y, z.
//! - **Grid index**: the flat cell index is turned back into `(u, v)` grid
//!   coordinates, centered into `[-0.5, 0.5)`, scaled by [`GRID_FREQUENCY`]
//!   and floored. Only x and y are fed.
//!
//! Hashing always works on integers, so positions that jitter inside one
//! lattice cell hash identically.

use bevy::math::{IVec2, IVec3, UVec2, Vec2, Vec3};

use crate::domain::DomainTransform;
use crate::field::Resolution;
use crate::hash::SmallXxHash;

/// Nudge applied before flooring in grid index mode.
///
/// Products like `inv_resolution * i` that are mathematically integral can
/// round to just below the integer. The nudge keeps them in the cell they
/// belong to. It is far smaller than the distance `1 / 512` between any two
/// distinct grid values, so it never moves a value into a neighbouring cell.
pub const EPSILON: f32 = 1e-5;

/// Lattice cells per unit of centered grid coordinate in grid index mode.
pub const GRID_FREQUENCY: f32 = 8.0;

/// Source of lattice coordinates for a field computation.
#[derive(Clone, Copy, Debug)]
pub enum LatticeSource<'a> {
  /// One externally produced position per cell.
  Positions(&'a [Vec3]),
  /// The grid topology itself is the coordinate source.
  GridIndex,
}

impl<'a> LatticeSource<'a> {
  pub fn positions(positions: &'a [Vec3]) -> Self {
    Self::Positions(positions)
  }

  /// Lattice cell for a flat cell index.
  ///
  /// Positions are moved through `domain` before flooring; grid index mode
  /// ignores it. In position mode `index` must be within the position slice.
  #[inline]
  pub fn cell(&self, index: usize, resolution: Resolution, domain: &DomainTransform) -> LatticeCell {
    match self {
      Self::Positions(positions) => LatticeCell::Space(quantize_point(domain.apply(positions[index]))),
      Self::GridIndex => LatticeCell::Grid(quantize_grid(index, resolution)),
    }
  }
}

/// Integer lattice coordinates of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LatticeCell {
  Grid(IVec2),
  Space(IVec3),
}

impl LatticeCell {
  /// Feeds the coordinates into `hash` in x, y[, z] order.
  #[inline]
  pub fn feed(self, hash: SmallXxHash) -> SmallXxHash {
    match self {
      Self::Grid(c) => hash.eat(c.x).eat(c.y),
      Self::Space(c) => hash.eat(c.x).eat(c.y).eat(c.z),
    }
  }
}

/// Floors each axis of a point. Non-finite components saturate.
#[inline]
pub fn quantize_point(point: Vec3) -> IVec3 {
  point.floor().as_ivec3()
}

/// Recovers `(u, v)` from a flat row-major cell index.
#[inline]
pub fn grid_coords(index: usize, resolution: Resolution) -> UVec2 {
  let res = resolution.get();
  let inv = 1.0 / res as f64;
  let v = (inv * index as f64 + EPSILON as f64).floor() as u32;
  let u = index as u32 - res * v;
  UVec2::new(u, v)
}

/// Maps grid coordinates to the resolution-independent range `[-0.5, 0.5)`.
#[inline]
pub fn centered(coords: UVec2, resolution: Resolution) -> Vec2 {
  let inv = resolution.inv();
  Vec2::new(coords.x as f32 + 0.5, coords.y as f32 + 0.5) * inv - 0.5
}

/// Lattice coordinates for a cell in grid index mode.
#[inline]
pub fn quantize_grid(index: usize, resolution: Resolution) -> IVec2 {
  let uv = centered(grid_coords(index, resolution), resolution);
  (uv * GRID_FREQUENCY + Vec2::splat(EPSILON))
    .floor()
    .as_ivec2()
}
