//! Seedable, chainable 32-bit hash accumulator.
//!
//! [`SmallXxHash`] is a single-lane reduction of xxHash32: the seed is offset
//! by the fifth prime, each fed integer goes through one xxHash32 round, and
//! reading the value applies the xxHash32 avalanche.
//!
//! The accumulator is a `Copy` value. [`SmallXxHash::eat`] returns a fresh
//! accumulator instead of mutating shared state, so one seeded accumulator can
//! be handed to every parallel worker without aliasing.
//!
//! # Feed order
//!
//! Feeding is order-sensitive: `eat(a).eat(b)` and `eat(b).eat(a)` produce
//! different values. Lattice coordinates are always fed x, then y, then z.
//!
//! ```
//! use hash_field::hash::SmallXxHash;
//!
//! let hash = SmallXxHash::seed(0).eat(3).eat(-7);
//! assert_eq!(u32::from(hash), hash.value());
//! ```

const PRIME_B: u32 = 0x85EB_CA77;
const PRIME_C: u32 = 0xC2B2_AE3D;
const PRIME_D: u32 = 0x27D4_EB2F;
const PRIME_E: u32 = 0x1656_67B1;

/// Running state of the hash accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SmallXxHash {
  accumulator: u32,
}

impl SmallXxHash {
  /// Creates an accumulator from a seed.
  #[inline]
  pub const fn seed(seed: u32) -> Self {
    Self {
      accumulator: seed.wrapping_add(PRIME_E),
    }
  }

  /// Folds one integer into the running state.
  #[inline]
  #[must_use]
  pub const fn eat(self, data: i32) -> Self {
    Self {
      accumulator: self
        .accumulator
        .wrapping_add((data as u32).wrapping_mul(PRIME_C))
        .rotate_left(17)
        .wrapping_mul(PRIME_D),
    }
  }

  /// Returns the raw accumulator without the avalanche step.
  #[inline]
  pub const fn accumulator(self) -> u32 {
    self.accumulator
  }

  /// Returns the hash of everything fed so far.
  #[inline]
  pub const fn value(self) -> u32 {
    avalanche(self.accumulator)
  }
}

impl From<SmallXxHash> for u32 {
  #[inline]
  fn from(hash: SmallXxHash) -> Self {
    hash.value()
  }
}

#[inline]
const fn avalanche(mut h: u32) -> u32 {
  h ^= h >> 15;
  h = h.wrapping_mul(PRIME_B);
  h ^= h >> 13;
  h = h.wrapping_mul(PRIME_C);
  h ^= h >> 16;
  h
}
