//! Configuration and field errors.
//!
//! The hashing kernel itself has no runtime failure modes. These errors cover
//! misuse detected at configuration-acceptance time or when inputs handed to
//! the kernel do not match the configured grid.

use crate::field::MAX_RESOLUTION;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  /// Resolution outside `1..=MAX_RESOLUTION`.
  ResolutionOutOfRange { resolution: i64 },
}

impl std::fmt::Display for ConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ResolutionOutOfRange { resolution } => write!(
        f,
        "resolution {} out of range: must be between 1 and {}",
        resolution, MAX_RESOLUTION
      ),
    }
  }
}

impl std::error::Error for ConfigError {}

/// Inputs that do not fit the configured grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
  /// Position array length differs from `resolution²`.
  PositionCount { expected: usize, actual: usize },
  /// Output field was sized for a different resolution.
  ResolutionMismatch { expected: u32, actual: u32 },
  /// Requested cell range does not fit the grid or the output slice.
  RangeOutOfBounds {
    start: usize,
    end: usize,
    cells: usize,
  },
}

impl std::fmt::Display for FieldError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::PositionCount { expected, actual } => {
        write!(f, "position count mismatch: expected={}, actual={}", expected, actual)
      }
      Self::ResolutionMismatch { expected, actual } => {
        write!(f, "field resolution mismatch: expected={}, actual={}", expected, actual)
      }
      Self::RangeOutOfBounds { start, end, cells } => {
        write!(f, "cell range {}..{} out of bounds for {} cells", start, end, cells)
      }
    }
  }
}

impl std::error::Error for FieldError {}
