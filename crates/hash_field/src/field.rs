//! Parallel hash field computation.
//!
//! [`ParallelHashField`] computes one 32-bit hash per cell of a
//! `resolution × resolution` grid. Cells are split into contiguous batches of
//! one row (`resolution` cells) and every batch is hashed by one rayon worker
//! into its own disjoint slice of the output, so workers never synchronize.
//!
//! # Scheduling
//!
//! [`ParallelHashField::compute`] is a blocking fork-join. For pipelines,
//! [`ParallelHashField::schedule`] runs the computation as a task on the
//! [`AsyncComputeTaskPool`] and returns the [`Task`] that downstream consumers
//! await. When positions come from an upstream task, the field task awaits it
//! and does not read positions before they are complete.
//!
//! ```
//! use bevy::tasks::block_on;
//! use hash_field::field::{HashField, HashFieldConfig, ParallelHashField, Resolution, SampleInput};
//!
//! let resolution = Resolution::new(2).unwrap();
//! let kernel = ParallelHashField::new(HashFieldConfig::new(resolution, 0));
//! let frame = block_on(kernel.schedule(SampleInput::Grid, HashField::new(resolution))).unwrap();
//! assert_eq!(frame.field.len(), 4);
//! ```

use bevy::tasks::{AsyncComputeTaskPool, Task, TaskPool};
use rayon::prelude::*;

use crate::domain::DomainTransform;
use crate::error::{ConfigError, FieldError};
use crate::hash::SmallXxHash;
use crate::lattice::LatticeSource;
use crate::shape::ShapeSamples;

/// Pool running field and shape tasks.
///
/// Inside a Bevy app this is the pool set up by `TaskPoolPlugin`; elsewhere a
/// default pool is created on first use.
pub fn compute_pool() -> &'static AsyncComputeTaskPool {
  AsyncComputeTaskPool::get_or_init(TaskPool::default)
}

/// Largest supported grid resolution (512² = 262,144 cells).
pub const MAX_RESOLUTION: u32 = 512;

/// Validated grid resolution in `1..=MAX_RESOLUTION`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution(u32);

impl Resolution {
  pub const MIN: Self = Self(1);

  /// Validates a resolution.
  pub fn new(resolution: u32) -> Result<Self, ConfigError> {
    if (1..=MAX_RESOLUTION).contains(&resolution) {
      Ok(Self(resolution))
    } else {
      Err(ConfigError::ResolutionOutOfRange {
        resolution: resolution as i64,
      })
    }
  }

  #[inline]
  pub const fn get(self) -> u32 {
    self.0
  }

  /// Number of cells, `resolution²`.
  #[inline]
  pub const fn cells(self) -> usize {
    (self.0 as usize) * (self.0 as usize)
  }

  #[inline]
  pub fn inv(self) -> f32 {
    1.0 / self.0 as f32
  }
}

impl TryFrom<i64> for Resolution {
  type Error = ConfigError;

  fn try_from(resolution: i64) -> Result<Self, Self::Error> {
    u32::try_from(resolution)
      .map_err(|_| ConfigError::ResolutionOutOfRange { resolution })
      .and_then(Self::new)
  }
}

/// Inputs that fix the result of a field computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HashFieldConfig {
  pub resolution: Resolution,
  pub seed: u32,
  /// Applied to positions before quantization. Unused in grid index mode.
  pub domain: DomainTransform,
}

impl HashFieldConfig {
  pub fn new(resolution: Resolution, seed: u32) -> Self {
    Self {
      resolution,
      seed,
      domain: DomainTransform::IDENTITY,
    }
  }

  pub fn with_domain(mut self, domain: DomainTransform) -> Self {
    self.domain = domain;
    self
  }

  /// Cells per parallel work unit: one grid row.
  #[inline]
  pub fn batch_size(&self) -> usize {
    self.resolution.get() as usize
  }
}

/// One hash per grid cell, row-major, `resolution²` long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashField {
  hashes: Vec<u32>,
  resolution: Resolution,
}

impl HashField {
  /// Creates a zeroed field.
  pub fn new(resolution: Resolution) -> Self {
    Self {
      hashes: vec![0; resolution.cells()],
      resolution,
    }
  }

  pub fn resolution(&self) -> Resolution {
    self.resolution
  }

  /// Resizes the field for a new resolution.
  ///
  /// The allocation is kept when the resolution is unchanged or shrinks.
  pub fn resize(&mut self, resolution: Resolution) {
    if resolution != self.resolution {
      self.hashes.resize(resolution.cells(), 0);
      self.resolution = resolution;
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.hashes.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.hashes.is_empty()
  }

  #[inline]
  pub fn as_slice(&self) -> &[u32] {
    &self.hashes
  }

  /// Hash of the cell at grid coordinates `(u, v)`.
  pub fn get(&self, u: u32, v: u32) -> Option<u32> {
    let res = self.resolution.get();
    if u < res && v < res {
      Some(self.hashes[(v * res + u) as usize])
    } else {
      None
    }
  }

  /// Iterates over the rows, bottom (`v = 0`) first.
  pub fn rows(&self) -> std::slice::Chunks<'_, u32> {
    self.hashes.chunks(self.resolution.get() as usize)
  }

  pub fn into_vec(self) -> Vec<u32> {
    self.hashes
  }
}

impl std::ops::Index<usize> for HashField {
  type Output = u32;

  fn index(&self, index: usize) -> &u32 {
    &self.hashes[index]
  }
}

/// Output of a scheduled field task.
#[derive(Debug)]
pub struct FieldFrame {
  pub field: HashField,
  /// Positions and normals the field was computed from, in position mode.
  pub samples: Option<ShapeSamples>,
}

/// A scheduled field task that could not run.
///
/// Carries the buffers handed to [`ParallelHashField::schedule`] back to the
/// caller. The field is returned untouched: neither resized nor written.
#[derive(Debug)]
pub struct FieldFailure {
  pub error: FieldError,
  pub frame: FieldFrame,
}

impl std::fmt::Display for FieldFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.error.fmt(f)
  }
}

impl std::error::Error for FieldFailure {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(&self.error)
  }
}

/// Input for a scheduled field task.
pub enum SampleInput {
  /// Hash the grid topology, no positions.
  Grid,
  /// Hash positions produced by an upstream task.
  Shape(Task<ShapeSamples>),
}

impl std::fmt::Debug for SampleInput {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Grid => f.write_str("Grid"),
      Self::Shape(task) => f
        .debug_struct("Shape")
        .field("finished", &task.is_finished())
        .finish(),
    }
  }
}

/// Hash field kernel for one configuration.
///
/// Stateless apart from its configuration. The seeded accumulator is a copied
/// value, so every worker starts from its own copy.
#[derive(Clone, Copy, Debug)]
pub struct ParallelHashField {
  config: HashFieldConfig,
  hash: SmallXxHash,
}

impl ParallelHashField {
  pub fn new(config: HashFieldConfig) -> Self {
    Self {
      config,
      hash: SmallXxHash::seed(config.seed),
    }
  }

  pub fn config(&self) -> &HashFieldConfig {
    &self.config
  }

  /// Computes every cell of `field` in parallel and returns when all batches
  /// are done.
  ///
  /// Positions are moved through the configured domain transform.
  pub fn compute(&self, source: LatticeSource<'_>, field: &mut HashField) -> Result<(), FieldError> {
    if field.resolution != self.config.resolution {
      return Err(FieldError::ResolutionMismatch {
        expected: self.config.resolution.get(),
        actual: field.resolution.get(),
      });
    }
    self.check_source(&source)?;

    #[cfg(feature = "tracy")]
    let _span = tracing::info_span!("hash_field", resolution = self.config.resolution.get()).entered();

    let batch = self.config.batch_size();
    field
      .hashes
      .par_chunks_mut(batch)
      .enumerate()
      .for_each(|(index, out)| self.hash_batch(&source, index * batch, out));
    Ok(())
  }

  /// Computes cells `start..start + out.len()` into `out` on the calling
  /// thread.
  ///
  /// Produces the same values as the matching sub-range of
  /// [`ParallelHashField::compute`].
  pub fn compute_range(
    &self,
    source: LatticeSource<'_>,
    start: usize,
    out: &mut [u32],
  ) -> Result<(), FieldError> {
    self.check_source(&source)?;
    self.check_range(start, out.len())?;
    self.hash_batch(&source, start, out);
    Ok(())
  }

  /// Hash of a single cell.
  pub fn cell_hash(&self, source: &LatticeSource<'_>, index: usize) -> Result<u32, FieldError> {
    self.check_source(source)?;
    self.check_range(index, 1)?;
    Ok(self.hash_cell(source, index))
  }

  /// Runs the computation as a task.
  ///
  /// `field` is resized to the configured resolution and handed back inside
  /// the [`FieldFrame`], so one allocation can be reused across runs. With
  /// [`SampleInput::Shape`] the task awaits the upstream task before reading
  /// any position. On failure the buffers come back in the [`FieldFailure`].
  pub fn schedule(&self, input: SampleInput, field: HashField) -> Task<Result<FieldFrame, FieldFailure>> {
    let kernel = *self;
    let resolution = kernel.config.resolution.get();

    match input {
      SampleInput::Grid => {
        log::debug!("scheduling grid hash field: resolution={}", resolution);
        compute_pool().spawn(async move { kernel.fill(field, None) })
      }
      SampleInput::Shape(upstream) => {
        log::debug!(
          "scheduling position hash field after shape task: resolution={}",
          resolution
        );
        compute_pool().spawn(async move {
          let samples = upstream.await;
          kernel.fill(field, Some(samples))
        })
      }
    }
  }

  /// Validates the inputs, then resizes and computes `field`.
  fn fill(&self, mut field: HashField, samples: Option<ShapeSamples>) -> Result<FieldFrame, FieldFailure> {
    let checked = self.check_source(&source_of(&samples));
    if let Err(error) = checked {
      return Err(FieldFailure {
        error,
        frame: FieldFrame { field, samples },
      });
    }

    field.resize(self.config.resolution);
    let computed = self.compute(source_of(&samples), &mut field);
    match computed {
      Ok(()) => Ok(FieldFrame { field, samples }),
      Err(error) => Err(FieldFailure {
        error,
        frame: FieldFrame { field, samples },
      }),
    }
  }

  fn check_source(&self, source: &LatticeSource<'_>) -> Result<(), FieldError> {
    if let LatticeSource::Positions(positions) = source {
      let expected = self.config.resolution.cells();
      if positions.len() != expected {
        return Err(FieldError::PositionCount {
          expected,
          actual: positions.len(),
        });
      }
    }
    Ok(())
  }

  fn check_range(&self, start: usize, len: usize) -> Result<(), FieldError> {
    let cells = self.config.resolution.cells();
    let end = start.saturating_add(len);
    if end > cells {
      return Err(FieldError::RangeOutOfBounds { start, end, cells });
    }
    Ok(())
  }

  #[inline]
  fn hash_cell(&self, source: &LatticeSource<'_>, index: usize) -> u32 {
    source
      .cell(index, self.config.resolution, &self.config.domain)
      .feed(self.hash)
      .value()
  }

  #[inline]
  fn hash_batch(&self, source: &LatticeSource<'_>, start: usize, out: &mut [u32]) {
    for (offset, slot) in out.iter_mut().enumerate() {
      *slot = self.hash_cell(source, start + offset);
    }
  }
}

fn source_of(samples: &Option<ShapeSamples>) -> LatticeSource<'_> {
  match samples {
    Some(samples) => LatticeSource::positions(&samples.positions),
    None => LatticeSource::GridIndex,
  }
}
