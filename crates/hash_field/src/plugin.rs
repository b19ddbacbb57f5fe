//! Bevy integration: recompute the hash field when its inputs change.
//!
//! [`HashFieldPlugin`] owns one persistent field. Every frame the refresh
//! system builds a [`FieldInputs`] from the current settings and the
//! [`HashFieldAnchor`] transform and compares it with the inputs of the last
//! computation. Only a difference triggers a new computation, which is then
//! copied into the hash and preview textures.
//!
//! Settings that fail validation are reported once when they change and the
//! previous field stays on screen.

use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::tasks::block_on;
// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

use crate::buffer::{FieldBuffer, ShaderConfig, StagingBuffers};
use crate::domain::DomainTransform;
use crate::error::FieldError;
use crate::field::{
  FieldFailure, FieldFrame, HashField, HashFieldConfig, ParallelHashField, Resolution, SampleInput,
};
use crate::render::{create_hash_texture, create_preview_texture, upload_hashes, upload_preview};
use crate::settings::{HashFieldSettings, SampleMode};
use crate::shape::{Plane, ShapeSamples, schedule_shape};

/// Side length of the preview sprite in world units.
pub const PREVIEW_EXTENT: f32 = 512.0;

/// Plugin computing and displaying a hash field.
///
/// `settings` is inserted as the initial [`HashFieldSettings`] resource. The
/// host may replace the resource at any time, e.g. on config reload.
pub struct HashFieldPlugin {
  pub settings: HashFieldSettings,
  /// Spawn a sprite showing the field colours.
  pub preview: bool,
}

impl Default for HashFieldPlugin {
  fn default() -> Self {
    Self {
      settings: HashFieldSettings::default(),
      preview: true,
    }
  }
}

impl HashFieldPlugin {
  pub fn new(settings: HashFieldSettings) -> Self {
    Self {
      settings,
      ..Default::default()
    }
  }

  pub fn without_preview(mut self) -> Self {
    self.preview = false;
    self
  }
}

impl Plugin for HashFieldPlugin {
  fn build(&self, app: &mut App) {
    if !app.world().contains_resource::<HashFieldSettings>() {
      app.insert_resource(self.settings.clone());
    }
    app
      .init_resource::<HashFieldState>()
      .add_systems(Startup, setup_field_textures)
      .add_systems(Update, refresh_hash_field);

    if self.preview {
      app.add_systems(Startup, spawn_preview.after(setup_field_textures));
    }
  }
}

/// Marks the entity whose transform places the sampled plane.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct HashFieldAnchor;

/// Marks the preview sprite.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct HashFieldPreview;

/// Everything that determines the computed field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldInputs {
  pub config: HashFieldConfig,
  pub mode: SampleMode,
  /// Anchor transform. Only affects [`SampleMode::Plane`].
  pub world: Affine3A,
}

impl FieldInputs {
  /// Grid mode reads neither the domain nor the anchor transform, so both
  /// are reset to identity and cannot trigger a refresh.
  pub fn new(mut config: HashFieldConfig, mode: SampleMode, mut world: Affine3A) -> Self {
    if mode == SampleMode::Grid {
      config.domain = DomainTransform::IDENTITY;
      world = Affine3A::IDENTITY;
    }
    Self {
      config,
      mode,
      world,
    }
  }
}

/// Persistent field storage and the inputs it was computed from.
#[derive(Resource, Default)]
pub struct HashFieldState {
  last_inputs: Option<FieldInputs>,
  field: Option<HashField>,
  samples: ShapeSamples,
  /// Allocation the next plane-mode computation samples into.
  spare_samples: ShapeSamples,
  staging: StagingBuffers,
  shader: Option<ShaderConfig>,
  hash_texture: Handle<Image>,
  preview_texture: Handle<Image>,
}

impl HashFieldState {
  /// True when `inputs` differ from those of the last computation.
  pub fn needs_refresh(&self, inputs: &FieldInputs) -> bool {
    self.last_inputs.as_ref() != Some(inputs)
  }

  /// Recomputes the field for `inputs` if they changed.
  ///
  /// Blocks until the field, and in plane mode the samples it depends on,
  /// are complete. Returns whether a computation ran. On error the previous
  /// field and samples stay.
  pub fn refresh(&mut self, inputs: FieldInputs) -> Result<bool, FieldError> {
    if !self.needs_refresh(&inputs) {
      return Ok(false);
    }

    let resolution = inputs.config.resolution;
    let field = self
      .field
      .take()
      .unwrap_or_else(|| HashField::new(resolution));
    let input = match inputs.mode {
      SampleMode::Grid => SampleInput::Grid,
      SampleMode::Plane => SampleInput::Shape(schedule_shape(
        Plane,
        resolution,
        inputs.world,
        std::mem::take(&mut self.spare_samples),
      )),
    };

    let result = block_on(ParallelHashField::new(inputs.config).schedule(input, field));
    self.apply(inputs, result).map(|()| true)
  }

  /// Stores a finished computation, or puts the buffers back on failure.
  fn apply(&mut self, inputs: FieldInputs, result: Result<FieldFrame, FieldFailure>) -> Result<(), FieldError> {
    let frame = match result {
      Ok(frame) => frame,
      Err(FieldFailure { error, frame }) => {
        self.field = Some(frame.field);
        if let Some(samples) = frame.samples {
          self.spare_samples = samples;
        }
        return Err(error);
      }
    };

    self.staging.upload_frame(&frame);
    match frame.samples {
      Some(samples) => self.spare_samples = std::mem::replace(&mut self.samples, samples),
      None => self.staging.clear_samples(),
    }
    self.field = Some(frame.field);
    self.last_inputs = Some(inputs);
    Ok(())
  }

  pub fn field(&self) -> Option<&HashField> {
    self.field.as_ref()
  }

  /// Samples of the last plane-mode computation.
  pub fn samples(&self) -> &ShapeSamples {
    &self.samples
  }

  pub fn staging(&self) -> &StagingBuffers {
    &self.staging
  }

  pub fn last_inputs(&self) -> Option<&FieldInputs> {
    self.last_inputs.as_ref()
  }

  pub fn shader_config(&self) -> Option<ShaderConfig> {
    self.shader
  }

  pub fn hash_texture(&self) -> &Handle<Image> {
    &self.hash_texture
  }

  pub fn preview_texture(&self) -> &Handle<Image> {
    &self.preview_texture
  }
}

fn setup_field_textures(
  settings: Res<HashFieldSettings>,
  mut state: ResMut<HashFieldState>,
  mut images: ResMut<Assets<Image>>,
) {
  let resolution = settings.resolution().unwrap_or(Resolution::MIN);
  state.hash_texture = create_hash_texture(&mut images, resolution);
  state.preview_texture = create_preview_texture(&mut images, resolution);
}

fn spawn_preview(mut commands: Commands, state: Res<HashFieldState>) {
  commands.spawn((
    Sprite {
      image: state.preview_texture.clone(),
      custom_size: Some(Vec2::splat(PREVIEW_EXTENT)),
      ..default()
    },
    HashFieldPreview,
  ));
}

#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
fn refresh_hash_field(
  settings: Res<HashFieldSettings>,
  mut state: ResMut<HashFieldState>,
  anchors: Query<&GlobalTransform, With<HashFieldAnchor>>,
  mut images: ResMut<Assets<Image>>,
) {
  let config = match settings.validate() {
    Ok(config) => config,
    Err(err) => {
      if settings.is_changed() {
        warn!("hash field settings rejected, keeping previous field: {err}");
      }
      return;
    }
  };

  if settings.is_changed() {
    state.shader = Some(ShaderConfig::new(
      config.resolution,
      settings.displacement,
      settings.vertical_offset,
    ));
  }

  let world = anchors
    .single()
    .map(GlobalTransform::affine)
    .unwrap_or(Affine3A::IDENTITY);
  let inputs = FieldInputs::new(config, settings.mode, world);
  if !state.needs_refresh(&inputs) {
    return;
  }

  let start = Instant::now();
  let state = &mut *state;
  if let Err(err) = state.refresh(inputs) {
    warn!("hash field computation failed: {err}");
    return;
  }

  let Some(field) = state.field.as_ref() else {
    return;
  };
  if let Some(image) = images.get_mut(&state.hash_texture) {
    upload_hashes(&state.staging, field.resolution(), image);
  }
  if let Some(image) = images.get_mut(&state.preview_texture) {
    upload_preview(field, image);
  }

  debug!(
    "hash field refreshed: resolution={} mode={:?} in {:.2}ms",
    config.resolution.get(),
    settings.mode,
    start.elapsed().as_secs_f32() * 1000.0
  );
}

#[cfg(test)]
mod tests {
  use bevy::math::{Quat, Vec3};

  use super::*;

  fn inputs(resolution: u32, seed: u32, mode: SampleMode) -> FieldInputs {
    let config = HashFieldConfig::new(Resolution::new(resolution).unwrap(), seed);
    FieldInputs::new(config, mode, Affine3A::IDENTITY)
  }

  #[test]
  fn unchanged_inputs_do_not_recompute() {
    let mut state = HashFieldState::default();
    let grid = inputs(4, 1, SampleMode::Grid);
    assert!(state.refresh(grid).unwrap());
    assert!(!state.refresh(grid).unwrap());
  }

  #[test]
  fn every_input_is_part_of_the_predicate() {
    let mut state = HashFieldState::default();
    let base = inputs(4, 1, SampleMode::Plane);
    state.refresh(base).unwrap();

    assert!(state.needs_refresh(&inputs(5, 1, SampleMode::Plane)));
    assert!(state.needs_refresh(&inputs(4, 2, SampleMode::Plane)));
    assert!(state.needs_refresh(&inputs(4, 1, SampleMode::Grid)));

    let mut moved = base;
    moved.world = Affine3A::from_rotation_translation(Quat::IDENTITY, Vec3::X);
    assert!(state.needs_refresh(&moved));
  }

  #[test]
  fn resolution_change_resizes_persistent_buffers() {
    let mut state = HashFieldState::default();
    state.refresh(inputs(8, 0, SampleMode::Plane)).unwrap();
    assert_eq!(state.samples().len(), 64);

    state.refresh(inputs(3, 0, SampleMode::Plane)).unwrap();
    assert_eq!(state.field().map(HashField::len), Some(9));
    assert_eq!(state.samples().len(), 9);
    assert_eq!(state.staging().hash_count(), 9);
    assert_eq!(state.staging().sample_count(), 9);
  }

  #[test]
  fn grid_mode_ignores_anchor_and_domain() {
    let mut state = HashFieldState::default();
    state.refresh(inputs(4, 0, SampleMode::Grid)).unwrap();

    let config = HashFieldConfig::new(Resolution::new(4).unwrap(), 0)
      .with_domain(crate::domain::Domain::uniform(3.0).matrix());
    let spun = Affine3A::from_rotation_z(0.5);
    assert!(!state.needs_refresh(&FieldInputs::new(config, SampleMode::Grid, spun)));
    assert!(state.needs_refresh(&FieldInputs::new(config, SampleMode::Plane, spun)));
  }

  #[test]
  fn failed_computation_keeps_previous_field_and_samples() {
    let mut state = HashFieldState::default();
    let plane = inputs(2, 5, SampleMode::Plane);
    state.refresh(plane).unwrap();
    let field = state.field().cloned();
    let samples = state.samples().clone();

    let resolution = Resolution::new(3).unwrap();
    let failure = FieldFailure {
      error: FieldError::PositionCount {
        expected: 9,
        actual: 4,
      },
      frame: FieldFrame {
        field: state.field.take().unwrap(),
        samples: Some(ShapeSamples::new(resolution)),
      },
    };
    let result = state.apply(inputs(3, 5, SampleMode::Plane), Err(failure));

    assert!(result.is_err());
    assert_eq!(state.field().cloned(), field);
    assert_eq!(state.samples(), &samples);
    assert_eq!(state.last_inputs(), Some(&plane));
    assert_eq!(state.staging().hash_count(), 4);
  }

  #[test]
  fn grid_mode_drops_staged_samples() {
    let mut state = HashFieldState::default();
    state.refresh(inputs(4, 0, SampleMode::Plane)).unwrap();
    state.refresh(inputs(4, 0, SampleMode::Grid)).unwrap();
    assert_eq!(state.staging().sample_count(), 0);
    assert_eq!(state.staging().hash_count(), 16);
  }
}
