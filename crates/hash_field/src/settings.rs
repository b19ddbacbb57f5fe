//! User-facing configuration of a hash field.
//!
//! [`HashFieldSettings`] is what the host deserializes from TOML. It accepts
//! any integer for the resolution so that out-of-range values can be reported
//! instead of failing the whole document; [`HashFieldSettings::validate`] is
//! the acceptance point that turns it into a [`HashFieldConfig`].

use bevy::prelude::*;
use serde::Deserialize;

use crate::buffer::ShaderConfig;
use crate::domain::Domain;
use crate::error::ConfigError;
use crate::field::{HashFieldConfig, Resolution};

/// Where the lattice coordinates of each cell come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
  /// Hash the grid topology. No positions, no domain transform.
  Grid,
  /// Hash positions sampled from a plane under the anchor transform.
  #[default]
  Plane,
}

#[derive(Resource, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HashFieldSettings {
  pub resolution: i64,
  pub seed: u32,
  pub mode: SampleMode,
  pub domain: Domain,
  /// Passed to the rendering stage only.
  pub displacement: f32,
  /// Passed to the rendering stage only.
  pub vertical_offset: f32,
}

impl Default for HashFieldSettings {
  fn default() -> Self {
    Self {
      resolution: 16,
      seed: 0,
      mode: SampleMode::default(),
      domain: Domain::default(),
      displacement: 0.1,
      vertical_offset: 0.0,
    }
  }
}

impl HashFieldSettings {
  pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(source)
  }

  pub fn resolution(&self) -> Result<Resolution, ConfigError> {
    Resolution::try_from(self.resolution)
  }

  /// Validates the settings into a kernel configuration.
  pub fn validate(&self) -> Result<HashFieldConfig, ConfigError> {
    let config = HashFieldConfig::new(self.resolution()?, self.seed);
    Ok(config.with_domain(self.domain.matrix()))
  }

  pub fn shader_config(&self) -> Result<ShaderConfig, ConfigError> {
    Ok(ShaderConfig::new(
      self.resolution()?,
      self.displacement,
      self.vertical_offset,
    ))
  }
}
