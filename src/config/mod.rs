mod plugin;

use bevy::{asset::Asset, prelude::*, reflect::TypePath};
use hash_field::HashFieldSettings;
pub use plugin::ConfigPlugin;
use serde::Deserialize;

#[cfg(not(target_family = "wasm"))]
pub const CONFIG_PATH: &str = "config/hash_viz.config.toml";

#[derive(Asset, TypePath, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct HashVizConfig {
  pub window: WindowConfig,
  pub anchor: AnchorConfig,
  pub field: HashFieldSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WindowConfig {
  pub width: u32,
  pub height: u32,
  pub title: String,
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self {
      width: 1024,
      height: 768,
      title: "Hash Field".to_string(),
    }
  }
}

#[derive(Resource, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct AnchorConfig {
  /// Rotation speed about Z in degrees per second.
  pub spin: f32,
}

#[cfg(not(target_family = "wasm"))]
#[derive(Resource)]
pub struct ConfigHandle(pub Handle<HashVizConfig>);

/// Reads the startup config.
///
/// A missing or malformed file yields the defaults together with the reason,
/// so the app still starts and the reason can be logged once logging is up.
pub fn load_config() -> (HashVizConfig, Option<String>) {
  // WASM: embed config at compile time (no filesystem access)
  #[cfg(target_family = "wasm")]
  let source: Result<String, String> = Ok(include_str!("../../assets/config/hash_viz.config.toml").to_string());
  #[cfg(not(target_family = "wasm"))]
  let source = std::fs::read_to_string(format!("assets/{CONFIG_PATH}"))
    .map_err(|e| format!("failed to read assets/{CONFIG_PATH}: {e}"));

  match source.and_then(|s| toml::from_str(&s).map_err(|e| format!("failed to parse config: {e}"))) {
    Ok(config) => (config, None),
    Err(reason) => (HashVizConfig::default(), Some(reason)),
  }
}

#[cfg(test)]
mod tests {
  use hash_field::SampleMode;

  use super::*;

  #[test]
  fn shipped_config_parses_and_validates() {
    let config: HashVizConfig =
      toml::from_str(include_str!("../../assets/config/hash_viz.config.toml")).unwrap();
    assert_eq!(config.field.mode, SampleMode::Plane);
    assert_eq!(config.field.validate().unwrap().resolution.get(), 32);
    assert_eq!(config.anchor.spin, 0.0);
  }

  #[test]
  fn missing_sections_fall_back_to_defaults() {
    let config: HashVizConfig = toml::from_str("[field]\nseed = 3").unwrap();
    assert_eq!(config.field.seed, 3);
    assert_eq!(config.field.resolution, 16);
    assert_eq!(config.window.width, 1024);
  }
}
