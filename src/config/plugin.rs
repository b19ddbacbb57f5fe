#[cfg(not(target_family = "wasm"))]
use bevy::{asset::AssetEvent, ecs::message::MessageReader};
use bevy::{prelude::*, window::PrimaryWindow};
#[cfg(not(target_family = "wasm"))]
use bevy_common_assets::toml::TomlAssetPlugin;
#[cfg(not(target_family = "wasm"))]
use hash_field::HashFieldSettings;

#[cfg(not(target_family = "wasm"))]
use super::{CONFIG_PATH, ConfigHandle};
use super::{AnchorConfig, HashVizConfig, WindowConfig};

/// Applies the startup config and, on native targets, hot-reloads it.
pub struct ConfigPlugin {
  pub config: HashVizConfig,
  /// Why the startup config fell back to defaults.
  pub load_error: Option<String>,
}

impl ConfigPlugin {
  pub fn load() -> Self {
    let (config, load_error) = super::load_config();
    Self { config, load_error }
  }
}

#[derive(Resource, Clone)]
struct CurrentWindow(WindowConfig);

#[derive(Resource)]
struct StartupLoadError(String);

impl Plugin for ConfigPlugin {
  fn build(&self, app: &mut App) {
    // Native: asset-based config with hot-reload
    #[cfg(not(target_family = "wasm"))]
    app
      .add_plugins(TomlAssetPlugin::<HashVizConfig>::new(&["config.toml"]))
      .add_systems(PreStartup, watch_config_file)
      .add_systems(Update, watch_config_changes);

    app
      .insert_resource(self.config.field.clone())
      .insert_resource(self.config.anchor)
      .insert_resource(CurrentWindow(self.config.window.clone()))
      .add_systems(Update, update_window_on_config_change);

    if let Some(reason) = &self.load_error {
      app
        .insert_resource(StartupLoadError(reason.clone()))
        .add_systems(Startup, report_load_error);
    }
  }
}

fn report_load_error(error: Res<StartupLoadError>) {
  warn!("{}, using default config", error.0);
}

#[cfg(not(target_family = "wasm"))]
fn watch_config_file(mut commands: Commands, asset_server: Res<AssetServer>) {
  let handle: Handle<HashVizConfig> = asset_server.load(CONFIG_PATH);
  commands.insert_resource(ConfigHandle(handle));
}

#[cfg(not(target_family = "wasm"))]
fn watch_config_changes(
  mut commands: Commands,
  config_handle: Res<ConfigHandle>,
  mut messages: MessageReader<AssetEvent<HashVizConfig>>,
  configs: Res<Assets<HashVizConfig>>,
) {
  for event in messages.read() {
    if let AssetEvent::Modified { id } = event {
      if config_handle.0.id() == *id {
        if let Some(config) = configs.get(&config_handle.0) {
          info!("Config reloaded!");
          apply_config(&mut commands, config);
        }
      }
    }
  }
}

/// Replaces the config resources. Field settings are validated by the field
/// plugin, which keeps the previous field when they are rejected.
#[cfg(not(target_family = "wasm"))]
fn apply_config(commands: &mut Commands, config: &HashVizConfig) {
  commands.insert_resource::<HashFieldSettings>(config.field.clone());
  commands.insert_resource::<AnchorConfig>(config.anchor);
  commands.insert_resource(CurrentWindow(config.window.clone()));
}

fn update_window_on_config_change(
  config: Res<CurrentWindow>,
  mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
  if config.is_changed() {
    if let Ok(mut window) = windows.single_mut() {
      window
        .resolution
        .set(config.0.width as f32, config.0.height as f32);
      window.title.clone_from(&config.0.title);
    }
  }
}
