mod config;

use bevy::{
  prelude::*,
  window::{PresentMode, WindowResolution},
};
use hash_field::{HashFieldAnchor, HashFieldPlugin};

use crate::config::{AnchorConfig, ConfigPlugin};

fn main() {
  #[cfg(feature = "tracy")]
  hash_field::init_tracy();

  let config_plugin = ConfigPlugin::load();
  let window = config_plugin.config.window.clone();
  let field_plugin = HashFieldPlugin::new(config_plugin.config.field.clone());

  App::new()
    .add_plugins(
      DefaultPlugins
        .set(ImagePlugin::default_nearest())
        .set(WindowPlugin {
          primary_window: Some(Window {
            resolution: WindowResolution::new(window.width, window.height),
            title: window.title,
            present_mode: PresentMode::Fifo,
            #[cfg(target_family = "wasm")]
            canvas: Some("#bevy".to_string()),
            #[cfg(target_family = "wasm")]
            fit_canvas_to_parent: true,
            ..default()
          }),
          ..default()
        }),
    )
    .add_plugins(config_plugin)
    .add_plugins(field_plugin)
    .add_systems(Startup, spawn_scene)
    .add_systems(Update, spin_anchor)
    .run();
}

fn spawn_scene(mut commands: Commands) {
  commands.spawn(Camera2d);
  commands.spawn((Transform::default(), HashFieldAnchor));
}

/// Turns the anchor so plane mode has a changing transform to follow.
fn spin_anchor(
  time: Res<Time>,
  anchor: Res<AnchorConfig>,
  mut anchors: Query<&mut Transform, With<HashFieldAnchor>>,
) {
  if anchor.spin == 0.0 {
    return;
  }
  let angle = anchor.spin.to_radians() * time.delta_secs();
  for mut transform in &mut anchors {
    transform.rotate_z(angle);
  }
}
