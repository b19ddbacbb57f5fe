//! E2E test for the hash field plugin in a headless app.
//!
//! Run: cargo test -p hash_field --test plugin_e2e

use bevy::prelude::*;
use hash_field::{
  ConfigError, HashFieldAnchor, HashFieldPlugin, HashFieldSettings, HashFieldState, SampleMode,
  hash_color,
};

const CONFIG: &str = r#"
resolution = 8
seed = 1234
mode = "grid"
displacement = 0.25
vertical_offset = -1.0

[domain]
scale = [4.0, 4.0, 4.0]
rotation = [0.0, 45.0, 0.0]
translation = [0.0, 0.0, 0.0]
"#;

fn app_with(settings: HashFieldSettings) -> App {
  let mut app = App::new();
  app.add_plugins(MinimalPlugins);
  app.add_plugins(bevy::transform::TransformPlugin);
  app.add_plugins(bevy::asset::AssetPlugin::default());
  app.add_plugins(bevy::image::ImagePlugin::default());
  app.add_plugins(HashFieldPlugin::new(settings).without_preview());
  app
}

fn state(app: &App) -> &HashFieldState {
  app.world().resource::<HashFieldState>()
}

#[test]
fn config_document_parses_and_validates() {
  let settings = HashFieldSettings::from_toml_str(CONFIG).unwrap();
  assert_eq!(settings.mode, SampleMode::Grid);
  assert_eq!(settings.domain.rotation, [0.0, 45.0, 0.0]);
  let config = settings.validate().unwrap();
  assert_eq!(config.resolution.get(), 8);
  assert_eq!(config.seed, 1234);

  let shader = settings.shader_config().unwrap();
  assert_eq!(shader.as_vec4(), Vec4::new(8.0, 0.125, 0.25, -1.0));
}

#[test]
fn first_update_computes_and_uploads() {
  let mut app = app_with(HashFieldSettings::from_toml_str(CONFIG).unwrap());
  app.update();

  let state = state(&app);
  let field = state.field().expect("field computed on first update");
  assert_eq!(field.len(), 64);
  assert_eq!(state.staging().hash_count(), 64);

  let images = app.world().resource::<Assets<Image>>();
  let hashes = images.get(state.hash_texture()).unwrap();
  assert_eq!(hashes.data.as_deref(), Some(state.staging().hashes()));

  let preview = images.get(state.preview_texture()).unwrap();
  let data = preview.data.as_ref().unwrap();
  // Bottom-left texel of the sprite is cell (0, 0).
  let bottom_left = 7 * 8 * 4;
  assert_eq!(
    &data[bottom_left..bottom_left + 4],
    &hash_color(field.get(0, 0).unwrap())
  );
}

#[test]
fn rejected_settings_keep_the_previous_field() {
  let mut app = app_with(HashFieldSettings::from_toml_str(CONFIG).unwrap());
  app.update();
  let before = state(&app).field().cloned();

  {
    let mut settings = app.world_mut().resource_mut::<HashFieldSettings>();
    settings.resolution = 1024;
    assert_eq!(
      settings.validate(),
      Err(ConfigError::ResolutionOutOfRange { resolution: 1024 })
    );
  }
  app.update();
  assert_eq!(state(&app).field().cloned(), before);

  app.world_mut().resource_mut::<HashFieldSettings>().resolution = 5;
  app.update();
  assert_eq!(state(&app).field().map(|f| f.len()), Some(25));
}

#[test]
fn moving_the_anchor_refreshes_plane_mode() {
  let settings = HashFieldSettings {
    resolution: 8,
    mode: SampleMode::Plane,
    ..Default::default()
  };
  let mut app = app_with(settings);
  let anchor = app
    .world_mut()
    .spawn((Transform::default(), HashFieldAnchor))
    .id();
  app.update();
  app.update();
  let before = state(&app).field().cloned();
  assert_eq!(state(&app).samples().len(), 64);

  app
    .world_mut()
    .entity_mut(anchor)
    .get_mut::<Transform>()
    .unwrap()
    .translation
    .x = 0.125;
  // Transforms propagate after Update, so the refresh sees the move one
  // frame later.
  app.update();
  app.update();

  let inputs = state(&app).last_inputs().copied().unwrap();
  assert_eq!(inputs.world.translation.x, 0.125);
  assert_ne!(state(&app).field().cloned(), before);
}

#[test]
fn shader_config_tracks_passthrough_values() {
  let mut app = app_with(HashFieldSettings::default());
  app.update();
  assert_eq!(
    state(&app).shader_config().map(|c| c.displacement),
    Some(0.1)
  );

  app
    .world_mut()
    .resource_mut::<HashFieldSettings>()
    .displacement = 0.5;
  app.update();
  assert_eq!(
    state(&app).shader_config().map(|c| c.displacement),
    Some(0.5)
  );
}
