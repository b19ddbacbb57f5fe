//! Bevy texture creation and upload for hash fields.
//!
//! Two textures per field: the raw hashes as `R32Uint` for shaders that read
//! them with `textureLoad`, and an sRGB colour preview for display. Both are
//! `resolution × resolution` and follow the field when its resolution changes.

use bevy::asset::RenderAssetUsages;
use bevy::image::ImageSampler;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::buffer::{HASH_STRIDE, StagingBuffers, hash_color};
use crate::field::{HashField, Resolution};

fn extent(resolution: Resolution) -> Extent3d {
  Extent3d {
    width: resolution.get(),
    height: resolution.get(),
    depth_or_array_layers: 1,
  }
}

/// Creates a texture holding one raw hash per texel.
pub fn create_hash_texture(images: &mut Assets<Image>, resolution: Resolution) -> Handle<Image> {
  let mut image = Image::new_fill(
    extent(resolution),
    TextureDimension::D2,
    &[0; HASH_STRIDE],
    TextureFormat::R32Uint,
    RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
  );

  // Integer texture, read with textureLoad
  image.sampler = ImageSampler::nearest();

  images.add(image)
}

/// Creates an RGBA8 preview texture with nearest-neighbor sampling.
pub fn create_preview_texture(images: &mut Assets<Image>, resolution: Resolution) -> Handle<Image> {
  let mut image = Image::new_fill(
    extent(resolution),
    TextureDimension::D2,
    &[0, 0, 0, 255],
    TextureFormat::Rgba8UnormSrgb,
    RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
  );

  image.sampler = ImageSampler::nearest();

  images.add(image)
}

/// Resizes `image` to `resolution × resolution` if it has other dimensions.
fn fit(image: &mut Image, resolution: Resolution) {
  let size = extent(resolution);
  if image.texture_descriptor.size != size {
    debug!(
      "resizing field texture {}x{} -> {}x{}",
      image.texture_descriptor.size.width, image.texture_descriptor.size.height, size.width, size.height
    );
    image.resize(size);
  }
}

/// Copies staged hash bytes into a hash texture.
pub fn upload_hashes(staging: &StagingBuffers, resolution: Resolution, image: &mut Image) {
  fit(image, resolution);
  let bytes = staging.hashes();
  if let Some(ref mut data) = image.data {
    if data.len() == bytes.len() {
      data.copy_from_slice(bytes);
    } else {
      warn!(
        "hash upload skipped: texture holds {} bytes, field has {}",
        data.len(),
        bytes.len()
      );
    }
  }
}

/// Writes the colour preview of `field` into a preview texture.
///
/// Texture rows run top to bottom, field rows bottom to top, so rows are
/// flipped to keep `v = 0` at the bottom of the sprite.
pub fn upload_preview(field: &HashField, image: &mut Image) {
  let resolution = field.resolution();
  fit(image, resolution);
  let row_bytes = resolution.get() as usize * 4;
  if let Some(ref mut data) = image.data {
    for (row, out) in field.rows().rev().zip(data.chunks_exact_mut(row_bytes)) {
      for (hash, texel) in row.iter().zip(out.chunks_exact_mut(4)) {
        texel.copy_from_slice(&hash_color(*hash));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::buffer::FieldBuffer;
  use crate::field::{HashFieldConfig, ParallelHashField};
  use crate::lattice::LatticeSource;

  fn computed(resolution: Resolution) -> HashField {
    let kernel = ParallelHashField::new(HashFieldConfig::new(resolution, 9));
    let mut field = HashField::new(resolution);
    kernel.compute(LatticeSource::GridIndex, &mut field).unwrap();
    field
  }

  #[test]
  fn hash_texture_receives_field_bytes() {
    let resolution = Resolution::new(4).unwrap();
    let field = computed(resolution);
    let mut staging = StagingBuffers::default();
    staging.upload_hashes(field.as_slice());

    let mut images = Assets::<Image>::default();
    let handle = create_hash_texture(&mut images, resolution);
    let image = images.get_mut(&handle).unwrap();
    upload_hashes(&staging, resolution, image);

    assert_eq!(image.data.as_deref(), Some(staging.hashes()));
  }

  #[test]
  fn preview_flips_rows_and_follows_resolution() {
    let small = Resolution::new(2).unwrap();
    let resolution = Resolution::new(3).unwrap();
    let field = computed(resolution);

    let mut images = Assets::<Image>::default();
    let handle = create_preview_texture(&mut images, small);
    let image = images.get_mut(&handle).unwrap();
    upload_preview(&field, image);

    assert_eq!(image.texture_descriptor.size.width, 3);
    let data = image.data.as_ref().unwrap();
    assert_eq!(data.len(), 9 * 4);
    // Top-left texel is cell (0, 2).
    assert_eq!(&data[0..4], &hash_color(field.get(0, 2).unwrap()));
    // Bottom-right texel is cell (2, 0).
    assert_eq!(&data[32..36], &hash_color(field.get(2, 0).unwrap()));
  }
}
