//! Benchmarks for the hash accumulator and full field computation.

use bevy::math::Affine3A;
use bevy::tasks::block_on;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hash_field::field::{HashField, HashFieldConfig, ParallelHashField, Resolution, SampleInput};
use hash_field::lattice::LatticeSource;
use hash_field::shape::{Plane, ShapeSamples, generate};
use hash_field::{Domain, SmallXxHash};

const ITERATIONS: i32 = 10_000;
const RESOLUTIONS: [u32; 3] = [64, 256, 512];

fn bench_accumulator(c: &mut Criterion) {
  let mut group = c.benchmark_group("accumulator");
  group.throughput(Throughput::Elements(ITERATIONS as u64));

  group.bench_function("eat_xy", |b| {
    b.iter(|| {
      let seed = SmallXxHash::seed(black_box(7));
      let mut sum = 0u32;
      for i in 0..ITERATIONS {
        sum = sum.wrapping_add(seed.eat(black_box(i)).eat(black_box(i ^ 0x5555)).value());
      }
      sum
    })
  });

  group.bench_function("eat_xyz", |b| {
    b.iter(|| {
      let seed = SmallXxHash::seed(black_box(7));
      let mut sum = 0u32;
      for i in 0..ITERATIONS {
        sum = sum.wrapping_add(seed.eat(black_box(i)).eat(black_box(-i)).eat(black_box(i >> 3)).value());
      }
      sum
    })
  });

  group.finish();
}

fn bench_grid_field(c: &mut Criterion) {
  let mut group = c.benchmark_group("grid_field");
  for r in RESOLUTIONS {
    let Ok(resolution) = Resolution::new(r) else {
      continue;
    };
    let kernel = ParallelHashField::new(HashFieldConfig::new(resolution, 0));
    let mut field = HashField::new(resolution);
    group.throughput(Throughput::Elements(resolution.cells() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(r), &r, |b, _| {
      b.iter(|| kernel.compute(LatticeSource::GridIndex, black_box(&mut field)))
    });
  }
  group.finish();
}

fn bench_position_field(c: &mut Criterion) {
  let mut group = c.benchmark_group("position_field");
  let domain = Domain::default().matrix();
  for r in RESOLUTIONS {
    let Ok(resolution) = Resolution::new(r) else {
      continue;
    };
    let kernel = ParallelHashField::new(HashFieldConfig::new(resolution, 0).with_domain(domain));
    let mut samples = ShapeSamples::default();
    generate(&Plane, resolution, Affine3A::IDENTITY, &mut samples);
    let mut field = HashField::new(resolution);
    group.throughput(Throughput::Elements(resolution.cells() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(r), &r, |b, _| {
      b.iter(|| {
        kernel.compute(
          LatticeSource::positions(&samples.positions),
          black_box(&mut field),
        )
      })
    });
  }
  group.finish();
}

/// Shape task plus the field task awaiting it, as the plugin runs them.
fn bench_scheduled_pipeline(c: &mut Criterion) {
  let mut group = c.benchmark_group("scheduled_pipeline");
  for r in RESOLUTIONS {
    let Ok(resolution) = Resolution::new(r) else {
      continue;
    };
    let kernel = ParallelHashField::new(HashFieldConfig::new(resolution, 0));
    group.throughput(Throughput::Elements(resolution.cells() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(r), &r, |b, _| {
      b.iter(|| {
        let samples = hash_field::schedule_shape(
          Plane,
          resolution,
          Affine3A::IDENTITY,
          ShapeSamples::default(),
        );
        block_on(kernel.schedule(SampleInput::Shape(samples), HashField::new(resolution)))
      })
    });
  }
  group.finish();
}

criterion_group!(
  benches,
  bench_accumulator,
  bench_grid_field,
  bench_position_field,
  bench_scheduled_pipeline
);
criterion_main!(benches);
