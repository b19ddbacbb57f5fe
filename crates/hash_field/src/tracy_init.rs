//! Tracy profiler initialization.

use tracing_subscriber::prelude::*;
use tracing_tracy::TracyLayer;

/// Routes `tracing` spans from the field jobs and systems to Tracy.
///
/// Call once from `main()` before `App::run()`.
pub fn init_tracy() {
  tracing_subscriber::registry()
    .with(TracyLayer::default())
    .init();
}
