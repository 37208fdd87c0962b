//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per tick, applying `time_scale` to the provided delta.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Update elapsed and delta milliseconds on the `WorldTime` resource.
///
/// `dt_ms` is the unscaled tick length. Negative values count as zero.
pub fn update_world_time(world: &mut World, dt_ms: f32) {
    let mut wt = world.resource_mut::<WorldTime>();
    let scaled = dt_ms.max(0.0) * wt.time_scale;
    wt.elapsed_ms += scaled as f64;
    wt.delta_ms = scaled;
    wt.frame_count += 1;
}
