use bevy_ecs::prelude::Resource;

/// Simulation clock. All values are milliseconds.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct WorldTime {
    pub elapsed_ms: f64,
    pub delta_ms: f32,
    pub time_scale: f32,
    /// Ticks run so far.
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed_ms: 0.0,
            delta_ms: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}
