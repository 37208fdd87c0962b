//! Shared view rectangle.
//!
//! The part of the world the renderer shows, in world pixels. The managers
//! compute their visible sets against it once per tick; the same type also
//! describes entity bounding boxes.

use bevy_ecs::prelude::Resource;
use glam::Vec2;

/// Axis-aligned rectangle in world pixels.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `center`.
    pub fn centered_on(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Move so `center` is in the middle, keeping the size.
    pub fn center_on(&mut self, center: Vec2) {
        *self = Self::centered_on(center, self.width, self.height);
    }

    pub fn intersects(&self, other: &ViewRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}
