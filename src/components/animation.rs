//! Per-entity sprite animation state.
//!
//! A [`SpriteAnimator`] selects which frame of a [`DecodedSprite`] to show.
//! Sprites store every facing back to back, so the animator keeps a
//! *direction window* `[frame_begin, frame_end]` for the current facing and
//! never lets the frame index leave it.
//!
//! # Playback
//!
//! - By default the animator loops inside the window: every elapsed
//!   `interval` milliseconds the frame steps forward and wraps to
//!   `frame_begin` after `frame_end`.
//! - [`SpriteAnimator::play_frames`] arms a finite request of N steps,
//!   optionally in reverse. The last step clamps at the terminal bound of the
//!   window instead of wrapping, and the request is then finished.
//! - Arming a request while one is in progress does nothing.
//!
//! Leftover time after a finite request completes is discarded, even when a
//! single large delta covered several intervals.

use std::sync::Arc;

use glam::Vec2;

use crate::spritecodec::DecodedSprite;

/// Frame interval used when a sprite declares zero.
const FALLBACK_INTERVAL_MS: f32 = 100.0;

/// Map a movement vector to a facing index in `[0, direction_count)`.
///
/// Index 0 faces down (south) and indices increase clockwise when viewed on
/// screen: with eight facings, 2 is west, 4 north and 6 east. Each axis
/// direction sits in the middle of its bucket, so small float noise never
/// flips the result.
pub fn direction_from_vector(direction: Vec2, direction_count: usize) -> usize {
    if direction == Vec2::ZERO || direction_count < 1 || !direction.is_finite() {
        return 0;
    }
    let v = direction.normalize();
    let mut angle = (v.dot(Vec2::Y).clamp(-1.0, 1.0) as f64).acos();
    if v.x > 0.0 {
        angle = std::f64::consts::TAU - angle;
    }
    let half_sector = std::f64::consts::PI / direction_count as f64;
    let mut region = (angle / half_sector) as usize;
    if region % 2 != 0 {
        region += 1;
    }
    region %= 2 * direction_count;
    region / 2
}

/// Frame selection state for one visual entity.
#[derive(Debug, Clone, Default)]
pub struct SpriteAnimator {
    sprite: Option<Arc<DecodedSprite>>,
    direction: usize,
    frame: usize,
    frame_begin: usize,
    frame_end: usize,
    elapsed_ms: f32,
    frames_left: u32,
    reverse: bool,
}

impl SpriteAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sprite(sprite: Arc<DecodedSprite>) -> Self {
        let mut anim = Self::new();
        anim.set_sprite(Some(sprite));
        anim
    }

    pub fn sprite(&self) -> Option<&Arc<DecodedSprite>> {
        self.sprite.as_ref()
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite.is_some()
    }

    /// Replace the active sprite.
    ///
    /// Resets elapsed time, cancels any finite request, recomputes the window
    /// for the current direction and moves to its first frame.
    pub fn set_sprite(&mut self, sprite: Option<Arc<DecodedSprite>>) {
        self.sprite = sprite;
        self.elapsed_ms = 0.0;
        self.frames_left = 0;
        self.reverse = false;
        self.direction %= self.direction_count();
        self.update_window();
        self.frame = self.frame_begin;
    }

    /// Number of facings of the active sprite, at least one.
    pub fn direction_count(&self) -> usize {
        self.sprite
            .as_ref()
            .map(|s| s.directions() as usize)
            .unwrap_or(1)
            .max(1)
    }

    pub fn frames_per_direction(&self) -> usize {
        self.sprite
            .as_ref()
            .map(|s| s.frames_per_direction())
            .unwrap_or(1)
    }

    pub fn direction(&self) -> usize {
        self.direction
    }

    /// Face `direction`, wrapping around the sprite's facing count.
    ///
    /// The frame goes back to the start of the new window only when the
    /// facing actually changes.
    pub fn set_direction(&mut self, direction: i32) {
        if self.sprite.is_none() {
            // Remembered until a sprite tells how many facings exist.
            self.direction = direction.max(0) as usize;
            return;
        }
        let count = self.direction_count() as i32;
        let wrapped = direction.rem_euclid(count) as usize;
        let changed = wrapped != self.direction;
        self.direction = wrapped;
        self.update_window();
        if changed {
            self.frame = self.frame_begin;
        } else {
            self.frame = self.frame.clamp(self.frame_begin, self.frame_end);
        }
    }

    /// Face along a movement vector.
    pub fn set_direction_from_vector(&mut self, v: Vec2) {
        if v != Vec2::ZERO {
            let dir = direction_from_vector(v, self.direction_count());
            self.set_direction(dir as i32);
        }
    }

    fn update_window(&mut self) {
        let Some(sprite) = self.sprite.as_ref() else {
            self.frame_begin = 0;
            self.frame_end = 0;
            return;
        };
        let per_dir = sprite.frames_per_direction();
        let last = sprite.frame_count().saturating_sub(1);
        // Sprites with fewer frames than facings reuse their last frame.
        self.frame_begin = (self.direction * per_dir).min(last);
        self.frame_end = (self.frame_begin + per_dir - 1).min(last);
    }

    pub fn frame_begin(&self) -> usize {
        self.frame_begin
    }

    pub fn frame_end(&self) -> usize {
        self.frame_end
    }

    pub fn current_frame(&self) -> usize {
        self.frame
    }

    /// Jump to a frame, clamped into the current window.
    pub fn set_current_frame(&mut self, frame: usize) {
        self.frame = frame.clamp(self.frame_begin, self.frame_end);
    }

    /// Frame index relative to the window start.
    pub fn frame_in_direction(&self) -> usize {
        self.frame - self.frame_begin
    }

    /// Frame interval of the active sprite in milliseconds.
    pub fn interval_ms(&self) -> f32 {
        match self.sprite.as_ref().map(|s| s.interval()) {
            Some(0) | None => FALLBACK_INTERVAL_MS,
            Some(i) => i as f32,
        }
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }

    /// A finite request is in progress.
    pub fn is_playing(&self) -> bool {
        self.frames_left > 0
    }

    pub fn frames_left(&self) -> u32 {
        self.frames_left
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Arm a finite request of `count` steps. Returns false (and changes
    /// nothing) when a request is already in progress, `count` is zero or
    /// there is no sprite to play.
    pub fn play_frames(&mut self, count: u32, reverse: bool) -> bool {
        if self.is_playing() || count == 0 || self.sprite.is_none() {
            return false;
        }
        self.frames_left = count;
        self.reverse = reverse;
        true
    }

    /// Play the whole current window once from its first frame.
    pub fn play_current_direction_once(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.frame = self.frame_begin;
        self.play_frames(self.frames_per_direction() as u32, false)
    }

    /// Play the whole current window once backwards from its last frame.
    pub fn play_current_direction_once_reverse(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.frame = self.frame_end;
        self.play_frames(self.frames_per_direction() as u32, true)
    }

    /// Abandon any finite request, keeping the current frame.
    pub fn end_playing(&mut self) {
        self.frames_left = 0;
        self.reverse = false;
    }

    fn step(&mut self, reverse: bool, clamp: bool) {
        if reverse {
            if self.frame <= self.frame_begin {
                self.frame = if clamp { self.frame_begin } else { self.frame_end };
            } else {
                self.frame -= 1;
            }
        } else if self.frame >= self.frame_end {
            self.frame = if clamp { self.frame_end } else { self.frame_begin };
        } else {
            self.frame += 1;
        }
    }

    /// Accumulate `delta_ms * speed` and step frames for every whole interval.
    ///
    /// Returns whether the frame index moved. Without a sprite nothing
    /// happens.
    pub fn advance(&mut self, delta_ms: f32, speed: f32) -> bool {
        if self.sprite.is_none() || delta_ms <= 0.0 || speed <= 0.0 {
            return false;
        }
        self.elapsed_ms += delta_ms * speed;
        let interval = self.interval_ms();
        let start = self.frame;
        while self.elapsed_ms >= interval {
            self.elapsed_ms -= interval;
            match self.frames_left {
                0 => self.step(false, false),
                1 => {
                    self.step(self.reverse, true);
                    self.end_playing();
                    self.elapsed_ms = 0.0;
                    break;
                }
                _ => {
                    self.frames_left -= 1;
                    self.step(self.reverse, false);
                }
            }
        }
        self.frame != start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spritecodec::decode_sprite;
    use crate::spritecodec::tests::{build_sprite, simple_body};

    fn sprite(frames: usize, directions: i32, interval: i32) -> Arc<DecodedSprite> {
        let bodies: Vec<_> = (0..frames).map(|_| simple_body(0)).collect();
        let data = build_sprite(2, 1, directions, interval, &[[0, 0, 0]], &bodies);
        Arc::new(decode_sprite(&data).unwrap())
    }

    #[test]
    fn axis_vectors_map_to_distinct_facings() {
        for count in [4usize, 8, 16] {
            let down = direction_from_vector(Vec2::new(0.0, 1.0), count);
            let left = direction_from_vector(Vec2::new(-1.0, 0.0), count);
            let up = direction_from_vector(Vec2::new(0.0, -1.0), count);
            let right = direction_from_vector(Vec2::new(1.0, 0.0), count);
            assert_eq!(down, 0);
            assert_eq!(left, count / 4);
            assert_eq!(up, count / 2);
            assert_eq!(right, 3 * count / 4);
        }
    }

    #[test]
    fn diagonals_with_eight_facings() {
        assert_eq!(direction_from_vector(Vec2::new(-1.0, 1.0), 8), 1);
        assert_eq!(direction_from_vector(Vec2::new(-1.0, -1.0), 8), 3);
        assert_eq!(direction_from_vector(Vec2::new(1.0, -1.0), 8), 5);
        assert_eq!(direction_from_vector(Vec2::new(1.0, 1.0), 8), 7);
    }

    #[test]
    fn bucket_is_stable_under_perturbation() {
        for eps in [1e-6f32, -1e-6, 1e-3, -1e-3] {
            assert_eq!(direction_from_vector(Vec2::new(eps, 1.0), 8), 0);
            assert_eq!(direction_from_vector(Vec2::new(-1.0, eps), 8), 2);
            assert_eq!(direction_from_vector(Vec2::new(eps, -1.0), 8), 4);
            assert_eq!(direction_from_vector(Vec2::new(1.0, eps), 8), 6);
        }
    }

    #[test]
    fn zero_vector_faces_south() {
        assert_eq!(direction_from_vector(Vec2::ZERO, 8), 0);
    }

    #[test]
    fn direction_window_and_wrap() {
        let mut anim = SpriteAnimator::with_sprite(sprite(16, 8, 100));
        anim.set_direction(3);
        assert_eq!((anim.frame_begin(), anim.frame_end()), (6, 7));
        assert_eq!(anim.current_frame(), 6);
        anim.set_direction(-1);
        assert_eq!(anim.direction(), 7);
        assert_eq!((anim.frame_begin(), anim.frame_end()), (14, 15));
        anim.set_direction(9);
        assert_eq!(anim.direction(), 1);
    }

    #[test]
    fn same_direction_keeps_frame() {
        let mut anim = SpriteAnimator::with_sprite(sprite(16, 4, 100));
        anim.set_direction(1);
        anim.advance(100.0, 1.0);
        assert_eq!(anim.current_frame(), 5);
        anim.set_direction(1);
        assert_eq!(anim.current_frame(), 5);
        anim.set_direction(2);
        assert_eq!(anim.current_frame(), 8);
    }

    #[test]
    fn looping_returns_to_begin_after_window_size_steps() {
        let mut anim = SpriteAnimator::with_sprite(sprite(12, 4, 50));
        anim.set_direction(2);
        let (begin, end) = (anim.frame_begin(), anim.frame_end());
        for _ in 0..3 {
            anim.advance(50.0, 1.0);
            assert!((begin..=end).contains(&anim.current_frame()));
        }
        assert_eq!(anim.current_frame(), begin);
    }

    #[test]
    fn speed_multiplier_scales_time() {
        let mut anim = SpriteAnimator::with_sprite(sprite(4, 1, 100));
        assert!(!anim.advance(60.0, 1.0));
        assert!(anim.advance(20.0, 2.0));
        assert_eq!(anim.current_frame(), 1);
    }

    #[test]
    fn play_once_halts_at_end() {
        let mut anim = SpriteAnimator::with_sprite(sprite(8, 2, 100));
        anim.set_direction(1);
        assert!(anim.play_current_direction_once());
        for _ in 0..10 {
            anim.advance(100.0, 1.0);
        }
        // Finished: the request was consumed and the frame held at the end
        // until a later advance resumes looping.
        assert!(!anim.is_playing());

        let mut anim = SpriteAnimator::with_sprite(sprite(8, 2, 100));
        anim.set_direction(1);
        anim.play_current_direction_once();
        for _ in 0..4 {
            anim.advance(100.0, 1.0);
        }
        assert_eq!(anim.current_frame(), anim.frame_end());
        assert!(!anim.is_playing());
    }

    #[test]
    fn play_once_with_large_delta_clamps() {
        let mut anim = SpriteAnimator::with_sprite(sprite(4, 1, 10));
        anim.play_frames(2, false);
        anim.advance(1000.0, 1.0);
        assert_eq!(anim.current_frame(), 2);
        assert!(!anim.is_playing());
        assert_eq!(anim.elapsed_ms(), 0.0);
    }

    #[test]
    fn reverse_play_clamps_at_begin() {
        let mut anim = SpriteAnimator::with_sprite(sprite(6, 1, 10));
        anim.set_current_frame(2);
        anim.play_frames(3, true);
        for _ in 0..3 {
            anim.advance(10.0, 1.0);
        }
        assert_eq!(anim.current_frame(), 0);
        assert!(!anim.is_playing());
    }

    #[test]
    fn replay_while_playing_is_noop() {
        let mut anim = SpriteAnimator::with_sprite(sprite(6, 1, 10));
        assert!(anim.play_frames(5, false));
        anim.advance(10.0, 1.0);
        assert!(!anim.play_frames(2, true));
        assert_eq!(anim.frames_left(), 4);
        assert!(!anim.is_reverse());
    }

    #[test]
    fn no_sprite_is_inert() {
        let mut anim = SpriteAnimator::new();
        assert!(!anim.advance(1000.0, 1.0));
        anim.set_direction(5);
        assert_eq!(anim.current_frame(), 0);
        // The facing survives until a sprite arrives, then wraps.
        assert_eq!(anim.direction(), 5);
        anim.set_sprite(Some(sprite(8, 4, 10)));
        assert_eq!(anim.direction(), 1);
        assert_eq!(anim.current_frame(), 2);
    }

    #[test]
    fn fewer_frames_than_directions_stays_in_bounds() {
        let mut anim = SpriteAnimator::with_sprite(sprite(3, 8, 10));
        anim.set_direction(6);
        assert!(anim.current_frame() < 3);
        anim.advance(100.0, 1.0);
        assert!(anim.current_frame() < 3);
    }
}
