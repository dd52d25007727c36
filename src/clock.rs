use std::time::{Duration, Instant};

use log::debug;

/// Wall-clock tracking for the frame loop.
///
/// `update_delta_time` drives gameplay: it reports elapsed seconds since the
/// previous call, zero on the very first call so startup cost does not turn
/// into a giant initial step.  `tick` is independent telemetry: it counts
/// frames and reports an fps figure roughly once per second.
#[derive(Debug)]
pub struct FrameClock {
    last_sample: Option<Instant>,
    delta_seconds: f32,
    frames: u32,
    fps_mark: Instant,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_sample: None,
            delta_seconds: 0.0,
            frames: 0,
            fps_mark: Instant::now(),
            fps: 0.0,
        }
    }

    /// Counts a frame for fps telemetry.  Does not touch the gameplay delta.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Computes elapsed seconds since the previous call, stores it and
    /// returns it.  Returns exactly zero on the first call, and never a
    /// negative value even if the underlying clock misbehaves.
    pub fn update_delta_time(&mut self) -> f32 {
        self.update_delta_at(Instant::now())
    }

    /// Last value computed by [`update_delta_time`](Self::update_delta_time).
    pub fn delta_seconds(&self) -> f32 {
        self.delta_seconds
    }

    /// Most recent once-per-second fps figure.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    fn update_delta_at(&mut self, now: Instant) -> f32 {
        let delta = match self.last_sample {
            // A non-monotonic sample yields None; clamp to zero instead of
            // propagating a negative step.
            Some(previous) => now
                .checked_duration_since(previous)
                .map_or(0.0, |elapsed| elapsed.as_secs_f32()),
            None => 0.0,
        };
        self.last_sample = Some(now);
        self.delta_seconds = delta;
        delta
    }

    fn tick_at(&mut self, now: Instant) {
        self.frames += 1;
        if let Some(elapsed) = now.checked_duration_since(self.fps_mark) {
            if elapsed >= Duration::from_secs(1) {
                self.fps = self.frames as f32 / elapsed.as_secs_f32();
                self.frames = 0;
                self.fps_mark = now;
                debug!("{:.1} fps", self.fps);
            }
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delta_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.update_delta_time(), 0.0);
    }

    #[test]
    fn subsequent_deltas_measure_elapsed_time() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.update_delta_at(start);
        let delta = clock.update_delta_at(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-4);
        assert_eq!(clock.delta_seconds(), delta);
    }

    #[test]
    fn non_monotonic_clock_clamps_to_zero() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.update_delta_at(start + Duration::from_secs(1));
        let delta = clock.update_delta_at(start);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn tick_reports_fps_after_a_second() {
        let mut clock = FrameClock::new();
        let start = clock.fps_mark;
        for i in 1..=60 {
            clock.tick_at(start + Duration::from_millis(i * 20));
        }
        assert!(clock.fps() > 0.0);
    }
}
