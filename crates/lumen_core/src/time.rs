use std::time::{Duration, Instant};

/// Throttles rendering to a fixed frame interval by polling wall-clock time.
pub struct FramePacer {
    interval: Duration,
    last_frame: Option<Instant>,
    delta: Duration,
}

impl FramePacer {
    pub fn new(fps: f32) -> Self {
        Self {
            interval: Duration::from_secs_f32(1.0 / fps.max(1.0)),
            last_frame: None,
            delta: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when a frame is due at `now`; records `now` as the frame start.
    pub fn should_render(&mut self, now: Instant) -> bool {
        match self.last_frame {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            last => {
                self.delta = last.map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
                self.last_frame = Some(now);
                true
            }
        }
    }

    /// Time between the two most recent rendered frames, zero before the second.
    pub fn frame_delta(&self) -> Duration {
        self.delta
    }

    /// When the next frame becomes due, for `ControlFlow::WaitUntil`.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.last_frame.map(|last| last + self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_always_renders() {
        let mut pacer = FramePacer::new(60.0);
        assert!(pacer.should_render(Instant::now()));
    }

    #[test]
    fn frames_inside_interval_are_skipped() {
        let mut pacer = FramePacer::new(60.0);
        let start = Instant::now();
        assert!(pacer.should_render(start));
        assert!(!pacer.should_render(start + Duration::from_millis(5)));
        assert!(pacer.should_render(start + Duration::from_millis(17)));
    }

    #[test]
    fn deadline_follows_last_frame() {
        let mut pacer = FramePacer::new(60.0);
        assert!(pacer.next_deadline().is_none());
        let start = Instant::now();
        pacer.should_render(start);
        assert_eq!(pacer.next_deadline(), Some(start + pacer.interval()));
    }

    #[test]
    fn delta_is_gap_between_rendered_frames() {
        let mut pacer = FramePacer::new(60.0);
        let start = Instant::now();
        pacer.should_render(start);
        assert_eq!(pacer.frame_delta(), Duration::ZERO);

        // Skipped frames leave the delta alone
        pacer.should_render(start + Duration::from_millis(5));
        assert_eq!(pacer.frame_delta(), Duration::ZERO);

        pacer.should_render(start + Duration::from_millis(20));
        assert_eq!(pacer.frame_delta(), Duration::from_millis(20));
    }
}
