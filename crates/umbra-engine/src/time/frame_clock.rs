use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per render loop. Delta time is clamped to avoid pathological
/// values when the loop is paused by the debugger, minimized, or stalls.
///
/// Every `report_every` the clock logs the average frame time at debug level.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,

    report_every: Duration,
    window_start: Instant,
    window_frames: u32,
    window_time: Duration,
}

/// Average over one reporting window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameStats {
    pub frames: u32,
    pub avg_frame_ms: f32,
}

impl FrameStats {
    pub fn fps(&self) -> f32 {
        if self.avg_frame_ms > 0.0 { 1000.0 / self.avg_frame_ms } else { 0.0 }
    }
}

impl FrameClock {
    /// Creates a new clock with default clamps (0.1 ms to 250 ms) reporting
    /// every five seconds.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
            report_every: Duration::from_secs(5),
            window_start: now,
            window_frames: 0,
            window_time: Duration::ZERO,
        }
    }

    pub fn with_report_interval(mut self, every: Duration) -> Self {
        self.report_every = every;
        self
    }

    /// Resets the clock baseline.
    ///
    /// Useful after surface reconfigure events or when resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let (ft, stats) = self.tick_at(Instant::now());
        if let Some(stats) = stats {
            log::debug!(
                "avg frame time {:.2} ms ({:.0} fps over {} frames)",
                stats.avg_frame_ms,
                stats.fps(),
                stats.frames
            );
        }
        ft
    }

    /// Advances to `now`. Returns the window average when a report is due.
    pub(crate) fn tick_at(&mut self, now: Instant) -> (FrameTime, Option<FrameStats>) {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);

        self.window_frames += 1;
        self.window_time += dt;
        let stats = (now.saturating_duration_since(self.window_start) >= self.report_every).then(|| {
            let stats = FrameStats {
                frames: self.window_frames,
                avg_frame_ms: self.window_time.as_secs_f32() * 1000.0 / self.window_frames as f32,
            };
            self.window_start = now;
            self.window_frames = 0;
            self.window_time = Duration::ZERO;
            stats
        });

        (ft, stats)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
