//! Frame statistics and the debug readout

use std::collections::VecDeque;
use std::time::Duration;

use crate::renderer::FrameReport;

/// Frame times kept for the rolling averages
pub const FRAME_TIME_WINDOW: usize = 120;

/// Rolling frame-time statistics
#[derive(Debug)]
pub struct FrameStats {
    frame_times: VecDeque<Duration>,
    fps: f32,
    avg_frame_time_ms: f32,
    min_frame_time_ms: f32,
    max_frame_time_ms: f32,
    total_frames: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(FRAME_TIME_WINDOW),
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
        }
    }

    pub fn record_frame(&mut self, delta: Duration) {
        self.total_frames += 1;
        if self.frame_times.len() >= FRAME_TIME_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta);

        let total: Duration = self.frame_times.iter().sum();
        let min = self.frame_times.iter().min().copied().unwrap_or_default();
        let max = self.frame_times.iter().max().copied().unwrap_or_default();

        let count = self.frame_times.len() as f32;
        let total_secs = total.as_secs_f32();
        if total_secs > 0.0 {
            self.avg_frame_time_ms = total_secs / count * 1000.0;
            self.fps = count / total_secs;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }
        self.min_frame_time_ms = min.as_secs_f32() * 1000.0;
        self.max_frame_time_ms = max.as_secs_f32() * 1000.0;
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    pub fn min_frame_time_ms(&self) -> f32 {
        self.min_frame_time_ms
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn format_stats(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2})",
            self.fps, self.avg_frame_time_ms, self.min_frame_time_ms, self.max_frame_time_ms
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame timing plus the driver's report for the last frame
#[derive(Debug, Default)]
pub struct DebugInfo {
    /// Show the readout in the window title
    pub enabled: bool,
    pub frame_stats: FrameStats,
    last_report: FrameReport,
    /// Frames dropped for swapchain recreation
    skipped_frames: u64,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn record_frame(&mut self, delta: Duration) {
        self.frame_stats.record_frame(delta);
    }

    pub fn record_report(&mut self, report: FrameReport) {
        if report.skipped {
            self.skipped_frames += 1;
        }
        self.last_report = report;
    }

    pub fn last_report(&self) -> &FrameReport {
        &self.last_report
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// One-line summary
    pub fn summary(&self, entities: usize) -> String {
        let report = &self.last_report;
        format!(
            "{} | draws: {} | instances: {} | uploads: {} | entities: {}",
            self.frame_stats.format_stats(),
            report.draw_calls,
            report.instances,
            report.uploads,
            entities
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window() {
        let mut stats = FrameStats::new();
        for _ in 0..FRAME_TIME_WINDOW + 10 {
            stats.record_frame(Duration::from_millis(10));
        }
        assert_eq!(stats.total_frames(), FRAME_TIME_WINDOW as u64 + 10);
        assert!((stats.fps() - 100.0).abs() < 0.5);
        assert!((stats.avg_frame_time_ms() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_min_max() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_millis(5));
        stats.record_frame(Duration::from_millis(20));
        assert!((stats.min_frame_time_ms() - 5.0).abs() < 0.01);
        assert!((stats.max_frame_time_ms() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_skipped_frames_counted() {
        let mut debug = DebugInfo::new();
        debug.record_report(FrameReport {
            skipped: true,
            ..FrameReport::default()
        });
        debug.record_report(FrameReport {
            draw_calls: 3,
            ..FrameReport::default()
        });
        assert_eq!(debug.skipped_frames(), 1);
        assert_eq!(debug.last_report().draw_calls, 3);
        assert!(debug.summary(4).contains("draws: 3"));
    }
}
