//! Fixed-delay tick pacing for Bombfield matches.
//!
//! A match runs one simulation step per tick at a target rate (30 Hz by
//! default). Pacing is *fixed-delay*: after a tick the loop sleeps for
//! whatever is left of the tick budget, and the next tick measures from the
//! moment it actually starts. A slow tick therefore just skips its sleep;
//! the following ticks are never squeezed to make up for it.
//!
//! ```text
//!  budget |<------ 33ms ------>|<------ 33ms ------>|
//!  fast   [tick]....sleep......[tick]....sleep......
//!  slow   [tick..........................][tick]....sleep......
//!                                         ^ no catch-up
//! ```
//!
//! # Integration
//!
//! The room actor keeps serving commands while it waits, so it uses the
//! deadline instead of [`TickPacer::pace`]:
//!
//! ```ignore
//! loop {
//!     pacer.begin_tick();
//!     game.process_loop_once();
//!     let deadline = pacer.end_tick().map(|info| info.deadline);
//!     // select! { cmd = rx.recv() => ..., _ = sleep_until(deadline) => break }
//! }
//! ```
//!
//! All timing uses `tokio::time::Instant`, so tests can drive the pacer
//! with a paused clock.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick pacer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target tick rate in Hz.
    pub tick_rate_hz: u32,
    /// Budget warning threshold (0.0–1.0). A warning is logged when a tick
    /// uses more than this fraction of its budget.
    pub budget_warn_threshold: f64,
    /// Record per-tick timing metrics.
    pub metrics_enabled: bool,
    /// Random delay (0–max µs) before the *first* tick, so rooms that fill
    /// up at the same moment don't tick in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            budget_warn_threshold: 0.80,
            metrics_enabled: true,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Tick rate used when none (or zero) is configured.
    pub const DEFAULT_TICK_RATE_HZ: u32 = 30;

    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Config for a specific tick rate with default thresholds.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - A rate of 0 falls back to [`Self::DEFAULT_TICK_RATE_HZ`]; a match
    ///   always ticks.
    /// - Rates above [`Self::MAX_TICK_RATE_HZ`] are capped.
    /// - The warning threshold is clamped to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 {
            warn!(
                default = Self::DEFAULT_TICK_RATE_HZ,
                "tick_rate_hz is 0 — using default"
            );
            self.tick_rate_hz = Self::DEFAULT_TICK_RATE_HZ;
        }
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum — clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Duration of a single tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Timing of one finished tick, returned by [`TickPacer::end_tick`].
#[derive(Debug, Clone, Copy)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// How long the tick's work took.
    pub elapsed: Duration,
    /// When the next tick may start. Equal to "now" after a slow tick.
    pub deadline: Instant,
    /// `true` if the tick used its whole budget (no sleep follows).
    pub overrun: bool,
}

impl TickInfo {
    /// How long the loop will sleep before the next tick, measured from
    /// the end of this one.
    pub fn sleep_for(&self, budget: Duration) -> Duration {
        budget.saturating_sub(self.elapsed)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the pacer. Updated in [`TickPacer::end_tick`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Ticks completed.
    pub total_ticks: u64,
    /// Ticks that used their whole budget.
    pub total_overruns: u64,
    /// Exponential moving average of tick execution time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick execution time observed.
    pub max_tick_time: Duration,
    /// Budget used by the last tick (0.0–∞). >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

/// Fixed-delay tick pacer. One per running match.
pub struct TickPacer {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    /// When the current tick started. Set by `begin_tick`, taken by
    /// `end_tick`.
    tick_start: Option<Instant>,
    start_delay: Duration,
    metrics: TickMetrics,
}

impl TickPacer {
    /// Creates a pacer from config. The first-tick jitter is drawn here.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        let start_delay = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick pacer created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            tick_start: None,
            start_delay,
            metrics: TickMetrics::default(),
        }
    }

    /// Creates a pacer for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Delay to wait before the very first tick (the jitter).
    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }

    /// Marks the start of a tick and returns its number.
    pub fn begin_tick(&mut self) -> u64 {
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());
        self.tick_count
    }

    /// Marks the end of the current tick and computes when the next one
    /// may begin.
    ///
    /// Returns `None` if no tick was begun.
    pub fn end_tick(&mut self) -> Option<TickInfo> {
        let start = self.tick_start.take()?;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(start);
        let overrun = elapsed >= self.tick_duration;

        // Fixed delay: sleep only for what is left of *this* tick's budget.
        let deadline = if overrun { now } else { start + self.tick_duration };

        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        if overrun {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.tick_duration.as_secs_f64() * 1000.0,
                "tick exceeded budget — not compensated"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        self.metrics.total_ticks += 1;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        if self.config.metrics_enabled {
            self.metrics.budget_utilization = utilization;
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + elapsed.as_secs_f64() * alpha);
        }

        trace!(tick = self.tick_count, overrun, "tick finished");

        Some(TickInfo {
            tick: self.tick_count,
            elapsed,
            deadline,
            overrun,
        })
    }

    /// Ends the current tick and sleeps until the next one may begin.
    pub async fn pace(&mut self) -> Option<TickInfo> {
        let info = self.end_tick()?;
        time::sleep_until(info.deadline).await;
        Some(info)
    }

    /// Ticks begun so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The configured tick rate in Hz (after validation).
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The per-tick budget.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
