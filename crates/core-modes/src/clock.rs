//! Clock mode.
//!
//! Local time is `source + sync offset + UTC offset`. The sync offset is
//! learned from time sync events (GPS) so the clock can be disciplined
//! without touching the underlying source.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use core_config::{ClockConfig, HourMode};
use core_events::KeyboardEvent;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::ModeHandler;

/// Source of UTC seconds since the Unix epoch.
pub trait TimeSource: Send {
    fn now_utc(&self) -> i64;
}

/// Wall clock of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_utc(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Settable source for tests and scripted sessions. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualTimeSource {
    now: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new(utc: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(utc)),
        }
    }

    pub fn set(&self, utc: i64) {
        self.now.store(utc, Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::Relaxed);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_utc(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOptions {
    pub hour_mode: HourMode,
    pub leading_zero: bool,
    pub utc_offset_minutes: i32,
    pub show_seconds: bool,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self::from(&ClockConfig::default())
    }
}

impl From<&ClockConfig> for ClockOptions {
    fn from(cfg: &ClockConfig) -> Self {
        Self {
            hour_mode: cfg.hour_mode,
            leading_zero: cfg.leading_zero,
            utc_offset_minutes: cfg.utc_offset_minutes,
            show_seconds: cfg.show_seconds,
        }
    }
}

pub struct ClockMode {
    source: Box<dyn TimeSource>,
    options: ClockOptions,
    sync_offset: i64,
    display: String,
}

impl ClockMode {
    pub fn new(source: Box<dyn TimeSource>, options: ClockOptions) -> Self {
        let mut clock = Self {
            source,
            options,
            sync_offset: 0,
            display: String::new(),
        };
        clock.refresh();
        clock
    }

    pub fn options(&self) -> ClockOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ClockOptions) {
        self.options = options;
        self.refresh();
    }

    /// Disciplined UTC seconds.
    pub fn now_utc(&self) -> i64 {
        self.source.now_utc().saturating_add(self.sync_offset)
    }

    /// Align the clock with an authoritative UTC time.
    pub fn set_time(&mut self, utc: i64) {
        let offset = utc.saturating_sub(self.source.now_utc());
        if offset != self.sync_offset {
            info!(target: "modes.clock", utc, drift = offset.saturating_sub(self.sync_offset), "time_synced");
        }
        self.sync_offset = offset;
        self.refresh();
    }

    fn refresh(&mut self) {
        let local = self
            .now_utc()
            .saturating_add(i64::from(self.options.utc_offset_minutes) * 60);
        match OffsetDateTime::from_unix_timestamp(local) {
            Ok(dt) => {
                self.display = format_time(dt.hour(), dt.minute(), dt.second(), &self.options);
            }
            Err(e) => debug!(target: "modes.clock", local, error = %e, "time_out_of_range"),
        }
    }
}

/// `HH MM SS` (or `HH MM`); the blanks leave one tube dark between groups.
fn format_time(hour: u8, minute: u8, second: u8, options: &ClockOptions) -> String {
    let hour = match options.hour_mode {
        HourMode::H24 => hour,
        HourMode::H12 => match hour % 12 {
            0 => 12,
            h => h,
        },
    };
    let mut out = if options.leading_zero {
        format!("{hour:02} {minute:02}")
    } else {
        format!("{hour:>2} {minute:02}")
    };
    if options.show_seconds {
        out.push_str(&format!(" {second:02}"));
    }
    out
}

impl ModeHandler for ClockMode {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn on_keyboard_event(&mut self, _event: &KeyboardEvent) {}

    fn display(&self) -> &str {
        &self.display
    }

    fn on_tick(&mut self) {
        self.refresh();
    }
}
