//! Device modes and the supervisor that switches between them.
//!
//! Every mode is a [`ModeHandler`]: it consumes keyboard events and exposes
//! the string the tubes should show. The [`DeviceSupervisor`] owns one
//! handler per [`DeviceMode`] and forwards events only to the active one.

pub mod calculator;
pub mod clock;
pub mod menu;
pub mod supervisor;

pub use calculator::{CalculatorController, CalculatorOptions};
pub use clock::{ClockMode, ClockOptions, ManualTimeSource, SystemTimeSource, TimeSource};
pub use menu::MenuMode;
pub use supervisor::{DeviceSupervisor, DisplayListener};

use core_events::KeyboardEvent;
use std::fmt;

/// "Handles key events, produces a display string."
pub trait ModeHandler {
    fn name(&self) -> &'static str;
    fn on_keyboard_event(&mut self, event: &KeyboardEvent);
    fn display(&self) -> &str;
    /// Periodic refresh; most modes are purely key driven.
    fn on_tick(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMode {
    Calculator,
    Clock,
    Menu,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceMode::Calculator => "calculator",
            DeviceMode::Clock => "clock",
            DeviceMode::Menu => "menu",
        })
    }
}
