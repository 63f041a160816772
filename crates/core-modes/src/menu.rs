//! Settings menu mode.
//!
//! `M+`/`M-` walk the settings, `+`/`-` edit the scratch value (held keys
//! auto-repeat), `=` commits it, `C` reverts to the stored value and `AC`
//! restores the factory default. Layout on the tubes: setting number on
//! the left, value right-aligned with a trailing point.

use core_config::{Setting, Settings};
use core_events::{KeyCode, KeyState, KeyboardEvent};
use tracing::debug;

use crate::ModeHandler;

#[derive(Debug)]
pub struct MenuMode {
    settings: Settings,
    index: usize,
    digit_count: usize,
    display: String,
}

impl MenuMode {
    pub fn new(settings: Settings, digit_count: usize) -> Self {
        let mut menu = Self {
            settings,
            index: 0,
            digit_count,
            display: String::new(),
        };
        menu.begin();
        menu
    }

    /// Start from the first setting, discarding stale edits.
    pub fn begin(&mut self) {
        self.index = 0;
        self.with_current(Setting::revert_temp);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current(&self) -> Option<&Setting> {
        self.settings.at(self.index)
    }

    fn with_current(&mut self, f: impl FnOnce(&mut Setting)) {
        if let Some(s) = self.settings.at_mut(self.index) {
            f(s);
        }
        self.format_display();
    }

    fn select(&mut self, index: usize) {
        self.index = index.min(self.settings.len().saturating_sub(1));
        self.with_current(Setting::revert_temp);
    }

    fn format_display(&mut self) {
        let Some(s) = self.settings.at(self.index) else {
            self.display.clear();
            return;
        };
        let value = s.temp();
        let sign = if value < 0 { "-" } else { "" };
        let gap = self.digit_count.saturating_sub(5);
        self.display = format!("{sign}{}{:gap$}{:>3}.", s.id(), "", value.unsigned_abs());
    }
}

impl ModeHandler for MenuMode {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn on_keyboard_event(&mut self, event: &KeyboardEvent) {
        if !matches!(event.state, KeyState::Pressed | KeyState::AutoRepeat) {
            return;
        }
        match event.code {
            KeyCode::MPLUS => self.select(self.index + 1),
            KeyCode::MMINUS => self.select(self.index.saturating_sub(1)),
            KeyCode::PLUS => self.with_current(|s| {
                s.step_temp(1);
            }),
            KeyCode::MINUS => self.with_current(|s| {
                s.step_temp(-1);
            }),
            KeyCode::EQUALS => self.with_current(Setting::commit),
            KeyCode::C => self.with_current(Setting::revert_temp),
            KeyCode::AC => self.with_current(Setting::reset),
            _ => return,
        }
        debug!(target: "modes.menu", %event, display = %self.display, "menu_key");
    }

    fn display(&self) -> &str {
        &self.display
    }
}
