//! Terminal front panel: raw-mode lifecycle and drawing of the tube frame.

use anyhow::Result;
use core_display::DisplayFrame;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
        disable_raw_mode, enable_raw_mode,
    },
};
use std::io::{Write, stdout};

const HELP: [&str; 3] = [
    "0-9 z . + - * / % = | n:+/- r:sqrt i:1/x ^:pow s c t l e",
    "F1-F5: MC MR MS M+ M- | Bksp: C  Esc: AC | Tab: function",
    "F10: mode  F11: menu | q / Ctrl-C: quit",
];

/// Tube glow.
const NIXIE: Color = Color::Rgb {
    r: 255,
    g: 140,
    b: 40,
};

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// Restores the terminal when dropped, including on early return or panic unwind.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}

/// Text rows of the panel: header, tube row, blank, key help.
pub fn panel_lines(mode: &str, frame: &DisplayFrame) -> Vec<String> {
    let mut lines = Vec::with_capacity(3 + HELP.len());
    lines.push(format!("nixie [{}] {}", frame.profile(), mode));
    lines.push(format!("  {}", frame.to_text()));
    lines.push(String::new());
    lines.extend(HELP.iter().map(|h| h.to_string()));
    lines
}

/// Redraw the whole panel. The tube row is drawn in the tube color.
pub fn draw_panel(out: &mut impl Write, mode: &str, frame: &DisplayFrame) -> Result<()> {
    queue!(out, Clear(ClearType::All))?;
    for (row, line) in panel_lines(mode, frame).iter().enumerate() {
        queue!(out, MoveTo(0, row as u16))?;
        if row == 1 {
            queue!(
                out,
                SetForegroundColor(NIXIE),
                SetAttribute(Attribute::Bold),
                Print(line),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        } else {
            queue!(out, Print(line))?;
        }
    }
    out.flush()?;
    Ok(())
}
