//! Terminal keyboard -> keypad mapping for the simulator.
//!
//! A PC keyboard has no function key with press/hold semantics, so Tab
//! toggles a latched modifier that the next keypad key consumes, and the two
//! function key gestures get dedicated keys (F10 / F11).

use core_events::{DeviceEvent, Event, KeyCode, KeyState, KeyboardEvent};
use crossterm::event::{KeyCode as CKeyCode, KeyModifiers as CKeyModifiers};

/// What one terminal key stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKey {
    Key(KeyCode),
    /// Toggle the latched function modifier.
    FunctionLatch,
    Device(DeviceEvent),
    Quit,
}

/// Map a character the way the simulator keyboard does.
pub fn map_char(c: char) -> Option<TerminalKey> {
    let code = match c {
        '0'..='9' => return KeyCode::digit(c as u8 - b'0').map(TerminalKey::Key),
        'z' => KeyCode::DOUBLE_ZERO,
        '.' | ',' => KeyCode::DOT,
        '+' => KeyCode::PLUS,
        '-' => KeyCode::MINUS,
        '*' => KeyCode::MUL,
        '/' => KeyCode::DIV,
        '%' => KeyCode::PERCENT,
        '=' => KeyCode::EQUALS,
        'n' => KeyCode::PLUSMINUS,
        'r' => KeyCode::SQUAREROOT,
        'i' => KeyCode::INV,
        '^' => KeyCode::POW,
        's' => KeyCode::SIN,
        'c' => KeyCode::COS,
        't' => KeyCode::TAN,
        'l' => KeyCode::LOG,
        'e' => KeyCode::LN,
        'q' => return Some(TerminalKey::Quit),
        _ => return None,
    };
    Some(TerminalKey::Key(code))
}

/// Map a crossterm key code plus modifiers. `None` for keys without a keypad meaning.
pub fn map_key_code(code: &CKeyCode, mods: CKeyModifiers) -> Option<TerminalKey> {
    if mods.contains(CKeyModifiers::CONTROL) {
        return matches!(code, CKeyCode::Char('c')).then_some(TerminalKey::Quit);
    }
    let key = match code {
        CKeyCode::Char(c) => return map_char(*c),
        CKeyCode::Enter => TerminalKey::Key(KeyCode::EQUALS),
        CKeyCode::Backspace | CKeyCode::Delete => TerminalKey::Key(KeyCode::C),
        CKeyCode::Esc => TerminalKey::Key(KeyCode::AC),
        CKeyCode::Tab => TerminalKey::FunctionLatch,
        CKeyCode::F(1) => TerminalKey::Key(KeyCode::MC),
        CKeyCode::F(2) => TerminalKey::Key(KeyCode::MR),
        CKeyCode::F(3) => TerminalKey::Key(KeyCode::MS),
        CKeyCode::F(4) => TerminalKey::Key(KeyCode::MPLUS),
        CKeyCode::F(5) => TerminalKey::Key(KeyCode::MMINUS),
        CKeyCode::F(10) => TerminalKey::Device(DeviceEvent::ModeSwitch),
        CKeyCode::F(11) => TerminalKey::Device(DeviceEvent::MenuMode),
        _ => return None,
    };
    Some(key)
}

/// Turns [`TerminalKey`]s into runtime events, tracking the latched modifier.
#[derive(Debug, Default)]
pub struct TerminalKeyMapper {
    latched: bool,
}

impl TerminalKeyMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latched(&self) -> bool {
        self.latched
    }

    /// `repeat` marks a terminal auto-repeat, reported as [`KeyState::AutoRepeat`].
    pub fn translate(&mut self, key: TerminalKey, repeat: bool) -> Option<Event> {
        match key {
            TerminalKey::FunctionLatch => {
                self.latched = !self.latched;
                None
            }
            TerminalKey::Device(d) => Some(Event::Device(d)),
            TerminalKey::Quit => Some(Event::Shutdown),
            TerminalKey::Key(code) => {
                let state = if repeat {
                    KeyState::AutoRepeat
                } else {
                    KeyState::Pressed
                };
                let function_held = std::mem::take(&mut self.latched);
                Some(Event::Keyboard(KeyboardEvent::new(code, state, function_held)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_cover_the_keypad() {
        assert_eq!(map_char('7'), Some(TerminalKey::Key(KeyCode::DIGIT_7)));
        assert_eq!(map_char('z'), Some(TerminalKey::Key(KeyCode::DOUBLE_ZERO)));
        assert_eq!(map_char(','), Some(TerminalKey::Key(KeyCode::DOT)));
        assert_eq!(map_char('c'), Some(TerminalKey::Key(KeyCode::COS)));
        assert_eq!(map_char('e'), Some(TerminalKey::Key(KeyCode::LN)));
        assert_eq!(map_char('q'), Some(TerminalKey::Quit));
        assert_eq!(map_char('x'), None);
    }

    #[test]
    fn named_keys() {
        let none = CKeyModifiers::NONE;
        assert_eq!(
            map_key_code(&CKeyCode::Enter, none),
            Some(TerminalKey::Key(KeyCode::EQUALS))
        );
        assert_eq!(
            map_key_code(&CKeyCode::Esc, none),
            Some(TerminalKey::Key(KeyCode::AC))
        );
        assert_eq!(
            map_key_code(&CKeyCode::Backspace, none),
            Some(TerminalKey::Key(KeyCode::C))
        );
        assert_eq!(
            map_key_code(&CKeyCode::F(4), none),
            Some(TerminalKey::Key(KeyCode::MPLUS))
        );
        assert_eq!(
            map_key_code(&CKeyCode::F(11), none),
            Some(TerminalKey::Device(DeviceEvent::MenuMode))
        );
        assert_eq!(map_key_code(&CKeyCode::F(7), none), None);
        assert_eq!(map_key_code(&CKeyCode::Up, none), None);
    }

    #[test]
    fn ctrl_c_quits_and_other_chords_are_ignored() {
        let ctrl = CKeyModifiers::CONTROL;
        assert_eq!(map_key_code(&CKeyCode::Char('c'), ctrl), Some(TerminalKey::Quit));
        assert_eq!(map_key_code(&CKeyCode::Char('s'), ctrl), None);
    }

    #[test]
    fn latch_applies_to_next_key_only() {
        let mut m = TerminalKeyMapper::new();
        assert_eq!(m.translate(TerminalKey::FunctionLatch, false), None);
        assert!(m.latched());
        assert_eq!(
            m.translate(TerminalKey::Key(KeyCode::SIN), false),
            Some(Event::Keyboard(KeyboardEvent::new(
                KeyCode::SIN,
                KeyState::Pressed,
                true
            )))
        );
        assert_eq!(
            m.translate(TerminalKey::Key(KeyCode::SIN), true),
            Some(Event::Keyboard(KeyboardEvent::new(
                KeyCode::SIN,
                KeyState::AutoRepeat,
                false
            )))
        );
    }

    #[test]
    fn latch_toggles_off() {
        let mut m = TerminalKeyMapper::new();
        m.translate(TerminalKey::FunctionLatch, false);
        m.translate(TerminalKey::FunctionLatch, false);
        assert!(!m.latched());
    }
}
