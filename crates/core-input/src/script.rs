//! Key scripts: a compact text form of a keypad session.
//!
//! Plain characters use the simulator keyboard map ([`map_char`]); bracketed
//! tokens name keys that have no printable character. Whitespace is skipped.
//!
//! ```text
//! 12+30=     [ms] 5*[mr]=     [fn]s     9[mode]
//! ```

use core_events::{DeviceEvent, Event, KeyCode};
use thiserror::Error;

use crate::terminal::{TerminalKey, TerminalKeyMapper, map_char};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown token `[{token}]` at offset {offset}")]
    UnknownToken { token: String, offset: usize },
    #[error("unterminated `[` at offset {0}")]
    Unterminated(usize),
    #[error("character {ch:?} at offset {offset} has no key")]
    UnmappedChar { ch: char, offset: usize },
}

fn named_token(name: &str) -> Option<TerminalKey> {
    let key = match name.to_ascii_lowercase().as_str() {
        "mc" => TerminalKey::Key(KeyCode::MC),
        "mr" => TerminalKey::Key(KeyCode::MR),
        "ms" => TerminalKey::Key(KeyCode::MS),
        "m+" => TerminalKey::Key(KeyCode::MPLUS),
        "m-" => TerminalKey::Key(KeyCode::MMINUS),
        "ac" => TerminalKey::Key(KeyCode::AC),
        "c" => TerminalKey::Key(KeyCode::C),
        "00" => TerminalKey::Key(KeyCode::DOUBLE_ZERO),
        "fn" => TerminalKey::FunctionLatch,
        "mode" => TerminalKey::Device(DeviceEvent::ModeSwitch),
        "menu" => TerminalKey::Device(DeviceEvent::MenuMode),
        _ => return None,
    };
    Some(key)
}

/// Parse a script into terminal keys.
pub fn parse_script(script: &str) -> Result<Vec<TerminalKey>, ScriptError> {
    let mut keys = Vec::new();
    let mut chars = script.char_indices();
    while let Some((offset, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        if ch == '[' {
            let rest = &script[offset + 1..];
            let Some(end) = rest.find(']') else {
                return Err(ScriptError::Unterminated(offset));
            };
            let name = &rest[..end];
            let key = named_token(name).ok_or_else(|| ScriptError::UnknownToken {
                token: name.to_string(),
                offset,
            })?;
            keys.push(key);
            // Skip the token body and the closing bracket.
            for _ in 0..name.chars().count() + 1 {
                chars.next();
            }
            continue;
        }
        keys.push(map_char(ch).ok_or(ScriptError::UnmappedChar { ch, offset })?);
    }
    Ok(keys)
}

/// Parse a script and translate it to the events the runtime would see.
pub fn script_events(script: &str) -> Result<Vec<Event>, ScriptError> {
    let mut mapper = TerminalKeyMapper::new();
    Ok(parse_script(script)?
        .into_iter()
        .filter_map(|key| mapper.translate(key, false))
        .collect())
}
