//! Input sources: the keypad serial link, the simulator's terminal keyboard
//! and text key scripts. All of them end up as `core_events::Event`s.

mod async_service;
pub mod frame;
pub mod script;
pub mod terminal;

pub use async_service::AsyncInputShutdown;
pub use frame::{FRAME_LEN, FrameDecoder};
pub use script::{ScriptError, parse_script, script_events};
pub use terminal::{TerminalKey, TerminalKeyMapper, map_char, map_key_code};

use async_service::spawn_async_event_task;

use core_events::Event;
use tokio::task::JoinHandle;

/// Spawn the async input service backed by `crossterm::EventStream`.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(
    sender: tokio::sync::mpsc::Sender<Event>,
) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_event_task(sender)
}

/// Read a whole keypad capture (raw serial bytes) into events.
pub fn decode_capture(bytes: &[u8]) -> anyhow::Result<Vec<Event>> {
    if bytes.len() % FRAME_LEN != 0 {
        anyhow::bail!(
            "keypad capture is {} bytes, not a whole number of {FRAME_LEN}-byte frames",
            bytes.len()
        );
    }
    Ok(FrameDecoder::new().feed_collect(bytes))
}
