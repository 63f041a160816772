//! Keypad serial frame decoding.
//!
//! The remote keypad sends fixed 2-byte frames: `[key code, key state]`.
//! Bytes may arrive in arbitrary chunks, so a dangling first byte is kept
//! until its partner shows up. The decoder owns the function key state and
//! stamps it on every keyboard event, and derives the two device gestures:
//!
//! * `ModeSwitch`: function key released after a plain tap (no other key
//!   pressed while it was down, no hold reported).
//! * `MenuMode`: function key reported as `hold` (once per hold).
//!
//! A derived device event is delivered before the keyboard event that caused it.

use core_events::{
    DeviceEvent, Event, EventListener, FRAME_ERRORS, KEYPRESS_REPEAT, KEYPRESS_TOTAL, KeyCode,
    KeyState, KeyboardEvent,
};
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

pub const FRAME_LEN: usize = 2;

#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Option<u8>,
    function_held: bool,
    chorded: bool,
    held_long: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function_held(&self) -> bool {
        self.function_held
    }

    /// Feed raw bytes; every complete frame is delivered to `out`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut impl EventListener) {
        for &byte in bytes {
            match self.pending.take() {
                None => self.pending = Some(byte),
                Some(code) => self.decode_frame(code, byte, out),
            }
        }
    }

    /// Convenience wrapper collecting the events of one chunk.
    pub fn feed_collect(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut out = Vec::new();
        self.feed(bytes, &mut out);
        out
    }

    fn decode_frame(&mut self, code: u8, state_byte: u8, out: &mut impl EventListener) {
        let Some(state) = KeyState::from_wire(state_byte) else {
            FRAME_ERRORS.fetch_add(1, Ordering::Relaxed);
            debug!(target: "input.frame", code, state_byte, "invalid_key_state_dropped");
            return;
        };
        match state {
            KeyState::Pressed => {
                KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
            }
            KeyState::AutoRepeat => {
                KEYPRESS_REPEAT.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let code = KeyCode(code);
        if code == KeyCode::FUNCTION {
            if let Some(gesture) = self.track_function_key(state) {
                trace!(target: "input.frame", ?gesture, "device_event");
                out.on_event(&Event::Device(gesture));
            }
        } else if self.function_held && state == KeyState::Pressed {
            self.chorded = true;
        }

        let event = KeyboardEvent::new(code, state, self.function_held);
        trace!(target: "input.frame", %event, "key_event");
        out.on_event(&Event::Keyboard(event));
    }

    fn track_function_key(&mut self, state: KeyState) -> Option<DeviceEvent> {
        match state {
            KeyState::Pressed => {
                self.function_held = true;
                self.chorded = false;
                self.held_long = false;
                None
            }
            KeyState::Hold => {
                self.function_held = true;
                if self.held_long {
                    return None;
                }
                self.held_long = true;
                Some(DeviceEvent::MenuMode)
            }
            KeyState::AutoRepeat => {
                self.function_held = true;
                None
            }
            KeyState::Released => {
                let tapped = self.function_held && !self.chorded && !self.held_long;
                self.function_held = false;
                tapped.then_some(DeviceEvent::ModeSwitch)
            }
            KeyState::Idle => {
                self.function_held = false;
                None
            }
        }
    }
}
