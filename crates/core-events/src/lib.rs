//! Core event types and channel helpers for the nixie calculator.
//!
//! Everything that can change what the tubes show arrives as an [`Event`]:
//! keypad events from the remote keyboard, special keypad gestures that switch
//! the device mode, GPS time sync notifications and the periodic tick that
//! drives the clock. Events are applied strictly in arrival order by a single
//! owner (the device supervisor); nothing in this crate mutates shared state.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// The runtime uses a bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. Producers await `send`
// (never drop) because reordering or losing a keypress would silently corrupt the running total.
// A human on a keypad cannot outrun this capacity; the bound only protects against a stuck
// consumer.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 256;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters. Inspected in tests and logged by the binary on shutdown.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0); // keyboard events with state `pressed`
pub static KEYPRESS_REPEAT: AtomicU64 = AtomicU64::new(0); // keyboard events with state `autorepeat`
pub static FRAME_ERRORS: AtomicU64 = AtomicU64::new(0); // keypad frames dropped for an invalid state byte
pub static ASYNC_INPUT_STARTS: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_SIGNAL: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_CHANNEL: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_STREAM: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_ERROR: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Keyboard(KeyboardEvent),
    Device(DeviceEvent),
    /// UTC seconds reported by the time source (GPS sync).
    TimeSync(i64),
    /// Periodic monotonic tick used to refresh time based displays.
    Tick,
    Shutdown,
}

/// Special keypad gestures produced by the function key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceEvent {
    /// Function key tapped on its own: toggle calculator/clock, or leave the menu.
    ModeSwitch,
    /// Function key held: enter the settings menu.
    MenuMode,
}

/// Typed observer for events.
///
/// Emitters (the keypad frame decoder, the runtime loop) hold a reference to a
/// listener instead of a raw callback with an opaque context pointer.
pub trait EventListener {
    fn on_event(&mut self, event: &Event);
}

/// Collecting listener, mostly useful in tests.
impl EventListener for Vec<Event> {
    fn on_event(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Every async producer (tick, terminal input, a GPS receiver) registers through the same trait.
// Each source owns its task lifecycle and must stop promptly once the channel is closed.
// -------------------------------------------------------------------------------------------------

/// A background producer of events.
pub trait AsyncEventSource: Send + 'static {
    /// Stable label used in logs.
    fn name(&self) -> &'static str;
    /// Start the producer task. It must return once `tx` reports the channel closed.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Periodic `Event::Tick`. Missed ticks are skipped.
pub struct TickEventSource {
    period: Duration,
}

impl TickEventSource {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !send_event(&tx, Event::Tick).await {
                    return;
                }
            }
        })
    }
}

/// Periodic `Event::TimeSync` from a UTC reader, standing in for a GPS receiver.
pub struct TimeSyncSource<F> {
    period: Duration,
    read_utc: F,
}

impl<F> TimeSyncSource<F>
where
    F: FnMut() -> Option<i64> + Send + 'static,
{
    /// `read_utc` returns `None` while no fix is available; nothing is sent then.
    pub fn new(period: Duration, read_utc: F) -> Self {
        Self { period, read_utc }
    }
}

impl<F> AsyncEventSource for TimeSyncSource<F>
where
    F: FnMut() -> Option<i64> + Send + 'static,
{
    fn name(&self) -> &'static str {
        "time_sync"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let TimeSyncSource {
            period,
            mut read_utc,
        } = *self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = ticker.tick() => {}
                }
                let Some(utc) = read_utc() else {
                    tracing::trace!(target: "runtime.events", "time_sync_no_fix");
                    continue;
                };
                if !send_event(&tx, Event::TimeSync(utc)).await {
                    return;
                }
            }
        })
    }
}

/// Sources collected at startup and spawned together.
#[derive(Default)]
pub struct EventSourceRegistry {
    pending: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, source: S) {
        self.pending.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Spawn every registered source on its own clone of `tx`. The registry is left
    /// empty. Drop the last runtime `Sender` before joining the handles.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        self.pending
            .drain(..)
            .map(|source| {
                tracing::info!(target: "runtime.events", source = source.name(), "event_source_spawned");
                source.spawn(tx.clone())
            })
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
// Keypad model
// -------------------------------------------------------------------------------------------------

/// Raw key code of the remote keypad. The layout is fixed by the keyboard firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub const POW: KeyCode = KeyCode(1);
    pub const INV: KeyCode = KeyCode(2);
    pub const C: KeyCode = KeyCode(3);
    pub const AC: KeyCode = KeyCode(4);
    pub const FUNCTION: KeyCode = KeyCode(5);
    pub const SIN: KeyCode = KeyCode(6);
    pub const COS: KeyCode = KeyCode(7);
    pub const TAN: KeyCode = KeyCode(8);
    pub const LOG: KeyCode = KeyCode(9);
    pub const LN: KeyCode = KeyCode(10);
    pub const SQUAREROOT: KeyCode = KeyCode(11);
    pub const DIGIT_7: KeyCode = KeyCode(12);
    pub const DIGIT_4: KeyCode = KeyCode(13);
    pub const DIGIT_1: KeyCode = KeyCode(14);
    pub const DIGIT_0: KeyCode = KeyCode(15);
    pub const PERCENT: KeyCode = KeyCode(16);
    pub const DIGIT_8: KeyCode = KeyCode(17);
    pub const DIGIT_5: KeyCode = KeyCode(18);
    pub const DIGIT_2: KeyCode = KeyCode(19);
    pub const DOUBLE_ZERO: KeyCode = KeyCode(20);
    pub const PLUSMINUS: KeyCode = KeyCode(21);
    pub const DIGIT_9: KeyCode = KeyCode(22);
    pub const DIGIT_6: KeyCode = KeyCode(23);
    pub const DIGIT_3: KeyCode = KeyCode(24);
    pub const DOT: KeyCode = KeyCode(25);
    pub const DIV: KeyCode = KeyCode(26);
    pub const MUL: KeyCode = KeyCode(27);
    pub const MINUS: KeyCode = KeyCode(28);
    pub const PLUS: KeyCode = KeyCode(29);
    pub const EQUALS: KeyCode = KeyCode(30);
    pub const MC: KeyCode = KeyCode(31);
    pub const MR: KeyCode = KeyCode(32);
    pub const MS: KeyCode = KeyCode(33);
    pub const MPLUS: KeyCode = KeyCode(34);
    pub const MMINUS: KeyCode = KeyCode(35);

    /// Key code of the digit key `d` (0..=9). `None` for anything else.
    pub const fn digit(d: u8) -> Option<KeyCode> {
        let code = match d {
            0 => Self::DIGIT_0,
            1 => Self::DIGIT_1,
            2 => Self::DIGIT_2,
            3 => Self::DIGIT_3,
            4 => Self::DIGIT_4,
            5 => Self::DIGIT_5,
            6 => Self::DIGIT_6,
            7 => Self::DIGIT_7,
            8 => Self::DIGIT_8,
            9 => Self::DIGIT_9,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{:02}", self.0)
    }
}

/// Key state as reported by the keypad (wire values 0..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Idle,
    Pressed,
    Hold,
    Released,
    AutoRepeat,
}

impl KeyState {
    /// Decode the state byte of a keypad frame.
    pub const fn from_wire(byte: u8) -> Option<KeyState> {
        match byte {
            0 => Some(KeyState::Idle),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Hold),
            3 => Some(KeyState::Released),
            4 => Some(KeyState::AutoRepeat),
            _ => None,
        }
    }

    pub const fn to_wire(self) -> u8 {
        match self {
            KeyState::Idle => 0,
            KeyState::Pressed => 1,
            KeyState::Hold => 2,
            KeyState::Released => 3,
            KeyState::AutoRepeat => 4,
        }
    }
}

/// A debounced keypad event with the function modifier state at the time of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyboardEvent {
    pub code: KeyCode,
    pub state: KeyState,
    pub function_held: bool,
}

impl KeyboardEvent {
    pub const fn new(code: KeyCode, state: KeyState, function_held: bool) -> Self {
        Self {
            code,
            state,
            function_held,
        }
    }

    /// Shorthand for a plain press without the function modifier.
    pub const fn pressed(code: KeyCode) -> Self {
        Self::new(code, KeyState::Pressed, false)
    }

    pub fn is_pressed(&self) -> bool {
        self.state == KeyState::Pressed
    }
}

impl fmt::Display for KeyboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.code, self.state)?;
        if self.function_held {
            write!(f, "+fn")?;
        }
        Ok(())
    }
}

/// Send an event on the bounded channel, counting failures instead of surfacing them.
/// Returns `false` once the consumer is gone.
pub async fn send_event(tx: &Sender<Event>, event: Event) -> bool {
    if tx.send(event).await.is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        return false;
    }
    true
}
