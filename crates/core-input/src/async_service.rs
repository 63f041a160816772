//! Terminal input task: crossterm key events become keypad events on the runtime channel.

use crate::terminal::{TerminalKeyMapper, map_key_code};
use core_events::{
    ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_ERROR, ASYNC_INPUT_STOP_SIGNAL,
    ASYNC_INPUT_STOP_STREAM, CHANNEL_SEND_FAILURES, Event, KEYPRESS_REPEAT, KEYPRESS_TOTAL,
    KeyState,
};
use crossterm::event::{Event as CEvent, EventStream, KeyEvent as CKeyEvent, KeyEventKind as CKind};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, info, trace, warn};

/// Handle that asks the input task to stop. A signal sent before the task
/// first waits is kept, not lost.
#[derive(Clone, Debug)]
pub struct AsyncInputShutdown {
    notify: Arc<Notify>,
}

impl AsyncInputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

pub(crate) fn spawn_async_event_task(sender: Sender<Event>) -> (JoinHandle<()>, AsyncInputShutdown) {
    let (task, shutdown) = TerminalInputTask::new(sender, EventStream::new());
    let span = tracing::debug_span!(target: "input.thread", "terminal_input");
    (tokio::spawn(task.run().instrument(span)), shutdown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Signal,
    ChannelClosed,
    StreamEnded,
    StreamError(io::ErrorKind),
}

impl StopReason {
    fn label(self) -> &'static str {
        match self {
            StopReason::Signal => "shutdown_signal",
            StopReason::ChannelClosed => "channel_closed",
            StopReason::StreamEnded => "stream_ended",
            StopReason::StreamError(_) => "stream_error",
        }
    }

    fn counter(self) -> &'static AtomicU64 {
        match self {
            StopReason::Signal => &ASYNC_INPUT_STOP_SIGNAL,
            StopReason::ChannelClosed => &ASYNC_INPUT_STOP_CHANNEL,
            StopReason::StreamEnded => &ASYNC_INPUT_STOP_STREAM,
            StopReason::StreamError(_) => &ASYNC_INPUT_STOP_ERROR,
        }
    }
}

struct TerminalInputTask<S> {
    sender: Sender<Event>,
    stream: S,
    mapper: TerminalKeyMapper,
    shutdown: Arc<Notify>,
}

impl<S> TerminalInputTask<S>
where
    S: Stream<Item = io::Result<CEvent>> + Unpin,
{
    fn new(sender: Sender<Event>, stream: S) -> (Self, AsyncInputShutdown) {
        let notify = Arc::new(Notify::new());
        let task = Self {
            sender,
            stream,
            mapper: TerminalKeyMapper::new(),
            shutdown: notify.clone(),
        };
        (task, AsyncInputShutdown { notify })
    }

    async fn run(mut self) {
        ASYNC_INPUT_STARTS.fetch_add(1, Ordering::Relaxed);
        info!(target: "input.thread", "async_input_task_started");

        let reason = self.pump().await;
        reason.counter().fetch_add(1, Ordering::Relaxed);
        if let StopReason::StreamError(kind) = reason {
            warn!(target: "input.thread", ?kind, "async_input_task_stream_error");
        }
        info!(target: "input.thread", reason = reason.label(), "async_input_task_stopped");
    }

    async fn pump(&mut self) -> StopReason {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.notified() => return StopReason::Signal,
                next = self.stream.next() => next,
            };
            let key = match next {
                None => return StopReason::StreamEnded,
                Some(Err(err)) => return StopReason::StreamError(err.kind()),
                Some(Ok(CEvent::Key(key))) => key,
                Some(Ok(_)) => continue,
            };
            let Some(event) = self.translate(key) else {
                continue;
            };
            let state = match &event {
                Event::Keyboard(k) => Some(k.state),
                _ => None,
            };
            if self.sender.send(event).await.is_err() {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                return StopReason::ChannelClosed;
            }
            match state {
                Some(KeyState::Pressed) => KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed),
                Some(KeyState::AutoRepeat) => KEYPRESS_REPEAT.fetch_add(1, Ordering::Relaxed),
                _ => 0,
            };
        }
    }

    fn translate(&mut self, key: CKeyEvent) -> Option<Event> {
        let repeat = match key.kind {
            CKind::Press => false,
            CKind::Repeat => true,
            CKind::Release => return None,
        };
        let Some(mapped) = map_key_code(&key.code, key.modifiers) else {
            trace!(target: "input.event", code = ?key.code, "unmapped_key");
            return None;
        };
        let event = self.mapper.translate(mapped, repeat)?;
        trace!(target: "input.event", ?event, repeat, "terminal_key");
        Some(event)
    }
}
