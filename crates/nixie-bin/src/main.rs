//! Nixie entrypoint: terminal simulator and headless key-script runner.
use anyhow::{Context, Result};
use clap::Parser;
use core_display::DisplayProfile;
use core_events::{
    ASYNC_INPUT_STARTS, CHANNEL_SEND_FAILURES, EVENT_CHANNEL_CAP, Event, EventListener,
    EventSourceRegistry, FRAME_ERRORS, KEYPRESS_REPEAT, KEYPRESS_TOTAL, TickEventSource,
    TimeSyncSource,
};
use core_modes::{
    DeviceMode, DeviceSupervisor, DisplayListener, ManualTimeSource, SystemTimeSource,
    TimeSource,
};
use core_terminal::{CrosstermBackend, TerminalBackend, draw_panel};
use std::fmt;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const SOURCE_JOIN_TIMEOUT: Duration = Duration::from_millis(200);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "nixie", version, about = "Nixie tube calculator simulator")]
struct Args {
    /// Configuration file path (overrides discovery of `nixie.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Display board: in12, in16, in17 or b5870. Defaults to the configured one.
    #[arg(long = "profile")]
    pub profile: Option<DisplayProfile>,
    /// Run a key script without a terminal and print the final display, e.g. `12+30=`.
    #[arg(long = "keys", conflicts_with = "capture")]
    pub keys: Option<String>,
    /// Replay a raw keypad capture (2-byte frames) without a terminal.
    #[arg(long = "capture")]
    pub capture: Option<PathBuf>,
    /// Pin the clock to this UTC time (seconds since the Unix epoch).
    #[arg(long = "utc", allow_hyphen_values = true)]
    pub utc: Option<i64>,
    /// File holding the receiver's latest UTC fix (Unix seconds), polled for clock sync.
    #[arg(long = "gps-fix")]
    pub gps_fix: Option<PathBuf>,
    /// Seconds between polls of the GPS fix file.
    #[arg(
        long = "sync-interval",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sync_interval: u64,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("nixie.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "nixie.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn time_source(utc: Option<i64>) -> Box<dyn TimeSource> {
    match utc {
        Some(utc) => Box::new(ManualTimeSource::new(utc)),
        None => Box::new(SystemTimeSource),
    }
}

/// Latest fix in `path`. A missing, empty or malformed file means no fix yet.
fn read_fix(path: &Path) -> Option<i64> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!(target: "runtime.events", path = %path.display(), error = %e, "gps_fix_unreadable");
            return None;
        }
    };
    match text.trim().parse::<i64>() {
        Ok(utc) => Some(utc),
        Err(e) => {
            debug!(target: "runtime.events", path = %path.display(), error = %e, "gps_fix_malformed");
            None
        }
    }
}

fn gps_fix_source(
    path: PathBuf,
    period: Duration,
) -> TimeSyncSource<impl FnMut() -> Option<i64> + Send + 'static> {
    TimeSyncSource::new(period, move || read_fix(&path))
}

/// Events for a headless run, or `None` when the terminal front end should start.
fn headless_events(args: &Args) -> Result<Option<Vec<Event>>> {
    if let Some(script) = args.keys.as_deref() {
        let events = core_input::script_events(script).context("invalid key script")?;
        return Ok(Some(events));
    }
    if let Some(path) = args.capture.as_ref() {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading keypad capture {}", path.display()))?;
        return core_input::decode_capture(&bytes).map(Some);
    }
    Ok(None)
}

/// Apply `events` in order up to the first shutdown. Returns how many were applied.
fn replay(supervisor: &mut DeviceSupervisor, events: &[Event]) -> usize {
    let mut applied = 0;
    for event in events {
        if matches!(event, Event::Shutdown) {
            break;
        }
        supervisor.on_event(event);
        applied += 1;
    }
    applied
}

fn report(supervisor: &DeviceSupervisor) -> String {
    format!(
        "mode: {}\ndisplay: {}\nframe: [{}]\n",
        supervisor.mode(),
        supervisor.display(),
        supervisor.frame().to_text()
    )
}

/// Mirrors display changes into the log.
struct TraceDisplay;

impl DisplayListener for TraceDisplay {
    fn on_display(&mut self, mode: DeviceMode, text: &str) {
        trace!(target: "runtime.display", %mode, text, "display_changed");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    QuitKey,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::QuitKey => "quit_key",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

fn log_telemetry() {
    info!(
        target: "runtime.shutdown",
        keypresses = KEYPRESS_TOTAL.load(Ordering::Relaxed),
        repeats = KEYPRESS_REPEAT.load(Ordering::Relaxed),
        frame_errors = FRAME_ERRORS.load(Ordering::Relaxed),
        send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
        input_starts = ASYNC_INPUT_STARTS.load(Ordering::Relaxed),
        "telemetry"
    );
}

struct NixieRuntime {
    supervisor: DeviceSupervisor,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    input_task: Option<JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    drawn: Option<(DeviceMode, String)>,
}

impl NixieRuntime {
    fn new(
        supervisor: DeviceSupervisor,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        input_task: JoinHandle<()>,
        input_shutdown: core_input::AsyncInputShutdown,
        source_handles: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            supervisor,
            rx,
            tx: Some(tx),
            source_handles,
            input_task: Some(input_task),
            input_shutdown: Some(input_shutdown),
            drawn: None,
        }
    }

    async fn run(&mut self) -> Result<()> {
        self.redraw();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            if matches!(event, Event::Shutdown) {
                shutdown_reason = ShutdownReason::QuitKey;
                break;
            }
            self.supervisor.on_event(&event);
            self.redraw();
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    fn redraw(&mut self) {
        let shown = (self.supervisor.mode(), self.supervisor.display().to_string());
        if self.drawn.as_ref() == Some(&shown) {
            return;
        }
        let frame = self.supervisor.frame();
        match draw_panel(&mut stdout(), &shown.0.to_string(), &frame) {
            Ok(()) => self.drawn = Some(shown),
            Err(e) => error!(target: "runtime", ?e, "panel_draw_error"),
        }
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(SOURCE_JOIN_TIMEOUT, handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        if let Some(shutdown) = self.input_shutdown.take() {
            shutdown.signal();
        }

        if let Some(handle) = self.input_task.take() {
            match handle.await {
                Ok(_) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_joined"
                ),
                Err(err) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "input_task_join_failed"
                ),
            }
        }

        log_telemetry();
        log_shutdown_stage(reason, "complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let config = core_config::load_from(args.config.clone())?;
    let profile = args.profile.unwrap_or_else(|| config.profile());
    let events = headless_events(&args)?;
    info!(
        target: "runtime.startup",
        %profile,
        config_override = args.config.is_some(),
        headless = events.is_some(),
        "bootstrap_complete"
    );

    let mut supervisor = DeviceSupervisor::new(config, profile, time_source(args.utc));
    supervisor.add_listener(Box::new(TraceDisplay));

    if let Some(events) = events {
        if let Some(utc) = args.gps_fix.as_deref().and_then(read_fix) {
            supervisor.on_event(&Event::TimeSync(utc));
        }
        let applied = replay(&mut supervisor, &events);
        info!(target: "runtime", applied, total = events.len(), "headless_replay_complete");
        print!("{}", report(&supervisor));
        return Ok(());
    }

    let mut backend = CrosstermBackend::new();
    backend.set_title("nixie")?;
    let _terminal = backend.enter_guard()?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    if let Some(path) = args.gps_fix.clone() {
        registry.register(gps_fix_source(
            path,
            Duration::from_secs(args.sync_interval),
        ));
    }
    let source_handles = registry.spawn_all(&tx);

    let mut runtime =
        NixieRuntime::new(supervisor, tx, rx, input_task, input_shutdown, source_handles);
    runtime.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Config;
    use core_events::{KeyCode, KeyState};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing::Dispatch;
    use tracing::Subscriber;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
    use tracing_subscriber::registry::Registry;

    const T0: i64 = 1_700_000_000;

    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedEvent {
        target: String,
        fields: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct FieldCollector {
        fields: Vec<(String, String)>,
    }

    impl Visit for FieldCollector {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S> Layer<S> for Capture
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            let mut collector = FieldCollector::default();
            event.record(&mut collector);
            self.events.lock().unwrap().push(CapturedEvent {
                target: event.metadata().target().to_string(),
                fields: collector.fields,
            });
        }
    }

    fn supervisor() -> DeviceSupervisor {
        DeviceSupervisor::new(Config::default(), DisplayProfile::In12, time_source(Some(T0)))
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_profile_and_script() {
        let a = args(&["nixie", "--profile", "IN-16", "--keys", "1+1="]);
        assert_eq!(a.profile, Some(DisplayProfile::In16));
        assert_eq!(a.keys.as_deref(), Some("1+1="));
        assert!(Args::try_parse_from(["nixie", "--profile", "nixie9"]).is_err());
        assert!(Args::try_parse_from(["nixie", "--keys", "1", "--capture", "x.bin"]).is_err());
    }

    #[test]
    fn replay_stops_at_quit() {
        let mut sup = supervisor();
        let events = core_input::script_events("12+1q3").unwrap();
        assert_eq!(replay(&mut sup, &events), 4);
        assert_eq!(sup.display(), "1");
    }

    #[test]
    fn report_lists_mode_display_and_frame() {
        let mut sup = supervisor();
        replay(&mut sup, &core_input::script_events("6*7=").unwrap());
        let text = report(&sup);
        assert!(text.starts_with("mode: calculator\ndisplay: 42\nframe: ["));
        assert!(text.ends_with("42]\n"));
    }

    #[test]
    fn headless_capture_file_is_decoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for code in [KeyCode::DIGIT_9, KeyCode::SQUAREROOT] {
            file.write_all(&[code.0, KeyState::Pressed.to_wire()]).unwrap();
            file.write_all(&[code.0, KeyState::Released.to_wire()]).unwrap();
        }
        let path = file.path().to_string_lossy().to_string();
        let events = headless_events(&args(&["nixie", "--capture", &path]))
            .unwrap()
            .unwrap();
        let mut sup = supervisor();
        replay(&mut sup, &events);
        assert_eq!(sup.display(), "3");
    }

    #[test]
    fn bad_script_and_truncated_capture_are_errors() {
        assert!(headless_events(&args(&["nixie", "--keys", "1[nope]"])).is_err());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[KeyCode::DIGIT_1.0]).unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(headless_events(&args(&["nixie", "--capture", &path])).is_err());
        assert!(headless_events(&args(&["nixie"])).unwrap().is_none());
    }

    #[test]
    fn pinned_clock_in_headless_run() {
        let mut sup = supervisor();
        replay(&mut sup, &core_input::script_events("[mode]").unwrap());
        assert_eq!(sup.mode(), DeviceMode::Clock);
        assert_eq!(sup.display(), "22 13 20");
    }

    #[test]
    fn gps_fix_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  {}", T0 + 60).unwrap();
        assert_eq!(read_fix(file.path()), Some(T0 + 60));
        std::fs::write(file.path(), "no fix").unwrap();
        assert_eq!(read_fix(file.path()), None);
        assert_eq!(read_fix(Path::new("__missing_gps_fix__")), None);
        let a = args(&["nixie", "--gps-fix", "fix.txt"]);
        assert_eq!(a.sync_interval, 60);
        assert!(Args::try_parse_from(["nixie", "--sync-interval", "0"]).is_err());
    }

    #[tokio::test]
    async fn gps_fix_source_disciplines_the_clock() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", T0 + 3600).unwrap();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAP);
        let mut registry = EventSourceRegistry::new();
        registry.register(gps_fix_source(
            file.path().to_path_buf(),
            Duration::from_millis(10),
        ));
        let handles = registry.spawn_all(&tx);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("fix delivered")
            .expect("channel open");
        assert_eq!(event, Event::TimeSync(T0 + 3600));

        let mut sup = supervisor();
        replay(&mut sup, &core_input::script_events("[mode]").unwrap());
        sup.on_event(&event);
        assert_eq!(sup.display(), "23 13 20");

        drop(tx);
        drop(rx);
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("source stops once the channel is closed")
                .expect("source task panicked");
        }
    }

    #[test]
    fn shutdown_reason_labels_are_stable() {
        assert_eq!(ShutdownReason::QuitKey.as_str(), "quit_key");
        assert_eq!(ShutdownReason::ChannelClosed.to_string(), "channel_closed");
    }

    #[test]
    fn shutdown_logging_includes_reason_and_stage() {
        let capture = Capture::default();
        let events = capture.events.clone();
        let dispatcher = Dispatch::new(Registry::default().with(capture));

        tracing::dispatcher::with_default(&dispatcher, || {
            log_shutdown_stage(ShutdownReason::QuitKey, "complete");
            log_telemetry();
        });

        let events = events.lock().unwrap();
        let stage = events
            .iter()
            .find(|e| e.fields.iter().any(|(name, _)| name == "stage"))
            .expect("shutdown stage logged");
        assert_eq!(stage.target, "runtime.shutdown");
        assert!(
            stage
                .fields
                .iter()
                .any(|(name, value)| name == "reason" && value.contains("quit_key"))
        );
        assert!(events.iter().any(|e| {
            e.target == "runtime.shutdown" && e.fields.iter().any(|(name, _)| name == "keypresses")
        }));
    }
}
