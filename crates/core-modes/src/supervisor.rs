//! Device supervisor: owns every mode, routes events, tracks the active mode.

use core_calc::AngleMode;
use core_config::{Config, Settings, StartupMode};
use core_display::{DisplayFrame, DisplayProfile};
use core_events::{DeviceEvent, Event, EventListener};
use tracing::{debug, info};

use crate::{
    CalculatorController, CalculatorOptions, ClockMode, ClockOptions, DeviceMode, MenuMode,
    ModeHandler, TimeSource,
};

/// Receives the active mode's display string whenever it changes.
pub trait DisplayListener {
    fn on_display(&mut self, mode: DeviceMode, text: &str);
}

/// Collecting listener, mostly useful in tests.
impl DisplayListener for Vec<(DeviceMode, String)> {
    fn on_display(&mut self, mode: DeviceMode, text: &str) {
        self.push((mode, text.to_string()));
    }
}

pub struct DeviceSupervisor {
    config: Config,
    profile: DisplayProfile,
    calculator: CalculatorController,
    clock: ClockMode,
    menu: MenuMode,
    mode: DeviceMode,
    previous: DeviceMode,
    listeners: Vec<Box<dyn DisplayListener + Send>>,
    last_shown: Option<(DeviceMode, String)>,
}

impl DeviceSupervisor {
    pub fn new(mut config: Config, profile: DisplayProfile, time: Box<dyn TimeSource>) -> Self {
        let digit_count = config.apply_profile(profile);
        let calculator = CalculatorController::new(calculator_options(&config));
        let clock = ClockMode::new(time, ClockOptions::from(&config.file.clock));
        let menu = MenuMode::new(Settings::from_config(&config), digit_count);
        let mode = match config.file.device.startup_mode {
            StartupMode::Calculator => DeviceMode::Calculator,
            StartupMode::Clock => DeviceMode::Clock,
        };
        info!(target: "modes.supervisor", %profile, digit_count, %mode, "device_started");
        Self {
            config,
            profile,
            calculator,
            clock,
            menu,
            mode,
            previous: mode,
            listeners: Vec::new(),
            last_shown: None,
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn DisplayListener + Send>) {
        self.listeners.push(listener);
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn previous_mode(&self) -> DeviceMode {
        self.previous
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calculator(&self) -> &CalculatorController {
        &self.calculator
    }

    pub fn clock(&self) -> &ClockMode {
        &self.clock
    }

    pub fn menu(&self) -> &MenuMode {
        &self.menu
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.calculator.options().angle_mode
    }

    pub fn handler(&self) -> &dyn ModeHandler {
        match self.mode {
            DeviceMode::Calculator => &self.calculator,
            DeviceMode::Clock => &self.clock,
            DeviceMode::Menu => &self.menu,
        }
    }

    fn handler_mut(&mut self) -> &mut dyn ModeHandler {
        match self.mode {
            DeviceMode::Calculator => &mut self.calculator,
            DeviceMode::Clock => &mut self.clock,
            DeviceMode::Menu => &mut self.menu,
        }
    }

    pub fn display(&self) -> &str {
        self.handler().display()
    }

    /// Tube frame for the current display.
    pub fn frame(&self) -> DisplayFrame {
        let padding = self.mode == DeviceMode::Calculator && self.config.file.calculator.zero_padding;
        let mut frame = DisplayFrame::render(self.profile, self.display(), padding);
        frame.set_menu_sign(self.mode == DeviceMode::Menu);
        frame
    }

    /// Push the current display to listeners, even if unchanged.
    pub fn refresh(&mut self) {
        self.last_shown = None;
        self.notify();
    }

    fn notify(&mut self) {
        let shown = (self.mode, self.handler().display().to_string());
        if self.last_shown.as_ref() == Some(&shown) {
            return;
        }
        for listener in &mut self.listeners {
            listener.on_display(shown.0, &shown.1);
        }
        self.last_shown = Some(shown);
    }

    fn switch_device_mode(&mut self) {
        let from = self.mode;
        self.mode = match self.mode {
            DeviceMode::Calculator => DeviceMode::Clock,
            DeviceMode::Clock => DeviceMode::Calculator,
            DeviceMode::Menu => {
                self.commit_settings();
                self.previous
            }
        };
        self.clock.on_tick();
        info!(target: "modes.supervisor", %from, to = %self.mode, "mode_switch");
    }

    fn enter_menu(&mut self) {
        if self.mode == DeviceMode::Menu {
            return;
        }
        self.previous = self.mode;
        self.mode = DeviceMode::Menu;
        self.menu.begin();
        info!(target: "modes.supervisor", from = %self.previous, "menu_entered");
    }

    fn commit_settings(&mut self) {
        self.menu.settings().apply_to(&mut self.config);
        self.clock.set_options(ClockOptions::from(&self.config.file.clock));
        info!(
            target: "modes.supervisor",
            zero_padding = self.config.file.calculator.zero_padding,
            utc_offset_minutes = self.config.file.clock.utc_offset_minutes,
            startup_mode = ?self.config.file.device.startup_mode,
            "settings_committed"
        );
    }
}

fn calculator_options(config: &Config) -> CalculatorOptions {
    CalculatorOptions {
        digit_count: config.effective_digit_count,
        show_plus_sign: config.effective_plus_sign,
        angle_mode: config.file.calculator.angle_mode,
    }
}

impl EventListener for DeviceSupervisor {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Keyboard(key) => self.handler_mut().on_keyboard_event(key),
            Event::Device(DeviceEvent::ModeSwitch) => self.switch_device_mode(),
            Event::Device(DeviceEvent::MenuMode) => self.enter_menu(),
            Event::TimeSync(utc) => self.clock.set_time(*utc),
            Event::Tick => self.handler_mut().on_tick(),
            Event::Shutdown => {
                debug!(target: "modes.supervisor", "shutdown_seen");
                return;
            }
        }
        self.notify();
    }
}

impl std::fmt::Debug for DeviceSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSupervisor")
            .field("profile", &self.profile)
            .field("mode", &self.mode)
            .field("previous", &self.previous)
            .field("display", &self.display())
            .field("angle_mode", &self.angle_mode())
            .finish_non_exhaustive()
    }
}
