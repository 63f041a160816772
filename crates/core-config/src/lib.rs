//! Configuration loading and parsing.
//!
//! Parses `nixie.toml` (or an override path provided by the binary) into
//! per-section structs. Every field has a default, so a missing file, a
//! missing section or a missing key all degrade to the stock device setup.
//! Unknown fields are ignored (TOML deserialization tolerance).
//!
//! The raw wishes (digit count, explicit plus sign) are retained as parsed;
//! `Config::apply_profile` clamps them against the tube board that is
//! actually attached, and can be re-run if the board choice changes.

pub mod settings;

pub use settings::{Setting, SettingId, Settings};

use anyhow::Result;
use core_calc::AngleMode;
use core_display::DisplayProfile;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by the settings registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("setting {id} rejects {value}: allowed range is {min}..={max}")]
    OutOfRange {
        id: SettingId,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("no setting numbered {0}")]
    UnknownSetting(u8),
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DisplayConfig {
    #[serde(default)]
    pub profile: DisplayProfile,
    /// Digit budget wish; `None` uses every tube on the board.
    #[serde(default)]
    pub digits: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalculatorConfig {
    #[serde(default)]
    pub angle_mode: AngleMode,
    #[serde(default = "CalculatorConfig::default_show_plus_sign")]
    pub show_plus_sign: bool,
    #[serde(default)]
    pub zero_padding: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            angle_mode: AngleMode::default(),
            show_plus_sign: Self::default_show_plus_sign(),
            zero_padding: false,
        }
    }
}

impl CalculatorConfig {
    const fn default_show_plus_sign() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartupMode {
    #[default]
    Calculator,
    Clock,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DeviceConfig {
    #[serde(default)]
    pub startup_mode: StartupMode,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HourMode {
    H12,
    #[default]
    H24,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClockConfig {
    #[serde(default)]
    pub hour_mode: HourMode,
    #[serde(default = "ClockConfig::default_leading_zero")]
    pub leading_zero: bool,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "ClockConfig::default_show_seconds")]
    pub show_seconds: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hour_mode: HourMode::default(),
            leading_zero: Self::default_leading_zero(),
            utc_offset_minutes: 0,
            show_seconds: Self::default_show_seconds(),
        }
    }
}

impl ClockConfig {
    const fn default_leading_zero() -> bool {
        true
    }
    const fn default_show_seconds() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub calculator: CalculatorConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,          // original file string (optional)
    pub file: ConfigFile,             // parsed (or default) data
    pub effective_digit_count: usize, // clamped to the attached board
    pub effective_plus_sign: bool,    // wish AND hardware support
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("nixie.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("nixie").join("nixie.toml");
    }
    PathBuf::from("nixie.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config {
            raw: Some(content),
            file,
            ..Config::default()
        }),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn profile(&self) -> DisplayProfile {
        self.file.display.profile
    }

    /// Clamp the display wishes against `profile`. Returns the effective digit budget.
    pub fn apply_profile(&mut self, profile: DisplayProfile) -> usize {
        let available = profile.digit_count();
        let wanted = self.file.display.digits.unwrap_or(available);
        let digits = wanted.clamp(1, available);
        let plus_wanted = self.file.calculator.show_plus_sign;
        let plus = plus_wanted && profile.has_plus_sign();

        if digits != wanted || plus != plus_wanted {
            info!(
                target: "config",
                %profile,
                wanted,
                digits,
                available,
                plus_wanted,
                plus,
                "display_settings_clamped"
            );
        }
        self.effective_digit_count = digits;
        self.effective_plus_sign = plus;
        digits
    }
}
