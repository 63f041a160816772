//! Numeric settings registry backing the on-device menu.
//!
//! Each [`Setting`] carries a stored value plus a scratch `temp` value that
//! the menu edits; only an explicit commit copies `temp` into the stored
//! value. Ids keep the numbering the menu shows on the tubes.

use std::fmt;

use crate::{Config, ConfigError, HourMode, StartupMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingId {
    /// 0 = calculator, 1 = clock.
    StartupMode = 1,
    /// Clock display format, reduced to the two time layouts with no date formats:
    /// 0 = time with seconds, 1 = time without seconds.
    ClockMode = 5,
    /// 0 = 12 hours, 1 = 24 hours.
    HourMode = 6,
    LeadingZero = 7,
    ZeroPadding = 22,
    /// Offset to UTC in minutes.
    UtcOffset = 42,
}

impl SettingId {
    pub const ALL: [SettingId; 6] = [
        Self::StartupMode,
        Self::ClockMode,
        Self::HourMode,
        Self::LeadingZero,
        Self::ZeroPadding,
        Self::UtcOffset,
    ];

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|id| id.number() == n)
            .ok_or(ConfigError::UnknownSetting(n))
    }

    const fn range(self) -> (i32, i32) {
        match self {
            Self::UtcOffset => (-720, 840),
            _ => (0, 1),
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    id: SettingId,
    default: i32,
    min: i32,
    max: i32,
    value: i32,
    temp: i32,
}

impl Setting {
    pub fn new(id: SettingId, default: i32, min: i32, max: i32) -> Self {
        Self {
            id,
            default,
            min,
            max,
            value: default,
            temp: default,
        }
    }

    pub fn id(&self) -> SettingId {
        self.id
    }
    pub fn get(&self) -> i32 {
        self.value
    }
    pub fn temp(&self) -> i32 {
        self.temp
    }
    pub fn default_value(&self) -> i32 {
        self.default
    }
    pub fn min(&self) -> i32 {
        self.min
    }
    pub fn max(&self) -> i32 {
        self.max
    }

    fn check(&self, value: i32) -> Result<i32, ConfigError> {
        if (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::OutOfRange {
                id: self.id,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn set(&mut self, value: i32) -> Result<(), ConfigError> {
        self.value = self.check(value)?;
        Ok(())
    }

    pub fn set_temp(&mut self, value: i32) -> Result<(), ConfigError> {
        self.temp = self.check(value)?;
        Ok(())
    }

    /// Move `temp` by `delta`, stopping at the range ends. Returns whether it moved.
    pub fn step_temp(&mut self, delta: i32) -> bool {
        let next = self.temp.saturating_add(delta).clamp(self.min, self.max);
        let moved = next != self.temp;
        self.temp = next;
        moved
    }

    /// Drop any uncommitted edit.
    pub fn revert_temp(&mut self) {
        self.temp = self.value;
    }

    pub fn commit(&mut self) {
        self.value = self.temp;
    }

    /// Back to the factory default; `temp` follows.
    pub fn reset(&mut self) {
        self.value = self.default;
        self.temp = self.default;
    }
}

/// Ordered collection of settings, in menu order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    items: Vec<Setting>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    /// Build the registry with factory defaults, then load the current values from `config`.
    pub fn from_config(config: &Config) -> Self {
        let defaults = Config::default();
        let items = SettingId::ALL
            .into_iter()
            .map(|id| {
                let (min, max) = id.range();
                let mut s = Setting::new(id, value_of(&defaults, id), min, max);
                // Out-of-range file values keep the default.
                if s.set(value_of(config, id)).is_ok() {
                    s.revert_temp();
                }
                s
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.items.iter()
    }

    pub fn at(&self, index: usize) -> Option<&Setting> {
        self.items.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Setting> {
        self.items.get_mut(index)
    }

    pub fn get(&self, id: SettingId) -> Option<&Setting> {
        self.items.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SettingId) -> Option<&mut Setting> {
        self.items.iter_mut().find(|s| s.id == id)
    }

    /// Write the stored (committed) values back into `config`.
    pub fn apply_to(&self, config: &mut Config) {
        for s in &self.items {
            let v = s.value;
            match s.id {
                SettingId::StartupMode => {
                    config.file.device.startup_mode = if v == 1 {
                        StartupMode::Clock
                    } else {
                        StartupMode::Calculator
                    }
                }
                SettingId::ClockMode => config.file.clock.show_seconds = v == 0,
                SettingId::HourMode => {
                    config.file.clock.hour_mode = if v == 0 { HourMode::H12 } else { HourMode::H24 }
                }
                SettingId::LeadingZero => config.file.clock.leading_zero = v != 0,
                SettingId::ZeroPadding => config.file.calculator.zero_padding = v != 0,
                SettingId::UtcOffset => config.file.clock.utc_offset_minutes = v,
            }
        }
    }
}

fn value_of(config: &Config, id: SettingId) -> i32 {
    let file = &config.file;
    match id {
        SettingId::StartupMode => match file.device.startup_mode {
            StartupMode::Calculator => 0,
            StartupMode::Clock => 1,
        },
        SettingId::ClockMode => i32::from(!file.clock.show_seconds),
        SettingId::HourMode => match file.clock.hour_mode {
            HourMode::H12 => 0,
            HourMode::H24 => 1,
        },
        SettingId::LeadingZero => i32::from(file.clock.leading_zero),
        SettingId::ZeroPadding => i32::from(file.calculator.zero_padding),
        SettingId::UtcOffset => file.clock.utc_offset_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_follows_menu_order() {
        let settings = Settings::default();
        let ids: Vec<u8> = settings.iter().map(|s| s.id().number()).collect();
        assert_eq!(ids, vec![1, 5, 6, 7, 22, 42]);
        assert_eq!(settings.len(), 6);
        assert_eq!(SettingId::UtcOffset.to_string(), "42");
        assert_eq!(SettingId::StartupMode.to_string(), "01");
    }

    #[test]
    fn values_load_from_config() {
        let mut cfg = Config::default();
        cfg.file.clock.hour_mode = HourMode::H12;
        cfg.file.clock.utc_offset_minutes = 60;
        let settings = Settings::from_config(&cfg);
        let hour = settings.get(SettingId::HourMode).unwrap();
        assert_eq!(hour.get(), 0);
        assert_eq!(hour.temp(), 0);
        assert_eq!(hour.default_value(), 1);
        assert_eq!(settings.get(SettingId::UtcOffset).unwrap().get(), 60);
    }

    #[test]
    fn out_of_range_config_value_keeps_default() {
        let mut cfg = Config::default();
        cfg.file.clock.utc_offset_minutes = 5000;
        let settings = Settings::from_config(&cfg);
        assert_eq!(settings.get(SettingId::UtcOffset).unwrap().get(), 0);
    }

    #[test]
    fn set_is_range_checked() {
        let mut s = Setting::new(SettingId::LeadingZero, 1, 0, 1);
        assert_eq!(
            s.set(2),
            Err(ConfigError::OutOfRange {
                id: SettingId::LeadingZero,
                value: 2,
                min: 0,
                max: 1
            })
        );
        assert_eq!(s.get(), 1);
        assert!(s.set_temp(-1).is_err());
        assert_eq!(s.temp(), 1);
        s.set(0).unwrap();
        assert_eq!(s.get(), 0);
    }

    #[test]
    fn temp_edit_commit_revert_reset() {
        let mut s = Setting::new(SettingId::UtcOffset, 0, -720, 840);
        assert!(s.step_temp(30));
        assert_eq!(s.temp(), 30);
        assert_eq!(s.get(), 0);
        s.revert_temp();
        assert_eq!(s.temp(), 0);
        s.step_temp(-15);
        s.commit();
        assert_eq!(s.get(), -15);
        s.reset();
        assert_eq!((s.get(), s.temp()), (0, 0));
    }

    #[test]
    fn step_stops_at_range_ends() {
        let mut s = Setting::new(SettingId::ZeroPadding, 0, 0, 1);
        assert!(!s.step_temp(-1));
        assert!(s.step_temp(1));
        assert!(!s.step_temp(1));
        assert_eq!(s.temp(), 1);
    }

    #[test]
    fn apply_writes_committed_values_back() {
        let mut cfg = Config::default();
        let mut settings = Settings::from_config(&cfg);
        settings.get_mut(SettingId::StartupMode).unwrap().set(1).unwrap();
        settings.get_mut(SettingId::ClockMode).unwrap().set(1).unwrap();
        settings.get_mut(SettingId::ZeroPadding).unwrap().set(1).unwrap();
        // Uncommitted edits do not leak.
        settings.get_mut(SettingId::LeadingZero).unwrap().step_temp(-1);
        settings.apply_to(&mut cfg);
        assert_eq!(cfg.file.device.startup_mode, StartupMode::Clock);
        assert!(!cfg.file.clock.show_seconds);
        assert!(cfg.file.calculator.zero_padding);
        assert!(cfg.file.clock.leading_zero);
    }

    #[test]
    fn clock_mode_offers_only_the_two_time_layouts() {
        let mut settings = Settings::from_config(&Config::default());
        let clock_mode = settings.get_mut(SettingId::ClockMode).unwrap();
        assert_eq!((clock_mode.min(), clock_mode.max()), (0, 1));
        assert!(clock_mode.set(2).is_err());
        assert_eq!(clock_mode.get(), 0);
    }

    #[test]
    fn lookup_by_number() {
        assert_eq!(SettingId::from_number(22), Ok(SettingId::ZeroPadding));
        assert_eq!(SettingId::from_number(3), Err(ConfigError::UnknownSetting(3)));
    }
}
