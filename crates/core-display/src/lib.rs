//! core-display: tube display geometry and string -> frame mapping.
//!
//! A [`DisplayProfile`] names one concrete tube board. Geometry is a static
//! choice made at startup, so it is a plain sum type with accessor methods
//! rather than a trait object. [`DisplayFrame`] is the lit/unlit state of
//! every tube, decimal point and sign indicator for one rendered string;
//! the hardware driver (or the terminal simulator) consumes it as-is.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

/// Supported tube boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayProfile {
    #[default]
    In12,
    In16,
    In17,
    B5870,
}

impl DisplayProfile {
    pub const ALL: [DisplayProfile; 4] = [Self::In12, Self::In16, Self::In17, Self::B5870];

    pub const fn digit_count(self) -> usize {
        14
    }

    pub const fn decimal_point_count(self) -> usize {
        14
    }

    /// Only the IN-12 board carries a dedicated plus indicator.
    pub const fn has_plus_sign(self) -> bool {
        matches!(self, Self::In12)
    }

    pub const fn has_menu_sign(self) -> bool {
        matches!(self, Self::In12)
    }

    pub const fn led_count(self) -> usize {
        match self {
            Self::In12 => 15,
            Self::In16 | Self::In17 | Self::B5870 => 14,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::In12 => "in12",
            Self::In16 => "in16",
            Self::In17 => "in17",
            Self::B5870 => "b5870",
        }
    }
}

impl fmt::Display for DisplayProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown display profile `{0}` (expected one of in12, in16, in17, b5870)")]
pub struct UnknownProfile(pub String);

impl FromStr for DisplayProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "");
        DisplayProfile::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

/// Lit state of one display for one rendered string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    profile: DisplayProfile,
    digits: Vec<Option<u8>>,
    decimal_points: Vec<bool>,
    minus: bool,
    plus: bool,
    menu: bool,
}

impl DisplayFrame {
    /// All tubes dark.
    pub fn blank(profile: DisplayProfile) -> Self {
        Self {
            profile,
            digits: vec![None; profile.digit_count()],
            decimal_points: vec![false; profile.decimal_point_count()],
            minus: false,
            plus: false,
            menu: false,
        }
    }

    /// Map `text` right-to-left onto the tubes.
    ///
    /// Digits light the current tube and move one position left. A `.` lights
    /// the point to the right of the current tube without moving, except that
    /// a second consecutive `.` first steps left so a run of dots lands on
    /// adjacent points. Signs set their indicators. Anything else leaves one
    /// tube dark. Characters past the leftmost tube are dropped.
    pub fn render(profile: DisplayProfile, text: &str, zero_padding: bool) -> Self {
        let mut frame = Self::blank(profile);
        if zero_padding {
            frame.digits.iter_mut().for_each(|d| *d = Some(0));
        }

        let mut pos = profile.digit_count() as isize - 1;
        let mut prev_dot = false;
        for ch in text.chars().rev() {
            match ch {
                '-' => frame.minus = true,
                '+' => frame.plus = profile.has_plus_sign(),
                '.' => {
                    if prev_dot {
                        pos -= 1;
                    }
                    if let Some(dp) = usize::try_from(pos)
                        .ok()
                        .and_then(|i| frame.decimal_points.get_mut(i))
                    {
                        *dp = true;
                    }
                    prev_dot = true;
                    continue;
                }
                '0'..='9' => {
                    if let Some(slot) = usize::try_from(pos)
                        .ok()
                        .and_then(|i| frame.digits.get_mut(i))
                    {
                        *slot = ch.to_digit(10).map(|d| d as u8);
                    }
                    pos -= 1;
                }
                _ => pos -= 1,
            }
            prev_dot = false;
        }
        trace!(target: "display", %profile, text, "render");
        frame
    }

    pub fn profile(&self) -> DisplayProfile {
        self.profile
    }

    pub fn digit(&self, index: usize) -> Option<u8> {
        self.digits.get(index).copied().flatten()
    }

    pub fn decimal_point(&self, index: usize) -> bool {
        self.decimal_points.get(index).copied().unwrap_or(false)
    }

    pub fn minus_sign(&self) -> bool {
        self.minus
    }

    pub fn plus_sign(&self) -> bool {
        self.plus
    }

    pub fn menu_sign(&self) -> bool {
        self.menu
    }

    /// Light the menu indicator; ignored on boards without one.
    pub fn set_menu_sign(&mut self, on: bool) {
        self.menu = on && self.profile.has_menu_sign();
    }

    /// Number of tubes showing a digit.
    pub fn lit_digits(&self) -> usize {
        self.digits.iter().filter(|d| d.is_some()).count()
    }

    /// One-line rendering for a terminal: sign column, then each tube
    /// (blank as space) followed by its point when lit.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.digits.len() * 2 + 3);
        out.push(match (self.minus, self.plus) {
            (true, _) => '-',
            (false, true) => '+',
            _ => ' ',
        });
        for (i, d) in self.digits.iter().enumerate() {
            out.push(d.map_or(' ', |d| char::from(b'0' + d)));
            if self.decimal_point(i) {
                out.push('.');
            }
        }
        if self.menu {
            out.push_str(" M");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lit(frame: &DisplayFrame) -> Vec<(usize, u8)> {
        (0..frame.profile().digit_count())
            .filter_map(|i| frame.digit(i).map(|d| (i, d)))
            .collect()
    }

    #[test]
    fn profile_geometry() {
        assert!(DisplayProfile::In12.has_plus_sign());
        assert!(DisplayProfile::In12.has_menu_sign());
        assert_eq!(DisplayProfile::In12.led_count(), 15);
        for p in [DisplayProfile::In16, DisplayProfile::In17, DisplayProfile::B5870] {
            assert_eq!(p.digit_count(), 14);
            assert_eq!(p.decimal_point_count(), 14);
            assert!(!p.has_plus_sign());
            assert!(!p.has_menu_sign());
        }
    }

    #[test]
    fn profile_parses_case_insensitively() {
        assert_eq!("IN12".parse::<DisplayProfile>(), Ok(DisplayProfile::In12));
        assert_eq!("in-17".parse::<DisplayProfile>(), Ok(DisplayProfile::In17));
        assert_eq!("b5870".parse::<DisplayProfile>(), Ok(DisplayProfile::B5870));
        assert!("vfd".parse::<DisplayProfile>().is_err());
    }

    #[test]
    fn digits_are_right_aligned() {
        let f = DisplayFrame::render(DisplayProfile::In12, "123", false);
        assert_eq!(lit(&f), vec![(11, 1), (12, 2), (13, 3)]);
        assert!(!f.minus_sign());
    }

    #[test]
    fn decimal_point_sits_right_of_its_digit() {
        let f = DisplayFrame::render(DisplayProfile::In16, "-12.5", false);
        assert_eq!(lit(&f), vec![(11, 1), (12, 2), (13, 5)]);
        assert!(f.decimal_point(12));
        assert!(!f.decimal_point(13));
        assert!(f.minus_sign());
    }

    #[test]
    fn run_of_dots_fills_adjacent_points() {
        let f = DisplayFrame::render(DisplayProfile::In12, "..............", false);
        assert!((0..14).all(|i| f.decimal_point(i)));
        assert_eq!(f.lit_digits(), 0);
    }

    #[test]
    fn plus_sign_only_on_supporting_boards() {
        assert!(DisplayFrame::render(DisplayProfile::In12, "+7", false).plus_sign());
        assert!(!DisplayFrame::render(DisplayProfile::In17, "+7", false).plus_sign());
    }

    #[test]
    fn other_characters_leave_a_gap() {
        let f = DisplayFrame::render(DisplayProfile::In12, "12 34", false);
        assert_eq!(lit(&f), vec![(9, 1), (10, 2), (12, 3), (13, 4)]);
    }

    #[test]
    fn zero_padding_fills_unused_tubes() {
        let f = DisplayFrame::render(DisplayProfile::In12, "42", true);
        assert_eq!(f.lit_digits(), 14);
        assert_eq!(f.digit(0), Some(0));
        assert_eq!(f.digit(13), Some(2));
    }

    #[test]
    fn overlong_text_is_clipped_on_the_left() {
        let f = DisplayFrame::render(DisplayProfile::In12, "1234567890123456", false);
        assert_eq!(f.digit(0), Some(3));
        assert_eq!(f.digit(13), Some(6));
    }

    #[test]
    fn menu_sign_respects_hardware() {
        let mut f = DisplayFrame::blank(DisplayProfile::In12);
        f.set_menu_sign(true);
        assert!(f.menu_sign());
        let mut f = DisplayFrame::blank(DisplayProfile::B5870);
        f.set_menu_sign(true);
        assert!(!f.menu_sign());
    }

    #[test]
    fn text_rendering() {
        let f = DisplayFrame::render(DisplayProfile::In12, "-12.5", false);
        assert_eq!(f.to_text(), format!("-{}12.5", " ".repeat(11)));
        let f = DisplayFrame::render(DisplayProfile::In12, "0", false);
        assert_eq!(f.to_text(), format!(" {}0", " ".repeat(13)));
    }
}
