//! Calculator mode: keystrokes -> entry buffer / engine -> display string.
//!
//! The controller keeps the number being typed as text until a non-digit key
//! commits it, so the tubes show exactly what was typed (`"0."`, `"12.50"`)
//! rather than a reformatted value. `input_pending` is true while such an
//! entry is open. Any accepted non-digit key closes it.

use core_calc::{AngleMode, ArithmeticEngine, Operation, error_placeholder, format_value};
use core_calc::format::used_digits;
use core_events::{KeyState, KeyboardEvent};
use core_keymap::{KeyFunction, decode};
use tracing::{trace, warn};

use crate::ModeHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorOptions {
    /// Digit budget of the attached display.
    pub digit_count: usize,
    /// Prefix strictly positive results of a sign flip with `+`.
    pub show_plus_sign: bool,
    pub angle_mode: AngleMode,
}

impl Default for CalculatorOptions {
    fn default() -> Self {
        Self {
            digit_count: 14,
            show_plus_sign: false,
            angle_mode: AngleMode::Degrees,
        }
    }
}

#[derive(Debug)]
pub struct CalculatorController {
    engine: ArithmeticEngine,
    options: CalculatorOptions,
    display: String,
    error: String,
    input_pending: bool,
}

impl Default for CalculatorController {
    fn default() -> Self {
        Self::new(CalculatorOptions::default())
    }
}

impl CalculatorController {
    pub fn new(options: CalculatorOptions) -> Self {
        Self {
            engine: ArithmeticEngine::with_angle_mode(options.angle_mode),
            options,
            display: "0".to_string(),
            error: error_placeholder(options.digit_count),
            input_pending: false,
        }
    }

    pub fn engine(&self) -> &ArithmeticEngine {
        &self.engine
    }

    pub fn options(&self) -> CalculatorOptions {
        self.options
    }

    pub fn input_pending(&self) -> bool {
        self.input_pending
    }

    pub fn set_angle_mode(&mut self, mode: AngleMode) {
        self.options.angle_mode = mode;
        self.engine.set_angle_mode(mode);
    }

    pub fn set_show_plus_sign(&mut self, show: bool) {
        self.options.show_plus_sign = show;
    }

    fn accepting_input(&self) -> bool {
        self.engine.return_code().is_success()
    }

    fn digit_input(&mut self, digit: u8) {
        if !self.accepting_input() {
            return;
        }
        if !self.input_pending {
            self.display.clear();
            self.input_pending = true;
        }
        let ch = char::from(b'0' + digit);
        if self.display == "0" {
            self.display.clear();
            self.display.push(ch);
        } else if used_digits(&self.display) < self.options.digit_count {
            self.display.push(ch);
        }
    }

    fn decimal_point_input(&mut self) {
        if !self.accepting_input() {
            return;
        }
        if !self.input_pending {
            self.display = "0.".to_string();
        } else if !self.display.contains('.') {
            self.display.push('.');
        }
        self.input_pending = true;
    }

    fn operation_input(&mut self, op: Operation) {
        if self.accepting_input() {
            if self.input_pending {
                self.commit_entry();
            }
            self.engine.on_operation(op);
            self.render(op);
        } else if op == Operation::AllClear {
            self.engine.on_operation(op);
            self.render(op);
        }
        self.input_pending = false;
    }

    fn commit_entry(&mut self) {
        match self.display.parse::<f64>() {
            Ok(value) => self.engine.on_numeric_input(value),
            Err(e) => {
                warn!(target: "modes.calculator", entry = %self.display, error = %e, "entry_not_numeric")
            }
        }
    }

    fn render(&mut self, op: Operation) {
        if !self.engine.return_code().is_success() {
            self.display.clone_from(&self.error);
            return;
        }
        let value = self.engine.display_value();
        let mut text = format_value(value, self.options.digit_count);
        if op == Operation::SwitchSign && self.options.show_plus_sign && value > 0.0 {
            text.insert(0, '+');
        }
        self.display = text;
    }
}

impl ModeHandler for CalculatorController {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn on_keyboard_event(&mut self, event: &KeyboardEvent) {
        if event.state != KeyState::Pressed {
            return;
        }
        let function = decode(event.code, event.function_held);
        match function {
            KeyFunction::Numeric(_) | KeyFunction::NumericX2(_) => {
                for d in function.digits() {
                    self.digit_input(d);
                }
            }
            KeyFunction::DecimalPoint => self.decimal_point_input(),
            KeyFunction::Operation(op) => self.operation_input(op),
            KeyFunction::Unknown => return,
        }
        trace!(target: "modes.calculator", %event, display = %self.display, pending = self.input_pending, "key");
    }

    fn display(&self) -> &str {
        &self.display
    }
}
