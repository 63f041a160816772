//! Calculator core: the arithmetic engine and the display formatter.
//!
//! The engine is a single-pending-operation state machine in the style of a
//! classic pocket calculator (no operator precedence, repeat-equals chains,
//! relative percent). The formatter turns its `f64` display value into the
//! fixed-width, trailing-zero-trimmed string shown on the tubes. Neither part
//! knows anything about keys or display hardware.

pub mod engine;
pub mod format;

pub use engine::{
    AngleMode, ArithmeticEngine, CalcError, MAX_CALC_VALUE, MAX_FACTORIAL, Operation,
    OperationKind, ReturnCode,
};
pub use format::{error_placeholder, format_value};
