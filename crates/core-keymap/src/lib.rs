//! core-keymap: keypad code -> key function decoding.
//!
//! Design principles:
//! - Pure and total: the result depends only on `(code, function_held)`; codes
//!   outside the layout decode to [`KeyFunction::Unknown`], never an error.
//! - Two layers: the modifier layer is consulted first and only remaps a few
//!   keys (inverse -> factorial, ln -> e, sin -> pi). Every other key is
//!   `Unknown` while the function key is held.
//! - No side effects: logging only at TRACE.

use core_calc::Operation;
use core_events::KeyCode;
use smallvec::{SmallVec, smallvec};
use tracing::trace;

/// Semantic meaning of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFunction {
    /// A single digit 0..=9.
    Numeric(u8),
    /// The `00` key: the digit entered twice.
    NumericX2(u8),
    DecimalPoint,
    Operation(Operation),
    Unknown,
}

impl KeyFunction {
    /// Digits to append to the entry buffer, in order. Empty for non-numeric keys.
    pub fn digits(&self) -> SmallVec<[u8; 2]> {
        match *self {
            KeyFunction::Numeric(d) => smallvec![d],
            KeyFunction::NumericX2(d) => smallvec![d, d],
            _ => SmallVec::new(),
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match *self {
            KeyFunction::Operation(op) => Some(op),
            _ => None,
        }
    }
}

/// Decode a raw key code, branching on the function modifier first.
pub fn decode(code: KeyCode, function_held: bool) -> KeyFunction {
    let out = if function_held {
        decode_function_layer(code)
    } else {
        decode_base_layer(code)
    };
    trace!(target: "input.keymap", code = code.0, function_held, ?out, "decode");
    out
}

fn decode_function_layer(code: KeyCode) -> KeyFunction {
    match code {
        KeyCode::INV => KeyFunction::Operation(Operation::Factorial),
        KeyCode::LN => KeyFunction::Operation(Operation::Euler),
        KeyCode::SIN => KeyFunction::Operation(Operation::Pi),
        _ => KeyFunction::Unknown,
    }
}

fn decode_base_layer(code: KeyCode) -> KeyFunction {
    let op = match code {
        KeyCode::DIGIT_0 => return KeyFunction::Numeric(0),
        KeyCode::DIGIT_1 => return KeyFunction::Numeric(1),
        KeyCode::DIGIT_2 => return KeyFunction::Numeric(2),
        KeyCode::DIGIT_3 => return KeyFunction::Numeric(3),
        KeyCode::DIGIT_4 => return KeyFunction::Numeric(4),
        KeyCode::DIGIT_5 => return KeyFunction::Numeric(5),
        KeyCode::DIGIT_6 => return KeyFunction::Numeric(6),
        KeyCode::DIGIT_7 => return KeyFunction::Numeric(7),
        KeyCode::DIGIT_8 => return KeyFunction::Numeric(8),
        KeyCode::DIGIT_9 => return KeyFunction::Numeric(9),
        KeyCode::DOUBLE_ZERO => return KeyFunction::NumericX2(0),
        KeyCode::DOT => return KeyFunction::DecimalPoint,
        KeyCode::AC => Operation::AllClear,
        KeyCode::C => Operation::Clear,
        KeyCode::PLUSMINUS => Operation::SwitchSign,
        KeyCode::PLUS => Operation::Add,
        KeyCode::MINUS => Operation::Subtract,
        KeyCode::EQUALS => Operation::Equals,
        KeyCode::DIV => Operation::Divide,
        KeyCode::MUL => Operation::Multiply,
        KeyCode::PERCENT => Operation::Percent,
        KeyCode::SQUAREROOT => Operation::SquareRoot,
        KeyCode::MC => Operation::MemClear,
        KeyCode::MR => Operation::MemRead,
        KeyCode::MS => Operation::MemStore,
        KeyCode::MMINUS => Operation::MemSubtract,
        KeyCode::MPLUS => Operation::MemAdd,
        KeyCode::INV => Operation::Reciprocal,
        KeyCode::POW => Operation::Power,
        KeyCode::SIN => Operation::Sin,
        KeyCode::COS => Operation::Cos,
        KeyCode::TAN => Operation::Tan,
        KeyCode::LOG => Operation::Log10,
        KeyCode::LN => Operation::Ln,
        _ => return KeyFunction::Unknown,
    };
    KeyFunction::Operation(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn digits_decode_to_numeric() {
        for d in 0..=9u8 {
            let code = KeyCode::digit(d).unwrap();
            assert_eq!(decode(code, false), KeyFunction::Numeric(d));
        }
    }

    #[test]
    fn double_zero_emits_two_digits() {
        let f = decode(KeyCode::DOUBLE_ZERO, false);
        assert_eq!(f, KeyFunction::NumericX2(0));
        assert_eq!(f.digits().as_slice(), &[0, 0]);
        assert_eq!(KeyFunction::Numeric(7).digits().as_slice(), &[7]);
        assert!(KeyFunction::DecimalPoint.digits().is_empty());
    }

    #[test]
    fn operations_on_base_layer() {
        let cases = [
            (KeyCode::PLUS, Operation::Add),
            (KeyCode::MINUS, Operation::Subtract),
            (KeyCode::MUL, Operation::Multiply),
            (KeyCode::DIV, Operation::Divide),
            (KeyCode::POW, Operation::Power),
            (KeyCode::EQUALS, Operation::Equals),
            (KeyCode::PERCENT, Operation::Percent),
            (KeyCode::SQUAREROOT, Operation::SquareRoot),
            (KeyCode::INV, Operation::Reciprocal),
            (KeyCode::PLUSMINUS, Operation::SwitchSign),
            (KeyCode::SIN, Operation::Sin),
            (KeyCode::COS, Operation::Cos),
            (KeyCode::TAN, Operation::Tan),
            (KeyCode::LOG, Operation::Log10),
            (KeyCode::LN, Operation::Ln),
            (KeyCode::MC, Operation::MemClear),
            (KeyCode::MR, Operation::MemRead),
            (KeyCode::MS, Operation::MemStore),
            (KeyCode::MPLUS, Operation::MemAdd),
            (KeyCode::MMINUS, Operation::MemSubtract),
            (KeyCode::AC, Operation::AllClear),
            (KeyCode::C, Operation::Clear),
        ];
        for (code, op) in cases {
            assert_eq!(decode(code, false), KeyFunction::Operation(op), "{code}");
        }
    }

    #[test]
    fn modifier_layer_remaps_three_keys() {
        assert_eq!(
            decode(KeyCode::INV, true),
            KeyFunction::Operation(Operation::Factorial)
        );
        assert_eq!(
            decode(KeyCode::LN, true),
            KeyFunction::Operation(Operation::Euler)
        );
        assert_eq!(
            decode(KeyCode::SIN, true),
            KeyFunction::Operation(Operation::Pi)
        );
    }

    #[test]
    fn modifier_layer_hides_everything_else() {
        for code in [KeyCode::PLUS, KeyCode::DIGIT_5, KeyCode::DOT, KeyCode::AC] {
            assert_eq!(decode(code, true), KeyFunction::Unknown);
        }
    }

    #[test]
    fn decode_is_total() {
        for raw in 0..=u8::MAX {
            // Must not panic for any code in either layer.
            let _ = decode(KeyCode(raw), false);
            let _ = decode(KeyCode(raw), true);
        }
        assert_eq!(decode(KeyCode::FUNCTION, false), KeyFunction::Unknown);
        assert_eq!(decode(KeyCode(0), false), KeyFunction::Unknown);
        assert_eq!(decode(KeyCode(200), false), KeyFunction::Unknown);
    }

    #[test]
    fn operation_accessor() {
        assert_eq!(
            KeyFunction::Operation(Operation::Add).operation(),
            Some(Operation::Add)
        );
        assert_eq!(KeyFunction::Numeric(1).operation(), None);
    }
}
