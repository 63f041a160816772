//! Arithmetic engine.
//!
//! State machine over `(pending, number_entered, equals_entered, return_code)`:
//! * A binary operator is deferred until its right operand exists; pressing a
//!   second operator evaluates the first (left-to-right, no precedence).
//! * Repeated `=` replays the last right operand against the running result.
//! * Any error is sticky: every input except all-clear is ignored until the
//!   engine is reset. Memory survives all-clear and errors.

use std::f64::consts::{E, PI};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

/// Largest magnitude a result may have (14 significant digits).
pub const MAX_CALC_VALUE: f64 = 99_999_999_999_999.0;
/// Largest factorial operand accepted before reporting overflow.
pub const MAX_FACTORIAL: f64 = 20.0;

/// Every action the calculator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// No pending operation.
    None,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    SquareRoot,
    Reciprocal,
    Sin,
    Cos,
    Tan,
    Log10,
    Ln,
    SwitchSign,
    Factorial,
    MemClear,
    MemRead,
    MemStore,
    MemAdd,
    MemSubtract,
    Euler,
    Pi,
    AllClear,
    Clear,
    Equals,
    Percent,
}

/// Dispatch category of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Binary,
    Unary,
    Memory,
    Constant,
    Clear,
    Percent,
    Equals,
    Inert,
}

impl Operation {
    pub const fn kind(self) -> OperationKind {
        use Operation::*;
        match self {
            Add | Subtract | Multiply | Divide | Power => OperationKind::Binary,
            SquareRoot | Reciprocal | Sin | Cos | Tan | Log10 | Ln | SwitchSign | Factorial => {
                OperationKind::Unary
            }
            MemClear | MemRead | MemStore | MemAdd | MemSubtract => OperationKind::Memory,
            Euler | Pi => OperationKind::Constant,
            AllClear | Clear => OperationKind::Clear,
            Percent => OperationKind::Percent,
            Equals => OperationKind::Equals,
            None => OperationKind::Inert,
        }
    }
}

/// Unit used by sin, cos and tan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleMode {
    #[default]
    Degrees,
    Radians,
}

/// Reasons an evaluation fails. Each one puts the engine into its sticky error state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    #[error("result exceeds the displayable range")]
    Overflow,
    #[error("division by zero")]
    DivideByZero,
    #[error("argument outside the domain of the function")]
    Domain,
    #[error("operation {0:?} cannot be evaluated")]
    UnknownOperation(Operation),
}

/// Outcome of the last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnCode {
    #[default]
    Success,
    Failed(CalcError),
}

impl ReturnCode {
    pub fn is_success(self) -> bool {
        matches!(self, ReturnCode::Success)
    }

    pub fn error(self) -> Option<CalcError> {
        match self {
            ReturnCode::Success => None,
            ReturnCode::Failed(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArithmeticEngine {
    display_value: f64,
    left_value: f64,
    right_value: f64,
    memory_value: f64,
    pending: Operation,
    number_entered: bool,
    equals_entered: bool,
    return_code: ReturnCode,
    angle_mode: AngleMode,
}

impl Default for ArithmeticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEngine {
    pub fn new() -> Self {
        Self::with_angle_mode(AngleMode::Degrees)
    }

    pub fn with_angle_mode(angle_mode: AngleMode) -> Self {
        Self {
            display_value: 0.0,
            left_value: 0.0,
            right_value: 0.0,
            memory_value: 0.0,
            pending: Operation::None,
            number_entered: false,
            equals_entered: false,
            return_code: ReturnCode::Success,
            angle_mode,
        }
    }

    pub fn display_value(&self) -> f64 {
        self.display_value
    }

    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }

    pub fn memory_value(&self) -> f64 {
        self.memory_value
    }

    pub fn pending_operation(&self) -> Operation {
        self.pending
    }

    pub fn left_value(&self) -> f64 {
        self.left_value
    }

    pub fn right_value(&self) -> f64 {
        self.right_value
    }

    pub fn number_entered(&self) -> bool {
        self.number_entered
    }

    pub fn equals_entered(&self) -> bool {
        self.equals_entered
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.angle_mode
    }

    pub fn set_angle_mode(&mut self, angle_mode: AngleMode) {
        self.angle_mode = angle_mode;
    }

    /// Latch a freshly entered value. Ignored while an error is pending.
    pub fn on_numeric_input(&mut self, value: f64) {
        if !self.return_code.is_success() {
            return;
        }
        if self.equals_entered {
            // A number right after `=` starts a new expression.
            self.equals_entered = false;
            self.pending = Operation::None;
            self.left_value = 0.0;
            self.right_value = 0.0;
        }
        self.display_value = value;
        self.number_entered = true;
        trace!(target: "calc.engine", value, "numeric_input");
    }

    /// Apply an operation. While an error is pending only [`Operation::AllClear`] is honored.
    pub fn on_operation(&mut self, op: Operation) {
        if !self.return_code.is_success() {
            if op == Operation::AllClear {
                self.all_clear();
            }
            return;
        }
        match op.kind() {
            OperationKind::Binary => self.on_binary(op),
            OperationKind::Unary => self.on_unary(op),
            OperationKind::Memory => self.on_memory(op),
            OperationKind::Constant => self.on_constant(op),
            OperationKind::Clear => self.on_clear(op),
            OperationKind::Percent => self.on_percent(),
            OperationKind::Equals => self.on_equals(),
            OperationKind::Inert => {}
        }
        trace!(
            target: "calc.engine",
            ?op,
            display = self.display_value,
            left = self.left_value,
            pending = ?self.pending,
            "operation"
        );
    }

    fn on_binary(&mut self, op: Operation) {
        if self.pending == Operation::None {
            self.left_value = self.display_value;
            self.pending = op;
        } else if !self.number_entered {
            if self.equals_entered {
                self.left_value = self.display_value;
            }
            // Operator changed without a new operand.
            self.pending = op;
        } else {
            let result = self.evaluate(self.pending, self.left_value, self.display_value);
            self.display_value = result;
            self.left_value = result;
            self.pending = op;
        }
        self.number_entered = false;
        self.equals_entered = false;
    }

    fn on_unary(&mut self, op: Operation) {
        let result = self.evaluate(op, self.display_value, 0.0);
        if self.pending == Operation::None {
            self.left_value = result;
        }
        self.display_value = result;
    }

    fn on_equals(&mut self) {
        if self.pending == Operation::None {
            return;
        }
        if !self.equals_entered {
            let result = self.evaluate(self.pending, self.left_value, self.display_value);
            self.equals_entered = true;
            self.right_value = self.display_value;
            self.display_value = result;
        } else {
            let result = self.evaluate(self.pending, self.display_value, self.right_value);
            self.left_value = self.display_value;
            self.display_value = result;
        }
        self.number_entered = false;
    }

    fn on_percent(&mut self) {
        if self.pending == Operation::None || self.equals_entered {
            let result = self.checked(self.display_value / 100.0);
            self.display_value = result;
            self.left_value = result;
            self.number_entered = false;
            return;
        }
        let raw = match self.pending {
            Operation::Add | Operation::Subtract => self.left_value * self.display_value / 100.0,
            _ => self.display_value / 100.0,
        };
        self.display_value = self.checked(raw);
    }

    fn on_memory(&mut self, op: Operation) {
        match op {
            Operation::MemClear => self.memory_value = 0.0,
            Operation::MemRead => self.on_numeric_input(self.memory_value),
            Operation::MemStore => self.memory_value = self.display_value,
            Operation::MemAdd => self.accumulate(self.memory_value + self.display_value),
            Operation::MemSubtract => self.accumulate(self.memory_value - self.display_value),
            _ => {}
        }
    }

    /// Memory is bounded like any result; on overflow the register keeps its old value.
    fn accumulate(&mut self, value: f64) {
        match bound(value) {
            Ok(value) => self.memory_value = value,
            Err(e) => self.fail(e),
        }
    }

    fn on_constant(&mut self, op: Operation) {
        match op {
            Operation::Euler => self.on_numeric_input(E),
            Operation::Pi => self.on_numeric_input(PI),
            _ => {}
        }
    }

    fn on_clear(&mut self, op: Operation) {
        match op {
            Operation::AllClear => self.all_clear(),
            Operation::Clear => self.display_value = 0.0,
            _ => {}
        }
    }

    /// Reset everything except memory and angle mode.
    fn all_clear(&mut self) {
        self.left_value = 0.0;
        self.right_value = 0.0;
        self.display_value = 0.0;
        self.return_code = ReturnCode::Success;
        self.pending = Operation::None;
        self.number_entered = false;
        self.equals_entered = false;
        trace!(target: "calc.engine", "all_clear");
    }

    /// Evaluate and latch the return code. Errors yield 0.
    fn evaluate(&mut self, op: Operation, left: f64, right: f64) -> f64 {
        match self.calculate_value(op, left, right) {
            Ok(value) => value,
            Err(e) => {
                self.fail(e);
                0.0
            }
        }
    }

    /// Apply the magnitude bound to a value computed outside `calculate_value`.
    fn checked(&mut self, value: f64) -> f64 {
        match bound(value) {
            Ok(value) => value,
            Err(e) => {
                self.fail(e);
                0.0
            }
        }
    }

    fn fail(&mut self, e: CalcError) {
        debug!(target: "calc.engine", error = %e, "error_state_entered");
        self.return_code = ReturnCode::Failed(e);
    }

    /// Pure evaluation of `op`. Unary operations ignore `right`.
    pub fn calculate_value(&self, op: Operation, left: f64, right: f64) -> Result<f64, CalcError> {
        let result = match op {
            Operation::Add => left + right,
            Operation::Subtract => left - right,
            Operation::Multiply => left * right,
            Operation::Divide => {
                if right == 0.0 {
                    return Err(CalcError::DivideByZero);
                }
                left / right
            }
            Operation::Power => left.powf(right),
            Operation::SquareRoot => {
                if left < 0.0 {
                    return Err(CalcError::Domain);
                }
                left.sqrt()
            }
            Operation::Reciprocal => {
                if left == 0.0 {
                    return Err(CalcError::DivideByZero);
                }
                1.0 / left
            }
            Operation::Sin => self.to_radians(left).sin(),
            Operation::Cos => self.to_radians(left).cos(),
            Operation::Tan => self.tangent(left)?,
            Operation::Log10 => {
                if left <= 0.0 {
                    return Err(CalcError::Domain);
                }
                left.log10()
            }
            Operation::Ln => {
                if left <= 0.0 {
                    return Err(CalcError::Domain);
                }
                left.ln()
            }
            Operation::SwitchSign => -left,
            Operation::Factorial => factorial(left)?,
            other => return Err(CalcError::UnknownOperation(other)),
        };
        bound(result)
    }

    fn to_radians(&self, angle: f64) -> f64 {
        match self.angle_mode {
            AngleMode::Degrees => angle * PI / 180.0,
            AngleMode::Radians => angle,
        }
    }

    fn tangent(&self, angle: f64) -> Result<f64, CalcError> {
        match self.angle_mode {
            AngleMode::Degrees => {
                // IEEE remainder: nearest multiple of 360, ties to even.
                let rem = angle - (angle / 360.0).round_ties_even() * 360.0;
                if rem.abs() == 90.0 {
                    return Err(CalcError::Domain);
                }
                Ok((angle * PI / 180.0).tan())
            }
            AngleMode::Radians => {
                if angle.cos() == 0.0 {
                    return Err(CalcError::Domain);
                }
                Ok(angle.tan())
            }
        }
    }
}

fn factorial(n: f64) -> Result<f64, CalcError> {
    if n > MAX_FACTORIAL {
        return Err(CalcError::Overflow);
    }
    if n < 0.0 || n != n.floor() {
        return Err(CalcError::Domain);
    }
    let product = (1..=n as u64).product::<u64>();
    Ok(product as f64)
}

/// Enforce the symmetric magnitude bound. NaN (e.g. a negative base raised to a
/// fractional power) has no real value and reports a domain error.
fn bound(value: f64) -> Result<f64, CalcError> {
    if value.is_nan() {
        return Err(CalcError::Domain);
    }
    if value.abs() > MAX_CALC_VALUE {
        return Err(CalcError::Overflow);
    }
    Ok(value)
}
