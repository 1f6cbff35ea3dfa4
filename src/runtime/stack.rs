//! The operand stack shared by every frame of one invocation

use super::{RuntimeError, Value};
use crate::parser::module::ValueType;

#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

macro_rules! typed_pop {
    ($name:ident, $ty:ty, $variant:ident) => {
        pub fn $name(&mut self) -> Result<$ty, RuntimeError> {
            match self.pop()? {
                Value::$variant(v) => Ok(v),
                other => Err(RuntimeError::TypeMismatch {
                    expected: ValueType::$variant.to_string(),
                    actual: other.typ().to_string(),
                }),
            }
        }
    };
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop a value and check its type
    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        if value.typ() != expected {
            return Err(RuntimeError::TypeMismatch {
                expected: expected.to_string(),
                actual: value.typ().to_string(),
            });
        }
        Ok(value)
    }

    typed_pop!(pop_i32, i32, I32);
    typed_pop!(pop_i64, i64, I64);
    typed_pop!(pop_f32, f32, F32);
    typed_pop!(pop_f64, f64, F64);

    /// Pop the top `count` values, returned in push order
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .values
            .len()
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.values.split_off(start))
    }

    /// Unwind to `height`, keeping the top `arity` values. This is how a
    /// branch carries its label's values out of the block it leaves.
    pub fn keep_top(&mut self, height: usize, arity: usize) -> Result<(), RuntimeError> {
        let len = self.values.len();
        if len < height + arity {
            return Err(RuntimeError::StackUnderflow);
        }
        self.values.drain(height..len - arity);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
