//! WebAssembly value representation

use super::RuntimeError;
use crate::parser::module::ValueType;
use std::fmt;

/// Runtime representation of WebAssembly values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Get the WebAssembly type of this value
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The zero value locals of this type start with
    pub fn default_for(typ: ValueType) -> Value {
        match typ {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    /// Convert to i32, returning None if wrong type
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64, returning None if wrong type
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f32, returning None if wrong type
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64, returning None if wrong type
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse command-line text as a value of the given type.
    ///
    /// Integers may be written signed or as their unsigned bit pattern, so
    /// `-1` and `4294967295` are the same i32. Floats accept anything Rust's
    /// float parser does, including `inf` and `NaN`.
    pub fn parse(typ: ValueType, text: &str) -> Result<Value, RuntimeError> {
        let text = text.trim();
        let invalid = || RuntimeError::InvalidArgument(format!("{text:?} is not a valid {typ}"));
        match typ {
            ValueType::I32 => text
                .parse::<i32>()
                .or_else(|_| text.parse::<u32>().map(|v| v as i32))
                .map(Value::I32)
                .map_err(|_| invalid()),
            ValueType::I64 => text
                .parse::<i64>()
                .or_else(|_| text.parse::<u64>().map(|v| v as i64))
                .map(Value::I64)
                .map_err(|_| invalid()),
            ValueType::F32 => text.parse::<f32>().map(Value::F32).map_err(|_| invalid()),
            ValueType::F64 => text.parse::<f64>().map(Value::F64).map_err(|_| invalid()),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_infinite() {
        f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{v}")
    }
}

/// Values display as bare numbers, the way a host language would print them.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) if v.is_infinite() => write_float(f, f64::from(*v)),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write_float(f, *v),
        }
    }
}
