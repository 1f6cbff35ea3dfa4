//! Numeric operations for WebAssembly
//!
//! Tests, comparisons, arithmetic and conversions. Integer arithmetic wraps;
//! division, remainder and float-to-int truncation trap where the result is
//! undefined. Float `min`, `max` and `nearest` follow WebAssembly rather than
//! Rust's library semantics (NaN wins, `-0 < +0`, ties to even).

use super::{RuntimeError, Stack, Value};
use crate::parser::instruction::NumericOp;

/// Pop the operands of `op`, apply it and push the result.
pub fn execute(stack: &mut Stack, op: NumericOp) -> Result<(), RuntimeError> {
    use NumericOp::*;

    macro_rules! unop {
        ($pop:ident, $wrap:ident, |$a:ident| $e:expr) => {{
            let $a = stack.$pop()?;
            Value::$wrap($e)
        }};
    }

    // c2 is on top of c1
    macro_rules! binop {
        ($pop:ident, $wrap:ident, |$a:ident, $b:ident| $e:expr) => {{
            let $b = stack.$pop()?;
            let $a = stack.$pop()?;
            Value::$wrap($e)
        }};
    }

    let result = match op {
        I32Eqz => unop!(pop_i32, I32, |a| (a == 0) as i32),
        I32Eq => binop!(pop_i32, I32, |a, b| (a == b) as i32),
        I32Ne => binop!(pop_i32, I32, |a, b| (a != b) as i32),
        I32LtS => binop!(pop_i32, I32, |a, b| (a < b) as i32),
        I32LtU => binop!(pop_i32, I32, |a, b| ((a as u32) < (b as u32)) as i32),
        I32GtS => binop!(pop_i32, I32, |a, b| (a > b) as i32),
        I32GtU => binop!(pop_i32, I32, |a, b| ((a as u32) > (b as u32)) as i32),
        I32LeS => binop!(pop_i32, I32, |a, b| (a <= b) as i32),
        I32LeU => binop!(pop_i32, I32, |a, b| ((a as u32) <= (b as u32)) as i32),
        I32GeS => binop!(pop_i32, I32, |a, b| (a >= b) as i32),
        I32GeU => binop!(pop_i32, I32, |a, b| ((a as u32) >= (b as u32)) as i32),

        I64Eqz => unop!(pop_i64, I32, |a| (a == 0) as i32),
        I64Eq => binop!(pop_i64, I32, |a, b| (a == b) as i32),
        I64Ne => binop!(pop_i64, I32, |a, b| (a != b) as i32),
        I64LtS => binop!(pop_i64, I32, |a, b| (a < b) as i32),
        I64LtU => binop!(pop_i64, I32, |a, b| ((a as u64) < (b as u64)) as i32),
        I64GtS => binop!(pop_i64, I32, |a, b| (a > b) as i32),
        I64GtU => binop!(pop_i64, I32, |a, b| ((a as u64) > (b as u64)) as i32),
        I64LeS => binop!(pop_i64, I32, |a, b| (a <= b) as i32),
        I64LeU => binop!(pop_i64, I32, |a, b| ((a as u64) <= (b as u64)) as i32),
        I64GeS => binop!(pop_i64, I32, |a, b| (a >= b) as i32),
        I64GeU => binop!(pop_i64, I32, |a, b| ((a as u64) >= (b as u64)) as i32),

        F32Eq => binop!(pop_f32, I32, |a, b| (a == b) as i32),
        F32Ne => binop!(pop_f32, I32, |a, b| (a != b) as i32),
        F32Lt => binop!(pop_f32, I32, |a, b| (a < b) as i32),
        F32Gt => binop!(pop_f32, I32, |a, b| (a > b) as i32),
        F32Le => binop!(pop_f32, I32, |a, b| (a <= b) as i32),
        F32Ge => binop!(pop_f32, I32, |a, b| (a >= b) as i32),
        F64Eq => binop!(pop_f64, I32, |a, b| (a == b) as i32),
        F64Ne => binop!(pop_f64, I32, |a, b| (a != b) as i32),
        F64Lt => binop!(pop_f64, I32, |a, b| (a < b) as i32),
        F64Gt => binop!(pop_f64, I32, |a, b| (a > b) as i32),
        F64Le => binop!(pop_f64, I32, |a, b| (a <= b) as i32),
        F64Ge => binop!(pop_f64, I32, |a, b| (a >= b) as i32),

        I32Clz => unop!(pop_i32, I32, |a| a.leading_zeros() as i32),
        I32Ctz => unop!(pop_i32, I32, |a| a.trailing_zeros() as i32),
        I32Popcnt => unop!(pop_i32, I32, |a| a.count_ones() as i32),
        I32Add => binop!(pop_i32, I32, |a, b| a.wrapping_add(b)),
        I32Sub => binop!(pop_i32, I32, |a, b| a.wrapping_sub(b)),
        I32Mul => binop!(pop_i32, I32, |a, b| a.wrapping_mul(b)),
        I32DivS => binop!(pop_i32, I32, |a, b| i32_div_s(a, b)?),
        I32DivU => binop!(pop_i32, I32, |a, b| i32_div_u(a, b)?),
        I32RemS => binop!(pop_i32, I32, |a, b| i32_rem_s(a, b)?),
        I32RemU => binop!(pop_i32, I32, |a, b| i32_rem_u(a, b)?),
        I32And => binop!(pop_i32, I32, |a, b| a & b),
        I32Or => binop!(pop_i32, I32, |a, b| a | b),
        I32Xor => binop!(pop_i32, I32, |a, b| a ^ b),
        I32Shl => binop!(pop_i32, I32, |a, b| a.wrapping_shl(b as u32)),
        I32ShrS => binop!(pop_i32, I32, |a, b| a.wrapping_shr(b as u32)),
        I32ShrU => binop!(pop_i32, I32, |a, b| (a as u32).wrapping_shr(b as u32) as i32),
        I32Rotl => binop!(pop_i32, I32, |a, b| a.rotate_left(b as u32 % 32)),
        I32Rotr => binop!(pop_i32, I32, |a, b| a.rotate_right(b as u32 % 32)),

        I64Clz => unop!(pop_i64, I64, |a| i64::from(a.leading_zeros())),
        I64Ctz => unop!(pop_i64, I64, |a| i64::from(a.trailing_zeros())),
        I64Popcnt => unop!(pop_i64, I64, |a| i64::from(a.count_ones())),
        I64Add => binop!(pop_i64, I64, |a, b| a.wrapping_add(b)),
        I64Sub => binop!(pop_i64, I64, |a, b| a.wrapping_sub(b)),
        I64Mul => binop!(pop_i64, I64, |a, b| a.wrapping_mul(b)),
        I64DivS => binop!(pop_i64, I64, |a, b| i64_div_s(a, b)?),
        I64DivU => binop!(pop_i64, I64, |a, b| i64_div_u(a, b)?),
        I64RemS => binop!(pop_i64, I64, |a, b| i64_rem_s(a, b)?),
        I64RemU => binop!(pop_i64, I64, |a, b| i64_rem_u(a, b)?),
        I64And => binop!(pop_i64, I64, |a, b| a & b),
        I64Or => binop!(pop_i64, I64, |a, b| a | b),
        I64Xor => binop!(pop_i64, I64, |a, b| a ^ b),
        I64Shl => binop!(pop_i64, I64, |a, b| a.wrapping_shl(b as u32)),
        I64ShrS => binop!(pop_i64, I64, |a, b| a.wrapping_shr(b as u32)),
        I64ShrU => binop!(pop_i64, I64, |a, b| (a as u64).wrapping_shr(b as u32) as i64),
        I64Rotl => binop!(pop_i64, I64, |a, b| a.rotate_left((b % 64) as u32)),
        I64Rotr => binop!(pop_i64, I64, |a, b| a.rotate_right((b % 64) as u32)),

        F32Abs => unop!(pop_f32, F32, |a| a.abs()),
        F32Neg => unop!(pop_f32, F32, |a| -a),
        F32Ceil => unop!(pop_f32, F32, |a| a.ceil()),
        F32Floor => unop!(pop_f32, F32, |a| a.floor()),
        F32Trunc => unop!(pop_f32, F32, |a| a.trunc()),
        F32Nearest => unop!(pop_f32, F32, |a| a.round_ties_even()),
        F32Sqrt => unop!(pop_f32, F32, |a| a.sqrt()),
        F32Add => binop!(pop_f32, F32, |a, b| a + b),
        F32Sub => binop!(pop_f32, F32, |a, b| a - b),
        F32Mul => binop!(pop_f32, F32, |a, b| a * b),
        F32Div => binop!(pop_f32, F32, |a, b| a / b),
        F32Min => binop!(pop_f32, F32, |a, b| f32_min(a, b)),
        F32Max => binop!(pop_f32, F32, |a, b| f32_max(a, b)),
        F32Copysign => binop!(pop_f32, F32, |a, b| a.copysign(b)),

        F64Abs => unop!(pop_f64, F64, |a| a.abs()),
        F64Neg => unop!(pop_f64, F64, |a| -a),
        F64Ceil => unop!(pop_f64, F64, |a| a.ceil()),
        F64Floor => unop!(pop_f64, F64, |a| a.floor()),
        F64Trunc => unop!(pop_f64, F64, |a| a.trunc()),
        F64Nearest => unop!(pop_f64, F64, |a| a.round_ties_even()),
        F64Sqrt => unop!(pop_f64, F64, |a| a.sqrt()),
        F64Add => binop!(pop_f64, F64, |a, b| a + b),
        F64Sub => binop!(pop_f64, F64, |a, b| a - b),
        F64Mul => binop!(pop_f64, F64, |a, b| a * b),
        F64Div => binop!(pop_f64, F64, |a, b| a / b),
        F64Min => binop!(pop_f64, F64, |a, b| f64_min(a, b)),
        F64Max => binop!(pop_f64, F64, |a, b| f64_max(a, b)),
        F64Copysign => binop!(pop_f64, F64, |a, b| a.copysign(b)),

        I32WrapI64 => unop!(pop_i64, I32, |a| a as i32),
        I32TruncF32S => unop!(pop_f32, I32, |a| trunc_i32(f64::from(a))?),
        I32TruncF32U => unop!(pop_f32, I32, |a| trunc_u32(f64::from(a))? as i32),
        I32TruncF64S => unop!(pop_f64, I32, |a| trunc_i32(a)?),
        I32TruncF64U => unop!(pop_f64, I32, |a| trunc_u32(a)? as i32),
        I64ExtendI32S => unop!(pop_i32, I64, |a| i64::from(a)),
        I64ExtendI32U => unop!(pop_i32, I64, |a| i64::from(a as u32)),
        I64TruncF32S => unop!(pop_f32, I64, |a| trunc_i64(f64::from(a))?),
        I64TruncF32U => unop!(pop_f32, I64, |a| trunc_u64(f64::from(a))? as i64),
        I64TruncF64S => unop!(pop_f64, I64, |a| trunc_i64(a)?),
        I64TruncF64U => unop!(pop_f64, I64, |a| trunc_u64(a)? as i64),
        F32ConvertI32S => unop!(pop_i32, F32, |a| a as f32),
        F32ConvertI32U => unop!(pop_i32, F32, |a| a as u32 as f32),
        F32ConvertI64S => unop!(pop_i64, F32, |a| a as f32),
        F32ConvertI64U => unop!(pop_i64, F32, |a| a as u64 as f32),
        F32DemoteF64 => unop!(pop_f64, F32, |a| a as f32),
        F64ConvertI32S => unop!(pop_i32, F64, |a| f64::from(a)),
        F64ConvertI32U => unop!(pop_i32, F64, |a| f64::from(a as u32)),
        F64ConvertI64S => unop!(pop_i64, F64, |a| a as f64),
        F64ConvertI64U => unop!(pop_i64, F64, |a| a as u64 as f64),
        F64PromoteF32 => unop!(pop_f32, F64, |a| f64::from(a)),
        I32ReinterpretF32 => unop!(pop_f32, I32, |a| a.to_bits() as i32),
        I64ReinterpretF64 => unop!(pop_f64, I64, |a| a.to_bits() as i64),
        F32ReinterpretI32 => unop!(pop_i32, F32, |a| f32::from_bits(a as u32)),
        F64ReinterpretI64 => unop!(pop_i64, F64, |a| f64::from_bits(a as u64)),

        I32Extend8S => unop!(pop_i32, I32, |a| i32::from(a as i8)),
        I32Extend16S => unop!(pop_i32, I32, |a| i32::from(a as i16)),
        I64Extend8S => unop!(pop_i64, I64, |a| i64::from(a as i8)),
        I64Extend16S => unop!(pop_i64, I64, |a| i64::from(a as i16)),
        I64Extend32S => unop!(pop_i64, I64, |a| i64::from(a as i32)),

        // `as` saturates and maps NaN to zero, which is exactly trunc_sat
        I32TruncSatF32S => unop!(pop_f32, I32, |a| a as i32),
        I32TruncSatF32U => unop!(pop_f32, I32, |a| a as u32 as i32),
        I32TruncSatF64S => unop!(pop_f64, I32, |a| a as i32),
        I32TruncSatF64U => unop!(pop_f64, I32, |a| a as u32 as i32),
        I64TruncSatF32S => unop!(pop_f32, I64, |a| a as i64),
        I64TruncSatF32U => unop!(pop_f32, I64, |a| a as u64 as i64),
        I64TruncSatF64S => unop!(pop_f64, I64, |a| a as i64),
        I64TruncSatF64U => unop!(pop_f64, I64, |a| a as u64 as i64),
    };

    stack.push(result);
    Ok(())
}

macro_rules! int_division {
    ($div_s:ident, $div_u:ident, $rem_s:ident, $rem_u:ident, $signed:ty, $unsigned:ty) => {
        pub fn $div_s(a: $signed, b: $signed) -> Result<$signed, RuntimeError> {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            // only MIN / -1 is left to overflow
            a.checked_div(b).ok_or(RuntimeError::IntegerOverflow)
        }

        pub fn $div_u(a: $signed, b: $signed) -> Result<$signed, RuntimeError> {
            (a as $unsigned)
                .checked_div(b as $unsigned)
                .map(|v| v as $signed)
                .ok_or(RuntimeError::DivisionByZero)
        }

        pub fn $rem_s(a: $signed, b: $signed) -> Result<$signed, RuntimeError> {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(a.wrapping_rem(b))
        }

        pub fn $rem_u(a: $signed, b: $signed) -> Result<$signed, RuntimeError> {
            (a as $unsigned)
                .checked_rem(b as $unsigned)
                .map(|v| v as $signed)
                .ok_or(RuntimeError::DivisionByZero)
        }
    };
}

int_division!(i32_div_s, i32_div_u, i32_rem_s, i32_rem_u, i32, u32);
int_division!(i64_div_s, i64_div_u, i64_rem_s, i64_rem_u, i64, u64);

macro_rules! float_min_max {
    ($min:ident, $max:ident, $t:ty) => {
        pub fn $min(a: $t, b: $t) -> $t {
            if a.is_nan() || b.is_nan() {
                <$t>::NAN
            } else if a == b {
                // equal but possibly differently signed zeros
                if a.is_sign_negative() {
                    a
                } else {
                    b
                }
            } else {
                a.min(b)
            }
        }

        pub fn $max(a: $t, b: $t) -> $t {
            if a.is_nan() || b.is_nan() {
                <$t>::NAN
            } else if a == b {
                if a.is_sign_positive() {
                    a
                } else {
                    b
                }
            } else {
                a.max(b)
            }
        }
    };
}

float_min_max!(f32_min, f32_max, f32);
float_min_max!(f64_min, f64_max, f64);

// Truncation checks the already-truncated value against the exclusive
// bounds of the target range. f32 inputs widen to f64 exactly.

pub fn trunc_i32(x: f64) -> Result<i32, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::InvalidConversion);
    }
    let t = x.trunc();
    if !(-2147483648.0..2147483648.0).contains(&t) {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(t as i32)
}

pub fn trunc_u32(x: f64) -> Result<u32, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::InvalidConversion);
    }
    let t = x.trunc();
    if t < 0.0 || t >= 4294967296.0 {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(t as u32)
}

pub fn trunc_i64(x: f64) -> Result<i64, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::InvalidConversion);
    }
    let t = x.trunc();
    if !(-9223372036854775808.0..9223372036854775808.0).contains(&t) {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(t as i64)
}

pub fn trunc_u64(x: f64) -> Result<u64, RuntimeError> {
    if x.is_nan() {
        return Err(RuntimeError::InvalidConversion);
    }
    let t = x.trunc();
    if t < 0.0 || t >= 18446744073709551616.0 {
        return Err(RuntimeError::IntegerOverflow);
    }
    Ok(t as u64)
}
