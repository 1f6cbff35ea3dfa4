//! Memory instructions
//!
//! Loads and stores compute the effective address as `addr + memarg.offset`
//! without wrapping; [`Memory`] does the bounds check.

use byteorder::{ByteOrder, LittleEndian};

use super::{MemArg, Memory, RuntimeError, Stack, Value};
use crate::parser::instruction::{LoadOp, StoreOp};

/// `[i32] -> [t]`
pub fn load(stack: &mut Stack, memory: &Memory, op: LoadOp, memarg: MemArg) -> Result<(), RuntimeError> {
    let addr = stack.pop_i32()? as u32;
    let bytes = memory.read(addr, memarg.offset, op.width() as usize)?;

    use LoadOp::*;
    let value = match op {
        I32Load => Value::I32(LittleEndian::read_i32(bytes)),
        I64Load => Value::I64(LittleEndian::read_i64(bytes)),
        F32Load => Value::F32(LittleEndian::read_f32(bytes)),
        F64Load => Value::F64(LittleEndian::read_f64(bytes)),
        I32Load8S => Value::I32(i32::from(bytes[0] as i8)),
        I32Load8U => Value::I32(i32::from(bytes[0])),
        I32Load16S => Value::I32(i32::from(LittleEndian::read_i16(bytes))),
        I32Load16U => Value::I32(i32::from(LittleEndian::read_u16(bytes))),
        I64Load8S => Value::I64(i64::from(bytes[0] as i8)),
        I64Load8U => Value::I64(i64::from(bytes[0])),
        I64Load16S => Value::I64(i64::from(LittleEndian::read_i16(bytes))),
        I64Load16U => Value::I64(i64::from(LittleEndian::read_u16(bytes))),
        I64Load32S => Value::I64(i64::from(LittleEndian::read_i32(bytes))),
        I64Load32U => Value::I64(i64::from(LittleEndian::read_u32(bytes))),
    };
    stack.push(value);
    Ok(())
}

/// `[i32 t] -> []`
pub fn store(stack: &mut Stack, memory: &mut Memory, op: StoreOp, memarg: MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_typed(op.value_type())?;
    let addr = stack.pop_i32()? as u32;

    let mut buf = [0u8; 8];
    let width = op.width() as usize;
    match value {
        Value::I32(v) => LittleEndian::write_u32(&mut buf, v as u32),
        Value::I64(v) => LittleEndian::write_u64(&mut buf, v as u64),
        Value::F32(v) => LittleEndian::write_f32(&mut buf, v),
        Value::F64(v) => LittleEndian::write_f64(&mut buf, v),
    }
    // narrow stores keep the low-order bytes
    memory.write(addr, memarg.offset, &buf[..width])
}

/// `memory.size`: `[] -> [i32]`
pub fn size(stack: &mut Stack, memory: &Memory) {
    stack.push(Value::I32(memory.size() as i32));
}

/// `memory.grow`: `[i32] -> [i32]`, pushing the old size or -1
pub fn grow(stack: &mut Stack, memory: &mut Memory) -> Result<(), RuntimeError> {
    let delta = stack.pop_i32()? as u32;
    let previous = memory.grow(delta);
    stack.push(Value::I32(previous));
    Ok(())
}

/// `memory.fill`: `[i32 i32 i32] -> []` (dst, value, len)
pub fn fill(stack: &mut Stack, memory: &mut Memory) -> Result<(), RuntimeError> {
    let len = stack.pop_i32()? as u32;
    let value = stack.pop_i32()? as u8;
    let dst = stack.pop_i32()? as u32;
    memory.fill(dst, value, len)
}

/// `memory.copy`: `[i32 i32 i32] -> []` (dst, src, len)
pub fn copy(stack: &mut Stack, memory: &mut Memory) -> Result<(), RuntimeError> {
    let len = stack.pop_i32()? as u32;
    let src = stack.pop_i32()? as u32;
    let dst = stack.pop_i32()? as u32;
    memory.copy(dst, src, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::module::Limits;
    use crate::runtime::memory::PAGE_SIZE;

    const NO_OFFSET: MemArg = MemArg { align: 0, offset: 0 };

    fn one_page() -> Memory {
        Memory::new(Limits { min: 1, max: None }, 16).unwrap()
    }

    #[test]
    fn test_store_then_load_extends() {
        let mut memory = one_page();
        let mut stack = Stack::new();

        stack.push_all([Value::I32(8), Value::I32(0x1234_80ff)]);
        store(&mut stack, &mut memory, StoreOp::I32Store, NO_OFFSET).unwrap();
        assert!(stack.is_empty());
        assert_eq!(memory.read(8, 0, 4).unwrap(), &[0xff, 0x80, 0x34, 0x12]);

        stack.push(Value::I32(8));
        load(&mut stack, &memory, LoadOp::I32Load8S, NO_OFFSET).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(-1));

        stack.push(Value::I32(8));
        load(&mut stack, &memory, LoadOp::I32Load8U, NO_OFFSET).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(0xff));

        stack.push(Value::I32(8));
        load(&mut stack, &memory, LoadOp::I64Load16S, NO_OFFSET).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I64(-32513));

        stack.push(Value::I32(4));
        let memarg = MemArg { align: 2, offset: 4 };
        load(&mut stack, &memory, LoadOp::I64Load32U, memarg).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I64(0x1234_80ff));
    }

    #[test]
    fn test_narrow_store_wraps() {
        let mut memory = one_page();
        let mut stack = Stack::new();
        stack.push_all([Value::I32(0), Value::I64(0x1_0000_0102)]);
        store(&mut stack, &mut memory, StoreOp::I64Store16, NO_OFFSET).unwrap();
        assert_eq!(memory.read(0, 0, 3).unwrap(), &[0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_float_round_trip_through_memory() {
        let mut memory = one_page();
        let mut stack = Stack::new();
        stack.push_all([Value::I32(16), Value::F64(-1.5)]);
        store(&mut stack, &mut memory, StoreOp::F64Store, NO_OFFSET).unwrap();
        stack.push(Value::I32(16));
        load(&mut stack, &memory, LoadOp::F64Load, NO_OFFSET).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::F64(-1.5));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut memory = one_page();
        let mut stack = Stack::new();

        stack.push(Value::I32(PAGE_SIZE as i32 - 2));
        assert!(matches!(
            load(&mut stack, &memory, LoadOp::I32Load, NO_OFFSET),
            Err(RuntimeError::MemoryOutOfBounds)
        ));

        // negative addresses are large unsigned ones
        stack.push_all([Value::I32(-1), Value::I32(0)]);
        assert!(matches!(
            store(&mut stack, &mut memory, StoreOp::I32Store8, NO_OFFSET),
            Err(RuntimeError::MemoryOutOfBounds)
        ));

        stack.push(Value::I32(0));
        let memarg = MemArg { align: 0, offset: u32::MAX };
        assert!(load(&mut stack, &memory, LoadOp::I32Load8U, memarg).is_err());
    }

    #[test]
    fn test_store_checks_operand_type() {
        let mut memory = one_page();
        let mut stack = Stack::new();
        stack.push_all([Value::I32(0), Value::F32(1.0)]);
        assert!(matches!(
            store(&mut stack, &mut memory, StoreOp::I32Store, NO_OFFSET),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_size_grow_fill_copy() {
        let mut memory = Memory::new(Limits { min: 1, max: Some(2) }, 16).unwrap();
        let mut stack = Stack::new();

        stack.push(Value::I32(1));
        grow(&mut stack, &mut memory).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(1));
        stack.push(Value::I32(1));
        grow(&mut stack, &mut memory).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(-1));
        size(&mut stack, &memory);
        assert_eq!(stack.pop().unwrap(), Value::I32(2));

        stack.push_all([Value::I32(0), Value::I32(0x1ab), Value::I32(3)]);
        fill(&mut stack, &mut memory).unwrap();
        stack.push_all([Value::I32(1), Value::I32(0), Value::I32(4)]);
        copy(&mut stack, &mut memory).unwrap();
        assert_eq!(memory.read(0, 0, 5).unwrap(), &[0xab, 0xab, 0xab, 0xab, 0]);
    }
}
