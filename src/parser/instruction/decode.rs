//! Decoding of single instructions from a function body.

use super::{BlockType, InstructionKind, LoadOp, MemArg, NumericOp, StoreOp};
use crate::parser::encoding::*;
use crate::parser::module::ValueType;
use crate::parser::reader::Reader;
use crate::parser::DecodeError;

/// Decode the instruction at the reader's position.
pub fn decode_instruction(reader: &mut Reader) -> Result<InstructionKind, DecodeError> {
    let opcode = reader.read_byte()?;

    let kind = match opcode {
        OP_UNREACHABLE => InstructionKind::Unreachable,
        OP_NOP => InstructionKind::Nop,
        OP_BLOCK => InstructionKind::Block {
            block_type: read_block_type(reader)?,
        },
        OP_LOOP => InstructionKind::Loop {
            block_type: read_block_type(reader)?,
        },
        OP_IF => InstructionKind::If {
            block_type: read_block_type(reader)?,
        },
        OP_ELSE => InstructionKind::Else,
        OP_END => InstructionKind::End,
        OP_BR => InstructionKind::Br {
            label_idx: reader.read_vu32()?,
        },
        OP_BR_IF => InstructionKind::BrIf {
            label_idx: reader.read_vu32()?,
        },
        OP_BR_TABLE => {
            let count = reader.read_vu32()?;
            let mut labels = Vec::new();
            for _ in 0..count {
                labels.push(reader.read_vu32()?);
            }
            InstructionKind::BrTable {
                labels,
                default: reader.read_vu32()?,
            }
        }
        OP_RETURN => InstructionKind::Return,
        OP_CALL => InstructionKind::Call {
            func_idx: reader.read_vu32()?,
        },
        OP_CALL_INDIRECT => {
            let type_idx = reader.read_vu32()?;
            let table_idx = reader.read_vu32()?;
            InstructionKind::CallIndirect { type_idx, table_idx }
        }

        OP_DROP => InstructionKind::Drop,
        OP_SELECT => InstructionKind::Select,
        OP_SELECT_TYPED => {
            let count = reader.read_vu32()?;
            if count != 1 {
                return Err(DecodeError::InvalidSelectArity(count));
            }
            InstructionKind::SelectTyped {
                val_type: ValueType::decode(reader.read_byte()?)?,
            }
        }

        OP_LOCAL_GET => InstructionKind::LocalGet {
            local_idx: reader.read_vu32()?,
        },
        OP_LOCAL_SET => InstructionKind::LocalSet {
            local_idx: reader.read_vu32()?,
        },
        OP_LOCAL_TEE => InstructionKind::LocalTee {
            local_idx: reader.read_vu32()?,
        },
        OP_GLOBAL_GET => InstructionKind::GlobalGet {
            global_idx: reader.read_vu32()?,
        },
        OP_GLOBAL_SET => InstructionKind::GlobalSet {
            global_idx: reader.read_vu32()?,
        },

        0x28..=0x35 => InstructionKind::Load {
            op: LoadOp::from_opcode(opcode).ok_or_else(|| unknown_opcode(opcode))?,
            memarg: read_memarg(reader)?,
        },
        0x36..=0x3E => InstructionKind::Store {
            op: StoreOp::from_opcode(opcode).ok_or_else(|| unknown_opcode(opcode))?,
            memarg: read_memarg(reader)?,
        },
        OP_MEMORY_SIZE => {
            read_zero_byte(reader)?;
            InstructionKind::MemorySize
        }
        OP_MEMORY_GROW => {
            read_zero_byte(reader)?;
            InstructionKind::MemoryGrow
        }

        OP_I32_CONST => InstructionKind::I32Const {
            value: reader.read_vs32()?,
        },
        OP_I64_CONST => InstructionKind::I64Const {
            value: reader.read_vs64()?,
        },
        OP_F32_CONST => InstructionKind::F32Const {
            value: reader.read_f32()?,
        },
        OP_F64_CONST => InstructionKind::F64Const {
            value: reader.read_f64()?,
        },

        PREFIX_FC => {
            let sub = reader.read_vu32()?;
            match sub {
                FC_MEMORY_COPY => {
                    read_zero_byte(reader)?;
                    read_zero_byte(reader)?;
                    InstructionKind::MemoryCopy
                }
                FC_MEMORY_FILL => {
                    read_zero_byte(reader)?;
                    InstructionKind::MemoryFill
                }
                0..=7 => InstructionKind::Numeric(
                    NumericOp::from_opcode(0xFC00 | sub as u16)
                        .ok_or_else(|| DecodeError::UnknownOpcode(format!("0xfc {sub}")))?,
                ),
                _ => return Err(DecodeError::UnknownOpcode(format!("0xfc {sub}"))),
            }
        }

        other => InstructionKind::Numeric(
            NumericOp::from_opcode(u16::from(other)).ok_or_else(|| unknown_opcode(other))?,
        ),
    };

    Ok(kind)
}

fn unknown_opcode(opcode: u8) -> DecodeError {
    DecodeError::UnknownOpcode(format!("0x{}", hex::encode([opcode])))
}

fn read_block_type(reader: &mut Reader) -> Result<BlockType, DecodeError> {
    let byte = reader.peek_byte()?;
    if byte == BLOCK_TYPE_EMPTY {
        reader.read_byte()?;
        return Ok(BlockType::Empty);
    }
    // single-byte negative values are value types, non-negative s33 is a type index
    if byte & 0xc0 == 0x40 {
        reader.read_byte()?;
        return Ok(BlockType::Value(ValueType::decode(byte)?));
    }
    let index = reader.read_vs64()?;
    if !(0..=i64::from(u32::MAX)).contains(&index) {
        return Err(DecodeError::InvalidBlockType(index));
    }
    Ok(BlockType::FuncType(index as u32))
}

fn read_memarg(reader: &mut Reader) -> Result<MemArg, DecodeError> {
    let align = reader.read_vu32()?;
    let offset = reader.read_vu32()?;
    Ok(MemArg { align, offset })
}

fn read_zero_byte(reader: &mut Reader) -> Result<(), DecodeError> {
    match reader.read_byte()? {
        0 => Ok(()),
        _ => Err(DecodeError::ZeroByteExpected),
    }
}
