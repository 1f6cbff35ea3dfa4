//! WebAssembly instruction representation and decoding
//!
//! Control, parametric, variable and memory instructions each get their own
//! [`InstructionKind`] variant. The plain numeric operators (tests,
//! comparisons, arithmetic and conversions) share one variant carrying a
//! [`NumericOp`], whose opcode and stack signature come from a single table.

pub mod decode;

pub use decode::decode_instruction;

use super::module::ValueType;
use super::module::ValueType::{F32, F64, I32, I64};

/// Memory argument for memory access instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Memory alignment (as power of 2)
    pub align: u32,
    /// Memory offset
    pub offset: u32,
}

/// Block type for structured control instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Empty block type (no parameters or results)
    Empty,
    /// Single value type result
    Value(ValueType),
    /// Function type index for multi-value blocks
    FuncType(u32),
}

/// Algebraic data type representing the supported WebAssembly instructions
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    // Control instructions
    Unreachable,
    Nop,
    Block { block_type: BlockType },
    Loop { block_type: BlockType },
    If { block_type: BlockType },
    Else,
    End,
    Br { label_idx: u32 },
    BrIf { label_idx: u32 },
    BrTable { labels: Vec<u32>, default: u32 },
    Return,
    Call { func_idx: u32 },
    CallIndirect { type_idx: u32, table_idx: u32 },

    // Parametric instructions
    Drop,
    Select,
    SelectTyped { val_type: ValueType },

    // Variable instructions
    LocalGet { local_idx: u32 },
    LocalSet { local_idx: u32 },
    LocalTee { local_idx: u32 },
    GlobalGet { global_idx: u32 },
    GlobalSet { global_idx: u32 },

    // Memory instructions
    Load { op: LoadOp, memarg: MemArg },
    Store { op: StoreOp, memarg: MemArg },
    MemorySize,
    MemoryGrow,
    MemoryCopy,
    MemoryFill,

    // Numeric instructions
    I32Const { value: i32 },
    I64Const { value: i64 },
    F32Const { value: f32 },
    F64Const { value: f64 },
    Numeric(NumericOp),
}

/// Loads from linear memory. Narrow loads extend to the full result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    I32Load,
    I64Load,
    F32Load,
    F64Load,
    I32Load8S,
    I32Load8U,
    I32Load16S,
    I32Load16U,
    I64Load8S,
    I64Load8U,
    I64Load16S,
    I64Load16U,
    I64Load32S,
    I64Load32U,
}

impl LoadOp {
    pub fn from_opcode(opcode: u8) -> Option<LoadOp> {
        use LoadOp::*;
        Some(match opcode {
            0x28 => I32Load,
            0x29 => I64Load,
            0x2A => F32Load,
            0x2B => F64Load,
            0x2C => I32Load8S,
            0x2D => I32Load8U,
            0x2E => I32Load16S,
            0x2F => I32Load16U,
            0x30 => I64Load8S,
            0x31 => I64Load8U,
            0x32 => I64Load16S,
            0x33 => I64Load16U,
            0x34 => I64Load32S,
            0x35 => I64Load32U,
            _ => return None,
        })
    }

    /// Type pushed onto the stack
    pub fn value_type(&self) -> ValueType {
        use LoadOp::*;
        match self {
            I32Load | I32Load8S | I32Load8U | I32Load16S | I32Load16U => I32,
            I64Load | I64Load8S | I64Load8U | I64Load16S | I64Load16U | I64Load32S
            | I64Load32U => I64,
            F32Load => F32,
            F64Load => F64,
        }
    }

    /// Number of bytes read from memory
    pub fn width(&self) -> u32 {
        use LoadOp::*;
        match self {
            I32Load8S | I32Load8U | I64Load8S | I64Load8U => 1,
            I32Load16S | I32Load16U | I64Load16S | I64Load16U => 2,
            I32Load | F32Load | I64Load32S | I64Load32U => 4,
            I64Load | F64Load => 8,
        }
    }
}

/// Stores to linear memory. Narrow stores wrap the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    I32Store,
    I64Store,
    F32Store,
    F64Store,
    I32Store8,
    I32Store16,
    I64Store8,
    I64Store16,
    I64Store32,
}

impl StoreOp {
    pub fn from_opcode(opcode: u8) -> Option<StoreOp> {
        use StoreOp::*;
        Some(match opcode {
            0x36 => I32Store,
            0x37 => I64Store,
            0x38 => F32Store,
            0x39 => F64Store,
            0x3A => I32Store8,
            0x3B => I32Store16,
            0x3C => I64Store8,
            0x3D => I64Store16,
            0x3E => I64Store32,
            _ => return None,
        })
    }

    /// Type popped from the stack
    pub fn value_type(&self) -> ValueType {
        use StoreOp::*;
        match self {
            I32Store | I32Store8 | I32Store16 => I32,
            I64Store | I64Store8 | I64Store16 | I64Store32 => I64,
            F32Store => F32,
            F64Store => F64,
        }
    }

    /// Number of bytes written to memory
    pub fn width(&self) -> u32 {
        use StoreOp::*;
        match self {
            I32Store8 | I64Store8 => 1,
            I32Store16 | I64Store16 => 2,
            I32Store | F32Store | I64Store32 => 4,
            I64Store | F64Store => 8,
        }
    }
}

macro_rules! numeric_ops {
    ($( $variant:ident = $opcode:literal : [$($param:ident),+] -> $result:ident; )*) => {
        /// Numeric operators with a fixed stack signature.
        ///
        /// Opcodes are single-byte except the `0xFC`-prefixed saturating
        /// truncations, which are keyed as `0xFC00 | subopcode`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum NumericOp {
            $($variant,)*
        }

        impl NumericOp {
            pub fn from_opcode(opcode: u16) -> Option<NumericOp> {
                match opcode {
                    $($opcode => Some(NumericOp::$variant),)*
                    _ => None,
                }
            }

            /// Operand types, in push order
            pub fn params(&self) -> &'static [ValueType] {
                match self {
                    $(NumericOp::$variant => &[$($param),+],)*
                }
            }

            pub fn result(&self) -> ValueType {
                match self {
                    $(NumericOp::$variant => $result,)*
                }
            }
        }
    };
}

numeric_ops! {
    // itestop / irelop (i32)
    I32Eqz = 0x45: [I32] -> I32;
    I32Eq = 0x46: [I32, I32] -> I32;
    I32Ne = 0x47: [I32, I32] -> I32;
    I32LtS = 0x48: [I32, I32] -> I32;
    I32LtU = 0x49: [I32, I32] -> I32;
    I32GtS = 0x4A: [I32, I32] -> I32;
    I32GtU = 0x4B: [I32, I32] -> I32;
    I32LeS = 0x4C: [I32, I32] -> I32;
    I32LeU = 0x4D: [I32, I32] -> I32;
    I32GeS = 0x4E: [I32, I32] -> I32;
    I32GeU = 0x4F: [I32, I32] -> I32;

    // itestop / irelop (i64)
    I64Eqz = 0x50: [I64] -> I32;
    I64Eq = 0x51: [I64, I64] -> I32;
    I64Ne = 0x52: [I64, I64] -> I32;
    I64LtS = 0x53: [I64, I64] -> I32;
    I64LtU = 0x54: [I64, I64] -> I32;
    I64GtS = 0x55: [I64, I64] -> I32;
    I64GtU = 0x56: [I64, I64] -> I32;
    I64LeS = 0x57: [I64, I64] -> I32;
    I64LeU = 0x58: [I64, I64] -> I32;
    I64GeS = 0x59: [I64, I64] -> I32;
    I64GeU = 0x5A: [I64, I64] -> I32;

    // frelop
    F32Eq = 0x5B: [F32, F32] -> I32;
    F32Ne = 0x5C: [F32, F32] -> I32;
    F32Lt = 0x5D: [F32, F32] -> I32;
    F32Gt = 0x5E: [F32, F32] -> I32;
    F32Le = 0x5F: [F32, F32] -> I32;
    F32Ge = 0x60: [F32, F32] -> I32;
    F64Eq = 0x61: [F64, F64] -> I32;
    F64Ne = 0x62: [F64, F64] -> I32;
    F64Lt = 0x63: [F64, F64] -> I32;
    F64Gt = 0x64: [F64, F64] -> I32;
    F64Le = 0x65: [F64, F64] -> I32;
    F64Ge = 0x66: [F64, F64] -> I32;

    // iunop / ibinop (i32)
    I32Clz = 0x67: [I32] -> I32;
    I32Ctz = 0x68: [I32] -> I32;
    I32Popcnt = 0x69: [I32] -> I32;
    I32Add = 0x6A: [I32, I32] -> I32;
    I32Sub = 0x6B: [I32, I32] -> I32;
    I32Mul = 0x6C: [I32, I32] -> I32;
    I32DivS = 0x6D: [I32, I32] -> I32;
    I32DivU = 0x6E: [I32, I32] -> I32;
    I32RemS = 0x6F: [I32, I32] -> I32;
    I32RemU = 0x70: [I32, I32] -> I32;
    I32And = 0x71: [I32, I32] -> I32;
    I32Or = 0x72: [I32, I32] -> I32;
    I32Xor = 0x73: [I32, I32] -> I32;
    I32Shl = 0x74: [I32, I32] -> I32;
    I32ShrS = 0x75: [I32, I32] -> I32;
    I32ShrU = 0x76: [I32, I32] -> I32;
    I32Rotl = 0x77: [I32, I32] -> I32;
    I32Rotr = 0x78: [I32, I32] -> I32;

    // iunop / ibinop (i64)
    I64Clz = 0x79: [I64] -> I64;
    I64Ctz = 0x7A: [I64] -> I64;
    I64Popcnt = 0x7B: [I64] -> I64;
    I64Add = 0x7C: [I64, I64] -> I64;
    I64Sub = 0x7D: [I64, I64] -> I64;
    I64Mul = 0x7E: [I64, I64] -> I64;
    I64DivS = 0x7F: [I64, I64] -> I64;
    I64DivU = 0x80: [I64, I64] -> I64;
    I64RemS = 0x81: [I64, I64] -> I64;
    I64RemU = 0x82: [I64, I64] -> I64;
    I64And = 0x83: [I64, I64] -> I64;
    I64Or = 0x84: [I64, I64] -> I64;
    I64Xor = 0x85: [I64, I64] -> I64;
    I64Shl = 0x86: [I64, I64] -> I64;
    I64ShrS = 0x87: [I64, I64] -> I64;
    I64ShrU = 0x88: [I64, I64] -> I64;
    I64Rotl = 0x89: [I64, I64] -> I64;
    I64Rotr = 0x8A: [I64, I64] -> I64;

    // funop / fbinop (f32)
    F32Abs = 0x8B: [F32] -> F32;
    F32Neg = 0x8C: [F32] -> F32;
    F32Ceil = 0x8D: [F32] -> F32;
    F32Floor = 0x8E: [F32] -> F32;
    F32Trunc = 0x8F: [F32] -> F32;
    F32Nearest = 0x90: [F32] -> F32;
    F32Sqrt = 0x91: [F32] -> F32;
    F32Add = 0x92: [F32, F32] -> F32;
    F32Sub = 0x93: [F32, F32] -> F32;
    F32Mul = 0x94: [F32, F32] -> F32;
    F32Div = 0x95: [F32, F32] -> F32;
    F32Min = 0x96: [F32, F32] -> F32;
    F32Max = 0x97: [F32, F32] -> F32;
    F32Copysign = 0x98: [F32, F32] -> F32;

    // funop / fbinop (f64)
    F64Abs = 0x99: [F64] -> F64;
    F64Neg = 0x9A: [F64] -> F64;
    F64Ceil = 0x9B: [F64] -> F64;
    F64Floor = 0x9C: [F64] -> F64;
    F64Trunc = 0x9D: [F64] -> F64;
    F64Nearest = 0x9E: [F64] -> F64;
    F64Sqrt = 0x9F: [F64] -> F64;
    F64Add = 0xA0: [F64, F64] -> F64;
    F64Sub = 0xA1: [F64, F64] -> F64;
    F64Mul = 0xA2: [F64, F64] -> F64;
    F64Div = 0xA3: [F64, F64] -> F64;
    F64Min = 0xA4: [F64, F64] -> F64;
    F64Max = 0xA5: [F64, F64] -> F64;
    F64Copysign = 0xA6: [F64, F64] -> F64;

    // cvtop
    I32WrapI64 = 0xA7: [I64] -> I32;
    I32TruncF32S = 0xA8: [F32] -> I32;
    I32TruncF32U = 0xA9: [F32] -> I32;
    I32TruncF64S = 0xAA: [F64] -> I32;
    I32TruncF64U = 0xAB: [F64] -> I32;
    I64ExtendI32S = 0xAC: [I32] -> I64;
    I64ExtendI32U = 0xAD: [I32] -> I64;
    I64TruncF32S = 0xAE: [F32] -> I64;
    I64TruncF32U = 0xAF: [F32] -> I64;
    I64TruncF64S = 0xB0: [F64] -> I64;
    I64TruncF64U = 0xB1: [F64] -> I64;
    F32ConvertI32S = 0xB2: [I32] -> F32;
    F32ConvertI32U = 0xB3: [I32] -> F32;
    F32ConvertI64S = 0xB4: [I64] -> F32;
    F32ConvertI64U = 0xB5: [I64] -> F32;
    F32DemoteF64 = 0xB6: [F64] -> F32;
    F64ConvertI32S = 0xB7: [I32] -> F64;
    F64ConvertI32U = 0xB8: [I32] -> F64;
    F64ConvertI64S = 0xB9: [I64] -> F64;
    F64ConvertI64U = 0xBA: [I64] -> F64;
    F64PromoteF32 = 0xBB: [F32] -> F64;
    I32ReinterpretF32 = 0xBC: [F32] -> I32;
    I64ReinterpretF64 = 0xBD: [F64] -> I64;
    F32ReinterpretI32 = 0xBE: [I32] -> F32;
    F64ReinterpretI64 = 0xBF: [I64] -> F64;

    // sign extension
    I32Extend8S = 0xC0: [I32] -> I32;
    I32Extend16S = 0xC1: [I32] -> I32;
    I64Extend8S = 0xC2: [I64] -> I64;
    I64Extend16S = 0xC3: [I64] -> I64;
    I64Extend32S = 0xC4: [I64] -> I64;

    // non-trapping float-to-int
    I32TruncSatF32S = 0xFC00: [F32] -> I32;
    I32TruncSatF32U = 0xFC01: [F32] -> I32;
    I32TruncSatF64S = 0xFC02: [F64] -> I32;
    I32TruncSatF64U = 0xFC03: [F64] -> I32;
    I64TruncSatF32S = 0xFC04: [F32] -> I64;
    I64TruncSatF32U = 0xFC05: [F32] -> I64;
    I64TruncSatF64S = 0xFC06: [F64] -> I64;
    I64TruncSatF64U = 0xFC07: [F64] -> I64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_op_table() {
        assert_eq!(NumericOp::from_opcode(0x6A), Some(NumericOp::I32Add));
        assert_eq!(NumericOp::I32Add.params(), &[I32, I32]);
        assert_eq!(NumericOp::I32Add.result(), I32);

        assert_eq!(NumericOp::from_opcode(0xA7), Some(NumericOp::I32WrapI64));
        assert_eq!(NumericOp::I32WrapI64.params(), &[I64]);

        assert_eq!(NumericOp::from_opcode(0xFC05), Some(NumericOp::I64TruncSatF32U));
        assert_eq!(NumericOp::I64TruncSatF32U.result(), I64);

        assert_eq!(NumericOp::from_opcode(0x44), None);
        assert_eq!(NumericOp::from_opcode(0xC5), None);
    }

    #[test]
    fn test_memory_op_widths() {
        assert_eq!(LoadOp::from_opcode(0x31).unwrap().width(), 1);
        assert_eq!(LoadOp::I64Load32U.value_type(), I64);
        assert_eq!(StoreOp::from_opcode(0x3B).unwrap(), StoreOp::I32Store16);
        assert_eq!(StoreOp::F64Store.width(), 8);
        assert!(LoadOp::from_opcode(0x36).is_none());
    }
}
