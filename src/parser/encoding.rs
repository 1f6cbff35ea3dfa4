//! WebAssembly binary format constants

// Header (§5.5.16)
pub const MAGIC: [u8; 4] = *b"\0asm";
pub const VERSION: u32 = 1;

// Section IDs (§5.5.2)
pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;

/// Position of a section in the required ordering. The data count section
/// sits between element and code despite its higher ID.
pub fn section_order(id: u8) -> Option<u8> {
    match id {
        SECTION_TYPE..=SECTION_ELEMENT => Some(id),
        SECTION_DATA_COUNT => Some(10),
        SECTION_CODE => Some(11),
        SECTION_DATA => Some(12),
        _ => None,
    }
}

// Type constructors (§5.3)
pub const TYPE_FUNC: u8 = 0x60;
pub const TYPE_FUNCREF: u8 = 0x70;

// Limits flags (§5.3.7)
pub const LIMITS_MIN: u8 = 0x00;
pub const LIMITS_MIN_MAX: u8 = 0x01;

// Import/export descriptor kinds (§5.5.5, §5.5.10)
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;

// Segment flags (§5.5.12, §5.5.14)
pub const ELEM_ACTIVE_FUNCS: u32 = 0;
pub const DATA_ACTIVE: u32 = 0;
pub const DATA_ACTIVE_EXPLICIT: u32 = 2;

// Block type: empty (§5.4.1)
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

// Control instructions (§5.4.1)
pub const OP_UNREACHABLE: u8 = 0x00;
pub const OP_NOP: u8 = 0x01;
pub const OP_BLOCK: u8 = 0x02;
pub const OP_LOOP: u8 = 0x03;
pub const OP_IF: u8 = 0x04;
pub const OP_ELSE: u8 = 0x05;
pub const OP_END: u8 = 0x0B;
pub const OP_BR: u8 = 0x0C;
pub const OP_BR_IF: u8 = 0x0D;
pub const OP_BR_TABLE: u8 = 0x0E;
pub const OP_RETURN: u8 = 0x0F;
pub const OP_CALL: u8 = 0x10;
pub const OP_CALL_INDIRECT: u8 = 0x11;

// Parametric instructions (§5.4.3)
pub const OP_DROP: u8 = 0x1A;
pub const OP_SELECT: u8 = 0x1B;
pub const OP_SELECT_TYPED: u8 = 0x1C;

// Variable instructions (§5.4.4)
pub const OP_LOCAL_GET: u8 = 0x20;
pub const OP_LOCAL_SET: u8 = 0x21;
pub const OP_LOCAL_TEE: u8 = 0x22;
pub const OP_GLOBAL_GET: u8 = 0x23;
pub const OP_GLOBAL_SET: u8 = 0x24;

// Memory instructions (§5.4.6)
pub const OP_MEMORY_SIZE: u8 = 0x3F;
pub const OP_MEMORY_GROW: u8 = 0x40;

// Numeric constants (§5.4.7)
pub const OP_I32_CONST: u8 = 0x41;
pub const OP_I64_CONST: u8 = 0x42;
pub const OP_F32_CONST: u8 = 0x43;
pub const OP_F64_CONST: u8 = 0x44;

// Multi-byte opcode prefix and its sub-opcodes we decode
pub const PREFIX_FC: u8 = 0xFC;
pub const FC_MEMORY_COPY: u32 = 10;
pub const FC_MEMORY_FILL: u32 = 11;

/// Most locals a single function may declare.
pub const MAX_LOCALS: u64 = 50_000;

/// Deepest block nesting accepted in a function body.
pub const MAX_BLOCK_DEPTH: u32 = 1024;
