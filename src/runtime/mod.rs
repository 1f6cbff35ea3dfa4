//! WebAssembly runtime implementation
//!
//! This module provides the execution engine for WebAssembly modules: value
//! representation, the value stack, linear memory, tables, host imports,
//! module instances and the instruction interpreter.

pub mod executor;
pub mod imports;
pub mod instance;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod table;
pub mod value;

pub use imports::{HostFunction, HostSignature, ImportTable, LinkError};
pub use instance::{ExecutionLimits, ExportedFunction, Instance, InstantiationError};
pub use memory::Memory;
pub use table::Table;
pub use value::Value;

/// Traps and other failures raised while running guest code.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unreachable executed")]
    Unreachable,
    #[error("integer divide by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer")]
    InvalidConversion,
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("out of bounds table access")]
    TableOutOfBounds,
    #[error("undefined element {0}")]
    UndefinedElement(u32),
    #[error("indirect call type mismatch: expected {expected}, got {actual}")]
    IndirectCallTypeMismatch { expected: String, actual: String },
    #[error("call stack exhausted")]
    CallStackExhausted,
    #[error("instruction budget exhausted")]
    InstructionBudgetExhausted,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("memory error: {0}")]
    MemoryError(String),
    #[error("table size exceeded")]
    TableSizeExceeded,
    #[error("unknown function {0}")]
    UnknownFunction(u32),
    #[error("unknown label {0}")]
    UnknownLabel(u32),
    #[error("unknown type {0}")]
    UnknownType(u32),
    #[error("unknown export {0}")]
    UnknownExport(String),
    #[error("local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("global variable index out of bounds: {0}")]
    GlobalIndexOutOfBounds(u32),
    #[error("host function failed: {0}")]
    Host(String),
}
