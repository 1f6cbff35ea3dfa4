//! WebAssembly operation implementations
//!
//! Numeric operators and memory accesses live here, keeping the executor
//! focused on control flow, calls and variables.

pub mod memory;
pub mod numeric;

pub(crate) use crate::parser::instruction::MemArg;
pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{RuntimeError, Value};
