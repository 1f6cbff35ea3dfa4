//! WebAssembly module instance
//!
//! Instantiation links a decoded [`Module`] against an [`ImportTable`],
//! builds its globals, memory and table, applies the active segments and runs
//! the start function. Once `instantiate` returns, the instance is complete
//! and its exports may be called.

use thiserror::Error;
use tracing::debug;

use super::executor::Executor;
use super::imports::{resolve_imports, ImportTable, LinkError, ResolvedImport};
use super::{Memory, RuntimeError, Table, Value};
use crate::parser::module::{ConstExpr, ExportIndex, FunctionType, Module};

/// Host-imposed bounds on guest execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Nested wasm calls allowed before trapping
    pub max_call_depth: u32,
    /// Instructions allowed per top-level call, unlimited if `None`
    pub fuel: Option<u64>,
    /// Cap on memory size, applied on top of the module's own maximum. A
    /// module whose initial size is above it fails to instantiate.
    pub max_memory_pages: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            max_call_depth: 512,
            fuel: None,
            // 1GiB
            max_memory_pages: 16384,
        }
    }
}

#[derive(Error, Debug)]
pub enum InstantiationError {
    #[error(transparent)]
    Link(#[from] LinkError),
    /// Segment initialisation or the start function trapped
    #[error(transparent)]
    Trap(#[from] RuntimeError),
}

/// A function export, found by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFunction {
    pub name: String,
    pub func_idx: u32,
    pub func_type: FunctionType,
}

/// Mutable state the executor works on.
#[derive(Debug, Default)]
pub struct InstanceState {
    pub memory: Option<Memory>,
    pub table: Option<Table>,
    pub globals: Vec<Value>,
}

#[derive(Debug)]
pub struct Instance {
    module: Module,
    host_functions: Vec<ResolvedImport>,
    state: InstanceState,
    limits: ExecutionLimits,
}

impl Instance {
    pub fn instantiate(
        module: Module,
        imports: &ImportTable,
        limits: ExecutionLimits,
    ) -> Result<Instance, InstantiationError> {
        let host_functions = resolve_imports(&module, imports)?;

        let mut globals = Vec::with_capacity(module.globals.len());
        for global in &module.globals {
            let value = eval_const(global.init, &globals)?;
            globals.push(value);
        }

        let mut memory = module
            .memories
            .first()
            .map(|declared| Memory::new(*declared, limits.max_memory_pages))
            .transpose()?;
        let mut table = module.tables.first().map(|declared| Table::new(*declared)).transpose()?;

        for segment in &module.elements {
            let offset = eval_offset(segment.offset, &globals)?;
            table
                .as_mut()
                .ok_or(RuntimeError::TableOutOfBounds)?
                .init(offset, &segment.functions)?;
        }
        for segment in &module.data {
            let offset = eval_offset(segment.offset, &globals)?;
            memory
                .as_mut()
                .ok_or(RuntimeError::MemoryOutOfBounds)?
                .write(offset, 0, &segment.init)?;
        }

        debug!(
            module = %module.name,
            imports = host_functions.len(),
            globals = globals.len(),
            memory_pages = memory.as_ref().map_or(0, Memory::size),
            table_size = table.as_ref().map_or(0, Table::size),
            "linked module"
        );

        let mut instance = Instance {
            module,
            host_functions,
            state: InstanceState { memory, table, globals },
            limits,
        };

        if let Some(start) = instance.module.start {
            debug!(start, "running start function");
            instance.execute(start, &[])?;
        }

        Ok(instance)
    }

    /// Look up a function export by name.
    pub fn get_function(&self, name: &str) -> Result<ExportedFunction, RuntimeError> {
        let export = self
            .module
            .get_export(name)
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;
        let ExportIndex::Function(func_idx) = export.index else {
            return Err(RuntimeError::UnknownExport(name.to_string()));
        };
        let func_type = self
            .module
            .function_type(func_idx)
            .ok_or(RuntimeError::UnknownFunction(func_idx))?;

        Ok(ExportedFunction {
            name: export.name.clone(),
            func_idx,
            func_type: func_type.clone(),
        })
    }

    /// Call an exported function. Arguments are checked against its type
    /// before any guest code runs.
    pub fn invoke(&mut self, function: &ExportedFunction, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let params = &function.func_type.parameters;
        if args.len() != params.len() {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                function.name,
                params.len(),
                args.len()
            )));
        }
        for (i, (arg, expected)) in args.iter().zip(params).enumerate() {
            if arg.typ() != *expected {
                return Err(RuntimeError::InvalidArgument(format!(
                    "argument {i} of {} must be {expected}, got {}",
                    function.name,
                    arg.typ()
                )));
            }
        }

        self.execute(function.func_idx, args)
    }

    /// Look up and call an export in one step.
    pub fn invoke_export(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let function = self.get_function(name)?;
        self.invoke(&function, args)
    }

    fn execute(&mut self, func_idx: u32, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let mut executor = Executor::new(&self.module, &self.host_functions, &mut self.state, &self.limits);
        executor.call(func_idx, args)
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.state.memory.as_ref()
    }

    /// Current value of a global in the global index space
    pub fn global(&self, global_idx: u32) -> Option<Value> {
        self.state.globals.get(global_idx as usize).copied()
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }
}

fn eval_const(expr: ConstExpr, globals: &[Value]) -> Result<Value, RuntimeError> {
    match expr {
        ConstExpr::I32(v) => Ok(Value::I32(v)),
        ConstExpr::I64(v) => Ok(Value::I64(v)),
        ConstExpr::F32(v) => Ok(Value::F32(v)),
        ConstExpr::F64(v) => Ok(Value::F64(v)),
        ConstExpr::GlobalGet(idx) => globals
            .get(idx as usize)
            .copied()
            .ok_or(RuntimeError::GlobalIndexOutOfBounds(idx)),
    }
}

fn eval_offset(expr: ConstExpr, globals: &[Value]) -> Result<u32, RuntimeError> {
    match eval_const(expr, globals)? {
        Value::I32(offset) => Ok(offset as u32),
        other => Err(RuntimeError::TypeMismatch {
            expected: "i32".to_string(),
            actual: other.typ().to_string(),
        }),
    }
}
