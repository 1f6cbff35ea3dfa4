//! Host functions and import resolution
//!
//! The host offers an [`ImportTable`] of native functions keyed by
//! `(namespace, name)`. Linking matches every import a module declares
//! against that table before the module may be instantiated.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use super::{RuntimeError, Value};
use crate::parser::module::{ExternalKind, FunctionType, Module};

type HostCallback = Box<dyn Fn(&[Value]) -> Result<Vec<Value>, RuntimeError>>;

/// What a host function will accept from a module that imports it.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignature {
    /// The import must declare exactly this type
    Exact(FunctionType),
    /// Any `[t] -> []` with a numeric `t`: a sink for one number of any kind
    NumericSink,
}

impl HostSignature {
    pub fn accepts(&self, declared: &FunctionType) -> bool {
        match self {
            HostSignature::Exact(expected) => expected == declared,
            HostSignature::NumericSink => {
                declared.parameters.len() == 1 && declared.return_types.is_empty()
            }
        }
    }
}

impl fmt::Display for HostSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HostSignature::Exact(ftype) => write!(f, "{ftype}"),
            HostSignature::NumericSink => f.write_str("[number] -> []"),
        }
    }
}

/// A native function a module can import.
pub struct HostFunction {
    signature: HostSignature,
    callback: HostCallback,
}

impl HostFunction {
    pub fn new(
        signature: HostSignature,
        callback: impl Fn(&[Value]) -> Result<Vec<Value>, RuntimeError> + 'static,
    ) -> Self {
        HostFunction {
            signature,
            callback: Box::new(callback),
        }
    }

    pub fn signature(&self) -> &HostSignature {
        &self.signature
    }

    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        (self.callback)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Host functions offered to modules, keyed by (namespace, name)
#[derive(Debug, Default)]
pub struct ImportTable {
    functions: HashMap<(String, String), Rc<HostFunction>>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        function: HostFunction,
    ) {
        self.functions
            .insert((module.into(), name.into()), Rc::new(function));
    }

    pub fn get_function(&self, module: &str, name: &str) -> Option<&Rc<HostFunction>> {
        self.functions.get(&(module.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("unknown import {module}.{name}")]
    UnknownImport { module: String, name: String },

    #[error("incompatible import type for {module}.{name}: module declares {declared}, host provides {provided}")]
    IncompatibleImportType {
        module: String,
        name: String,
        declared: FunctionType,
        provided: HostSignature,
    },

    #[error("cannot provide {kind} import {module}.{name}")]
    UnsupportedImportKind {
        module: String,
        name: String,
        kind: &'static str,
    },

    #[error("unknown type {0}")]
    UnknownType(u32),
}

/// A function import bound to the host function that satisfies it.
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub module: String,
    pub name: String,
    pub func_type: FunctionType,
    pub function: Rc<HostFunction>,
}

/// Bind each import of `module` to an entry of `table`, in function index order.
pub fn resolve_imports(module: &Module, table: &ImportTable) -> Result<Vec<ResolvedImport>, LinkError> {
    let mut resolved = Vec::new();
    for import in &module.imports {
        let type_idx = match import.external_kind {
            ExternalKind::Function(type_idx) => type_idx,
            ref other => {
                return Err(LinkError::UnsupportedImportKind {
                    module: import.module.clone(),
                    name: import.name.clone(),
                    kind: other.name(),
                })
            }
        };
        let declared = module
            .types
            .get(type_idx as usize)
            .ok_or(LinkError::UnknownType(type_idx))?;
        let function = table
            .get_function(&import.module, &import.name)
            .ok_or_else(|| LinkError::UnknownImport {
                module: import.module.clone(),
                name: import.name.clone(),
            })?;
        if !function.signature().accepts(declared) {
            return Err(LinkError::IncompatibleImportType {
                module: import.module.clone(),
                name: import.name.clone(),
                declared: declared.clone(),
                provided: function.signature().clone(),
            });
        }

        debug!(import = %import, func_type = %declared, "resolved import");
        resolved.push(ResolvedImport {
            module: import.module.clone(),
            name: import.name.clone(),
            func_type: declared.clone(),
            function: Rc::clone(function),
        });
    }
    Ok(resolved)
}
