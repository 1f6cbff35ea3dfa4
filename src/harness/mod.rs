//! The invocation harness
//!
//! Load a module's bytes, instantiate them against the host's imports, look
//! up an export and call it, displaying what comes back. Each step is a free
//! function; [`Harness`] chains them as a typestate so an export can only be
//! looked up once instantiation (start function included) has finished.
//!
//! ```
//! use wasmcall::harness::{DisplaySink, Harness};
//! use wasmcall::runtime::Value;
//!
//! let bytes = wat::parse_str(r#"
//!     (module
//!         (import "env" "print" (func $print (param i32)))
//!         (func (export "add") (param i32 i32) (result i32)
//!             local.get 0
//!             local.get 1
//!             i32.add))
//! "#).unwrap();
//!
//! let mut harness = Harness::new(DisplaySink::new(std::io::sink()))
//!     .load_from_memory("math", bytes)
//!     .instantiate()
//!     .unwrap();
//! let add = harness.get_export("add").unwrap();
//! assert_eq!(harness.invoke(&add, &[Value::I32(11), Value::I32(22)]).unwrap(), vec![Value::I32(33)]);
//! ```

mod error;
mod sink;

pub use error::{HarnessError, Stage};
pub use sink::DisplaySink;

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::parser;
use crate::runtime::{
    ExecutionLimits, ExportedFunction, HostFunction, HostSignature, ImportTable, Instance,
    InstantiationError, RuntimeError, Value,
};

/// Where a harness is in its one-way progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Unloaded,
    BytesLoaded,
    /// Linked and initialised while the start function runs. `instantiate`
    /// only returns once the start function has, so no harness value is ever
    /// in this state; it shows up in logs only.
    Instantiated,
    Ready,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            HarnessState::Unloaded => "unloaded",
            HarnessState::BytesLoaded => "bytes-loaded",
            HarnessState::Instantiated => "instantiated",
            HarnessState::Ready => "ready",
        })
    }
}

/// Read the whole byte source.
pub fn load_bytes(path: &Path) -> Result<Vec<u8>, HarnessError> {
    let bytes = fs::read(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), len = bytes.len(), "read module bytes");
    Ok(bytes)
}

/// Decode, validate and link `bytes`, running the start function if any.
pub fn instantiate(
    name: &str,
    bytes: &[u8],
    imports: &ImportTable,
    limits: ExecutionLimits,
) -> Result<Instance, HarnessError> {
    let module = parser::parse(name, bytes)?;
    debug!(%module, "decoded module");
    Instance::instantiate(module, imports, limits).map_err(|err| match err {
        InstantiationError::Link(err) => HarnessError::Link(err),
        InstantiationError::Trap(err) => HarnessError::trap(Stage::Instantiate, err),
    })
}

/// Find the function export `name`. Its type is not checked here.
pub fn get_export(instance: &Instance, name: &str) -> Result<ExportedFunction, HarnessError> {
    instance
        .get_function(name)
        .map_err(|_| HarnessError::Lookup(name.to_string()))
}

pub fn invoke(
    instance: &mut Instance,
    function: &ExportedFunction,
    args: &[Value],
) -> Result<Vec<Value>, HarnessError> {
    debug!(export = %function.name, ?args, "invoking");
    instance
        .invoke(function, args)
        .map_err(|err| HarnessError::trap(Stage::Invoke, err))
}

/// Parse textual arguments against the parameter types of `function`.
pub fn parse_args(function: &ExportedFunction, args: &[String]) -> Result<Vec<Value>, HarnessError> {
    let params = &function.func_type.parameters;
    if args.len() != params.len() {
        return Err(HarnessError::trap(
            Stage::Invoke,
            RuntimeError::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                function.name,
                params.len(),
                args.len()
            )),
        ));
    }
    params
        .iter()
        .zip(args)
        .map(|(typ, text)| Value::parse(*typ, text).map_err(|err| HarnessError::trap(Stage::Invoke, err)))
        .collect()
}

/// The host's standard imports: `env.print`, which displays any one number.
pub fn standard_imports(sink: &DisplaySink) -> ImportTable {
    let sink = sink.clone();
    let mut imports = ImportTable::new();
    imports.add_function(
        "env",
        "print",
        HostFunction::new(HostSignature::NumericSink, move |args| {
            for value in args {
                sink.display_print(*value);
            }
            Ok(vec![])
        }),
    );
    imports
}

/// A harness with nothing loaded.
#[derive(Debug)]
pub struct Harness {
    imports: ImportTable,
    limits: ExecutionLimits,
    sink: DisplaySink,
}

impl Harness {
    /// A harness offering the standard imports, displaying to `sink`.
    pub fn new(sink: DisplaySink) -> Self {
        Harness {
            imports: standard_imports(&sink),
            limits: ExecutionLimits::default(),
            sink,
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the import table offered to the module.
    pub fn with_imports(mut self, imports: ImportTable) -> Self {
        self.imports = imports;
        self
    }

    pub fn state(&self) -> HarnessState {
        HarnessState::Unloaded
    }

    pub fn load_bytes(self, path: impl AsRef<Path>) -> Result<LoadedHarness, HarnessError> {
        let path = path.as_ref();
        let bytes = load_bytes(path)?;
        Ok(self.load_from_memory(&path.display().to_string(), bytes))
    }

    /// Take bytes already in memory as the byte source.
    pub fn load_from_memory(self, name: &str, bytes: Vec<u8>) -> LoadedHarness {
        let loaded = LoadedHarness {
            name: name.to_string(),
            bytes,
            imports: self.imports,
            limits: self.limits,
            sink: self.sink,
        };
        info!(module = %loaded.name, state = %loaded.state(), "loaded");
        loaded
    }
}

/// A harness holding module bytes.
#[derive(Debug)]
pub struct LoadedHarness {
    name: String,
    bytes: Vec<u8>,
    imports: ImportTable,
    limits: ExecutionLimits,
    sink: DisplaySink,
}

impl LoadedHarness {
    pub fn state(&self) -> HarnessState {
        HarnessState::BytesLoaded
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Instantiate the bytes. The bytes are dropped; the instance keeps the
    /// decoded module.
    pub fn instantiate(self) -> Result<ReadyHarness, HarnessError> {
        let instance = instantiate(&self.name, &self.bytes, &self.imports, self.limits)?;
        debug!(module = %self.name, from = %HarnessState::Instantiated, to = %HarnessState::Ready, "start function returned");

        let ready = ReadyHarness {
            instance,
            sink: self.sink,
        };
        info!(module = %self.name, state = %ready.state(), "instantiated");
        Ok(ready)
    }
}

/// A harness with a live instance whose exports may be called repeatedly.
#[derive(Debug)]
pub struct ReadyHarness {
    instance: Instance,
    sink: DisplaySink,
}

impl ReadyHarness {
    pub fn state(&self) -> HarnessState {
        HarnessState::Ready
    }

    pub fn get_export(&self, name: &str) -> Result<ExportedFunction, HarnessError> {
        get_export(&self.instance, name)
    }

    pub fn invoke(&mut self, function: &ExportedFunction, args: &[Value]) -> Result<Vec<Value>, HarnessError> {
        invoke(&mut self.instance, function, args)
    }

    /// Look up `name` and call it with arguments given as text.
    pub fn call(&mut self, name: &str, args: &[String]) -> Result<Vec<Value>, HarnessError> {
        let function = self.get_export(name)?;
        let args = parse_args(&function, args)?;
        self.invoke(&function, &args)
    }

    /// Show a call's results on the display sink.
    pub fn display(&self, results: &[Value]) {
        self.sink.display_result(results);
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

/// The whole scenario described by `config`: load, instantiate, call the
/// export and display its result.
pub fn run(config: &HarnessConfig, sink: DisplaySink) -> Result<(), HarnessError> {
    let mut harness = Harness::new(sink)
        .with_limits(config.limits())
        .load_bytes(&config.module)?
        .instantiate()?;

    let results = harness.call(&config.export, &config.args)?;
    info!(export = %config.export, ?results, "call returned");
    harness.display(&results);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        let names: Vec<String> = [
            HarnessState::Unloaded,
            HarnessState::BytesLoaded,
            HarnessState::Instantiated,
            HarnessState::Ready,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["unloaded", "bytes-loaded", "instantiated", "ready"]);
    }
}
