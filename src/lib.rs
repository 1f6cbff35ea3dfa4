//! Load a WebAssembly module, link it against host imports and call one of
//! its exports.
//!
//! wasmcall carries its own small WebAssembly 1.0 engine: a binary decoder
//! and validator, and a tree-walking interpreter. On top of that sits a
//! harness that runs the usual embedding sequence of reading bytes,
//! instantiating with an `env.print` import, looking up an export, calling
//! it and displaying the result.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format decoder and validator. Reads `.wasm` bytes into a [`parser::Module`].
//! - [`runtime`] -- Interpreter, memory, tables, host imports and instances.
//! - [`harness`] -- The load / instantiate / lookup / invoke sequence and its errors.
//! - [`config`] -- Harness settings from defaults, a JSON file and the command line.
//!
//! # Example
//!
//! ```
//! use wasmcall::parser;
//! use wasmcall::runtime::{ExecutionLimits, ImportTable, Instance, Value};
//!
//! let bytes = wat::parse_str(r#"
//!     (module
//!         (func (export "add") (param i32 i32) (result i32)
//!             local.get 0
//!             local.get 1
//!             i32.add))
//! "#).unwrap();
//!
//! let module = parser::parse("math", &bytes).unwrap();
//! let mut instance = Instance::instantiate(module, &ImportTable::new(), ExecutionLimits::default()).unwrap();
//! let results = instance.invoke_export("add", &[Value::I32(2), Value::I32(3)]).unwrap();
//! assert_eq!(results, vec![Value::I32(5)]);
//! ```

pub mod config;
pub mod harness;
pub mod parser;
pub mod runtime;
