//! Common test utilities shared between integration tests

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use wasmcall::harness::DisplaySink;

/// Captured writer that stores output for testing
#[derive(Clone, Default)]
pub struct CapturedWriter(pub Arc<Mutex<Vec<u8>>>);

impl CapturedWriter {
    /// Everything written so far
    pub fn output(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A display sink and a handle on what it has written
pub fn captured_sink() -> (DisplaySink, CapturedWriter) {
    let writer = CapturedWriter::default();
    (DisplaySink::new(writer.clone()), writer)
}

/// Assemble a test module from its text format
pub fn wasm(source: &str) -> Vec<u8> {
    wat::parse_str(source).unwrap_or_else(|e| panic!("bad test module: {e}"))
}

/// The standard scenario's module: imports `env.print`, exports `add`
pub const MATH_WAT: &str = r#"
    (module
        (import "env" "print" (func $print (param i32)))
        (func (export "add") (param $a i32) (param $b i32) (result i32)
            local.get $a
            local.get $b
            i32.add))
"#;
