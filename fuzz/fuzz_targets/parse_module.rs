#![no_main]

use libfuzzer_sys::fuzz_target;

use wasmcall::parser;

fuzz_target!(|data: &[u8]| {
    // Only panics matter here, errors are expected
    let _ = parser::parse("fuzz", data);
});
