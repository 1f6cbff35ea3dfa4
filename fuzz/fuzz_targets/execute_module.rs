#![no_main]

use libfuzzer_sys::fuzz_target;

use wasmcall::harness::{self, DisplaySink};
use wasmcall::parser::module::ExportIndex;
use wasmcall::runtime::{ExecutionLimits, Value};

fuzz_target!(|data: &[u8]| {
    let sink = DisplaySink::new(std::io::sink());
    let limits = ExecutionLimits {
        max_call_depth: 128,
        fuel: Some(100_000),
        max_memory_pages: 16,
    };
    let Ok(mut instance) = harness::instantiate("fuzz", data, &harness::standard_imports(&sink), limits) else {
        return;
    };

    let names: Vec<String> = instance
        .module()
        .exports
        .iter()
        .filter(|export| matches!(export.index, ExportIndex::Function(_)))
        .map(|export| export.name.clone())
        .collect();

    // call every exported function with zeroed arguments of the right types
    for name in names {
        let Ok(function) = harness::get_export(&instance, &name) else {
            continue;
        };
        let args: Vec<Value> = function
            .func_type
            .parameters
            .iter()
            .map(|typ| Value::default_for(*typ))
            .collect();
        let _ = harness::invoke(&mut instance, &function, &args);
    }
});
