mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::wasm;
use rstest::rstest;
use wasmcall::parser;
use wasmcall::parser::module::{FunctionType, ValueType};
use wasmcall::runtime::{
    ExecutionLimits, HostFunction, HostSignature, ImportTable, Instance, InstantiationError, RuntimeError, Value,
};

fn instantiate_with(source: &str, imports: &ImportTable, limits: ExecutionLimits) -> Instance {
    let module = parser::parse("test", &wasm(source)).unwrap();
    Instance::instantiate(module, imports, limits).unwrap()
}

fn instantiate(source: &str) -> Instance {
    instantiate_with(source, &ImportTable::new(), ExecutionLimits::default())
}

fn call(source: &str, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    instantiate(source).invoke_export(name, args)
}

const ARITH: &str = r#"
    (module
        (func $fac (export "fac") (param i64) (result i64)
            local.get 0
            i64.eqz
            if (result i64)
                i64.const 1
            else
                local.get 0
                local.get 0
                i64.const 1
                i64.sub
                call $fac
                i64.mul
            end)
        (func (export "fib") (param $n i32) (result i32)
            (local $a i32) (local $b i32) (local $t i32)
            i32.const 1
            local.set $b
            block $done
                loop $next
                    local.get $n
                    i32.eqz
                    br_if $done
                    local.get $a
                    local.get $b
                    i32.add
                    local.set $t
                    local.get $b
                    local.set $a
                    local.get $t
                    local.set $b
                    local.get $n
                    i32.const 1
                    i32.sub
                    local.set $n
                    br $next
                end
            end
            local.get $a)
        (func (export "classify") (param i32) (result i32)
            block $c
                block $b
                    block $a
                        local.get 0
                        br_table $a $b $c
                    end
                    i32.const 100
                    return
                end
                i32.const 200
                return
            end
            i32.const 300)
        (func (export "max") (param f32 f32) (result f32)
            local.get 0
            local.get 1
            f32.max)
        (func (export "pick") (param i32) (result i64)
            i64.const 7
            i64.const 9
            local.get 0
            select)
        (func (export "swap") (param i32 i32) (result i32 i32)
            local.get 1
            local.get 0)
        (func (export "sum3") (param i32 i32 i32) (result i32)
            local.get 0
            local.get 1
            local.get 2
            block (param i32 i32) (result i32)
                i32.add
            end
            i32.add)
        (func (export "trunc") (param f64) (result i32)
            local.get 0
            i32.trunc_f64_s)
        (func (export "sat") (param f64) (result i32)
            local.get 0
            i32.trunc_sat_f64_u)
        (func (export "ext") (param i32) (result i64)
            local.get 0
            i64.extend_i32_u
            i64.extend32_s))
"#;

#[rstest]
#[case("fac", &[Value::I64(0)], &[Value::I64(1)])]
#[case("fac", &[Value::I64(20)], &[Value::I64(2432902008176640000)])]
#[case("fib", &[Value::I32(0)], &[Value::I32(0)])]
#[case("fib", &[Value::I32(10)], &[Value::I32(55)])]
#[case("classify", &[Value::I32(0)], &[Value::I32(100)])]
#[case("classify", &[Value::I32(1)], &[Value::I32(200)])]
#[case("classify", &[Value::I32(2)], &[Value::I32(300)])]
#[case("classify", &[Value::I32(-1)], &[Value::I32(300)])]
#[case("max", &[Value::F32(-0.0), Value::F32(0.0)], &[Value::F32(0.0)])]
#[case("pick", &[Value::I32(1)], &[Value::I64(7)])]
#[case("pick", &[Value::I32(0)], &[Value::I64(9)])]
#[case("swap", &[Value::I32(1), Value::I32(2)], &[Value::I32(2), Value::I32(1)])]
#[case("sum3", &[Value::I32(1), Value::I32(2), Value::I32(3)], &[Value::I32(6)])]
#[case("trunc", &[Value::F64(-3.9)], &[Value::I32(-3)])]
#[case("sat", &[Value::F64(-3.9)], &[Value::I32(0)])]
#[case("ext", &[Value::I32(-1)], &[Value::I64(-1)])]
fn arithmetic_and_control(#[case] name: &str, #[case] args: &[Value], #[case] expected: &[Value]) {
    assert_eq!(call(ARITH, name, args).unwrap(), expected);
}

#[rstest]
#[case("trunc", &[Value::F64(f64::NAN)], "invalid conversion to integer")]
#[case("trunc", &[Value::F64(3e9)], "integer overflow")]
#[case("fib", &[Value::I64(3)], "invalid argument: argument 0 of fib must be i32, got i64")]
#[case("fib", &[], "invalid argument: fib expects 1 arguments, got 0")]
fn arithmetic_traps(#[case] name: &str, #[case] args: &[Value], #[case] message: &str) {
    assert_eq!(call(ARITH, name, args).unwrap_err().to_string(), message);
}

const MEMORY: &str = r#"
    (module
        (memory 1 2)
        (data (i32.const 16) "\2a\00\00\00hello")
        (func (export "load") (param i32) (result i32)
            local.get 0
            i32.load)
        (func (export "load8") (param i32) (result i32)
            local.get 0
            i32.load8_u offset=4)
        (func (export "store") (param i32 i64)
            local.get 0
            local.get 1
            i64.store)
        (func (export "grow") (param i32) (result i32)
            local.get 0
            memory.grow)
        (func (export "size") (result i32)
            memory.size)
        (func (export "fill") (param i32 i32 i32)
            local.get 0
            local.get 1
            local.get 2
            memory.fill))
"#;

#[test]
fn memory_operations() {
    let mut instance = instantiate(MEMORY);
    assert_eq!(instance.invoke_export("load", &[Value::I32(16)]).unwrap(), vec![Value::I32(42)]);
    assert_eq!(
        instance.invoke_export("load8", &[Value::I32(16)]).unwrap(),
        vec![Value::I32(b'h' as i32)]
    );

    instance
        .invoke_export("store", &[Value::I32(0), Value::I64(0x0102_0304_0506_0708)])
        .unwrap();
    assert_eq!(instance.invoke_export("load", &[Value::I32(4)]).unwrap(), vec![Value::I32(0x0102_0304)]);

    assert!(matches!(
        instance.invoke_export("load", &[Value::I32(65533)]),
        Err(RuntimeError::MemoryOutOfBounds)
    ));
    assert_eq!(instance.invoke_export("grow", &[Value::I32(1)]).unwrap(), vec![Value::I32(1)]);
    assert_eq!(instance.invoke_export("load", &[Value::I32(65533)]).unwrap(), vec![Value::I32(0)]);
    assert_eq!(instance.invoke_export("grow", &[Value::I32(1)]).unwrap(), vec![Value::I32(-1)]);
    assert_eq!(instance.invoke_export("size", &[]).unwrap(), vec![Value::I32(2)]);

    instance
        .invoke_export("fill", &[Value::I32(100), Value::I32(0xff), Value::I32(4)])
        .unwrap();
    assert_eq!(instance.invoke_export("load", &[Value::I32(100)]).unwrap(), vec![Value::I32(-1)]);
    assert_eq!(instance.memory().unwrap().read(104, 0, 1).unwrap(), &[0]);
}

#[test]
fn host_memory_cap_limits_growth() {
    let limits = ExecutionLimits {
        max_memory_pages: 1,
        ..ExecutionLimits::default()
    };
    let mut instance = instantiate_with(MEMORY, &ImportTable::new(), limits);
    assert_eq!(instance.invoke_export("grow", &[Value::I32(1)]).unwrap(), vec![Value::I32(-1)]);
}

#[test]
fn oversized_initial_memory_fails_to_instantiate() {
    let module = parser::parse("test", &wasm("(module (memory 65536))")).unwrap();
    assert!(matches!(
        Instance::instantiate(module, &ImportTable::new(), ExecutionLimits::default()),
        Err(InstantiationError::Trap(RuntimeError::MemoryError(_)))
    ));
}

#[test]
fn data_segment_out_of_bounds_traps_at_instantiation() {
    let module = parser::parse("test", &wasm(r#"(module (memory 1) (data (i32.const 65535) "ab"))"#)).unwrap();
    assert!(matches!(
        Instance::instantiate(module, &ImportTable::new(), ExecutionLimits::default()),
        Err(InstantiationError::Trap(RuntimeError::MemoryOutOfBounds))
    ));
}

const TABLE: &str = r#"
    (module
        (type $binary (func (param i32 i32) (result i32)))
        (type $unary (func (param i32) (result i32)))
        (table 4 funcref)
        (elem (i32.const 0) $add $sub $neg)
        (func $add (type $binary) local.get 0 local.get 1 i32.add)
        (func $sub (type $binary) local.get 0 local.get 1 i32.sub)
        (func $neg (type $unary) i32.const 0 local.get 0 i32.sub)
        (func (export "apply") (param i32 i32 i32) (result i32)
            local.get 1
            local.get 2
            local.get 0
            call_indirect (type $binary)))
"#;

#[rstest]
#[case(0, Ok(15))]
#[case(1, Ok(5))]
#[case(2, Err("indirect call type mismatch: expected [i32 i32] -> [i32], got [i32] -> [i32]"))]
#[case(3, Err("undefined element 3"))]
#[case(4, Err("undefined element 4"))]
fn call_indirect(#[case] slot: i32, #[case] expected: Result<i32, &str>) {
    let result = call(TABLE, "apply", &[Value::I32(slot), Value::I32(10), Value::I32(5)]);
    match expected {
        Ok(value) => assert_eq!(result.unwrap(), vec![Value::I32(value)]),
        Err(message) => assert_eq!(result.unwrap_err().to_string(), message),
    }
}

#[test]
fn globals_persist_between_calls() {
    let mut instance = instantiate(
        r#"(module
            (global $count (mut i32) (i32.const 0))
            (func (export "bump") (result i32)
                global.get $count
                i32.const 1
                i32.add
                global.set $count
                global.get $count))"#,
    );
    for expected in 1..=3 {
        assert_eq!(instance.invoke_export("bump", &[]).unwrap(), vec![Value::I32(expected)]);
    }
    assert_eq!(instance.global(0), Some(Value::I32(3)));
}

#[test]
fn unbounded_recursion_exhausts_the_call_stack() {
    let limits = ExecutionLimits {
        max_call_depth: 64,
        ..ExecutionLimits::default()
    };
    let mut instance = instantiate_with(
        r#"(module (func $f (export "f") call $f))"#,
        &ImportTable::new(),
        limits,
    );
    assert!(matches!(
        instance.invoke_export("f", &[]),
        Err(RuntimeError::CallStackExhausted)
    ));
}

/// `$count(n)` recurses `n` times, with the recursive call buried under
/// `nesting` result blocks.
fn nested_recursion(nesting: usize) -> String {
    format!(
        r#"(module
            (func $count (export "count") (param i32) (result i32)
                {open}
                local.get 0
                i32.eqz
                if (result i32)
                    i32.const 0
                else
                    local.get 0
                    i32.const 1
                    i32.sub
                    call $count
                    i32.const 1
                    i32.add
                end
                {close}))"#,
        open = "block (result i32) ".repeat(nesting),
        close = "end ".repeat(nesting),
    )
}

#[rstest]
#[case::flat(0)]
#[case::nested(60)]
#[case::deeply_nested(500)]
fn recursion_up_to_the_default_limit(#[case] nesting: usize) {
    let mut instance = instantiate(&nested_recursion(nesting));
    assert_eq!(
        instance.invoke_export("count", &[Value::I32(500)]).unwrap(),
        vec![Value::I32(500)]
    );
    assert!(matches!(
        instance.invoke_export("count", &[Value::I32(100_000)]),
        Err(RuntimeError::CallStackExhausted)
    ));
    // the instance is still usable after the trap
    assert_eq!(instance.invoke_export("count", &[Value::I32(3)]).unwrap(), vec![Value::I32(3)]);
}

#[test]
fn fuel_is_per_call() {
    let source = r#"(module
        (func (export "spin") (param i32)
            loop $l
                local.get 0
                i32.const 1
                i32.sub
                local.tee 0
                br_if $l
            end))"#;
    let limits = ExecutionLimits {
        fuel: Some(1000),
        ..ExecutionLimits::default()
    };
    let mut instance = instantiate_with(source, &ImportTable::new(), limits);
    instance.invoke_export("spin", &[Value::I32(50)]).unwrap();
    instance.invoke_export("spin", &[Value::I32(50)]).unwrap();
    assert!(matches!(
        instance.invoke_export("spin", &[Value::I32(1000)]),
        Err(RuntimeError::InstructionBudgetExhausted)
    ));
}

#[test]
fn unreachable_traps() {
    assert!(matches!(
        call(r#"(module (func (export "boom") unreachable))"#, "boom", &[]),
        Err(RuntimeError::Unreachable)
    ));
}

#[test]
fn host_functions_see_arguments_and_return_values() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut imports = ImportTable::new();
    let log = Rc::clone(&seen);
    imports.add_function(
        "env",
        "double",
        HostFunction::new(
            HostSignature::Exact(FunctionType::new(vec![ValueType::I64], vec![ValueType::I64])),
            move |args| {
                log.borrow_mut().extend_from_slice(args);
                let v = args[0].as_i64().unwrap_or_default();
                Ok(vec![Value::I64(v * 2)])
            },
        ),
    );
    imports.add_function(
        "env",
        "fail",
        HostFunction::new(HostSignature::Exact(FunctionType::default()), |_| {
            Err(RuntimeError::Host("refused".to_string()))
        }),
    );

    let mut instance = instantiate_with(
        r#"(module
            (import "env" "double" (func $double (param i64) (result i64)))
            (import "env" "fail" (func $fail))
            (func (export "quadruple") (param i64) (result i64)
                local.get 0
                call $double
                call $double)
            (func (export "fail") call $fail))"#,
        &imports,
        ExecutionLimits::default(),
    );
    assert_eq!(
        instance.invoke_export("quadruple", &[Value::I64(5)]).unwrap(),
        vec![Value::I64(20)]
    );
    assert_eq!(*seen.borrow(), vec![Value::I64(5), Value::I64(10)]);
    assert_eq!(
        instance.invoke_export("fail", &[]).unwrap_err().to_string(),
        "host function failed: refused"
    );
}

#[test]
fn host_returning_wrong_type_traps() {
    let mut imports = ImportTable::new();
    imports.add_function(
        "env",
        "get",
        HostFunction::new(
            HostSignature::Exact(FunctionType::new(vec![], vec![ValueType::I32])),
            |_| Ok(vec![Value::F32(1.0)]),
        ),
    );
    let mut instance = instantiate_with(
        r#"(module
            (import "env" "get" (func $get (result i32)))
            (func (export "get") (result i32) call $get))"#,
        &imports,
        ExecutionLimits::default(),
    );
    assert!(matches!(
        instance.invoke_export("get", &[]),
        Err(RuntimeError::TypeMismatch { .. })
    ));
}
