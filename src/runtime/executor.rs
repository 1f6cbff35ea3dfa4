//! WebAssembly instruction executor
//!
//! Interprets the structured form of each function body without recursing
//! on the native stack. Every active wasm call is a [`Frame`] holding its
//! locals and a label stack; blocks, loops and ifs push a [`Label`] that
//! remembers where in its body execution has reached.

use tracing::trace;

use super::imports::ResolvedImport;
use super::instance::{ExecutionLimits, InstanceState};
use super::{ops, stack::Stack, RuntimeError, Value};
use crate::parser::instruction::{BlockType, InstructionKind};
use crate::parser::module::Module;
use crate::parser::structured::StructuredInstruction;

/// What the interpreter does after one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockEnd {
    /// Carry on with the next instruction
    Normal,
    /// Branch to the label this many levels out
    Branch(u32),
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    /// Branches leave the construct (block, if and the function body)
    Block,
    /// Branches re-enter the loop
    Loop,
}

/// An active control construct.
#[derive(Debug, Clone, Copy)]
struct Label<'a> {
    kind: LabelKind,
    body: &'a [StructuredInstruction],
    pc: usize,
    /// Stack height below the construct's parameters
    height: usize,
    /// Values kept by a branch to this label
    arity: usize,
}

/// An active wasm call. The first label is the function body itself.
#[derive(Debug)]
struct Frame<'a> {
    locals: Vec<Value>,
    labels: Vec<Label<'a>>,
    height: usize,
    arity: usize,
}

/// Runs guest code against one instance's state. One executor serves one
/// top-level call, so the fuel budget applies per call.
pub struct Executor<'a> {
    module: &'a Module,
    host_functions: &'a [ResolvedImport],
    state: &'a mut InstanceState,
    stack: Stack,
    frames: Vec<Frame<'a>>,
    max_call_depth: u32,
    fuel: Option<u64>,
}

impl<'a> Executor<'a> {
    pub fn new(
        module: &'a Module,
        host_functions: &'a [ResolvedImport],
        state: &'a mut InstanceState,
        limits: &ExecutionLimits,
    ) -> Self {
        Executor {
            module,
            host_functions,
            state,
            stack: Stack::new(),
            frames: Vec::new(),
            max_call_depth: limits.max_call_depth,
            fuel: limits.fuel,
        }
    }

    /// Call function `func_idx` with `args`, which the caller has already
    /// checked against its type, and return its results.
    pub fn call(&mut self, func_idx: u32, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let arity = self
            .module
            .function_type(func_idx)
            .ok_or(RuntimeError::UnknownFunction(func_idx))?
            .return_types
            .len();
        self.stack.push_all(args.iter().copied());
        self.call_function(func_idx)?;
        self.run()?;
        self.stack.pop_n(arity)
    }

    /// Step through instructions until every frame has returned.
    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let next = {
                let Some(frame) = self.frames.last_mut() else {
                    return Ok(());
                };
                let label = frame.labels.last_mut().ok_or(RuntimeError::UnknownLabel(0))?;
                let body = label.body;
                let next = body.get(label.pc);
                label.pc += 1;
                next
            };

            // falling off the end of a construct leaves it with its results in place
            let Some(instruction) = next else {
                self.end_label()?;
                continue;
            };
            self.consume_fuel()?;
            match self.execute_instruction(instruction)? {
                BlockEnd::Normal => {}
                BlockEnd::Branch(label_idx) => self.branch(label_idx)?,
                BlockEnd::Return => self.finish_function()?,
            }
        }
    }

    /// Take the arguments of `func_idx` from the stack. A host function
    /// runs at once and leaves its results in their place; a wasm function
    /// gets a new frame that [`Executor::run`] picks up.
    fn call_function(&mut self, func_idx: u32) -> Result<(), RuntimeError> {
        let module = self.module;
        let func_type = module
            .function_type(func_idx)
            .ok_or(RuntimeError::UnknownFunction(func_idx))?;

        let host_functions = self.host_functions;
        if let Some(import) = host_functions.get(func_idx as usize) {
            let args = self.stack.pop_n(func_type.parameters.len())?;
            trace!(module = %import.module, name = %import.name, ?args, "calling host function");
            let results = import.function.call(&args)?;

            let result_types: Vec<_> = results.iter().map(Value::typ).collect();
            if result_types != func_type.return_types {
                return Err(RuntimeError::TypeMismatch {
                    expected: format!("{:?}", func_type.return_types),
                    actual: format!("{result_types:?}"),
                });
            }
            self.stack.push_all(results);
            return Ok(());
        }

        if self.frames.len() >= self.max_call_depth as usize {
            return Err(RuntimeError::CallStackExhausted);
        }
        let body = (func_idx as usize)
            .checked_sub(host_functions.len())
            .and_then(|def_idx| module.code.get(def_idx))
            .ok_or(RuntimeError::UnknownFunction(func_idx))?;

        let mut locals = self.stack.pop_n(func_type.parameters.len())?;
        locals.extend(body.locals.iter().map(|typ| Value::default_for(*typ)));
        let height = self.stack.depth();
        let arity = func_type.return_types.len();

        self.frames.push(Frame {
            locals,
            labels: vec![Label {
                kind: LabelKind::Block,
                body: &body.structured,
                pc: 0,
                height,
                arity,
            }],
            height,
            arity,
        });
        Ok(())
    }

    fn execute_instruction(&mut self, instruction: &'a StructuredInstruction) -> Result<BlockEnd, RuntimeError> {
        match instruction {
            StructuredInstruction::Plain(kind) => return self.execute_plain(kind),

            StructuredInstruction::Block { block_type, body } => {
                let (params, results) = self.block_arity(*block_type)?;
                self.enter(LabelKind::Block, body, params, results)?;
            }

            StructuredInstruction::Loop { block_type, body } => {
                let (params, _) = self.block_arity(*block_type)?;
                self.enter(LabelKind::Loop, body, params, params)?;
            }

            StructuredInstruction::If {
                block_type,
                then_branch,
                else_branch,
            } => {
                let condition = self.stack.pop_i32()?;
                let (params, results) = self.block_arity(*block_type)?;
                let body = if condition != 0 {
                    then_branch.as_slice()
                } else {
                    else_branch.as_deref().unwrap_or_default()
                };
                self.enter(LabelKind::Block, body, params, results)?;
            }
        }
        Ok(BlockEnd::Normal)
    }

    fn enter(
        &mut self,
        kind: LabelKind,
        body: &'a [StructuredInstruction],
        params: usize,
        arity: usize,
    ) -> Result<(), RuntimeError> {
        let height = self
            .stack
            .depth()
            .checked_sub(params)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.frame()?.labels.push(Label {
            kind,
            body,
            pc: 0,
            height,
            arity,
        });
        Ok(())
    }

    /// Leave the innermost construct after its last instruction. Its
    /// results are already on top of the stack.
    fn end_label(&mut self) -> Result<(), RuntimeError> {
        let frame = self.frame()?;
        frame.labels.pop();
        if frame.labels.is_empty() {
            return self.finish_function();
        }
        Ok(())
    }

    fn branch(&mut self, label_idx: u32) -> Result<(), RuntimeError> {
        let frame = self.frames.last_mut().ok_or(RuntimeError::UnknownLabel(label_idx))?;
        let target = frame
            .labels
            .len()
            .checked_sub(label_idx as usize + 1)
            .ok_or(RuntimeError::UnknownLabel(label_idx))?;
        // the function body's label: same as return
        if target == 0 {
            return self.finish_function();
        }

        let label = frame.labels[target];
        self.stack.keep_top(label.height, label.arity)?;
        match label.kind {
            LabelKind::Loop => {
                frame.labels.truncate(target + 1);
                frame.labels[target].pc = 0;
            }
            LabelKind::Block => frame.labels.truncate(target),
        }
        Ok(())
    }

    fn finish_function(&mut self) -> Result<(), RuntimeError> {
        let frame = self.frames.pop().ok_or(RuntimeError::UnknownLabel(0))?;
        self.stack.keep_top(frame.height, frame.arity)
    }

    fn frame(&mut self) -> Result<&mut Frame<'a>, RuntimeError> {
        self.frames.last_mut().ok_or(RuntimeError::UnknownLabel(0))
    }

    fn locals(&mut self) -> Result<&mut [Value], RuntimeError> {
        Ok(self.frame()?.locals.as_mut_slice())
    }

    fn execute_plain(&mut self, kind: &InstructionKind) -> Result<BlockEnd, RuntimeError> {
        use InstructionKind::*;

        match kind {
            Unreachable => return Err(RuntimeError::Unreachable),
            // block markers never survive into the structured form
            Nop | Block { .. } | Loop { .. } | If { .. } | Else | End => {}

            Br { label_idx } => return Ok(BlockEnd::Branch(*label_idx)),
            BrIf { label_idx } => {
                if self.stack.pop_i32()? != 0 {
                    return Ok(BlockEnd::Branch(*label_idx));
                }
            }
            BrTable { labels, default } => {
                let idx = self.stack.pop_i32()? as u32;
                let label = labels.get(idx as usize).unwrap_or(default);
                return Ok(BlockEnd::Branch(*label));
            }
            Return => return Ok(BlockEnd::Return),
            Call { func_idx } => self.call_function(*func_idx)?,
            CallIndirect { type_idx, .. } => self.call_indirect(*type_idx)?,

            Drop => {
                self.stack.pop()?;
            }
            Select | SelectTyped { .. } => {
                let condition = self.stack.pop_i32()?;
                let second = self.stack.pop()?;
                let first = self.stack.pop()?;
                self.stack.push(if condition != 0 { first } else { second });
            }

            LocalGet { local_idx } => {
                let value = *self
                    .locals()?
                    .get(*local_idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(*local_idx))?;
                self.stack.push(value);
            }
            LocalSet { local_idx } => {
                let value = self.stack.pop()?;
                *self
                    .locals()?
                    .get_mut(*local_idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(*local_idx))? = value;
            }
            LocalTee { local_idx } => {
                let value = self.stack.pop()?;
                *self
                    .locals()?
                    .get_mut(*local_idx as usize)
                    .ok_or(RuntimeError::LocalIndexOutOfBounds(*local_idx))? = value;
                self.stack.push(value);
            }
            GlobalGet { global_idx } => {
                let value = *self
                    .state
                    .globals
                    .get(*global_idx as usize)
                    .ok_or(RuntimeError::GlobalIndexOutOfBounds(*global_idx))?;
                self.stack.push(value);
            }
            GlobalSet { global_idx } => {
                let value = self.stack.pop()?;
                *self
                    .state
                    .globals
                    .get_mut(*global_idx as usize)
                    .ok_or(RuntimeError::GlobalIndexOutOfBounds(*global_idx))? = value;
            }

            Load { op, memarg } => {
                let memory = self.state.memory.as_ref().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::load(&mut self.stack, memory, *op, *memarg)?;
            }
            Store { op, memarg } => {
                let memory = self.state.memory.as_mut().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::store(&mut self.stack, memory, *op, *memarg)?;
            }
            MemorySize => {
                let memory = self.state.memory.as_ref().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::size(&mut self.stack, memory);
            }
            MemoryGrow => {
                let memory = self.state.memory.as_mut().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::grow(&mut self.stack, memory)?;
            }
            MemoryCopy => {
                let memory = self.state.memory.as_mut().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::copy(&mut self.stack, memory)?;
            }
            MemoryFill => {
                let memory = self.state.memory.as_mut().ok_or(RuntimeError::MemoryOutOfBounds)?;
                ops::memory::fill(&mut self.stack, memory)?;
            }

            I32Const { value } => self.stack.push(Value::I32(*value)),
            I64Const { value } => self.stack.push(Value::I64(*value)),
            F32Const { value } => self.stack.push(Value::F32(*value)),
            F64Const { value } => self.stack.push(Value::F64(*value)),
            Numeric(op) => ops::numeric::execute(&mut self.stack, *op)?,
        }

        Ok(BlockEnd::Normal)
    }

    fn call_indirect(&mut self, type_idx: u32) -> Result<(), RuntimeError> {
        let elem_idx = self.stack.pop_i32()? as u32;
        let table = self.state.table.as_ref().ok_or(RuntimeError::TableOutOfBounds)?;
        let func_idx = table.get(elem_idx)?;

        let expected = self
            .module
            .types
            .get(type_idx as usize)
            .ok_or(RuntimeError::UnknownType(type_idx))?;
        let actual = self
            .module
            .function_type(func_idx)
            .ok_or(RuntimeError::UnknownFunction(func_idx))?;
        if expected != actual {
            return Err(RuntimeError::IndirectCallTypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        self.call_function(func_idx)
    }

    /// (parameter count, result count) of a block
    fn block_arity(&self, block_type: BlockType) -> Result<(usize, usize), RuntimeError> {
        match block_type {
            BlockType::Empty => Ok((0, 0)),
            BlockType::Value(_) => Ok((0, 1)),
            BlockType::FuncType(type_idx) => {
                let func_type = self
                    .module
                    .types
                    .get(type_idx as usize)
                    .ok_or(RuntimeError::UnknownType(type_idx))?;
                Ok((func_type.parameters.len(), func_type.return_types.len()))
            }
        }
    }

    fn consume_fuel(&mut self) -> Result<(), RuntimeError> {
        if let Some(fuel) = self.fuel.as_mut() {
            if *fuel == 0 {
                return Err(RuntimeError::InstructionBudgetExhausted);
            }
            *fuel -= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::NumericOp;
    use crate::parser::module::{FunctionBody, FunctionType, ValueType};

    fn plain(kind: InstructionKind) -> StructuredInstruction {
        StructuredInstruction::Plain(kind)
    }

    fn module_with(func_type: FunctionType, locals: Vec<ValueType>, body: Vec<StructuredInstruction>) -> Module {
        let mut module = Module::new("test");
        module.types = vec![func_type];
        module.functions = vec![0];
        module.code = vec![FunctionBody {
            locals,
            instructions: vec![],
            structured: body,
        }];
        module
    }

    fn run(module: &Module, args: &[Value], limits: ExecutionLimits) -> Result<Vec<Value>, RuntimeError> {
        let mut state = InstanceState::default();
        let mut executor = Executor::new(module, &[], &mut state, &limits);
        executor.call(0, args)
    }

    #[test]
    fn test_add() {
        let module = module_with(
            FunctionType::new(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]),
            vec![],
            vec![
                plain(InstructionKind::LocalGet { local_idx: 0 }),
                plain(InstructionKind::LocalGet { local_idx: 1 }),
                plain(InstructionKind::Numeric(NumericOp::I32Add)),
            ],
        );
        let results = run(&module, &[Value::I32(11), Value::I32(22)], ExecutionLimits::default()).unwrap();
        assert_eq!(results, vec![Value::I32(33)]);
    }

    #[test]
    fn test_branch_out_of_block_keeps_result() {
        // block (result i32) i32.const 1 i32.const 2 br 0 end
        let module = module_with(
            FunctionType::new(vec![], vec![ValueType::I32]),
            vec![],
            vec![StructuredInstruction::Block {
                block_type: BlockType::Value(ValueType::I32),
                body: vec![
                    plain(InstructionKind::I32Const { value: 1 }),
                    plain(InstructionKind::I32Const { value: 2 }),
                    plain(InstructionKind::Br { label_idx: 0 }),
                    plain(InstructionKind::Unreachable),
                ],
            }],
        );
        let results = run(&module, &[], ExecutionLimits::default()).unwrap();
        assert_eq!(results, vec![Value::I32(2)]);
    }

    #[test]
    fn test_loop_counts_down() {
        // local 0 counts down from the argument, local 1 counts iterations
        let module = module_with(
            FunctionType::new(vec![ValueType::I32], vec![ValueType::I32]),
            vec![ValueType::I32],
            vec![
                StructuredInstruction::Loop {
                    block_type: BlockType::Empty,
                    body: vec![
                        plain(InstructionKind::LocalGet { local_idx: 1 }),
                        plain(InstructionKind::I32Const { value: 1 }),
                        plain(InstructionKind::Numeric(NumericOp::I32Add)),
                        plain(InstructionKind::LocalSet { local_idx: 1 }),
                        plain(InstructionKind::LocalGet { local_idx: 0 }),
                        plain(InstructionKind::I32Const { value: 1 }),
                        plain(InstructionKind::Numeric(NumericOp::I32Sub)),
                        plain(InstructionKind::LocalTee { local_idx: 0 }),
                        plain(InstructionKind::BrIf { label_idx: 0 }),
                    ],
                },
                plain(InstructionKind::LocalGet { local_idx: 1 }),
            ],
        );
        let results = run(&module, &[Value::I32(5)], ExecutionLimits::default()).unwrap();
        assert_eq!(results, vec![Value::I32(5)]);
    }

    #[test]
    fn test_fuel_exhaustion() {
        let module = module_with(
            FunctionType::new(vec![], vec![]),
            vec![],
            vec![StructuredInstruction::Loop {
                block_type: BlockType::Empty,
                body: vec![plain(InstructionKind::Br { label_idx: 0 })],
            }],
        );
        let limits = ExecutionLimits {
            fuel: Some(1000),
            ..ExecutionLimits::default()
        };
        assert!(matches!(
            run(&module, &[], limits),
            Err(RuntimeError::InstructionBudgetExhausted)
        ));
    }

    #[test]
    fn test_call_depth() {
        let module = module_with(
            FunctionType::new(vec![], vec![]),
            vec![],
            vec![plain(InstructionKind::Call { func_idx: 0 })],
        );
        let limits = ExecutionLimits {
            max_call_depth: 64,
            ..ExecutionLimits::default()
        };
        assert!(matches!(run(&module, &[], limits), Err(RuntimeError::CallStackExhausted)));
    }

    #[test]
    fn test_call_depth_through_nested_blocks() {
        // `call 0` under 200 nested blocks, with the default limits
        let mut body = vec![plain(InstructionKind::Call { func_idx: 0 })];
        for _ in 0..200 {
            body = vec![StructuredInstruction::Block {
                block_type: BlockType::Empty,
                body,
            }];
        }
        let module = module_with(FunctionType::new(vec![], vec![]), vec![], body);
        assert!(matches!(
            run(&module, &[], ExecutionLimits::default()),
            Err(RuntimeError::CallStackExhausted)
        ));
    }

    #[test]
    fn test_memory_access_without_memory_traps() {
        let module = module_with(
            FunctionType::new(vec![], vec![ValueType::I32]),
            vec![],
            vec![plain(InstructionKind::MemorySize)],
        );
        assert!(matches!(
            run(&module, &[], ExecutionLimits::default()),
            Err(RuntimeError::MemoryOutOfBounds)
        ));
    }
}
