use std::collections::HashSet;

use thiserror::Error;

use super::instruction::{BlockType, InstructionKind};
use super::module::{ConstExpr, ExportIndex, ExternalKind, FunctionType, Limits, Module};
use super::module::{ValueType, ValueType::*};
use MaybeValue::{Unknown, Val};

/// Largest memory, in 64KiB pages, a 32-bit address space can hold.
pub const MAX_PAGES: u32 = 65536;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("type mismatch")]
    TypeMismatch,

    #[error("unknown type {0}")]
    UnknownType(u32),

    #[error("unknown function {0}")]
    UnknownFunction(u32),

    #[error("unknown local {0}")]
    UnknownLocal(u32),

    #[error("unknown global {0}")]
    UnknownGlobal(u32),

    #[error("unknown label {0}")]
    UnknownLabel(u32),

    #[error("unknown memory")]
    UnknownMemory,

    #[error("unknown table {0}")]
    UnknownTable(u32),

    #[error("global {0} is immutable")]
    ImmutableGlobal(u32),

    #[error("alignment must not be larger than natural")]
    BadAlignment,

    #[error("multiple memories")]
    MultipleMemories,

    #[error("multiple tables")]
    MultipleTables,

    #[error("size minimum must not be greater than maximum")]
    InvalidLimits,

    #[error("memory size must be at most 65536 pages (4GiB)")]
    MemoryTooLarge,

    #[error("duplicate export name {0:?}")]
    DuplicateExportName(String),

    #[error("start function must have type [] -> []")]
    StartFunctionType,

    #[error("constant expression required")]
    ConstantExpressionRequired,

    #[error("data count and data section have inconsistent lengths")]
    DataCountMismatch,

    #[error("unexpected token {0}")]
    UnexpectedToken(&'static str),
}

/// Checks that span the whole module: index spaces, limits, exports,
/// segment offsets and the start function. Function bodies are checked
/// separately by [`validate_function`].
pub fn validate_module(module: &Module) -> Result<(), ValidationError> {
    for import in &module.imports {
        match &import.external_kind {
            ExternalKind::Function(type_idx) => {
                module
                    .types
                    .get(*type_idx as usize)
                    .ok_or(ValidationError::UnknownType(*type_idx))?;
            }
            ExternalKind::Table(limits) => check_limits(limits, u32::MAX)?,
            ExternalKind::Memory(limits) => check_limits(limits, MAX_PAGES)?,
            ExternalKind::Global(_) => {}
        }
    }

    for type_idx in &module.functions {
        module
            .types
            .get(*type_idx as usize)
            .ok_or(ValidationError::UnknownType(*type_idx))?;
    }

    if module.table_count() > 1 {
        return Err(ValidationError::MultipleTables);
    }
    for limits in &module.tables {
        check_limits(limits, u32::MAX)?;
    }

    if module.memory_count() > 1 {
        return Err(ValidationError::MultipleMemories);
    }
    for limits in &module.memories {
        check_limits(limits, MAX_PAGES)?;
    }

    for global in &module.globals {
        if const_expr_type(module, &global.init)? != global.global_type.value_type {
            return Err(ValidationError::TypeMismatch);
        }
    }

    let mut names = HashSet::new();
    for export in &module.exports {
        if !names.insert(export.name.as_str()) {
            return Err(ValidationError::DuplicateExportName(export.name.clone()));
        }
        match export.index {
            ExportIndex::Function(idx) if idx >= module.function_count() => {
                return Err(ValidationError::UnknownFunction(idx))
            }
            ExportIndex::Table(idx) if idx >= module.table_count() => {
                return Err(ValidationError::UnknownTable(idx))
            }
            ExportIndex::Memory(idx) if idx >= module.memory_count() => {
                return Err(ValidationError::UnknownMemory)
            }
            ExportIndex::Global(idx) if module.global_type(idx).is_none() => {
                return Err(ValidationError::UnknownGlobal(idx))
            }
            _ => {}
        }
    }

    if let Some(start) = module.start {
        let ftype = module
            .function_type(start)
            .ok_or(ValidationError::UnknownFunction(start))?;
        if !ftype.parameters.is_empty() || !ftype.return_types.is_empty() {
            return Err(ValidationError::StartFunctionType);
        }
    }

    for segment in &module.elements {
        if module.table_count() == 0 {
            return Err(ValidationError::UnknownTable(0));
        }
        if const_expr_type(module, &segment.offset)? != I32 {
            return Err(ValidationError::TypeMismatch);
        }
        for func_idx in &segment.functions {
            if *func_idx >= module.function_count() {
                return Err(ValidationError::UnknownFunction(*func_idx));
            }
        }
    }

    for segment in &module.data {
        if module.memory_count() == 0 {
            return Err(ValidationError::UnknownMemory);
        }
        if const_expr_type(module, &segment.offset)? != I32 {
            return Err(ValidationError::TypeMismatch);
        }
    }

    if let Some(count) = module.data_count {
        if count as usize != module.data.len() {
            return Err(ValidationError::DataCountMismatch);
        }
    }

    Ok(())
}

fn check_limits(limits: &Limits, bound: u32) -> Result<(), ValidationError> {
    if limits.min > bound || limits.max.map_or(false, |max| max > bound) {
        return Err(ValidationError::MemoryTooLarge);
    }
    if limits.max.map_or(false, |max| limits.min > max) {
        return Err(ValidationError::InvalidLimits);
    }
    Ok(())
}

/// Type produced by a constant expression. `global.get` may only read
/// immutable imported globals.
fn const_expr_type(module: &Module, expr: &ConstExpr) -> Result<ValueType, ValidationError> {
    match expr {
        ConstExpr::I32(_) => Ok(I32),
        ConstExpr::I64(_) => Ok(I64),
        ConstExpr::F32(_) => Ok(F32),
        ConstExpr::F64(_) => Ok(F64),
        ConstExpr::GlobalGet(idx) => {
            let global_type = module
                .imported_globals()
                .nth(*idx as usize)
                .ok_or(ValidationError::UnknownGlobal(*idx))?;
            if global_type.mutable {
                return Err(ValidationError::ConstantExpressionRequired);
            }
            Ok(global_type.value_type)
        }
    }
}

/// Validate the body of the `def_idx`th function defined in the module.
pub fn validate_function(module: &Module, def_idx: usize) -> Result<(), ValidationError> {
    let func_idx = module.imported_function_count() + def_idx as u32;
    let ftype = module
        .function_type(func_idx)
        .ok_or(ValidationError::UnknownFunction(func_idx))?;
    let body = module
        .code
        .get(def_idx)
        .ok_or(ValidationError::UnknownFunction(func_idx))?;

    let mut validator = CodeValidator::new(module, ftype, &body.locals);
    for instruction in &body.instructions {
        validator.validate(instruction)?;
    }
    if !validator.ended() {
        return Err(ValidationError::UnexpectedToken("end"));
    }
    Ok(())
}

#[derive(PartialEq, Debug, Clone, Copy)]
enum MaybeValue {
    Val(ValueType),
    Unknown,
}

#[derive(PartialEq, Debug, Clone, Copy)]
enum FrameKind {
    Function,
    Block,
    Loop,
    If,
    Else,
}

#[derive(Clone)]
struct CtrlFrame {
    kind: FrameKind,
    start_types: Vec<ValueType>,
    end_types: Vec<ValueType>,
    height: usize,
    unreachable: bool,
}

/// Operand and control stack type checker for one function body.
struct CodeValidator<'a> {
    module: &'a Module,
    locals: Vec<ValueType>,
    return_types: Vec<ValueType>,
    vals: Vec<MaybeValue>,
    ctrls: Vec<CtrlFrame>,
    finished: bool,
}

impl<'a> CodeValidator<'a> {
    fn new(module: &'a Module, ftype: &FunctionType, locals: &[ValueType]) -> CodeValidator<'a> {
        let mut v = CodeValidator {
            module,
            locals: ftype.parameters.iter().chain(locals).copied().collect(),
            return_types: ftype.return_types.clone(),
            vals: vec![],
            ctrls: vec![],
            finished: false,
        };

        // parameters live in locals, so the function frame starts with an empty stack
        v.push_ctrl(FrameKind::Function, vec![], ftype.return_types.clone());
        v
    }

    fn ended(&self) -> bool {
        self.finished && self.ctrls.is_empty()
    }

    fn push_val(&mut self, val_type: MaybeValue) {
        self.vals.push(val_type);
    }

    fn push_vals(&mut self, val_types: &[ValueType]) {
        self.vals.extend(val_types.iter().map(|t| Val(*t)));
    }

    fn pop_val(&mut self) -> Result<MaybeValue, ValidationError> {
        let frame = self
            .ctrls
            .last()
            .ok_or(ValidationError::UnexpectedToken("instruction after end"))?;
        if self.vals.len() == frame.height {
            if frame.unreachable {
                return Ok(Unknown);
            }
            return Err(ValidationError::TypeMismatch);
        }
        self.vals.pop().ok_or(ValidationError::TypeMismatch)
    }

    fn pop_expected(&mut self, val_type: ValueType) -> Result<MaybeValue, ValidationError> {
        let popped = self.pop_val()?;
        match popped {
            Val(actual) if actual != val_type => Err(ValidationError::TypeMismatch),
            _ => Ok(popped),
        }
    }

    fn pop_expecteds(&mut self, val_types: &[ValueType]) -> Result<(), ValidationError> {
        for val_type in val_types.iter().rev() {
            self.pop_expected(*val_type)?;
        }
        Ok(())
    }

    fn push_ctrl(&mut self, kind: FrameKind, start_types: Vec<ValueType>, end_types: Vec<ValueType>) {
        self.push_vals(&start_types);
        self.ctrls.push(CtrlFrame {
            kind,
            height: self.vals.len() - start_types.len(),
            start_types,
            end_types,
            unreachable: false,
        });
    }

    fn pop_ctrl(&mut self) -> Result<CtrlFrame, ValidationError> {
        let end_types = self
            .ctrls
            .last()
            .ok_or(ValidationError::UnexpectedToken("end"))?
            .end_types
            .clone();
        self.pop_expecteds(&end_types)?;
        let frame = self
            .ctrls
            .pop()
            .ok_or(ValidationError::UnexpectedToken("end"))?;
        if self.vals.len() != frame.height {
            return Err(ValidationError::TypeMismatch);
        }
        Ok(frame)
    }

    /// Types a branch to label `li` must carry.
    fn label_types(&self, li: u32) -> Result<Vec<ValueType>, ValidationError> {
        let index = self
            .ctrls
            .len()
            .checked_sub(li as usize + 1)
            .ok_or(ValidationError::UnknownLabel(li))?;
        let frame = &self.ctrls[index];
        Ok(if frame.kind == FrameKind::Loop {
            frame.start_types.clone()
        } else {
            frame.end_types.clone()
        })
    }

    fn unreachable(&mut self) -> Result<(), ValidationError> {
        let ctrl = self
            .ctrls
            .last_mut()
            .ok_or(ValidationError::UnexpectedToken("instruction after end"))?;
        self.vals.truncate(ctrl.height);
        ctrl.unreachable = true;
        Ok(())
    }

    fn local(&self, local_idx: u32) -> Result<ValueType, ValidationError> {
        self.locals
            .get(local_idx as usize)
            .copied()
            .ok_or(ValidationError::UnknownLocal(local_idx))
    }

    fn block_signature(&self, block_type: BlockType) -> Result<FunctionType, ValidationError> {
        match block_type {
            BlockType::Empty => Ok(FunctionType::default()),
            BlockType::Value(t) => Ok(FunctionType::new(vec![], vec![t])),
            BlockType::FuncType(type_idx) => self
                .module
                .types
                .get(type_idx as usize)
                .cloned()
                .ok_or(ValidationError::UnknownType(type_idx)),
        }
    }

    fn require_memory(&self) -> Result<(), ValidationError> {
        if self.module.memory_count() == 0 {
            return Err(ValidationError::UnknownMemory);
        }
        Ok(())
    }

    fn validate(&mut self, inst: &InstructionKind) -> Result<(), ValidationError> {
        if self.ctrls.is_empty() {
            return Err(ValidationError::UnexpectedToken("instruction after end"));
        }

        match inst {
            InstructionKind::Unreachable => self.unreachable(),
            InstructionKind::Nop => Ok(()),

            InstructionKind::Block { block_type }
            | InstructionKind::Loop { block_type }
            | InstructionKind::If { block_type } => {
                let kind = match inst {
                    InstructionKind::Block { .. } => FrameKind::Block,
                    InstructionKind::Loop { .. } => FrameKind::Loop,
                    _ => FrameKind::If,
                };
                // special case for If we need to pop an i32
                if kind == FrameKind::If {
                    self.pop_expected(I32)?;
                }
                let signature = self.block_signature(*block_type)?;
                self.pop_expecteds(&signature.parameters)?;
                self.push_ctrl(kind, signature.parameters, signature.return_types);
                Ok(())
            }

            InstructionKind::Else => {
                let ctrl = self.pop_ctrl()?;
                if ctrl.kind != FrameKind::If {
                    return Err(ValidationError::UnexpectedToken("else"));
                }
                self.push_ctrl(FrameKind::Else, ctrl.start_types, ctrl.end_types);
                Ok(())
            }

            InstructionKind::End => {
                let ctrl = self.pop_ctrl()?;
                // an if without else passes its inputs straight through
                if ctrl.kind == FrameKind::If && ctrl.start_types != ctrl.end_types {
                    return Err(ValidationError::TypeMismatch);
                }
                if ctrl.kind == FrameKind::Function {
                    self.finished = true;
                }
                self.push_vals(&ctrl.end_types);
                Ok(())
            }

            InstructionKind::Br { label_idx } => {
                let label_types = self.label_types(*label_idx)?;
                self.pop_expecteds(&label_types)?;
                self.unreachable()
            }

            InstructionKind::BrIf { label_idx } => {
                self.pop_expected(I32)?;
                let label_types = self.label_types(*label_idx)?;
                self.pop_expecteds(&label_types)?;
                self.push_vals(&label_types);
                Ok(())
            }

            InstructionKind::BrTable { labels, default } => {
                self.pop_expected(I32)?;
                let default_types = self.label_types(*default)?;
                for label in labels {
                    let label_types = self.label_types(*label)?;
                    if label_types.len() != default_types.len() {
                        return Err(ValidationError::TypeMismatch);
                    }
                    // check against the stack without consuming it
                    let saved = self.vals.clone();
                    self.pop_expecteds(&label_types)?;
                    self.vals = saved;
                }
                self.pop_expecteds(&default_types)?;
                self.unreachable()
            }

            InstructionKind::Return => {
                let return_types = self.return_types.clone();
                self.pop_expecteds(&return_types)?;
                self.unreachable()
            }

            InstructionKind::Call { func_idx } => {
                let ftype = self
                    .module
                    .function_type(*func_idx)
                    .ok_or(ValidationError::UnknownFunction(*func_idx))?
                    .clone();
                self.pop_expecteds(&ftype.parameters)?;
                self.push_vals(&ftype.return_types);
                Ok(())
            }

            InstructionKind::CallIndirect {
                type_idx,
                table_idx,
            } => {
                if *table_idx >= self.module.table_count() {
                    return Err(ValidationError::UnknownTable(*table_idx));
                }
                let ftype = self
                    .module
                    .types
                    .get(*type_idx as usize)
                    .ok_or(ValidationError::UnknownType(*type_idx))?
                    .clone();
                // operand that directs us to the table entry
                self.pop_expected(I32)?;
                self.pop_expecteds(&ftype.parameters)?;
                self.push_vals(&ftype.return_types);
                Ok(())
            }

            InstructionKind::Drop => {
                self.pop_val()?;
                Ok(())
            }

            InstructionKind::Select => {
                self.pop_expected(I32)?;
                let t1 = self.pop_val()?;
                let t2 = self.pop_val()?;
                match (t1, t2) {
                    (Val(a), Val(b)) if a != b => Err(ValidationError::TypeMismatch),
                    (Unknown, t) | (t, _) => {
                        self.push_val(t);
                        Ok(())
                    }
                }
            }

            InstructionKind::SelectTyped { val_type } => {
                self.pop_expected(I32)?;
                self.pop_expected(*val_type)?;
                self.pop_expected(*val_type)?;
                self.push_val(Val(*val_type));
                Ok(())
            }

            InstructionKind::LocalGet { local_idx } => {
                let t = self.local(*local_idx)?;
                self.push_val(Val(t));
                Ok(())
            }

            InstructionKind::LocalSet { local_idx } => {
                let t = self.local(*local_idx)?;
                self.pop_expected(t)?;
                Ok(())
            }

            InstructionKind::LocalTee { local_idx } => {
                let t = self.local(*local_idx)?;
                self.pop_expected(t)?;
                self.push_val(Val(t));
                Ok(())
            }

            InstructionKind::GlobalGet { global_idx } => {
                let global = self
                    .module
                    .global_type(*global_idx)
                    .ok_or(ValidationError::UnknownGlobal(*global_idx))?;
                self.push_val(Val(global.value_type));
                Ok(())
            }

            InstructionKind::GlobalSet { global_idx } => {
                let global = self
                    .module
                    .global_type(*global_idx)
                    .ok_or(ValidationError::UnknownGlobal(*global_idx))?;
                if !global.mutable {
                    return Err(ValidationError::ImmutableGlobal(*global_idx));
                }
                self.pop_expected(global.value_type)?;
                Ok(())
            }

            InstructionKind::Load { op, memarg } => {
                self.require_memory()?;
                check_alignment(memarg.align, op.width())?;
                self.pop_expected(I32)?;
                self.push_val(Val(op.value_type()));
                Ok(())
            }

            InstructionKind::Store { op, memarg } => {
                self.require_memory()?;
                check_alignment(memarg.align, op.width())?;
                self.pop_expected(op.value_type())?;
                self.pop_expected(I32)?;
                Ok(())
            }

            InstructionKind::MemorySize => {
                self.require_memory()?;
                self.push_val(Val(I32));
                Ok(())
            }

            InstructionKind::MemoryGrow => {
                self.require_memory()?;
                self.pop_expected(I32)?;
                self.push_val(Val(I32));
                Ok(())
            }

            InstructionKind::MemoryCopy | InstructionKind::MemoryFill => {
                self.require_memory()?;
                self.pop_expecteds(&[I32, I32, I32])
            }

            InstructionKind::I32Const { .. } => {
                self.push_val(Val(I32));
                Ok(())
            }
            InstructionKind::I64Const { .. } => {
                self.push_val(Val(I64));
                Ok(())
            }
            InstructionKind::F32Const { .. } => {
                self.push_val(Val(F32));
                Ok(())
            }
            InstructionKind::F64Const { .. } => {
                self.push_val(Val(F64));
                Ok(())
            }

            InstructionKind::Numeric(op) => {
                self.pop_expecteds(op.params())?;
                self.push_val(Val(op.result()));
                Ok(())
            }
        }
    }
}

/// `align` is an exponent and may not exceed the natural alignment of the access.
fn check_alignment(align: u32, width: u32) -> Result<(), ValidationError> {
    if align >= 32 || 1u32 << align > width {
        return Err(ValidationError::BadAlignment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::{LoadOp, MemArg, NumericOp};
    use crate::parser::module::{Export, FunctionBody, Global, GlobalType};
    use rstest::rstest;

    fn module_with_body(
        params: Vec<ValueType>,
        results: Vec<ValueType>,
        instructions: Vec<InstructionKind>,
    ) -> Module {
        let mut module = Module::new("test");
        module.types = vec![FunctionType::new(params, results)];
        module.functions = vec![0];
        module.code = vec![FunctionBody {
            locals: vec![I64],
            instructions,
            structured: vec![],
        }];
        module
    }

    fn check(
        params: Vec<ValueType>,
        results: Vec<ValueType>,
        instructions: Vec<InstructionKind>,
    ) -> Result<(), ValidationError> {
        validate_function(&module_with_body(params, results, instructions), 0)
    }

    use InstructionKind as I;

    #[test]
    fn test_add_validates() {
        assert!(check(
            vec![I32, I32],
            vec![I32],
            vec![
                I::LocalGet { local_idx: 0 },
                I::LocalGet { local_idx: 1 },
                I::Numeric(NumericOp::I32Add),
                I::End,
            ]
        )
        .is_ok());
    }

    #[rstest]
    #[case::wrong_result(vec![I::I64Const { value: 1 }, I::End])]
    #[case::missing_result(vec![I::End])]
    #[case::extra_value(vec![I::I32Const { value: 1 }, I::I32Const { value: 2 }, I::End])]
    #[case::wrong_operand(vec![I::I32Const { value: 1 }, I::F32Const { value: 1.0 }, I::Numeric(NumericOp::I32Add), I::End])]
    #[case::local_type(vec![I::LocalGet { local_idx: 0 }, I::End])]
    #[case::if_without_else_result(vec![I::I32Const { value: 1 }, I::If { block_type: BlockType::Value(I32) }, I::I32Const { value: 1 }, I::End, I::End])]
    fn test_type_mismatch(#[case] instructions: Vec<InstructionKind>) {
        assert!(matches!(
            check(vec![], vec![I32], instructions),
            Err(ValidationError::TypeMismatch)
        ));
    }

    #[test]
    fn test_unreachable_makes_stack_polymorphic() {
        assert!(check(
            vec![],
            vec![I32],
            vec![I::Unreachable, I::Numeric(NumericOp::I32Add), I::End]
        )
        .is_ok());
        assert!(check(vec![], vec![F64], vec![I::Unreachable, I::End]).is_ok());
    }

    #[test]
    fn test_branches() {
        // block (result i32) i32.const 1 br 0 end
        assert!(check(
            vec![],
            vec![I32],
            vec![
                I::Block {
                    block_type: BlockType::Value(I32)
                },
                I::I32Const { value: 1 },
                I::Br { label_idx: 0 },
                I::End,
                I::End,
            ]
        )
        .is_ok());

        assert!(matches!(
            check(vec![], vec![], vec![I::Br { label_idx: 1 }, I::End]),
            Err(ValidationError::UnknownLabel(1))
        ));

        // loop labels take the loop's parameters, not its results
        assert!(check(
            vec![],
            vec![I32],
            vec![
                I::Loop {
                    block_type: BlockType::Value(I32)
                },
                I::I32Const { value: 1 },
                I::Br { label_idx: 0 },
                I::End,
                I::End,
            ]
        )
        .is_ok());

        assert!(matches!(
            check(
                vec![],
                vec![I32],
                vec![
                    I::Block {
                        block_type: BlockType::Value(I32)
                    },
                    I::Br { label_idx: 0 },
                    I::End,
                    I::End,
                ]
            ),
            Err(ValidationError::TypeMismatch)
        ));
    }

    #[test]
    fn test_br_table_arity() {
        assert!(matches!(
            check(
                vec![],
                vec![I32],
                vec![
                    I::Block {
                        block_type: BlockType::Empty
                    },
                    I::I32Const { value: 7 },
                    I::I32Const { value: 0 },
                    I::BrTable {
                        labels: vec![0],
                        default: 1
                    },
                    I::End,
                    I::I32Const { value: 0 },
                    I::End,
                ]
            ),
            Err(ValidationError::TypeMismatch)
        ));
    }

    #[test]
    fn test_else_requires_if() {
        assert!(matches!(
            check(
                vec![],
                vec![],
                vec![
                    I::Block {
                        block_type: BlockType::Empty
                    },
                    I::Else,
                    I::End,
                    I::End
                ]
            ),
            Err(ValidationError::UnexpectedToken("else"))
        ));
    }

    #[test]
    fn test_memory_instructions_need_memory() {
        let load = vec![
            I::I32Const { value: 0 },
            I::Load {
                op: LoadOp::I32Load,
                memarg: MemArg { align: 2, offset: 0 },
            },
            I::End,
        ];
        assert!(matches!(
            check(vec![], vec![I32], load.clone()),
            Err(ValidationError::UnknownMemory)
        ));

        let mut module = module_with_body(vec![], vec![I32], load);
        module.memories.push(Limits { min: 1, max: None });
        assert!(validate_function(&module, 0).is_ok());

        module.code[0].instructions[1] = I::Load {
            op: LoadOp::I32Load,
            memarg: MemArg { align: 3, offset: 0 },
        };
        assert!(matches!(
            validate_function(&module, 0),
            Err(ValidationError::BadAlignment)
        ));
    }

    #[test]
    fn test_global_set_requires_mutable() {
        let mut module = module_with_body(
            vec![],
            vec![],
            vec![
                I::I32Const { value: 1 },
                I::GlobalSet { global_idx: 0 },
                I::End,
            ],
        );
        module.globals.push(Global {
            global_type: GlobalType {
                value_type: I32,
                mutable: false,
            },
            init: ConstExpr::I32(0),
        });
        assert!(matches!(
            validate_function(&module, 0),
            Err(ValidationError::ImmutableGlobal(0))
        ));
    }

    #[test]
    fn test_module_checks() {
        let mut module = module_with_body(vec![], vec![], vec![I::End]);
        module.exports = vec![
            Export {
                name: "f".to_string(),
                index: ExportIndex::Function(0),
            },
            Export {
                name: "f".to_string(),
                index: ExportIndex::Function(0),
            },
        ];
        assert!(matches!(
            validate_module(&module),
            Err(ValidationError::DuplicateExportName(name)) if name == "f"
        ));

        module.exports.pop();
        module.memories = vec![Limits {
            min: 2,
            max: Some(1),
        }];
        assert!(matches!(
            validate_module(&module),
            Err(ValidationError::InvalidLimits)
        ));

        module.memories = vec![Limits {
            min: MAX_PAGES + 1,
            max: None,
        }];
        assert!(matches!(
            validate_module(&module),
            Err(ValidationError::MemoryTooLarge)
        ));

        module.memories.clear();
        module.types.push(FunctionType::new(vec![I32], vec![]));
        module.functions.push(1);
        module.code.push(FunctionBody::default());
        module.start = Some(1);
        assert!(matches!(
            validate_module(&module),
            Err(ValidationError::StartFunctionType)
        ));
    }
}
