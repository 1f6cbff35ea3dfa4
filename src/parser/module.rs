use std::fmt;

use super::instruction::InstructionKind;
use super::structured::StructuredInstruction;
use super::DecodeError;

/// Numeric value types. Reference and vector types are outside what this
/// engine runs and are rejected while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn decode(byte: u8) -> Result<ValueType, DecodeError> {
        match byte {
            0x7f => Ok(ValueType::I32),
            0x7e => Ok(ValueType::I64),
            0x7d => Ok(ValueType::F32),
            0x7c => Ok(ValueType::F64),
            0x7b => Err(DecodeError::Unsupported("v128 value type".to_string())),
            0x70 | 0x6f => Err(DecodeError::Unsupported("reference value type".to_string())),
            other => Err(DecodeError::UnknownValueType(other)),
        }
    }

    /// Size in bytes of a value of this type in linear memory.
    pub fn byte_width(&self) -> u32 {
        match self {
            ValueType::I32 | ValueType::F32 => 4,
            ValueType::I64 | ValueType::F64 => 8,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub return_types: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(parameters: Vec<ValueType>, return_types: Vec<ValueType>) -> FunctionType {
        FunctionType {
            parameters,
            return_types,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(
            f,
            "[{}] -> [{}]",
            join(&self.parameters),
            join(&self.return_types)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalKind {
    /// Index into the type section
    Function(u32),
    /// A funcref table
    Table(Limits),
    Memory(Limits),
    Global(GlobalType),
}

impl ExternalKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExternalKind::Function(_) => "function",
            ExternalKind::Table(_) => "table",
            ExternalKind::Memory(_) => "memory",
            ExternalKind::Global(_) => "global",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub external_kind: ExternalKind,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{} ({})", self.module, self.name, self.external_kind.name())
    }
}

/// The constant expressions that may initialise globals and segment offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    GlobalGet(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: ConstExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

/// An active element segment targeting table 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub offset: ConstExpr,
    pub functions: Vec<u32>,
}

/// An active data segment targeting memory 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub offset: ConstExpr,
    pub init: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionBody {
    /// Declared locals, expanded (parameters are not included)
    pub locals: Vec<ValueType>,
    /// Flat instruction sequence as decoded, ending with `end`
    pub instructions: Vec<InstructionKind>,
    /// Block structure built once the body has validated
    pub structured: Vec<StructuredInstruction>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,

    pub types: Vec<FunctionType>,
    pub imports: Vec<Import>,
    /// Type index of each function defined in this module
    pub functions: Vec<u32>,
    pub tables: Vec<Limits>,
    pub memories: Vec<Limits>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<ElementSegment>,
    pub code: Vec<FunctionBody>,
    pub data: Vec<DataSegment>,
    pub data_count: Option<u32>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn imported_function_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|import| matches!(import.external_kind, ExternalKind::Function(_)))
            .count() as u32
    }

    pub fn imported_globals(&self) -> impl Iterator<Item = &GlobalType> {
        self.imports.iter().filter_map(|import| match &import.external_kind {
            ExternalKind::Global(global_type) => Some(global_type),
            _ => None,
        })
    }

    /// Size of the function index space (imports first, then definitions).
    pub fn function_count(&self) -> u32 {
        self.imported_function_count() + self.functions.len() as u32
    }

    pub fn table_count(&self) -> u32 {
        let imported = self
            .imports
            .iter()
            .filter(|import| matches!(import.external_kind, ExternalKind::Table(_)))
            .count();
        (imported + self.tables.len()) as u32
    }

    pub fn memory_count(&self) -> u32 {
        let imported = self
            .imports
            .iter()
            .filter(|import| matches!(import.external_kind, ExternalKind::Memory(_)))
            .count();
        (imported + self.memories.len()) as u32
    }

    /// Type of a function in the function index space.
    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        let imported = self.imported_function_count();
        let type_idx = if func_idx < imported {
            self.imports
                .iter()
                .filter_map(|import| match import.external_kind {
                    ExternalKind::Function(type_idx) => Some(type_idx),
                    _ => None,
                })
                .nth(func_idx as usize)?
        } else {
            *self.functions.get((func_idx - imported) as usize)?
        };
        self.types.get(type_idx as usize)
    }

    /// Type of a global in the global index space.
    pub fn global_type(&self, global_idx: u32) -> Option<GlobalType> {
        self.imported_globals()
            .copied()
            .chain(self.globals.iter().map(|global| global.global_type))
            .nth(global_idx as usize)
    }

    pub fn get_export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|export| export.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "module {}", self.name)?;
        write!(f, " types = {}", self.types.len())?;
        write!(f, " imports = [")?;
        for (i, import) in self.imports.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{import}")?;
        }
        write!(f, "] functions = {}", self.functions.len())?;
        write!(f, " memories = {}", self.memories.len())?;
        write!(f, " exports = [")?;
        for (i, export) in self.exports.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", export.name)?;
        }
        write!(f, "]")?;
        if let Some(start) = self.start {
            write!(f, " start = {start}")?;
        }
        Ok(())
    }
}
