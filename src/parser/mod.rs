//! Decoding and validation of WebAssembly binary modules.
//!
//! [`parse`] reads the binary format section by section into a [`Module`],
//! validates it, then builds the block structure of each function body so
//! the runtime never sees an unvalidated or unbalanced body.

pub mod encoding;
pub mod instruction;
pub mod module;
pub mod reader;
pub mod structured;
pub mod validate;

use thiserror::Error;
use tracing::debug;

use encoding::*;
use instruction::{decode_instruction, InstructionKind};
use module::{
    ConstExpr, DataSegment, ElementSegment, Export, ExportIndex, ExternalKind, FunctionBody,
    FunctionType, Global, GlobalType, Import, Limits, ValueType,
};
pub use module::Module;
use reader::Reader;
pub use validate::ValidationError;

/// The binary could not be decoded at all.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("integer representation too long")]
    IntegerTooLong,

    #[error("integer too large")]
    IntegerTooLarge,

    #[error("magic header not detected, found 0x{0}")]
    BadMagic(String),

    #[error("unknown binary version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed section id {0}")]
    UnknownSection(u8),

    #[error("section {0} out of order")]
    SectionOutOfOrder(u8),

    #[error("section {0} size mismatch")]
    SectionSizeMismatch(u8),

    #[error("malformed UTF-8 encoding")]
    InvalidUtf8,

    #[error("malformed value type 0x{0:02x}")]
    UnknownValueType(u8),

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("illegal opcode {0}")]
    UnknownOpcode(String),

    #[error("malformed block type {0}")]
    InvalidBlockType(i64),

    #[error("invalid result arity {0} for select")]
    InvalidSelectArity(u32),

    #[error("malformed function type, expected 0x60 but found 0x{0:02x}")]
    MalformedFunctionType(u8),

    #[error("function and code section have inconsistent lengths ({functions} functions, {bodies} bodies)")]
    FunctionCodeMismatch { functions: usize, bodies: usize },

    #[error("too many locals")]
    TooManyLocals,

    #[error("malformed limits flag 0x{0:02x}")]
    InvalidLimits(u8),

    #[error("malformed mutability 0x{0:02x}")]
    InvalidMutability(u8),

    #[error("malformed import kind 0x{0:02x}")]
    InvalidImportKind(u8),

    #[error("malformed export kind 0x{0:02x}")]
    InvalidExportKind(u8),

    #[error("zero byte expected")]
    ZeroByteExpected,

    #[error("constant expression required")]
    InvalidConstExpr,

    #[error("function body must end with `end`")]
    MissingEnd,

    #[error("instructions after the final `end` of a function body")]
    TrailingInstructions,

    #[error("blocks nested too deeply")]
    NestingTooDeep,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed module: {0}")]
    Malformed(#[from] DecodeError),

    #[error("invalid module: {0}")]
    Invalid(#[from] ValidationError),

    #[error("invalid function {index}: {source}")]
    InvalidFunction {
        index: u32,
        source: ValidationError,
    },
}

/// Decode and validate a complete binary module.
pub fn parse(name: &str, bytes: &[u8]) -> Result<Module, ParseError> {
    let mut reader = Reader::new(bytes);
    let mut module = Module::new(name);

    read_header(&mut reader)?;

    let mut last_order = 0;
    while !reader.is_empty() {
        let sec_id = reader.read_byte()?;
        let sec_len = reader.read_vu32()? as usize;
        let mut section = reader.sub_reader(sec_len)?;

        if sec_id == SECTION_CUSTOM {
            let sec_name = section.read_string()?;
            debug!(name = %sec_name, len = sec_len, "skipping custom section");
            continue;
        }

        let order = section_order(sec_id).ok_or(DecodeError::UnknownSection(sec_id))?;
        if order <= last_order {
            return Err(DecodeError::SectionOutOfOrder(sec_id).into());
        }
        last_order = order;

        debug!(id = sec_id, len = sec_len, "reading section");
        read_section(sec_id, &mut section, &mut module)?;

        if !section.is_empty() {
            return Err(DecodeError::SectionSizeMismatch(sec_id).into());
        }
    }

    if module.functions.len() != module.code.len() {
        return Err(DecodeError::FunctionCodeMismatch {
            functions: module.functions.len(),
            bodies: module.code.len(),
        }
        .into());
    }

    validate::validate_module(&module)?;

    let imported = module.imported_function_count();
    for def_idx in 0..module.code.len() {
        let index = imported + def_idx as u32;
        validate::validate_function(&module, def_idx)
            .map_err(|source| ParseError::InvalidFunction { index, source })?;
        let structured = structured::build(&module.code[def_idx].instructions)
            .map_err(|source| ParseError::InvalidFunction { index, source })?;
        module.code[def_idx].structured = structured;
    }

    debug!(module = %module, "parsed module");
    Ok(module)
}

fn read_header(reader: &mut Reader) -> Result<(), DecodeError> {
    let magic = reader.read_bytes(MAGIC.len())?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic(hex::encode(magic)));
    }
    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    Ok(())
}

fn read_section(sec_id: u8, reader: &mut Reader, module: &mut Module) -> Result<(), DecodeError> {
    match sec_id {
        SECTION_TYPE => module.types = read_vec(reader, read_function_type)?,
        SECTION_IMPORT => module.imports = read_vec(reader, read_import)?,
        SECTION_FUNCTION => module.functions = read_vec(reader, |r| r.read_vu32())?,
        SECTION_TABLE => module.tables = read_vec(reader, read_table_type)?,
        SECTION_MEMORY => module.memories = read_vec(reader, read_limits)?,
        SECTION_GLOBAL => module.globals = read_vec(reader, read_global)?,
        SECTION_EXPORT => module.exports = read_vec(reader, read_export)?,
        SECTION_START => module.start = Some(reader.read_vu32()?),
        SECTION_ELEMENT => module.elements = read_vec(reader, read_element)?,
        SECTION_DATA_COUNT => module.data_count = Some(reader.read_vu32()?),
        SECTION_CODE => module.code = read_vec(reader, read_function_body)?,
        SECTION_DATA => module.data = read_vec(reader, read_data)?,
        _ => return Err(DecodeError::UnknownSection(sec_id)),
    }
    Ok(())
}

/* SECTION READERS ************************************************/

fn read_vec<T>(
    reader: &mut Reader,
    read: impl Fn(&mut Reader) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let count = reader.read_vu32()?;
    // each item takes at least one byte, don't trust the count for allocation
    let mut items = Vec::with_capacity((count as usize).min(reader.remaining()));
    for _ in 0..count {
        items.push(read(reader)?);
    }
    Ok(items)
}

fn read_value_types(reader: &mut Reader) -> Result<Vec<ValueType>, DecodeError> {
    read_vec(reader, |r| ValueType::decode(r.read_byte()?))
}

fn read_function_type(reader: &mut Reader) -> Result<FunctionType, DecodeError> {
    let form = reader.read_byte()?;
    if form != TYPE_FUNC {
        return Err(DecodeError::MalformedFunctionType(form));
    }
    let parameters = read_value_types(reader)?;
    let return_types = read_value_types(reader)?;
    Ok(FunctionType::new(parameters, return_types))
}

fn read_limits(reader: &mut Reader) -> Result<Limits, DecodeError> {
    match reader.read_byte()? {
        LIMITS_MIN => Ok(Limits {
            min: reader.read_vu32()?,
            max: None,
        }),
        LIMITS_MIN_MAX => Ok(Limits {
            min: reader.read_vu32()?,
            max: Some(reader.read_vu32()?),
        }),
        flag => Err(DecodeError::InvalidLimits(flag)),
    }
}

fn read_table_type(reader: &mut Reader) -> Result<Limits, DecodeError> {
    match reader.read_byte()? {
        TYPE_FUNCREF => read_limits(reader),
        0x6f => Err(DecodeError::Unsupported("externref tables".to_string())),
        other => Err(DecodeError::UnknownValueType(other)),
    }
}

fn read_global_type(reader: &mut Reader) -> Result<GlobalType, DecodeError> {
    let value_type = ValueType::decode(reader.read_byte()?)?;
    let mutable = match reader.read_byte()? {
        0x00 => false,
        0x01 => true,
        other => return Err(DecodeError::InvalidMutability(other)),
    };
    Ok(GlobalType {
        value_type,
        mutable,
    })
}

fn read_import(reader: &mut Reader) -> Result<Import, DecodeError> {
    let module = reader.read_string()?;
    let name = reader.read_string()?;
    let external_kind = match reader.read_byte()? {
        DESC_FUNC => ExternalKind::Function(reader.read_vu32()?),
        DESC_TABLE => ExternalKind::Table(read_table_type(reader)?),
        DESC_MEMORY => ExternalKind::Memory(read_limits(reader)?),
        DESC_GLOBAL => ExternalKind::Global(read_global_type(reader)?),
        other => return Err(DecodeError::InvalidImportKind(other)),
    };
    Ok(Import {
        module,
        name,
        external_kind,
    })
}

fn read_global(reader: &mut Reader) -> Result<Global, DecodeError> {
    let global_type = read_global_type(reader)?;
    let init = read_const_expr(reader)?;
    Ok(Global { global_type, init })
}

fn read_export(reader: &mut Reader) -> Result<Export, DecodeError> {
    let name = reader.read_string()?;
    let kind = reader.read_byte()?;
    let idx = reader.read_vu32()?;
    let index = match kind {
        DESC_FUNC => ExportIndex::Function(idx),
        DESC_TABLE => ExportIndex::Table(idx),
        DESC_MEMORY => ExportIndex::Memory(idx),
        DESC_GLOBAL => ExportIndex::Global(idx),
        other => return Err(DecodeError::InvalidExportKind(other)),
    };
    Ok(Export { name, index })
}

fn read_element(reader: &mut Reader) -> Result<ElementSegment, DecodeError> {
    let flags = reader.read_vu32()?;
    if flags != ELEM_ACTIVE_FUNCS {
        return Err(DecodeError::Unsupported(format!(
            "element segment with flags {flags}"
        )));
    }
    let offset = read_const_expr(reader)?;
    let functions = read_vec(reader, |r| r.read_vu32())?;
    Ok(ElementSegment { offset, functions })
}

fn read_data(reader: &mut Reader) -> Result<DataSegment, DecodeError> {
    let flags = reader.read_vu32()?;
    match flags {
        DATA_ACTIVE => {}
        DATA_ACTIVE_EXPLICIT => {
            let memory = reader.read_vu32()?;
            if memory != 0 {
                return Err(DecodeError::Unsupported(format!(
                    "data segment for memory {memory}"
                )));
            }
        }
        _ => {
            return Err(DecodeError::Unsupported(format!(
                "data segment with flags {flags}"
            )))
        }
    }
    let offset = read_const_expr(reader)?;
    let init = reader.read_u8vec()?;
    Ok(DataSegment { offset, init })
}

fn read_const_expr(reader: &mut Reader) -> Result<ConstExpr, DecodeError> {
    let expr = match decode_instruction(reader)? {
        InstructionKind::I32Const { value } => ConstExpr::I32(value),
        InstructionKind::I64Const { value } => ConstExpr::I64(value),
        InstructionKind::F32Const { value } => ConstExpr::F32(value),
        InstructionKind::F64Const { value } => ConstExpr::F64(value),
        InstructionKind::GlobalGet { global_idx } => ConstExpr::GlobalGet(global_idx),
        _ => return Err(DecodeError::InvalidConstExpr),
    };
    match decode_instruction(reader)? {
        InstructionKind::End => Ok(expr),
        _ => Err(DecodeError::InvalidConstExpr),
    }
}

fn read_function_body(reader: &mut Reader) -> Result<FunctionBody, DecodeError> {
    let size = reader.read_vu32()? as usize;
    let mut body = reader.sub_reader(size)?;

    let mut locals = Vec::new();
    let mut total: u64 = 0;
    let groups = body.read_vu32()?;
    for _ in 0..groups {
        let count = body.read_vu32()?;
        let value_type = ValueType::decode(body.read_byte()?)?;
        total += u64::from(count);
        if total > MAX_LOCALS {
            return Err(DecodeError::TooManyLocals);
        }
        locals.extend(std::iter::repeat(value_type).take(count as usize));
    }

    let mut instructions = Vec::new();
    let mut depth: u32 = 0;
    loop {
        if body.is_empty() {
            return Err(DecodeError::MissingEnd);
        }
        let instruction = decode_instruction(&mut body)?;
        match instruction {
            InstructionKind::Block { .. }
            | InstructionKind::Loop { .. }
            | InstructionKind::If { .. } => {
                depth += 1;
                if depth > MAX_BLOCK_DEPTH {
                    return Err(DecodeError::NestingTooDeep);
                }
            }
            InstructionKind::End if depth == 0 => {
                instructions.push(instruction);
                break;
            }
            InstructionKind::End => depth -= 1,
            _ => {}
        }
        instructions.push(instruction);
    }

    if !body.is_empty() {
        return Err(DecodeError::TrailingInstructions);
    }

    Ok(FunctionBody {
        locals,
        instructions,
        structured: Vec::new(),
    })
}
