//! Block structure for validated function bodies.
//!
//! The flat instruction stream is folded into a tree so the interpreter can
//! run a block by walking its body, with no searching for matching `else`
//! and `end` at run time.

use super::instruction::{BlockType, InstructionKind};
use super::validate::ValidationError;

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredInstruction {
    Plain(InstructionKind),
    Block {
        block_type: BlockType,
        body: Vec<StructuredInstruction>,
    },
    Loop {
        block_type: BlockType,
        body: Vec<StructuredInstruction>,
    },
    If {
        block_type: BlockType,
        then_branch: Vec<StructuredInstruction>,
        else_branch: Option<Vec<StructuredInstruction>>,
    },
}

enum OpenBlock {
    Function,
    Block(BlockType),
    Loop(BlockType),
    If {
        block_type: BlockType,
        then_branch: Option<Vec<StructuredInstruction>>,
    },
}

/// Fold a flat body ending in its final `end` into a tree. The final `end`
/// is consumed and does not appear in the result.
pub fn build(instructions: &[InstructionKind]) -> Result<Vec<StructuredInstruction>, ValidationError> {
    let mut stack: Vec<(OpenBlock, Vec<StructuredInstruction>)> =
        vec![(OpenBlock::Function, Vec::new())];
    let mut iter = instructions.iter();

    while let Some(instruction) = iter.next() {
        match instruction {
            InstructionKind::Block { block_type } => {
                stack.push((OpenBlock::Block(*block_type), Vec::new()))
            }
            InstructionKind::Loop { block_type } => {
                stack.push((OpenBlock::Loop(*block_type), Vec::new()))
            }
            InstructionKind::If { block_type } => stack.push((
                OpenBlock::If {
                    block_type: *block_type,
                    then_branch: None,
                },
                Vec::new(),
            )),
            InstructionKind::Else => match stack.last_mut() {
                Some((
                    OpenBlock::If {
                        then_branch: then_branch @ None,
                        ..
                    },
                    body,
                )) => *then_branch = Some(std::mem::take(body)),
                _ => return Err(ValidationError::UnexpectedToken("else")),
            },
            InstructionKind::End => {
                let (open, body) = stack
                    .pop()
                    .ok_or(ValidationError::UnexpectedToken("end"))?;
                let built = match open {
                    OpenBlock::Function => {
                        if iter.next().is_some() {
                            return Err(ValidationError::UnexpectedToken("instruction after end"));
                        }
                        return Ok(body);
                    }
                    OpenBlock::Block(block_type) => StructuredInstruction::Block { block_type, body },
                    OpenBlock::Loop(block_type) => StructuredInstruction::Loop { block_type, body },
                    OpenBlock::If {
                        block_type,
                        then_branch: None,
                    } => StructuredInstruction::If {
                        block_type,
                        then_branch: body,
                        else_branch: None,
                    },
                    OpenBlock::If {
                        block_type,
                        then_branch: Some(then_branch),
                    } => StructuredInstruction::If {
                        block_type,
                        then_branch,
                        else_branch: Some(body),
                    },
                };
                stack
                    .last_mut()
                    .ok_or(ValidationError::UnexpectedToken("end"))?
                    .1
                    .push(built);
            }
            other => stack
                .last_mut()
                .ok_or(ValidationError::UnexpectedToken("instruction after end"))?
                .1
                .push(StructuredInstruction::Plain(other.clone())),
        }
    }

    Err(ValidationError::UnexpectedToken("end"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::NumericOp;
    use InstructionKind as I;
    use StructuredInstruction as S;

    #[test]
    fn test_build_nested() {
        let flat = vec![
            I::Block {
                block_type: BlockType::Empty,
            },
            I::Loop {
                block_type: BlockType::Empty,
            },
            I::Br { label_idx: 1 },
            I::End,
            I::End,
            I::Nop,
            I::End,
        ];
        assert_eq!(
            build(&flat).unwrap(),
            vec![
                S::Block {
                    block_type: BlockType::Empty,
                    body: vec![S::Loop {
                        block_type: BlockType::Empty,
                        body: vec![S::Plain(I::Br { label_idx: 1 })],
                    }],
                },
                S::Plain(I::Nop),
            ]
        );
    }

    #[test]
    fn test_build_if_else() {
        let flat = vec![
            I::LocalGet { local_idx: 0 },
            I::If {
                block_type: BlockType::Empty,
            },
            I::Nop,
            I::Else,
            I::Numeric(NumericOp::I32Eqz),
            I::End,
            I::End,
        ];
        let built = build(&flat).unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(
            built[1],
            S::If {
                block_type: BlockType::Empty,
                then_branch: vec![S::Plain(I::Nop)],
                else_branch: Some(vec![S::Plain(I::Numeric(NumericOp::I32Eqz))]),
            }
        );
    }

    #[test]
    fn test_build_rejects_unbalanced() {
        assert!(build(&[I::Nop]).is_err());
        assert!(build(&[I::End, I::Nop]).is_err());
        assert!(build(&[I::Else, I::End]).is_err());
    }
}
