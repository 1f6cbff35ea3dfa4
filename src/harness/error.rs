use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;
use crate::runtime::{LinkError, RuntimeError};

/// The harness step a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Instantiate,
    Lookup,
    Invoke,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Stage::Load => "load",
            Stage::Instantiate => "instantiate",
            Stage::Lookup => "lookup",
            Stage::Invoke => "invoke",
        })
    }
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Validation(#[from] ParseError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("no exported function named {0:?}")]
    Lookup(String),

    /// Guest code trapped, or the arguments did not fit the callee. A trap
    /// while instantiating comes from segment initialisation or the start
    /// function.
    #[error("{source}")]
    RuntimeTrap {
        stage: Stage,
        #[source]
        source: RuntimeError,
    },
}

impl HarnessError {
    pub fn stage(&self) -> Stage {
        match self {
            HarnessError::Io { .. } => Stage::Load,
            HarnessError::Validation(_) | HarnessError::Link(_) => Stage::Instantiate,
            HarnessError::Lookup(_) => Stage::Lookup,
            HarnessError::RuntimeTrap { stage, .. } => *stage,
        }
    }

    pub(crate) fn trap(stage: Stage, source: RuntimeError) -> Self {
        HarnessError::RuntimeTrap { stage, source }
    }
}
