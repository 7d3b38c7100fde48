//! # HLASM language module
//!
//! The context engine tracks scopes, sources, macro and copy nesting while statements
//! are processed.  The semantic index in `lsp` is built on top of what the engine records.
//!
//! * `context::HlasmContext` is the engine, one per compilation unit
//! * `variables` holds SET symbols and macro parameters
//! * `macros` holds macro definitions, invocations and copy members
//! * `ordinary` is the ordinary symbol table
//! * `analyzer` drives the engine from fixed-format source
//! * `lsp::LspContext` answers outline, definition, references, hover and completion queries

pub mod ids;
pub mod terms;
pub mod ebcdic;
pub mod variables;
pub mod ordinary;
pub mod statement;
pub mod macros;
pub mod processing;
pub mod context;
pub mod handbook;
pub mod settings;
pub mod analyzer;
pub mod lsp;

#[cfg(test)]
mod tests;

use lsp_types as lsp_t;
use thiserror::Error;

/// Hard failures of the context engine.
/// They mean the caller skipped a check it was supposed to make, user errors are not reported this way.
#[derive(Error,Debug,PartialEq)]
pub enum Error {
    #[error("unknown macro {0}")]
    UnknownMacro(String),
    #[error("unknown copy member {0}")]
    UnknownCopyMember(String),
    #[error("adding sequence symbols to macro definition not allowed")]
    SequenceSymbolInMacro,
    #[error("undefined operation code {0}")]
    UndefinedOpcode(String),
    #[error("open code cannot be left")]
    OpenCodeExit,
    #[error("no copy member is open")]
    CopyUnderflow,
    #[error("source snapshot requires a single processing frame")]
    SnapshotDepth,
    #[error("processing stack underflow")]
    ProcessingUnderflow
}

/// Position within a file
#[derive(Clone,PartialEq,Eq,Hash,Debug)]
pub struct Location {
    pub pos: lsp_t::Position,
    pub file: String
}

impl Location {
    pub fn new(file: &str,pos: lsp_t::Position) -> Self {
        Self { pos, file: file.to_string() }
    }
    pub fn to_lsp(&self) -> Option<lsp_t::Location> {
        match lsp_t::Url::parse(&self.file) {
            Ok(uri) => Some(lsp_t::Location::new(uri,lsp_t::Range::new(self.pos,self.pos))),
            Err(_) => None
        }
    }
}

/// Data attributes that conditional assembly can query
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum DataAttrKind {
    T,
    L,
    S,
    I,
    K,
    N,
    D,
    O
}

impl DataAttrKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'T' => Some(Self::T),
            'L' => Some(Self::L),
            'S' => Some(Self::S),
            'I' => Some(Self::I),
            'K' => Some(Self::K),
            'N' => Some(Self::N),
            'D' => Some(Self::D),
            'O' => Some(Self::O),
            _ => None
        }
    }
}
