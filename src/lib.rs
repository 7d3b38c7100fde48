//! # `hlasmkit` main library
//!
//! This library follows High Level Assembler (HLASM) sources the way the assembler does,
//! far enough to answer editor queries about them.
//!
//! ## Architecture
//!
//! Analysis of one open code file is built around three pieces:
//! * `lang::hlasm::context::HlasmContext` holds the conditional assembly state: scopes,
//!   variable symbols, macro and copy member registries, the processing stack
//! * `lang::hlasm::analyzer::Analyzer` drives the context through the statements, expanding
//!   macros and copy members that it finds in open code or in a `Library`
//! * `lang::hlasm::lsp::LspContext` is the semantic index built from the finished context,
//!   answering outline, definition, references, hover and completion queries
//!
//! ## Language Files
//!
//! Sources are fixed format: label in column 1, continuation in column 72,
//! continued text resuming in column 16.  Language independent helpers are in `lang`.
//!
//! ## Command Line
//!
//! The `hlasmkit` binary runs one query per invocation and prints the answer as JSON,
//! see the `commands` module.

pub mod lang;
pub mod commands;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;
