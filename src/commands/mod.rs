//! # CLI Subcommands
//!
//! Every subcommand analyzes one open code file, runs a single query against
//! the resulting semantic index, and prints the answer as JSON.

pub mod query;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("File not found")]
    FileNotFound,
    #[error("URI is not part of the analysis")]
    UnknownUri
}
