//! A small interactive command interpreter.
//!
//! Each input line is split into words, the first word is looked up among a handful of
//! builtins (`exit`, `?`, `pwd`, `cd`) and anything else is launched as an external
//! program with `fork`/`execv`, the shell blocking until it finishes.
//!
//! The main entry point is [`Interpreter`], which drives the read-dispatch-execute loop
//! over any [`LineSource`]. [`Session`] captures the terminal state once at startup and
//! [`env::Environment`] holds the per-interpreter view of the process environment.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod input;
mod interpreter;
mod session;
mod tokenizer;

#[cfg(test)]
mod test_support;

pub use builtin::Builtin;
pub use external::Child;
pub use input::{DEFAULT_LINE_LIMIT, EditorSource, LineSource, ReadError, StreamSource};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
pub use session::Session;
pub use tokenizer::{TokenizeError, Tokens, tokenize};
