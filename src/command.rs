use crate::builtin::Builtin;
use crate::tokenizer::Tokens;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, as POSIX shells do.
pub type ExitCode = i32;

/// What a tokenized line resolves to before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// The line held no words.
    Empty,
    /// The first word names a builtin; it runs inside the shell process.
    Builtin(Builtin, &'a Tokens),
    /// Anything else is the path of a program to execute in a child process.
    External(&'a Tokens),
}

impl<'a> Command<'a> {
    /// Resolve the first token against the builtin registry.
    pub fn resolve(tokens: &'a Tokens) -> Self {
        if tokens.is_empty() {
            return Command::Empty;
        }
        match Builtin::lookup(tokens.get(0)) {
            Some(builtin) => Command::Builtin(builtin, tokens),
            None => Command::External(tokens),
        }
    }
}
