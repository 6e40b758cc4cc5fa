use crate::command::{Command, ExitCode};
use crate::env::Environment;
use crate::external;
use crate::input::{LineSource, ReadError};
use crate::session::Session;
use crate::tokenizer::tokenize;
use anyhow::Context;
use log::debug;
use std::io::Write;

/// The read-dispatch-execute loop.
///
/// The interpreter owns an [`Environment`] and the [`Session`] captured at startup. Each
/// line read from a [`LineSource`] is tokenized and either handed to a builtin, which
/// runs in this process, or executed as an external program in a child process that
/// the interpreter waits for before reading the next line.
///
/// Example
/// ```
/// use smallsh::env::Environment;
/// use smallsh::{Interpreter, Session, StreamSource};
///
/// let mut sh = Interpreter::new(Environment::new(), Session::detached(false));
/// let mut input = StreamSource::new(&b"?\n"[..], std::io::sink(), 4096);
/// let mut out = Vec::new();
/// sh.run(&mut input, &mut out, &mut std::io::sink()).unwrap();
/// assert!(String::from_utf8(out).unwrap().contains("cd - changes directory"));
/// ```
pub struct Interpreter {
    env: Environment,
    session: Session,
    line_number: usize,
}

impl Interpreter {
    pub fn new(env: Environment, session: Session) -> Self {
        Self {
            env,
            session,
            line_number: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until end of input or `exit`.
    ///
    /// Problems with a single line (a failed builtin, a program that cannot start, an
    /// unterminated quote, an over-long line) are reported on `stderr` and the loop
    /// moves on. Only a failing input stream or a failing `stdout`/`stderr` ends it with
    /// an error.
    pub fn run<S: LineSource + ?Sized>(
        &mut self,
        input: &mut S,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<()> {
        while !self.env.should_exit {
            let prompt = self
                .session
                .is_interactive()
                .then(|| format!("{}: ", self.line_number));

            match input.read_line(prompt.as_deref()) {
                Ok(Some(line)) => {
                    self.execute_line(&line, stdout, stderr)?;
                }
                Ok(None) => {
                    debug!("end of input after {} line(s)", self.line_number);
                    break;
                }
                Err(ReadError::Io(err)) => {
                    return Err(err).context("failed to read command line");
                }
                Err(err) => writeln!(stderr, "smallsh: {err}")?,
            }
            self.line_number += 1;
        }
        Ok(())
    }

    /// Tokenize and run one line.
    ///
    /// Returns the command's exit code, or `None` when nothing ran (blank line or a
    /// reported error).
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<Option<ExitCode>> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                writeln!(stderr, "smallsh: {err}")?;
                return Ok(None);
            }
        };

        let result = match Command::resolve(&tokens) {
            Command::Empty => return Ok(None),
            Command::Builtin(builtin, tokens) => {
                let result = builtin.run(tokens, stdout, &mut self.env);
                stdout.flush()?;
                result
            }
            Command::External(tokens) => {
                stdout.flush()?;
                external::run(tokens)
            }
        };

        match result {
            Ok(code) => Ok(Some(code)),
            Err(err) => {
                writeln!(stderr, "{err:#}")?;
                Ok(None)
            }
        }
    }
}
