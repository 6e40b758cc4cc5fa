use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Longest line, in bytes without the line terminator, that the shell accepts.
pub const DEFAULT_LINE_LIMIT: usize = 4096;

/// Why a line could not be read.
#[derive(Debug)]
pub enum ReadError {
    /// The line was read completely but is longer than the limit; it is discarded.
    TooLong { len: usize, limit: usize },
    /// The line is not valid UTF-8; it is discarded.
    InvalidUtf8,
    /// The input stream itself failed.
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::TooLong { len, limit } => {
                write!(f, "line too long ({len} bytes, limit {limit})")
            }
            ReadError::InvalidUtf8 => write!(f, "line is not valid UTF-8"),
            ReadError::Io(err) => write!(f, "read error: {err}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::Io(err)
    }
}

/// Where command lines come from.
pub trait LineSource {
    /// Show `prompt` (if any) and read the next line without its terminator.
    ///
    /// Returns `Ok(None)` at end of input. A [`ReadError::TooLong`] or
    /// [`ReadError::InvalidUtf8`] consumes the offending line, so the next call reads
    /// the line after it.
    fn read_line(&mut self, prompt: Option<&str>) -> Result<Option<String>, ReadError>;
}

/// Reads lines from any buffered stream, writing prompts to `prompt_out`.
pub struct StreamSource<R, W> {
    reader: R,
    prompt_out: W,
    limit: usize,
    buf: Vec<u8>,
}

impl<R: BufRead, W: Write> StreamSource<R, W> {
    pub fn new(reader: R, prompt_out: W, limit: usize) -> Self {
        Self {
            reader,
            prompt_out,
            limit,
            buf: Vec::new(),
        }
    }

    /// Give back the reader and the prompt writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.prompt_out)
    }
}

impl<R: BufRead, W: Write> LineSource for StreamSource<R, W> {
    fn read_line(&mut self, prompt: Option<&str>) -> Result<Option<String>, ReadError> {
        if let Some(prompt) = prompt {
            self.prompt_out.write_all(prompt.as_bytes())?;
            self.prompt_out.flush()?;
        }

        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }

        check_len(self.buf.len(), self.limit)?;
        String::from_utf8(std::mem::take(&mut self.buf))
            .map(Some)
            .map_err(|_| ReadError::InvalidUtf8)
    }
}

/// Interactive line editing with history, backed by rustyline.
pub struct EditorSource {
    editor: DefaultEditor,
    limit: usize,
}

impl EditorSource {
    pub fn new(limit: usize) -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            limit,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: Option<&str>) -> Result<Option<String>, ReadError> {
        match self.editor.readline(prompt.unwrap_or("")) {
            Ok(line) => {
                check_len(line.len(), self.limit)?;
                if !line.trim().is_empty() {
                    // History is a convenience; failing to record it is not an error.
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the partial line.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(ReadError::Io(err)),
            Err(err) => Err(ReadError::Io(io::Error::other(err.to_string()))),
        }
    }
}

fn check_len(len: usize, limit: usize) -> Result<(), ReadError> {
    if len > limit {
        Err(ReadError::TooLong { len, limit })
    } else {
        Ok(())
    }
}
