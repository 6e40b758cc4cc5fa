//! Splitting a command line into words.
//!
//! Words are separated by whitespace. Single quotes keep their content literally,
//! double quotes keep their content except for backslash escapes, and outside quotes a
//! backslash escapes the next character. Nothing is expanded.

use std::fmt;

/// Words of one input line, in order.
///
/// Index 0, when present, is the command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    words: Vec<String>,
}

impl Tokens {
    /// Number of words on the line.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Tokens {
    fn from(words: Vec<String>) -> Self {
        Self { words }
    }
}

/// Errors that can occur while splitting a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A closing quote was not found before the end of the line.
    UnfinishedQuote(char),
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::UnfinishedQuote(q) => write!(f, "unterminated {q} quote"),
        }
    }
}

impl std::error::Error for TokenizeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Word,
    SingleQuote,
    DoubleQuote,
}

struct TokenizerFSM<'a> {
    input: std::str::Chars<'a>,
    state: State,
    word: String,
    words: Vec<String>,
}

impl<'a> TokenizerFSM<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            input: line.chars(),
            state: State::Start,
            word: String::new(),
            words: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Tokens, TokenizeError> {
        while let Some(ch) = self.input.next() {
            match self.state {
                State::Start => self.handle_start(ch),
                State::Word => self.handle_word(ch),
                State::SingleQuote => self.handle_single_quote(ch),
                State::DoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            State::SingleQuote => return Err(TokenizeError::UnfinishedQuote('\'')),
            State::DoubleQuote => return Err(TokenizeError::UnfinishedQuote('"')),
            State::Word => self.finish_word(),
            State::Start => {}
        }

        Ok(Tokens { words: self.words })
    }

    fn handle_start(&mut self, ch: char) {
        if is_separator(ch) {
            return;
        }
        self.state = State::Word;
        self.handle_word(ch);
    }

    fn handle_word(&mut self, ch: char) {
        match ch {
            c if is_separator(c) => {
                self.finish_word();
                self.state = State::Start;
            }
            '\'' => self.state = State::SingleQuote,
            '"' => self.state = State::DoubleQuote,
            '\\' => self.push_escaped(),
            c => self.word.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = State::Word,
            c => self.word.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = State::Word,
            '\\' => self.push_escaped(),
            c => self.word.push(c),
        }
    }

    // A backslash at the very end of the line stays literal.
    fn push_escaped(&mut self) {
        let escaped = self.input.next().unwrap_or('\\');
        self.word.push(escaped);
    }

    fn finish_word(&mut self) {
        self.words.push(std::mem::take(&mut self.word));
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

/// Split one line into words.
pub fn tokenize(line: &str) -> Result<Tokens, TokenizeError> {
    TokenizerFSM::new(line).run()
}
