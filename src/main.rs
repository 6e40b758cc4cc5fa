use anyhow::Result;
use env_logger::Env;
use log::{debug, warn};
use smallsh::env::Environment;
use smallsh::{DEFAULT_LINE_LIMIT, EditorSource, Interpreter, LineSource, Session, StreamSource};
use std::io;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let session = Session::init();
    let mut input: Box<dyn LineSource> = if session.is_interactive() {
        match EditorSource::new(DEFAULT_LINE_LIMIT) {
            Ok(editor) => Box::new(editor),
            Err(err) => {
                warn!("line editing unavailable, reading plain lines: {err}");
                plain_lines()
            }
        }
    } else {
        plain_lines()
    };

    let mut interpreter = Interpreter::new(Environment::new(), session);
    let result = interpreter.run(input.as_mut(), &mut io::stdout(), &mut io::stderr());

    if let Err(err) = interpreter.session().restore_terminal() {
        eprintln!("smallsh: {err:#}");
    }
    debug!("shell exiting");
    result
}

fn plain_lines() -> Box<dyn LineSource> {
    Box::new(StreamSource::new(
        io::stdin().lock(),
        io::stdout(),
        DEFAULT_LINE_LIMIT,
    ))
}
