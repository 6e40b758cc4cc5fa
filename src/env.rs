use std::collections::HashMap;
use std::env as stdenv;

/// User-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a snapshot of the environment variables taken when the shell started.
/// - `should_exit`: set by the `exit` builtin; the loop stops once it sees it.
///
/// Lookups only consult `vars`, so a test (or an embedder) can build an environment
/// without `HOME` regardless of what the real process has.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Key-value store of environment variables (e.g. HOME).
    pub vars: HashMap<String, String>,
    /// When set to true, the read loop terminates after the current line.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process environment into a new `Environment`.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn new() -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            vars,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}
