use crate::command::ExitCode;
use crate::env::Environment;
use crate::tokenizer::Tokens;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use log::debug;
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// Commands that run inside the shell process instead of in a child.
///
/// The registry is the fixed list [`Builtin::ALL`]; every variant has a unique name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Help,
    Pwd,
    Cd,
}

impl Builtin {
    /// Every builtin, in the order `?` lists them.
    pub const ALL: [Builtin; 4] = [Builtin::Exit, Builtin::Help, Builtin::Pwd, Builtin::Cd];

    /// Name the command is invoked by.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Help => "?",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
        }
    }

    /// One-line description shown by `?`.
    pub fn description(self) -> &'static str {
        match self {
            Builtin::Exit => "exit the command shell",
            Builtin::Help => "show this help menu",
            Builtin::Pwd => "prints working directory",
            Builtin::Cd => "changes directory",
        }
    }

    /// Find the builtin called `name`.
    ///
    /// `None` (a line without words) and unknown names are both "not found".
    /// Matching is exact and case-sensitive.
    pub fn lookup(name: Option<&str>) -> Option<Builtin> {
        let name = name?;
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Run the builtin with the words of the line that invoked it.
    ///
    /// Errors come back prefixed with the builtin's name; the caller reports them.
    pub fn run(
        self,
        tokens: &Tokens,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        debug!("builtin {} with {} argument(s)", self.name(), tokens.args().len());
        match self {
            Builtin::Exit => invoke::<Exit>(tokens, stdout, env),
            Builtin::Help => invoke::<Help>(tokens, stdout, env),
            Builtin::Pwd => invoke::<Pwd>(tokens, stdout, env),
            Builtin::Cd => invoke::<Cd>(tokens, stdout, env),
        }
    }
}

/// Argument parsing and execution for one builtin.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
trait BuiltinCommand: Sized + FromArgs {
    const BUILTIN: Builtin;

    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

fn invoke<T: BuiltinCommand>(
    tokens: &Tokens,
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let name = T::BUILTIN.name();
    // Only a lone `--help` is read as a flag; every other word is an operand, so
    // `cd -dir` names a directory.
    let mut args: Vec<&str> = Vec::with_capacity(tokens.len());
    if !matches!(tokens.args(), [only] if only == "--help") {
        args.push("--");
    }
    args.extend(tokens.args().iter().map(String::as_str));

    match T::from_args(&[name], &args) {
        Ok(cmd) => cmd.execute(stdout, env),
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            stdout.write_all(output.as_bytes())?;
            Ok(0)
        }
        Err(EarlyExit { output, .. }) => Err(anyhow!("{name}: {}", output.trim_end())),
    }
}

#[derive(FromArgs)]
/// Exit the command shell.
struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    const BUILTIN: Builtin = Builtin::Exit;

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show the builtin commands.
struct Help {
    #[argh(positional, greedy)]
    /// ignored
    _args: Vec<String>,
}

impl BuiltinCommand for Help {
    const BUILTIN: Builtin = Builtin::Help;

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        for builtin in Builtin::ALL {
            writeln!(stdout, "{} - {}", builtin.name(), builtin.description())?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
struct Pwd {
    #[argh(positional, greedy)]
    /// ignored
    _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    const BUILTIN: Builtin = Builtin::Pwd;

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = env::current_dir().context("pwd")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted, anything after it is ignored.
    args: Vec<String>,
}

impl BuiltinCommand for Cd {
    const BUILTIN: Builtin = Builtin::Cd;

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.args.into_iter().next() {
            Some(t) => PathBuf::from(t),
            None => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("cd: HOME not set"),
            },
        };

        env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
        debug!("working directory is now {}", target.display());
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lock_current_dir, make_unique_temp_dir};
    use crate::tokenizer::tokenize;
    use std::collections::HashSet;
    use std::env as stdenv;
    use std::fs;

    fn run_line(line: &str, env: &mut Environment) -> (Result<ExitCode>, String) {
        let tokens = tokenize(line).unwrap();
        let builtin = Builtin::lookup(tokens.get(0)).expect("not a builtin");
        let mut out = Vec::new();
        let res = builtin.run(&tokens, &mut out, env);
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_lookup_finds_every_registered_name() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(Some(builtin.name())), Some(builtin));
        }
    }

    #[test]
    fn test_lookup_not_found() {
        assert_eq!(Builtin::lookup(None), None);
        assert_eq!(Builtin::lookup(Some("")), None);
        assert_eq!(Builtin::lookup(Some("CD")), None);
        assert_eq!(Builtin::lookup(Some("help")), None);
        assert_eq!(Builtin::lookup(Some("/bin/pwd")), None);
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = Builtin::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names.len(), Builtin::ALL.len());
    }

    #[test]
    fn test_help_lists_every_builtin() {
        let (res, out) = run_line("?", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert_eq!(
            out,
            "exit - exit the command shell\n\
             ? - show this help menu\n\
             pwd - prints working directory\n\
             cd - changes directory\n"
        );
    }

    #[test]
    fn test_exit_sets_flag_and_ignores_args() {
        let mut env = Environment::default();
        let (res, out) = run_line("exit 3 whatever", &mut env);
        assert_eq!(res.unwrap(), 0);
        assert!(out.is_empty());
        assert!(env.should_exit);
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();

        let (res, out) = run_line("pwd", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_builtin_help_flag_prints_usage() {
        let (res, out) = run_line("cd --help", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert!(out.contains("Usage: cd"), "unexpected usage: {out}");
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let (res, out) = run_line("? extra --bogus", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert!(out.starts_with("exit - exit the command shell\n"));

        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let (res, out) = run_line("pwd -x extra", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_help_flag_after_an_operand_is_an_operand() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let (res, out) = run_line("pwd x --help", &mut Environment::default());
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pwd_reports_removed_working_directory() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = make_unique_temp_dir("pwd_gone").expect("failed to create temp dir");
        stdenv::set_current_dir(&temp).unwrap();
        fs::remove_dir(&temp).unwrap();

        let (res, out) = run_line("pwd", &mut Environment::default());
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        let err = res.unwrap_err();
        assert!(format!("{err:#}").starts_with("pwd: "), "unexpected error: {err:#}");
        assert!(out.is_empty());
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_abs").expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let line = format!("cd '{}'", canonical_temp.display());
        let (res, _) = run_line(&line, &mut Environment::default());
        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(new_cwd, canonical_temp);
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_home").expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let mut env = Environment::default();
        env.set_var("HOME", canonical_temp.to_string_lossy());
        let (res, _) = run_line("cd", &mut env);
        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(new_cwd, canonical_temp);
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_without_home_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let (res, _) = run_line("cd", &mut Environment::default());

        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "cd: HOME not set");
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let name = format!("nonexistent_dir_for_cd_test_{}", std::process::id());
        let (res, _) = run_line(&format!("cd {name}"), &mut Environment::default());

        let err = res.unwrap_err();
        assert!(format!("{err:#}").starts_with(&format!("cd: {name}: ")));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_to_file_errors() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_file").expect("failed to create temp dir");
        let file = temp.join("plain");
        fs::write(&file, b"x").unwrap();
        let orig = stdenv::current_dir().unwrap();

        let (res, _) = run_line(&format!("cd '{}'", file.display()), &mut Environment::default());

        assert!(res.is_err());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_uses_first_argument() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let (res, _) = run_line("cd / /nonexistent_second_arg", &mut Environment::default());
        let new_cwd = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(new_cwd, PathBuf::from("/"));
    }

    #[test]
    fn test_cd_to_directory_starting_with_dash() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_dash").expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");
        fs::create_dir(canonical_temp.join("-dash")).unwrap();
        let orig = stdenv::current_dir().unwrap();

        stdenv::set_current_dir(&canonical_temp).unwrap();
        let (res, _) = run_line("cd -dash", &mut Environment::default());
        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(new_cwd, canonical_temp.join("-dash"));
        let _ = fs::remove_dir_all(&temp);
    }
}
