use crate::command::ExitCode;
use crate::tokenizer::Tokens;
use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use nix::errno::Errno;
use nix::libc::c_char;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::ffi::CString;
use std::ptr;

/// Status a child exits with when its program cannot be executed.
pub const EXEC_FAILURE_STATUS: i32 = 1;

/// A child process that has not been waited on yet.
///
/// Consuming it with [`Child::wait`] reaps the process. If a `Child` is dropped without
/// being waited on, the drop blocks until the process exits so it is never left behind
/// as a zombie.
#[derive(Debug)]
pub struct Child {
    pid: Pid,
    reaped: bool,
}

impl Child {
    /// Fork and execute the program named by the first token.
    ///
    /// The program path is used verbatim: there is no PATH search. The remaining tokens
    /// are its arguments. If `execv` fails, the child writes `"<program>: <reason>"` to
    /// standard error and exits with [`EXEC_FAILURE_STATUS`]; the parent only sees that
    /// as the child's exit code.
    ///
    /// Buffered output is not flushed here; callers flush their own writers first.
    pub fn spawn(tokens: &Tokens) -> Result<Self> {
        let program = tokens.get(0).ok_or_else(|| anyhow!("no program to run"))?;
        let argv = tokens
            .iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{program}: argument contains a NUL byte"))?;
        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(ptr::null());

        // The argv array is built above so the child does not allocate: after the fork
        // it only calls signal, execv, write and _exit.
        match unsafe { fork() }.with_context(|| format!("{program}: fork failed"))? {
            ForkResult::Child => {
                // The shell ignores SIGPIPE and an ignored disposition survives exec.
                let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
                unsafe { nix::libc::execv(argv_ptrs[0], argv_ptrs.as_ptr()) };
                report_exec_failure(argv[0].as_bytes(), Errno::last());
                unsafe { nix::libc::_exit(EXEC_FAILURE_STATUS) }
            }
            ForkResult::Parent { child } => {
                debug!("spawned {program} as pid {child}");
                Ok(Self {
                    pid: child,
                    reaped: false,
                })
            }
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until the child exits or is killed and return its exit code.
    pub fn wait(mut self) -> Result<ExitCode> {
        let result = self.reap();
        self.reaped = true;
        result
    }

    fn reap(&self) -> Result<ExitCode> {
        loop {
            match waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(code),
                Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
                Ok(other) => debug!("pid {}: ignoring wait status {:?}", self.pid, other),
                Err(Errno::EINTR) => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("waiting for pid {}", self.pid));
                }
            }
        }
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        if !self.reaped {
            if let Err(err) = self.reap() {
                warn!("{err:#}");
            }
        }
    }
}

/// Spawn the program named by `tokens` and wait for it to finish.
pub fn run(tokens: &Tokens) -> Result<ExitCode> {
    let child = Child::spawn(tokens)?;
    let pid = child.pid();
    let code = child.wait()?;
    debug!("pid {pid} finished with exit code {code}");
    Ok(code)
}

// Runs in the forked child, so it sticks to raw writes on fd 2.
fn report_exec_failure(program: &[u8], err: Errno) {
    let stderr = std::io::stderr();
    let parts: [&[u8]; 4] = [program, b": ", err.desc().as_bytes(), b"\n"];
    for part in parts {
        let _ = nix::unistd::write(&stderr, part);
    }
}
