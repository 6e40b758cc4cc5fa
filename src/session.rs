use anyhow::{Context, Result};
use log::debug;
use nix::sys::signal::{Signal, killpg};
use nix::sys::termios::{SetArg, Termios, tcgetattr, tcsetattr};
use nix::unistd::{Pid, getpgrp, getpid, tcgetpgrp, tcsetpgrp};
use std::io::{self, IsTerminal};

/// Terminal state captured once when the shell starts.
///
/// A session is either interactive (standard input is a terminal: prompts are printed
/// and the shell owns the terminal's foreground group) or not (piped or redirected
/// input: no prompts and no process-group handling).
#[derive(Debug)]
pub struct Session {
    interactive: bool,
    terminal: io::Stdin,
    saved_modes: Option<Termios>,
}

impl Session {
    /// Inspect standard input and, if it is a terminal, take over its foreground group.
    ///
    /// Terminal-control failures are reported on standard error and leave an
    /// interactive session without saved modes.
    pub fn init() -> Self {
        let terminal = io::stdin();
        if !terminal.is_terminal() {
            debug!("standard input is not a terminal; running non-interactively");
            return Self::detached(false);
        }

        match acquire_terminal(&terminal) {
            Ok(modes) => Self {
                interactive: true,
                terminal,
                saved_modes: Some(modes),
            },
            Err(err) => {
                eprintln!("smallsh: {err:#}");
                Self::detached(true)
            }
        }
    }

    /// A session that never touches the terminal.
    ///
    /// Prompts follow `interactive`; there is nothing to restore.
    pub fn detached(interactive: bool) -> Self {
        Self {
            interactive,
            terminal: io::stdin(),
            saved_modes: None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Put the terminal back into the modes it had when the session started.
    pub fn restore_terminal(&self) -> Result<()> {
        let Some(modes) = &self.saved_modes else {
            return Ok(());
        };
        tcsetattr(&self.terminal, SetArg::TCSADRAIN, modes)
            .context("failed to restore terminal modes")
    }
}

fn acquire_terminal(terminal: &io::Stdin) -> Result<Termios> {
    wait_for_foreground(
        || tcgetpgrp(terminal).context("cannot read the terminal's foreground group"),
        getpgrp(),
        |own| killpg(own, Signal::SIGTTIN).context("failed to stop for SIGTTIN"),
    )?;

    let pgid = getpid();
    tcsetpgrp(terminal, pgid)
        .with_context(|| format!("cannot give the terminal to process group {pgid}"))?;
    debug!("interactive session, foreground process group {pgid}");
    tcgetattr(terminal).context("cannot read terminal modes")
}

/// Stop the group `own` until it is the terminal's foreground group.
///
/// `stop` is expected to suspend the process; it returns once the shell is continued,
/// and the foreground group is checked again.
fn wait_for_foreground(
    mut foreground: impl FnMut() -> Result<Pid>,
    own: Pid,
    mut stop: impl FnMut(Pid) -> Result<()>,
) -> Result<()> {
    loop {
        let current = foreground()?;
        if current == own {
            return Ok(());
        }
        debug!("process group {own} is in the background (foreground is {current})");
        stop(own)?;
    }
}
