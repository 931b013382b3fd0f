//! completion command - Shell completion scripts for `backstroke`

use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell as Target;

use crate::cli::args::{Cli, Shell};

impl From<Shell> for Target {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => Target::Bash,
            Shell::Zsh => Target::Zsh,
            Shell::Fish => Target::Fish,
            Shell::PowerShell => Target::PowerShell,
        }
    }
}

/// Write the completion script for `shell` to `out`.
pub fn write_completion(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(Target::from(shell), &mut cmd, name, out);
}

/// Print the completion script on stdout.
pub fn completion(shell: Shell) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_completion(shell, &mut lock);
    lock.flush()?;
    Ok(())
}
