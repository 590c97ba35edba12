use crate::command::{CommandFactory, EXIT_NOT_FOUND, ExecutableCommand, ExitCode, Outcome};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::stage::StageIo;
use anyhow::{Context, Result};
use nix::errno::Errno;
use std::io::{self, Write};
use std::process::{Command, ExitStatus};

/// Command that is not a builtin: a program looked up through `PATH` by the
/// OS, run in its own process.
pub struct ExternalCommand {
    name: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(name: String, args: Vec<String>) -> Self {
        Self { name, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand::new(
            name.to_owned(),
            args.iter().map(|x| x.to_string()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        io: StageIo,
        terminal: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome> {
        let StageIo {
            stdin,
            stdout,
            foreground,
        } = io;

        // Anything the terminal buffered must land before the child writes.
        if let Err(err) = terminal.flush() {
            tracing::warn!(program = %self.name, error = %err, "could not flush terminal");
        }

        // The `Command` owns our copies of the stage descriptors and is dropped
        // right after the spawn, so they are closed before we wait.
        let spawned = Command::new(&self.name)
            .args(&self.args)
            .env_clear()
            .envs(&env.vars)
            .current_dir(&env.current_dir)
            .stdin(stdin.into_stdio())
            .stdout(stdout.into_stdio())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) if is_process_creation_failure(&source) => {
                return Err(ShellError::Spawn {
                    program: self.name,
                    source,
                }
                .into());
            }
            Err(err) => {
                // The child already terminated on its exec failure path.
                tracing::debug!(program = %self.name, error = %err, "exec failed");
                eprintln!("pipesh: {}: {}", self.name, err);
                return Ok(Outcome::Completed(EXIT_NOT_FOUND));
            }
        };

        let pid = child.id();
        tracing::debug!(program = %self.name, pid, foreground, "spawned");
        if !foreground {
            return Ok(Outcome::Started { pid });
        }

        let status = child
            .wait()
            .with_context(|| format!("waiting for `{}` (pid {pid})", self.name))?;
        tracing::debug!(pid, %status, "reaped foreground child");
        Ok(Outcome::Completed(exit_code(status)))
    }
}

/// Whether a spawn error means no process could be created at all, as
/// opposed to the new process failing to run the program.
///
/// `ENOMEM` is left out: `spawn` reports errors from `fork` and from `execve`
/// in the child the same way, and `execve` fails with `ENOMEM` for images
/// that don't fit. Only `EAGAIN` reliably means the process table is full.
fn is_process_creation_failure(err: &io::Error) -> bool {
    err.raw_os_error().map(Errno::from_raw) == Some(Errno::EAGAIN)
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}
