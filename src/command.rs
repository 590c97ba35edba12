use crate::env::Environment;
use crate::stage::StageIo;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Exit code of a stage whose program could not be executed.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// What happened to a dispatched stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stage ran to completion.
    Completed(ExitCode),
    /// The stage was started in the background; the interpreter did not wait.
    Started { pid: u32 },
    /// The stage asked the interpreter to stop once the current line is done.
    Quit,
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `io` carries the stage's descriptors; `terminal` is the interpreter's own
    /// output stream. Dropping `io` closes the interpreter's copies of any
    /// pipe ends or redirected files. An `Err` is fatal for the interpreter.
    fn execute(
        self: Box<Self>,
        io: StageIo,
        terminal: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
