use crate::command::{CommandFactory, EXIT_NOT_FOUND, Outcome};
use crate::config::Prompt;
use crate::env::Environment;
use crate::io_adapters::LineSource;
use crate::parser::StageBuilder;
use crate::stage::Stage;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate: the builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What the read-eval loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// A minimal shell-like interpreter that runs lines of stages.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`]
/// objects that are queried, in order, to create the command for a stage. See
/// [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use pipesh::{Control, Interpreter};
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.run_line("set GREETING hello").unwrap(), Control::Continue);
/// assert_eq!(sh.env().get_var("GREETING"), Some("hello"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    terminal: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            terminal: Box::new(std::io::stdout()),
        }
    }

    /// Send builtin output somewhere other than the process standard output.
    pub fn with_terminal(mut self, terminal: Box<dyn Write>) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Parse and run one line.
    ///
    /// Stages run in order as soon as each one is complete. A redirection or
    /// pipe error is reported and ends the line early. `Err` means the
    /// interpreter cannot go on.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<Control> {
        let mut control = Control::Continue;
        for event in StageBuilder::new(line) {
            let stage = match event {
                Ok(stage) => stage,
                Err(err) => {
                    tracing::debug!(error = ?err, "line aborted");
                    eprintln!("pipesh: {err}");
                    break;
                }
            };
            if self.dispatch(stage)? == Outcome::Quit {
                control = Control::Quit;
            }
        }
        Ok(control)
    }

    /// Run a single stage with the first factory that accepts its name.
    fn dispatch(&mut self, stage: Stage) -> anyhow::Result<Outcome> {
        tracing::debug!(name = stage.name(), argv = ?stage.argv, "dispatching stage");
        let Stage { argv, io } = stage;
        let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();

        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, &argv[0], &args) {
                return cmd.execute(io, &mut *self.terminal, &mut self.env);
            }
        }
        eprintln!("pipesh: {}: command not found", argv[0]);
        Ok(Outcome::Completed(EXIT_NOT_FOUND))
    }

    /// Read-eval loop: prompt, read a line, run it, until end of input or
    /// until a stage asks to quit.
    pub fn repl(&mut self, source: &mut dyn LineSource, prompt: &Prompt) -> anyhow::Result<()> {
        loop {
            reap_background();
            let Some(line) = source.read_line(&prompt.render(&self.env))? else {
                break;
            };
            if self.run_line(&line)? == Control::Quit {
                break;
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `cd`, `set`, `echo`, `pwd`, `exit`/`quit`
    /// - external command launcher for every other name
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Set>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

/// Collect background children that have already exited so they don't linger
/// as zombies. Never blocks; nothing is kept about them.
fn reap_background() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(status) => tracing::debug!(?status, "reaped background child"),
        }
    }
}
