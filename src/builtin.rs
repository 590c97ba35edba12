use crate::command::{CommandFactory, ExecutableCommand, Outcome};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::stage::StageIo;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed through the [`argh`] `FromArgs` trait and executed
/// directly in-process without spawning a child process. They always talk to
/// the interpreter's own terminal: stage redirections and pipes are not
/// applied to them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Names the command answers to, e.g. `["echo"]`.
    fn names() -> &'static [&'static str];

    /// Executes the command, writing any output to `stdout`.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        io: StageIo,
        terminal: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome> {
        drop(io);
        let outcome = match <T as BuiltinCommand>::execute(*self, terminal, env) {
            Ok(x) => x,
            Err(e) => {
                tracing::debug!(error = ?e, "builtin failed");
                if let Err(err) = writeln!(terminal, "{e}") {
                    tracing::warn!(error = %err, "could not write to terminal");
                }
                Outcome::Completed(1)
            }
        };
        Ok(flush_terminal(terminal, outcome))
    }
}

/// Flush the terminal; a stage whose output could not be delivered fails
/// with exit code 1, but a quit request still stands.
fn flush_terminal(terminal: &mut dyn Write, outcome: Outcome) -> Outcome {
    match terminal.flush() {
        Ok(()) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "could not flush terminal");
            match outcome {
                Outcome::Quit => Outcome::Quit,
                _ => Outcome::Completed(1),
            }
        }
    }
}

/// A builtin invoked with the wrong arguments; prints its usage line.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _io: StageIo,
        terminal: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<Outcome> {
        if let Err(err) = terminal.write_all(self.output.as_bytes()) {
            tracing::warn!(error = %err, "could not write usage to terminal");
            return Ok(Outcome::Completed(1));
        }
        let code = if self.is_error { 1 } else { 0 };
        Ok(flush_terminal(terminal, Outcome::Completed(code)))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if T::names().contains(&name) {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

fn usage(synopsis: &str) -> EarlyExit {
    EarlyExit {
        output: format!("usage: {synopsis}\n"),
        status: Err(()),
    }
}

/// Accept exactly `N` positional arguments or fail with a usage line.
fn exact_args<const N: usize>(args: &[&str], synopsis: &str) -> Result<[String; N], EarlyExit> {
    <[&str; N]>::try_from(args)
        .map(|args| args.map(str::to_owned))
        .map_err(|_| usage(synopsis))
}

/// Print the current working directory to standard output.
pub struct Pwd {}

impl FromArgs for Pwd {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        exact_args::<0>(args, "pwd")?;
        Ok(Pwd {})
    }
}

impl BuiltinCommand for Pwd {
    fn names() -> &'static [&'static str] {
        &["pwd"]
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(Outcome::Completed(0))
    }
}

/// Change the current working directory.
///
/// On success the process working directory, `current_dir` and `PWD` all
/// point at the canonical target. On failure nothing changes.
pub struct Cd {
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl FromArgs for Cd {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let [target] = exact_args::<1>(args, "cd dir")?;
        Ok(Cd { target })
    }
}

impl BuiltinCommand for Cd {
    fn names() -> &'static [&'static str] {
        &["cd"]
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome> {
        let requested = PathBuf::from(&self.target);
        let new_dir = if requested.is_absolute() {
            requested
        } else {
            env.current_dir.join(requested)
        };

        let canonical = fs::canonicalize(&new_dir)
            .and_then(|dir| env::set_current_dir(&dir).map(|()| dir))
            .with_context(|| format!("Could not change to directory \"{}\"", self.target))?;

        env.set_current_dir(canonical);
        Ok(Outcome::Completed(0))
    }
}

/// Set an environment variable visible to every program started afterwards.
pub struct Set {
    pub name: String,
    pub value: String,
}

impl FromArgs for Set {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let [name, value] = exact_args::<2>(args, "set name value")?;
        Ok(Set { name, value })
    }
}

impl BuiltinCommand for Set {
    fn names() -> &'static [&'static str] {
        &["set"]
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome> {
        if self.name.contains(['=', '\0']) || self.value.contains('\0') {
            anyhow::bail!("set: invalid variable name or value");
        }
        env.set_var(self.name, self.value);
        Ok(Outcome::Completed(0))
    }
}

/// Write the arguments to standard output, separated by single spaces and
/// followed by a newline. No options are recognised.
pub struct Echo {
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn names() -> &'static [&'static str] {
        &["echo"]
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<Outcome> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(Outcome::Completed(0))
    }
}

/// Stop the interpreter once the current line has been processed.
pub struct Exit {}

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], _args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Exit {})
    }
}

impl BuiltinCommand for Exit {
    fn names() -> &'static [&'static str] {
        &["exit", "quit"]
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<Outcome> {
        Ok(Outcome::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ExitCode;
    use crate::env::PWD;
    use crate::io_adapters::MemWriter;
    use crate::test_support::{lock_current_dir, make_unique_temp_dir};
    use std::collections::HashMap;
    use std::env as stdenv;

    fn completed(outcome: Outcome) -> Option<ExitCode> {
        match outcome {
            Outcome::Completed(code) => Some(code),
            _ => None,
        }
    }

    fn scratch_env() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
        }
    }

    /// Build a builtin through its factory and run it, capturing its output.
    fn run<T: BuiltinCommand + 'static>(
        env: &mut Environment,
        name: &str,
        args: &[&str],
    ) -> (Outcome, String) {
        let cmd = Factory::<T>::default()
            .try_create(env, name, args)
            .expect("factory should accept its own name");
        let (mut out, handle) = MemWriter::with_handle();
        let outcome = cmd.execute(StageIo::default(), &mut out, env).unwrap();
        let text = String::from_utf8(handle.borrow().clone()).unwrap();
        (outcome, text)
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let env = scratch_env();
        assert!(Factory::<Echo>::default().try_create(&env, "ech", &[]).is_none());
        assert!(Factory::<Exit>::default().try_create(&env, "Exit", &[]).is_none());
        assert!(Factory::<Exit>::default().try_create(&env, "quit", &[]).is_some());
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let mut env = scratch_env();

        let mut out = Vec::new();
        let res = Pwd {}.execute(&mut out, &mut env);

        assert_eq!(completed(res.unwrap()), Some(0));
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, format!("{}\n", cur.to_string_lossy()));
    }

    #[test]
    fn test_pwd_with_arguments_prints_usage() {
        let mut env = scratch_env();
        let (outcome, text) = run::<Pwd>(&mut env, "pwd", &["extra"]);
        assert_eq!(outcome, Outcome::Completed(1));
        assert_eq!(text, "usage: pwd\n");
    }

    #[test]
    fn test_echo_joins_with_single_spaces() {
        let mut env = scratch_env();
        let (outcome, text) = run::<Echo>(&mut env, "echo", &["a", "b", "c"]);
        assert_eq!(outcome, Outcome::Completed(0));
        assert_eq!(text, "a b c\n");
    }

    #[test]
    fn test_echo_without_arguments_prints_newline() {
        let mut env = scratch_env();
        let (_, text) = run::<Echo>(&mut env, "echo", &[]);
        assert_eq!(text, "\n");
    }

    #[test]
    fn test_echo_prints_option_like_arguments_verbatim() {
        let mut env = scratch_env();
        let (_, text) = run::<Echo>(&mut env, "echo", &["-n", "--help"]);
        assert_eq!(text, "-n --help\n");
    }

    #[test]
    fn test_set_assigns_variable() {
        let mut env = scratch_env();
        let (outcome, text) = run::<Set>(&mut env, "set", &["FOO", "bar"]);
        assert_eq!(outcome, Outcome::Completed(0));
        assert!(text.is_empty());
        assert_eq!(env.get_var("FOO"), Some("bar"));
    }

    #[test]
    fn test_set_wrong_arity_prints_usage_and_changes_nothing() {
        let mut env = scratch_env();
        for args in [&["FOO"][..], &["FOO", "bar", "baz"][..], &[][..]] {
            let (outcome, text) = run::<Set>(&mut env, "set", args);
            assert_eq!(outcome, Outcome::Completed(1));
            assert_eq!(text, "usage: set name value\n");
        }
        assert!(env.vars.is_empty());
    }

    #[test]
    fn test_set_rejects_name_with_equals_sign() {
        let mut env = scratch_env();
        let (outcome, _) = run::<Set>(&mut env, "set", &["A=B", "c"]);
        assert_eq!(outcome, Outcome::Completed(1));
        assert!(env.vars.is_empty());
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_abs");
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");

        // remember the cwd so it can be restored
        let orig = stdenv::current_dir().unwrap();
        let mut env = scratch_env();

        let cmd = Cd {
            target: canonical_temp.to_string_lossy().to_string(),
        };
        let res = cmd.execute(&mut Vec::new(), &mut env);

        assert!(res.is_ok());
        let new_canonical = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        assert_eq!(new_canonical, canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);
        assert_eq!(
            env.get_var(PWD),
            Some(canonical_temp.to_string_lossy().as_ref())
        );

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_dot_is_idempotent() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = scratch_env();
        let before = fs::canonicalize(&orig).unwrap();

        for _ in 0..3 {
            let (outcome, _) = run::<Cd>(&mut env, "cd", &["."]);
            assert_eq!(outcome, Outcome::Completed(0));
        }

        assert_eq!(env.current_dir, before);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), before);
        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_nonexistent_path_reports_and_keeps_state() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = scratch_env();
        env.set_var(PWD, "unchanged");

        let name = format!("nonexistent_dir_for_cd_test_{}", std::process::id());
        let (outcome, text) = run::<Cd>(&mut env, "cd", &[name.as_str()]);

        assert_eq!(outcome, Outcome::Completed(1));
        assert_eq!(text, format!("Could not change to directory \"{name}\"\n"));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        assert_eq!(env.current_dir, orig);
        assert_eq!(env.get_var(PWD), Some("unchanged"));
    }

    #[test]
    fn test_cd_requires_exactly_one_argument() {
        let mut env = scratch_env();
        let (_, text) = run::<Cd>(&mut env, "cd", &[]);
        assert_eq!(text, "usage: cd dir\n");
        let (_, text) = run::<Cd>(&mut env, "cd", &["a", "b"]);
        assert_eq!(text, "usage: cd dir\n");
    }

    #[test]
    fn test_exit_and_quit_request_stop() {
        let mut env = scratch_env();
        assert_eq!(run::<Exit>(&mut env, "exit", &[]).0, Outcome::Quit);
        assert_eq!(run::<Exit>(&mut env, "quit", &["now"]).0, Outcome::Quit);
    }
}
