use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Name of the variable that mirrors the working directory.
pub const PWD: &str = "PWD";

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, PWD).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. `PWD` is set to the working directory so
    /// the prompt always has something to show.
    pub fn new() -> Self {
        let vars: HashMap<String, String> = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut env = Self { vars, current_dir };
        env.sync_pwd();
        env
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Record a new working directory and mirror it into `PWD`.
    pub fn set_current_dir(&mut self, dir: PathBuf) {
        self.current_dir = dir;
        self.sync_pwd();
    }

    fn sync_pwd(&mut self) {
        let pwd = self.current_dir.to_string_lossy().into_owned();
        self.set_var(PWD, pwd);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
