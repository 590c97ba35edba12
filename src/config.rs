//! Command-line configuration, prompt rendering and log setup.

use crate::env::{Environment, PWD};
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

/// Prompt used when `--prompt` is not given.
pub const DEFAULT_PROMPT: &str = "pipesh:{cwd}$ ";

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "PIPESH_LOG";

#[derive(FromArgs, Debug)]
/// A small line-oriented command interpreter with pipes, redirections and
/// background stages.
pub struct Args {
    /// run this line instead of reading from the terminal; may be repeated
    #[argh(option, short = 'c')]
    pub command: Vec<String>,

    /// prompt template; `{cwd}` is replaced with $PWD
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    pub prompt: String,

    /// do not keep a history of interactive lines
    #[argh(switch)]
    pub no_history: bool,

    /// log what the interpreter is doing to stderr
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}

/// Prompt template rendered before every line.
#[derive(Debug, Clone)]
pub struct Prompt {
    template: String,
}

impl Prompt {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, env: &Environment) -> String {
        self.template
            .replace("{cwd}", env.get_var(PWD).unwrap_or_default())
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `PIPESH_LOG` wins over `verbose` when it is set.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
