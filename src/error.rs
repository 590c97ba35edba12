use std::io;
use thiserror::Error;

/// Error that aborts the rest of the current line.
///
/// The interpreter reports it and moves on to the next line.
#[derive(Debug, Error)]
pub enum LineError {
    /// `>` or `<` was the last token or was followed by another operator.
    #[error("missing file name after `{operator}`")]
    MissingTarget { operator: &'static str },

    /// The redirection target could not be opened.
    #[error("{path}: {source}")]
    OpenTarget {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot create pipe: {0}")]
    Pipe(#[from] nix::Error),
}

/// Error the interpreter cannot recover from.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The OS refused to create a new process at all.
    #[error("failed to create a process for `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}
