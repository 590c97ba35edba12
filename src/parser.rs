//! Turns a line into a lazy sequence of ready-to-run stages.
//!
//! Stages are produced one at a time, in line order, and the caller is
//! expected to dispatch each stage before asking for the next one. This is
//! what makes the pipe work: when `|` ends a stage, the pipe already exists,
//! the producer's standard output is bound to its write end, and the read end
//! is held back until the next stage starts accumulating.
//!
//! Every operator binds a descriptor at most once per stage. A `|`, `>` or `<`
//! whose descriptor is already bound is kept as a literal argument.

use crate::error::LineError;
use crate::lexer::{self, Token, Tokens};
use crate::stage::{self, Stage, StageIo};
use std::os::fd::OwnedFd;

/// What to do with the stage being accumulated after looking at one token.
enum Step {
    /// Keep reading tokens into the current stage.
    Continue,
    /// The current stage is complete.
    Dispatch,
    /// No tokens left.
    End,
}

/// Iterator of stages for one line.
///
/// Yields `Err` at most once; after an error or the end of the line it only
/// yields `None`.
pub struct StageBuilder<'a> {
    tokens: Tokens<'a>,
    /// Read end of the pipe created by the previous stage.
    pending_stdin: Option<OwnedFd>,
    done: bool,
}

impl<'a> StageBuilder<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            tokens: lexer::split_into_tokens(line),
            pending_stdin: None,
            done: false,
        }
    }

    fn build_stage(&mut self) -> Result<Option<Stage>, LineError> {
        let mut argv: Vec<String> = Vec::new();
        let mut io = StageIo::default();

        loop {
            if let Some(read_end) = self.pending_stdin.take() {
                io.stdin = read_end.into();
            }

            let step = match self.tokens.next() {
                None => Step::End,
                Some(token) => self.apply(token, &mut argv, &mut io)?,
            };

            match step {
                Step::Continue => continue,
                Step::Dispatch | Step::End if !argv.is_empty() => {
                    return Ok(Some(Stage { argv, io }));
                }
                Step::Dispatch => {
                    // Empty stage: drop (and close) whatever it had bound.
                    tracing::trace!("skipping empty stage");
                    io = StageIo::default();
                }
                Step::End => return Ok(None),
            }
        }
    }

    fn apply(
        &mut self,
        token: Token<'a>,
        argv: &mut Vec<String>,
        io: &mut StageIo,
    ) -> Result<Step, LineError> {
        match token {
            Token::Semicolon => Ok(Step::Dispatch),
            Token::Ampersand => {
                io.foreground = false;
                Ok(Step::Dispatch)
            }
            Token::PipeOp if io.stdout.is_inherited() => {
                let (read_end, write_end) = stage::open_pipe()?;
                io.stdout = write_end.into();
                self.pending_stdin = Some(read_end);
                Ok(Step::Dispatch)
            }
            Token::RedirectRight if io.stdout.is_inherited() => {
                let path = self.redirect_target(">")?;
                io.stdout = stage::open_for_write(path)?;
                Ok(Step::Continue)
            }
            Token::RedirectLeft if io.stdin.is_inherited() => {
                let path = self.redirect_target("<")?;
                io.stdin = stage::open_for_read(path)?;
                Ok(Step::Continue)
            }
            other => {
                argv.push(other.as_str().to_owned());
                Ok(Step::Continue)
            }
        }
    }

    fn redirect_target(&mut self, operator: &'static str) -> Result<&'a str, LineError> {
        match self.tokens.next() {
            Some(Token::Word(path)) => Ok(path),
            _ => Err(LineError::MissingTarget { operator }),
        }
    }
}

impl Iterator for StageBuilder<'_> {
    type Item = Result<Stage, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.build_stage() {
            Ok(Some(stage)) => Some(Ok(stage)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                self.pending_stdin = None;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for StageBuilder<'_> {}
