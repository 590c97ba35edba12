//! A small line-oriented command interpreter.
//!
//! A line is split on whitespace into words and the control operators `;`,
//! `&`, `|`, `>` and `<`. Words are grouped into stages, and every stage is run
//! as soon as its terminating operator is seen: either in-process as a builtin
//! (`cd`, `set`, `echo`, `pwd`, `exit`/`quit`) or as an external program with
//! its standard streams bound to the pipes and files the line asked for.
//!
//! The main entry point is [`Interpreter`]. [`parser::StageBuilder`] can be
//! used on its own to see how a line is split into stages.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod stage;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Control, Interpreter};
