//! Terminal client for the Nanochat line protocol.
//!
//! A Nanochat server speaks newline-delimited ASCII over one TCP stream, one
//! request and one reply at a time. Each module focuses on a concrete
//! responsibility:
//!
//! - [`codec`] encodes requests and decodes the reply shape each one expects.
//! - [`connection`] owns the single live connection and its lifecycle.
//! - [`command`] splits REPL input into a command and its arguments.
//! - [`session`] holds the state shared between commands, including the
//!   message buffer.
//! - [`repl`] reads lines, dispatches them and renders the results.
//! - [`config`] loads the persisted TOML settings.
//! - [`cli`] parses the command-line flags.
//! - [`error`] defines the inline error taxonomy reported by commands.
//!
//! Integration tests drive [`repl::Repl`] against a scripted server over
//! loopback TCP.

pub mod cli;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod repl;
pub mod session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
