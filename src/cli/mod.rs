//! Command-line interface module.

mod args;
pub mod check;
pub mod common;
pub mod dump;
pub mod watch;

pub use args::{Cli, Commands, DumpArgs};
