//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the switchboard binary.

mod commands;
mod run;

pub use commands::{Cli, Commands, RequestArgs};
pub use run::{Gateway, handle_chat_command, handle_models_command, handle_prompt_command};
