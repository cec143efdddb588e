//! Function-call protocol for the Switchboard inference gateway.
//!
//! A chat that offers functions constrains the backend to emit
//! `{"function": name, "arguments": {...}}` (or an array of those in
//! parallel-call mode). This crate builds the function set and its grammar,
//! parses the constrained output back into calls and decides whether the
//! model answered directly or asked for tools.

mod dispatch;
mod gbnf;
mod parse;
mod protocol;
mod set;

pub use dispatch::{Dispatch, classify, no_action_message, tool_call_deltas};
pub use gbnf::{GbnfCompiler, JSON_BNF};
pub use parse::{ParseWarning, ParsedCalls, escape_newlines, parse_function_call};
pub use protocol::{FunctionActivation, FunctionCallState, activate};
pub use set::{
    NO_ACTION_MESSAGE_DESCRIPTION, build_function_set, function_grammar, function_schema,
    no_action_function,
};
