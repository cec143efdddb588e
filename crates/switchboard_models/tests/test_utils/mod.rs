//! Test utilities for switchboard_models tests.

pub mod scripted_client;

#[allow(unused_imports)]
pub use scripted_client::ScriptedClient;
