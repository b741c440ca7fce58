//! WebSocket chat server for Huddle.
//!
//! Hosts one room: a connection hub that fans events out to every other
//! open connection, plus an HTTP gateway for submitting messages.

pub mod error;
pub mod handler;
pub mod hub;
pub mod runner;
mod signal;
pub mod state;

pub use runner::{router, run_server};
