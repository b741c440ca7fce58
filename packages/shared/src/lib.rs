//! Shared library for Huddle, a WebSocket chat room.
//!
//! This crate defines the wire protocol spoken between the hub and its
//! clients, plus the clock and logging utilities both binaries use.

pub mod event;
pub mod logger;
pub mod time;
