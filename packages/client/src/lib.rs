//! WebSocket chat client for Huddle.
//!
//! The realtime core lives in [`view`] (the ordered fold of inbound
//! events) and [`composer`] (edge-triggered typing signals); [`session`]
//! wires them to a live connection and [`runner`] adds reconnection.

pub mod composer;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod gateway;
pub mod runner;
pub mod session;
pub mod ui;
pub mod view;

pub use runner::run_client;
