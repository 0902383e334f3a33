//! Kit Gateway Library Crate
//!
//! This library contains all the logic for the WebSocket gateway service:
//! configuration, shared application state, routing, and the per-connection
//! WebSocket protocol. The `gateway` binary is a thin wrapper around it.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
