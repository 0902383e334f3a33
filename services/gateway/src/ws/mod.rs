//! WebSocket Session Management
//!
//! This module contains the per-connection protocol of the gateway. It is
//! structured into submodules for clarity:
//!
//! - `protocol`: the inbound command envelope and the uniform outbound
//!   `ServerResponse` frame.
//! - `session`: the connection lifecycle, from upgrade through the welcome
//!   frame to disconnect.
//! - `dispatch`: frame classification and state-legality routing.
//! - `handlers`: the per-command business logic calling the collaborators.

mod dispatch;
mod handlers;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
