//! Kit Gateway Core
//!
//! Domain logic shared by the gateway service: the per-connection session
//! state machine and the narrow collaborator interfaces (credential
//! verification, audio persistence, agent inference) the message handlers
//! depend on. Keeping the collaborators behind traits lets the protocol
//! tests run against deterministic fakes.

pub mod agent;
pub mod audio;
pub mod credentials;
pub mod session;
