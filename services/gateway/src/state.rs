//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the collaborator
//! clients every connection depends on. All collaborators sit behind trait
//! objects so tests can swap in deterministic fakes.

use crate::config::Config;
use kit_gateway_core::{
    agent::AgentClient, audio::AudioStore, credentials::CredentialVerifier,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// connection tasks. Sessions themselves are never stored here; each
/// connection owns its own.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub audio_store: Arc<dyn AudioStore>,
    pub agent: Arc<dyn AgentClient>,
    pub config: Arc<Config>,
}
