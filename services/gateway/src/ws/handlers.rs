//! One handler per client command.
//!
//! Each handler validates its payload fields, calls the collaborators it
//! needs, mutates the session, and produces exactly one `ServerResponse`.
//! Collaborator calls are the only suspension points on a connection and
//! every one of them is bounded by the configured timeout; expiry takes the
//! same error path as a collaborator failure so a session never hangs.

use crate::{
    state::AppState,
    ws::protocol::ServerResponse,
};
use kit_gateway_core::session::{ChatState, Session};
use serde_json::{Map, Value, json};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// `{"state": ...}` payload carried by every error response so the client
/// can resynchronize.
pub(super) fn state_data(session: &Session) -> Value {
    json!({ "state": session.state() })
}

/// Extracts a required non-empty string field from a command payload.
fn string_field(data: &Map<String, Value>, name: &str) -> Option<String> {
    data.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Handles `auth`: verifies the API key and advances INIT -> AUTHENTICATED.
pub(super) async fn handle_auth(
    session: &mut Session,
    state: &AppState,
    data: Map<String, Value>,
) -> ServerResponse {
    let Some(api_key) = string_field(&data, "api_key") else {
        return ServerResponse::error("auth", "missing API key", state_data(session));
    };

    let verified = match timeout(
        state.config.collaborator_timeout,
        state.verifier.verify(&api_key),
    )
    .await
    {
        Ok(verified) => verified,
        Err(_) => {
            warn!("credential check timed out");
            return ServerResponse::error("auth", "credential check timed out", state_data(session));
        }
    };

    if !verified {
        // State stays INIT; the client may retry with another key.
        return ServerResponse::error("auth", "API key verification failed", state_data(session));
    }

    session.authenticate();
    ServerResponse::success(
        "auth",
        "API key accepted, provide a device ID to register",
        state_data(session),
    )
}

/// Handles `register`: binds the device identity and advances to READY.
pub(super) async fn handle_register(
    session: &mut Session,
    data: Map<String, Value>,
) -> ServerResponse {
    let Some(device_id) = string_field(&data, "device_id") else {
        return ServerResponse::error("register", "missing device ID", state_data(session));
    };

    if !session.register_device(device_id.as_str()) {
        // Dispatch gates legality before we get here, but the state machine
        // has the final say on its own transitions.
        return ServerResponse::error(
            "register",
            format!("cannot register a device in state {}", session.state()),
            state_data(session),
        );
    }
    info!(%device_id, "device registered");
    ServerResponse::success(
        "register",
        "device registered, ready to chat",
        json!({
            "state": session.state(),
            "device_id": device_id,
            "context_count": session.context_count(),
        }),
    )
}

/// Handles `chat`: records the turn, consults the agent, relays its reply.
pub(super) async fn handle_chat(
    session: &mut Session,
    state: &AppState,
    data: Map<String, Value>,
) -> ServerResponse {
    let Some(content) = string_field(&data, "content") else {
        return ServerResponse::error("chat", "message content required", state_data(session));
    };
    let message_type = string_field(&data, "message_type").unwrap_or_else(|| "text".to_string());

    // The first chat promotes READY -> CHATTING. The turn counts as having
    // happened even if the agent fails below, so nothing is rolled back.
    if session.state() == ChatState::Ready {
        session.start_chatting();
    }
    session.record_user_turn(content.as_str());
    debug!(%message_type, chars = content.len(), "chat message received");

    let context = session.recent_context(state.config.context_limit).to_vec();
    let reply = match timeout(
        state.config.collaborator_timeout,
        state.agent.process(&content, &context),
    )
    .await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(error)) => {
            warn!(%error, "agent processing failed");
            return ServerResponse::error(
                "chat",
                format!("agent processing failed: {error:#}"),
                state_data(session),
            );
        }
        Err(_) => {
            warn!("agent processing timed out");
            return ServerResponse::error("chat", "agent processing timed out", state_data(session));
        }
    };

    session.record_assistant_turn(reply.reply.as_str());

    let mut data = Map::new();
    data.insert("response".to_string(), Value::String(reply.reply));
    if let Some(intent) = reply.intent {
        data.insert("intent".to_string(), Value::String(intent));
    }
    if let Some(workflow) = reply.workflow {
        data.insert("workflow".to_string(), Value::String(workflow));
    }
    data.insert(
        "context_count".to_string(),
        Value::from(session.context_count()),
    );

    ServerResponse::success("chat", "message received", Value::Object(data))
}

/// Handles a binary audio frame: persists it, then asks the agent about it.
///
/// The saved filename stands in for the transcribed text until a
/// speech-to-text collaborator exists. Audio never promotes READY ->
/// CHATTING; only chat does.
pub(super) async fn handle_audio(
    session: &mut Session,
    state: &AppState,
    bytes: &[u8],
) -> ServerResponse {
    debug!(size = bytes.len(), "audio payload received");

    let saved = match timeout(
        state.config.collaborator_timeout,
        state.audio_store.save(bytes),
    )
    .await
    {
        Ok(Ok(saved)) => saved,
        Ok(Err(error)) => {
            warn!(%error, "audio store rejected payload");
            let mut reason = error.to_string();
            if reason.is_empty() {
                reason = "failed to save audio file".to_string();
            }
            return ServerResponse::error("chat", reason, state_data(session));
        }
        Err(_) => {
            warn!("audio store timed out");
            return ServerResponse::error("chat", "failed to save audio file", state_data(session));
        }
    };

    session.record_user_turn(saved.filename.as_str());

    // TODO: run speech-to-text on the stored file and send the transcript
    // instead of this placeholder query.
    let query = format!("audio message received, file: {}", saved.filename);
    let context = session.recent_context(state.config.context_limit).to_vec();
    let reply = match timeout(
        state.config.collaborator_timeout,
        state.agent.process(&query, &context),
    )
    .await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(error)) => {
            warn!(%error, "agent processing failed for audio message");
            return ServerResponse::error(
                "chat",
                format!("agent processing failed: {error:#}"),
                state_data(session),
            );
        }
        Err(_) => {
            warn!("agent processing timed out for audio message");
            return ServerResponse::error("chat", "agent processing timed out", state_data(session));
        }
    };

    session.record_assistant_turn(reply.reply.as_str());
    ServerResponse::success(
        "chat",
        "audio message received",
        json!({
            "audio_file": saved.filename,
            "response": reply.reply,
        }),
    )
}
