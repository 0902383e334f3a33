//! Message routing: classifies each inbound frame, enforces the
//! state-legality table, and dispatches to exactly one handler.
//!
//! The session loop calls into this module strictly in frame-arrival order,
//! so everything here takes `&mut Session` and nothing needs locking.

use crate::{
    state::AppState,
    ws::{
        handlers,
        protocol::{ClientCommand, ParseError, ServerResponse, parse_command},
    },
};
use kit_gateway_core::session::{CommandKind, Session};
use tracing::debug;

/// Handles one inbound text frame, returning the single response frame.
///
/// The malformed-message check runs before the state-legality check: a frame
/// that is not a valid command envelope is rejected identically in every
/// state.
pub(super) async fn dispatch_text(
    session: &mut Session,
    state: &AppState,
    text: &str,
) -> ServerResponse {
    let command = match parse_command(text) {
        Ok(command) => command,
        Err(ParseError::Malformed) => {
            debug!("malformed text frame");
            return ServerResponse::error(
                "error",
                "malformed message, expected a JSON object with `type` and `data`",
                handlers::state_data(session),
            );
        }
        Err(ParseError::UnknownType(kind)) => {
            debug!(kind, "unsupported message type");
            return ServerResponse::error(
                "error",
                format!("unsupported message type: {kind}"),
                handlers::state_data(session),
            );
        }
    };
    dispatch_command(session, state, command).await
}

/// Handles one inbound binary frame. Binary always means audio, but the
/// legality table still applies: audio before registration is rejected, not
/// dropped.
pub(super) async fn dispatch_binary(
    session: &mut Session,
    state: &AppState,
    bytes: &[u8],
) -> ServerResponse {
    if !session.state().allows(CommandKind::Audio) {
        return sequence_error(session, CommandKind::Audio);
    }
    handlers::handle_audio(session, state, bytes).await
}

async fn dispatch_command(
    session: &mut Session,
    state: &AppState,
    command: ClientCommand,
) -> ServerResponse {
    if !session.state().allows(command.kind) {
        return sequence_error(session, command.kind);
    }
    match command.kind {
        CommandKind::Auth => handlers::handle_auth(session, state, command.data).await,
        CommandKind::Register => handlers::handle_register(session, command.data).await,
        CommandKind::Chat => handlers::handle_chat(session, state, command.data).await,
        // Audio only ever arrives on the binary path.
        CommandKind::Audio => sequence_error(session, CommandKind::Audio),
    }
}

/// Soft rejection for a command that is illegal in the current state. The
/// connection stays open and the response carries the state so the client
/// can resynchronize.
fn sequence_error(session: &Session, command: CommandKind) -> ServerResponse {
    debug!(%command, state = %session.state(), "command rejected in current state");
    ServerResponse::error(
        "error",
        format!(
            "cannot handle {} in state {}, complete authentication and registration first",
            command,
            session.state()
        ),
        handlers::state_data(session),
    )
}
