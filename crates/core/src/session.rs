//! Per-connection session state machine.
//!
//! One `Session` exists per live WebSocket connection and is owned
//! exclusively by that connection's task, so none of this needs locking.
//! It tracks where the client is in the auth -> register -> chat handshake,
//! the bound device identity, and the conversation turns recorded so far.

use crate::agent::{ContextTurn, TurnRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// The protocol phase of one connection.
///
/// Transitions only ever move forward; disconnection is the sole way out of
/// any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatState {
    /// Waiting for API key verification.
    Init,
    /// Key accepted, waiting for a device ID.
    Authenticated,
    /// Device bound, no chat turn exchanged yet.
    Ready,
    /// At least one chat turn has been exchanged.
    Chatting,
}

impl ChatState {
    /// The wire spelling of the state, as carried in response `data`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatState::Init => "INIT",
            ChatState::Authenticated => "AUTHENTICATED",
            ChatState::Ready => "READY",
            ChatState::Chatting => "CHATTING",
        }
    }

    /// Whether `command` is legal in this state.
    ///
    /// An illegal command is a soft rejection: the caller reports an error
    /// carrying the current state and leaves the session untouched.
    pub fn allows(&self, command: CommandKind) -> bool {
        matches!(
            (self, command),
            (ChatState::Init, CommandKind::Auth)
                | (ChatState::Authenticated, CommandKind::Register)
                | (
                    ChatState::Ready | ChatState::Chatting,
                    CommandKind::Chat | CommandKind::Audio
                )
        )
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four kinds of client commands the router dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Auth,
    Register,
    Chat,
    Audio,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Auth => "auth",
            CommandKind::Register => "register",
            CommandKind::Chat => "chat",
            CommandKind::Audio => "audio",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side state for one WebSocket connection.
///
/// Created when the connection is accepted, dropped when it closes; never
/// persisted or shared between connections.
#[derive(Debug)]
pub struct Session {
    state: ChatState,
    device_id: Option<String>,
    context_count: u64,
    history: Vec<ContextTurn>,
    max_history: usize,
}

impl Session {
    /// Creates a fresh session in `INIT`, keeping at most `max_history`
    /// turns of transcript.
    pub fn new(max_history: usize) -> Self {
        Self {
            state: ChatState::Init,
            device_id: None,
            context_count: 0,
            history: Vec::new(),
            max_history,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Number of user turns recorded so far. Reporting only.
    pub fn context_count(&self) -> u64 {
        self.context_count
    }

    /// INIT -> AUTHENTICATED. Returns false, changing nothing, outside INIT.
    pub fn authenticate(&mut self) -> bool {
        if self.state != ChatState::Init {
            warn!(state = %self.state, "authenticate called outside INIT");
            return false;
        }
        self.state = ChatState::Authenticated;
        info!("session state: INIT -> AUTHENTICATED");
        true
    }

    /// AUTHENTICATED -> READY, binding the device identity. The device ID is
    /// set exactly once for the lifetime of the connection.
    pub fn register_device(&mut self, device_id: impl Into<String>) -> bool {
        if self.state != ChatState::Authenticated {
            warn!(state = %self.state, "register_device called outside AUTHENTICATED");
            return false;
        }
        let device_id = device_id.into();
        info!(%device_id, "session state: AUTHENTICATED -> READY");
        self.device_id = Some(device_id);
        self.state = ChatState::Ready;
        true
    }

    /// READY -> CHATTING. Only the first successful chat command triggers
    /// this; audio stays in whatever state it was received in.
    pub fn start_chatting(&mut self) -> bool {
        if self.state != ChatState::Ready {
            warn!(state = %self.state, "start_chatting called outside READY");
            return false;
        }
        self.state = ChatState::Chatting;
        debug!("session state: READY -> CHATTING");
        true
    }

    /// Records a user turn in the transcript and bumps the reported count.
    pub fn record_user_turn(&mut self, content: impl Into<String>) {
        self.context_count += 1;
        self.push_turn(ContextTurn::new(TurnRole::User, content));
    }

    /// Records the agent's reply to the latest user turn.
    pub fn record_assistant_turn(&mut self, content: impl Into<String>) {
        self.push_turn(ContextTurn::new(TurnRole::Assistant, content));
    }

    /// The most recent turns, oldest first, to hand to the agent as context.
    pub fn recent_context(&self, limit: usize) -> &[ContextTurn] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    fn push_turn(&mut self, turn: ContextTurn) {
        self.history.push(turn);
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legality_table_matches_protocol() {
        use ChatState::*;
        use CommandKind::*;

        assert!(Init.allows(Auth));
        assert!(!Init.allows(Register));
        assert!(!Init.allows(Chat));
        assert!(!Init.allows(Audio));

        assert!(Authenticated.allows(Register));
        assert!(!Authenticated.allows(Auth));
        assert!(!Authenticated.allows(Chat));
        assert!(!Authenticated.allows(Audio));

        assert!(Ready.allows(Chat));
        assert!(Ready.allows(Audio));
        assert!(!Ready.allows(Register));
        assert!(!Ready.allows(Auth));

        assert!(Chatting.allows(Chat));
        assert!(Chatting.allows(Audio));
        assert!(!Chatting.allows(Register));
        assert!(!Chatting.allows(Auth));
    }

    #[test]
    fn transitions_are_monotonic() {
        let mut session = Session::new(100);
        assert_eq!(session.state(), ChatState::Init);

        assert!(session.authenticate());
        assert_eq!(session.state(), ChatState::Authenticated);
        // Re-running an earlier transition never regresses the state.
        assert!(!session.authenticate());
        assert_eq!(session.state(), ChatState::Authenticated);

        assert!(session.register_device("device-1"));
        assert_eq!(session.state(), ChatState::Ready);
        assert_eq!(session.device_id(), Some("device-1"));
        assert!(!session.register_device("device-2"));
        assert_eq!(session.device_id(), Some("device-1"));

        assert!(session.start_chatting());
        assert_eq!(session.state(), ChatState::Chatting);
        assert!(!session.start_chatting());
        assert_eq!(session.state(), ChatState::Chatting);
    }

    #[test]
    fn early_transitions_rejected_out_of_order() {
        let mut session = Session::new(100);
        assert!(!session.register_device("device-1"));
        assert!(!session.start_chatting());
        assert_eq!(session.state(), ChatState::Init);
        assert_eq!(session.device_id(), None);
    }

    #[test]
    fn user_turns_drive_context_count() {
        let mut session = Session::new(100);
        assert_eq!(session.context_count(), 0);

        session.record_user_turn("hello");
        session.record_assistant_turn("hi there");
        session.record_user_turn("how are you");
        assert_eq!(session.context_count(), 2);
        assert_eq!(session.recent_context(10).len(), 3);
    }

    #[test]
    fn recent_context_returns_newest_turns() {
        let mut session = Session::new(100);
        for i in 0..5 {
            session.record_user_turn(format!("message {i}"));
        }
        let context = session.recent_context(2);
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, "message 3");
        assert_eq!(context[1].content, "message 4");
    }

    #[test]
    fn history_is_capped() {
        let mut session = Session::new(3);
        for i in 0..10 {
            session.record_user_turn(format!("message {i}"));
        }
        assert_eq!(session.recent_context(100).len(), 3);
        assert_eq!(session.recent_context(100)[0].content, "message 7");
        // The reported count keeps growing even as old turns are dropped.
        assert_eq!(session.context_count(), 10);
    }

    #[test]
    fn state_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ChatState::Init).unwrap(),
            "\"INIT\""
        );
        assert_eq!(
            serde_json::to_string(&ChatState::Chatting).unwrap(),
            "\"CHATTING\""
        );
        assert_eq!(ChatState::Authenticated.to_string(), "AUTHENTICATED");
    }
}
