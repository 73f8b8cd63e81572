//! Conversation state machine.
//!
//! A session starts `Uninitialized`, becomes `Active` once the server hands out a
//! conversation id, and from then on alternates user and assistant messages one turn
//! at a time. At most one request is in flight; submissions made meanwhile wait in a
//! FIFO queue and are dispatched in order as earlier turns complete.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::api_connection::connection::{ApiConnectionError, ChatTransport};
use crate::api_connection::endpoints::{
    ChatMessage, ChatResponse, ConversationId, NewConversationResponse,
};
use crate::response_merger::{merge_response, RecommendationState};

/// Shown in place of the assistant reply when a turn fails for any reason.
pub const TURN_FAILURE_MESSAGE: &str = "抱歉，发生了错误，请稍后再试。";

/// Starter prompts offered before the user has said anything.
pub const QUICK_QUESTIONS: [&str; 4] = [
    "我家里有番茄、鸡蛋，能做什么？",
    "我想吃素食",
    "给我推荐一道快手菜",
    "麻婆豆腐怎么做？",
];

/// 1-based lookup into [`QUICK_QUESTIONS`].
pub fn quick_question(n: usize) -> Option<&'static str> {
    n.checked_sub(1).and_then(|i| QUICK_QUESTIONS.get(i)).copied()
}

#[derive(Debug)]
pub enum SessionError {
    AlreadyActive(ConversationId),
    /// Conversation creation failed; the session stays uninitialized.
    Transport(ApiConnectionError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyActive(id) => {
                write!(f, "Session already bound to conversation {}", id)
            }
            SessionError::Transport(err) => write!(f, "Could not create conversation: {}", err),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Transport(err) => Some(err),
            SessionError::AlreadyActive(_) => None,
        }
    }
}

impl From<ApiConnectionError> for SessionError {
    fn from(err: ApiConnectionError) -> Self {
        SessionError::Transport(err)
    }
}

/// A conversation identity and its messages in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Active(Conversation),
}

/// A request the session wants sent. Hand the transport's result back to
/// [`ConversationSession::finish_turn`]; until then the session stays pending and
/// queues every new submission.
#[must_use = "the turn must be sent and its result passed to finish_turn"]
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingTurn {
    pub conversation_id: ConversationId,
    pub message: String,
}

#[derive(Debug)]
pub struct ConversationSession {
    state: SessionState,
    pending: bool,
    queued: VecDeque<String>,
    last_response: Option<ChatResponse>,
    recommendation: RecommendationState,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            pending: false,
            queued: VecDeque::new(),
            last_response: None,
            recommendation: RecommendationState::default(),
        }
    }

    /// Asks the server for a conversation and activates the session with it.
    /// Returns the new id and the greeting that seeded the history.
    pub async fn initialize<T>(
        &mut self,
        transport: &T,
    ) -> Result<(ConversationId, String), SessionError>
    where
        T: ChatTransport + ?Sized,
    {
        if let SessionState::Active(conversation) = &self.state {
            return Err(SessionError::AlreadyActive(conversation.id.clone()));
        }

        let created = transport.create_conversation().await.map_err(|e| {
            error!("Failed to create conversation: {}", e);
            SessionError::Transport(e)
        })?;
        self.activate(created)
    }

    /// `Uninitialized -> Active`. Fires once; later calls are rejected.
    pub fn activate(
        &mut self,
        created: NewConversationResponse,
    ) -> Result<(ConversationId, String), SessionError> {
        if let SessionState::Active(conversation) = &self.state {
            return Err(SessionError::AlreadyActive(conversation.id.clone()));
        }

        info!(conversation_id = %created.conversation_id, "Conversation started");
        self.state = SessionState::Active(Conversation {
            id: created.conversation_id.clone(),
            messages: vec![ChatMessage::assistant(created.message.clone())],
        });
        Ok((created.conversation_id, created.message))
    }

    /// Accepts a user submission. Returns the request to send when the turn can start
    /// right away; returns `None` when the text is blank, the session has no id yet,
    /// or another turn is in flight (in which case the text is queued).
    ///
    /// A returned turn must be sent and completed with [`Self::finish_turn`].
    /// [`Self::submit`] does both.
    #[must_use]
    pub fn begin_turn(&mut self, text: &str) -> Option<OutgoingTurn> {
        if text.trim().is_empty() {
            debug!("Ignoring blank submission");
            return None;
        }
        if !self.is_active() {
            debug!("Ignoring submission before the conversation exists");
            return None;
        }
        if self.pending {
            debug!(queued = self.queued.len() + 1, "Turn in flight, queueing submission");
            self.queued.push_back(text.to_string());
            return None;
        }
        self.dispatch(text.to_string())
    }

    fn dispatch(&mut self, text: String) -> Option<OutgoingTurn> {
        let SessionState::Active(conversation) = &mut self.state else {
            return None;
        };
        conversation.messages.push(ChatMessage::user(text.clone()));
        self.pending = true;
        Some(OutgoingTurn {
            conversation_id: conversation.id.clone(),
            message: text,
        })
    }

    /// Completes the in-flight turn. Any failure becomes the fixed fallback reply and
    /// leaves the recommendation slot as it was. Returns the next queued turn, if any,
    /// which is already in flight and must be sent like the one from `begin_turn`.
    #[must_use]
    pub fn finish_turn(
        &mut self,
        outcome: Result<ChatResponse, ApiConnectionError>,
    ) -> Option<OutgoingTurn> {
        if !self.pending {
            warn!("finish_turn called with no turn in flight, ignoring");
            return None;
        }
        let SessionState::Active(conversation) = &mut self.state else {
            return None;
        };

        match outcome {
            Ok(response) => {
                if response.conversation_id != conversation.id {
                    warn!(
                        expected = %conversation.id,
                        received = %response.conversation_id,
                        "Reply carries a different conversation id"
                    );
                }
                conversation
                    .messages
                    .push(ChatMessage::assistant(response.message.clone()));
                self.recommendation =
                    merge_response(std::mem::take(&mut self.recommendation), &response);
                self.last_response = Some(response);
            }
            Err(e) => {
                error!(conversation_id = %conversation.id, "Chat turn failed: {}", e);
                conversation
                    .messages
                    .push(ChatMessage::assistant(TURN_FAILURE_MESSAGE));
            }
        }
        self.pending = false;

        let next = self.queued.pop_front()?;
        self.dispatch(next)
    }

    /// Submits `text` and runs it, plus anything queued behind it, to completion.
    /// Never fails: transport errors end up in the history as the fallback reply.
    pub async fn submit<T>(&mut self, transport: &T, text: &str)
    where
        T: ChatTransport + ?Sized,
    {
        let mut next = self.begin_turn(text);
        while let Some(turn) = next {
            let outcome = transport
                .send_message(&turn.message, &turn.conversation_id)
                .await;
            next = self.finish_turn(outcome);
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        match &self.state {
            SessionState::Active(conversation) => Some(conversation),
            SessionState::Uninitialized => None,
        }
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation().map(|conversation| &conversation.id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation()
            .map(|conversation| conversation.messages.as_slice())
            .unwrap_or_default()
    }

    /// True while only the greeting is present.
    pub fn awaiting_first_question(&self) -> bool {
        self.is_active() && self.messages().len() == 1
    }

    pub fn last_response(&self) -> Option<&ChatResponse> {
        self.last_response.as_ref()
    }

    pub fn recommendation(&self) -> &RecommendationState {
        &self.recommendation
    }

    pub fn detected_ingredients(&self) -> &[String] {
        self.last_response
            .as_ref()
            .and_then(|response| response.detected_ingredients.as_deref())
            .unwrap_or_default()
    }

    pub fn detected_restrictions(&self) -> &[String] {
        self.last_response
            .as_ref()
            .and_then(|response| response.detected_restrictions.as_deref())
            .unwrap_or_default()
    }
}
