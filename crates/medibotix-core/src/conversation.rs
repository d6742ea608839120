//! Conversation session: the message log and the single in-flight question.
//!
//! Asking is split in two edges so a front end can keep its event loop
//! running while the backend thinks:
//!
//! * [`ConversationController::begin_ask`] appends the user message right away
//!   and hands back a [`PendingQuery`];
//! * [`ConversationController::finish_ask`] appends the answer, or the fixed
//!   fallback text on any failure, and clears `loading`.
//!
//! [`ConversationController::reset`] bumps a generation counter, so an answer
//! that arrives for a conversation that no longer exists is dropped.

use crate::error::{ClientError, TransportError};
use crate::state::ChatMessage;
use crate::transport::{AskReply, Transport};

pub const FALLBACK_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Awaiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    Answered,
    /// The fallback message was appended instead of an answer
    Fallback,
}

/// Ticket for a question issued by [`ConversationController::begin_ask`]
#[derive(Debug, Clone)]
pub struct PendingQuery {
    generation: u64,
    pub question: String,
}

impl PendingQuery {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn send(self, transport: &dyn Transport) -> QueryCompletion {
        let result = transport.ask_question(&self.question).await;
        QueryCompletion {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug)]
pub struct QueryCompletion {
    generation: u64,
    result: Result<AskReply, TransportError>,
}

impl QueryCompletion {
    /// Settle a question whose request never produced a reply
    pub fn failed(generation: u64, error: TransportError) -> Self {
        Self {
            generation,
            result: Err(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversationController {
    messages: Vec<ChatMessage>,
    loading: bool,
    generation: u64,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Awaiting
        } else {
            SessionState::Idle
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idle -> Awaiting. Returns `None` (and changes nothing) for a blank
    /// question or while another question is in flight. `Some` also means the
    /// caller's input buffer must be cleared.
    pub fn begin_ask(&mut self, question: &str) -> Option<PendingQuery> {
        if self.loading || question.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(question));
        self.loading = true;

        tracing::info!(
            generation = self.generation,
            chars = question.chars().count(),
            "Question issued"
        );

        Some(PendingQuery {
            generation: self.generation,
            question: question.to_string(),
        })
    }

    /// Like [`begin_ask`](Self::begin_ask), taking the question from an input
    /// buffer and clearing it when the question is accepted.
    pub fn submit_input(&mut self, input: &mut String) -> Option<PendingQuery> {
        let pending = self.begin_ask(input)?;
        input.clear();
        Some(pending)
    }

    /// Awaiting -> Idle. Returns `None` when the completion is stale (the
    /// session was reset after the question was issued).
    pub fn finish_ask(&mut self, completion: QueryCompletion) -> Option<AskOutcome> {
        if completion.generation != self.generation || !self.loading {
            tracing::debug!(
                issued = completion.generation,
                current = self.generation,
                "Discarding stale answer"
            );
            return None;
        }

        let answer = completion
            .result
            .map_err(ClientError::from)
            .and_then(AskReply::into_answer);

        let outcome = match answer {
            Ok(text) => {
                self.messages.push(ChatMessage::assistant(text));
                AskOutcome::Answered
            }
            Err(err) => {
                tracing::warn!(error = %err, "Question failed, showing fallback");
                self.messages.push(ChatMessage::assistant(FALLBACK_MESSAGE));
                AskOutcome::Fallback
            }
        };

        self.loading = false;
        Some(outcome)
    }

    /// Full round trip. Failures never escape: they end up as the fallback
    /// message in the log.
    pub async fn ask(&mut self, transport: &dyn Transport, question: &str) -> Option<AskOutcome> {
        let pending = self.begin_ask(question)?;
        let completion = pending.send(transport).await;
        self.finish_ask(completion)
    }

    /// Clear the log from any state. In-flight requests are not cancelled;
    /// their answers will be discarded.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.messages.clear();
        self.loading = false;
        tracing::info!(generation = self.generation, "Conversation reset");
    }
}
