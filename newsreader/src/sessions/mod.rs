use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::extraction::ArticleRecord;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// A loaded article with its summary and running conversation.
/// `article` and `summary` are fixed at creation; `turns` only grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub article: ArticleRecord,
    pub summary: String,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry returned by `GET /sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            title: session.article.title.clone(),
            url: session.article.url.clone(),
            created_at: session.created_at,
            message_count: session.turns.len(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    NotFound(String),
}

/// Storage seam for sessions, injected into the server state.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session and return its freshly generated id.
    async fn create(&self, article: ArticleRecord, summary: String) -> String;

    /// Snapshot of a session.
    async fn get(&self, session_id: &str) -> Result<Session, SessionError>;

    /// Append a turn stamped with the current time.
    async fn append_turn(
        &self,
        session_id: &str,
        question: String,
        answer: String,
    ) -> Result<ConversationTurn, SessionError>;

    /// All sessions, in no particular order.
    async fn list(&self) -> Vec<SessionSummary>;
}

/// Process-local store; everything is lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

fn new_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, article: ArticleRecord, summary: String) -> String {
        let mut sessions = self.sessions.write();
        let mut id = new_session_id();
        while sessions.contains_key(&id) {
            id = new_session_id();
        }

        info!("sessions: created {} for '{}'", id, article.title);
        sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                article,
                summary,
                turns: Vec::new(),
                created_at: Utc::now(),
            },
        );
        id
    }

    async fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    async fn append_turn(
        &self,
        session_id: &str,
        question: String,
        answer: String,
    ) -> Result<ConversationTurn, SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let turn = ConversationTurn {
            question,
            answer,
            timestamp: Utc::now(),
        };
        session.turns.push(turn.clone());
        debug!("sessions: {} now has {} turns", session_id, session.turns.len());
        Ok(turn)
    }

    async fn list(&self) -> Vec<SessionSummary> {
        self.sessions.read().values().map(SessionSummary::from).collect()
    }
}
