//! In-memory conversation sessions.
//!
//! Each session sits behind its own async mutex so a turn can hold it for the
//! whole read-modify-write while other sessions proceed. The id map itself is
//! only locked long enough to look up or insert an entry.

use chrono::{DateTime, Utc};
use faqdesk_core::config::SessionSettings;
use faqdesk_llm::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// Retention policy. Both limits are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Keep only the newest N messages on each write
    pub max_history_messages: Option<usize>,

    /// Sessions not written for this long are dropped by `prune_idle`
    pub idle_ttl: Option<Duration>,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            max_history_messages: settings.max_history_messages,
            idle_ttl: settings.idle_ttl_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Exclusive access to one session for the duration of a turn.
pub struct SessionGuard {
    id: String,
    session: OwnedMutexGuard<Session>,
    max_history_messages: Option<usize>,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.session.history
    }

    /// Replace the stored history wholesale, applying the retention limit.
    pub fn replace_history(&mut self, mut history: Vec<ChatMessage>) {
        if let Some(max) = self.max_history_messages {
            if history.len() > max {
                history.drain(..history.len() - max);
            }
        }

        self.session.history = history;
        self.session.updated_at = Utc::now();
    }
}

/// Session id to history store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// New random session id. Nothing is stored until the first write.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        tracing::debug!("Created session {}", id);
        id
    }

    /// Ordered history for `id`, empty for an unknown id.
    pub async fn get_history(&self, id: &str) -> Vec<ChatMessage> {
        let entry = self.sessions.read().await.get(id).cloned();
        match entry {
            Some(session) => session.lock().await.history.clone(),
            None => Vec::new(),
        }
    }

    /// Replace the history for `id`.
    pub async fn set_history(&self, id: &str, history: Vec<ChatMessage>) {
        let mut guard = self.lock(id).await;
        guard.replace_history(history);
    }

    /// Take exclusive access to `id`, materializing the session if needed.
    pub async fn lock(&self, id: &str) -> SessionGuard {
        let entry = {
            let mut sessions = self.sessions.write().await;
            Arc::clone(
                sessions
                    .entry(id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
            )
        };

        SessionGuard {
            id: id.to_string(),
            session: entry.lock_owned().await,
            max_history_messages: self.config.max_history_messages,
        }
    }

    /// Drop sessions idle for longer than the configured TTL.
    ///
    /// Sessions currently locked by a turn are kept. Returns the number
    /// removed; always 0 without a TTL.
    pub async fn prune_idle(&self) -> usize {
        let Some(ttl) = self.config.idle_ttl else {
            return 0;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => s.updated_at >= cutoff,
            Err(_) => true,
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Pruned {} idle sessions", removed);
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
