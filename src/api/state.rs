use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::db::TrendingStore;
use crate::error::{AppError, AppResult};
use crate::services::trending::DEFAULT_TRENDING_LIMIT;
use crate::services::{DramaProvider, SearchSession, TrendingRecorder};

/// Tunables shared by the handlers
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub trending_limit: usize,
    /// Sessions untouched for longer than this are dropped by the sweeper
    pub session_idle: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            trending_limit: DEFAULT_TRENDING_LIMIT,
            session_idle: Duration::from_secs(600),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn DramaProvider>,
    pub store: Arc<dyn TrendingStore>,
    pub recorder: TrendingRecorder,
    pub settings: SearchSettings,
    pub inner: Arc<RwLock<AppStateInner>>,
}

/// Inner state that can be modified
#[derive(Default)]
pub struct AppStateInner {
    pub sessions: HashMap<Uuid, SessionEntry>,
}

/// A live session and when a client last touched it
pub struct SessionEntry {
    pub session: SearchSession,
    last_seen: Instant,
}

impl SessionEntry {
    fn new(session: SearchSession) -> Self {
        Self {
            session,
            last_seen: Instant::now(),
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }
}

impl AppState {
    pub fn new(
        provider: Arc<dyn DramaProvider>,
        store: Arc<dyn TrendingStore>,
        recorder: TrendingRecorder,
        settings: SearchSettings,
    ) -> Self {
        Self {
            provider,
            store,
            recorder,
            settings,
            inner: Arc::new(RwLock::new(AppStateInner::default())),
        }
    }

    /// Starts a session with this state's provider and settings
    pub fn start_session(&self) -> SearchSession {
        SearchSession::start(
            self.provider.clone(),
            self.recorder.clone(),
            self.settings.debounce,
        )
    }

    pub async fn insert_session(&self, session: SearchSession) -> Uuid {
        let id = session.id();
        let mut inner = self.inner.write().await;
        inner.sessions.insert(id, SessionEntry::new(session));
        id
    }

    /// Runs `f` against a session and marks it as recently used
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&SearchSession) -> R,
    ) -> AppResult<R> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))?;

        entry.last_seen = Instant::now();
        Ok(f(&entry.session))
    }

    pub async fn remove_session(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        inner.sessions.remove(&id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Drops sessions idle for longer than `settings.session_idle`
    ///
    /// Returns how many were dropped. Dropping a session stops its driver.
    pub async fn evict_idle_sessions(&self) -> usize {
        let now = Instant::now();
        let max_idle = self.settings.session_idle;

        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, entry| entry.idle_for(now) <= max_idle);

        before - inner.sessions.len()
    }

    /// Spawns a task that evicts idle sessions every half idle period
    pub fn spawn_session_sweeper(&self) -> JoinHandle<()> {
        let state = self.clone();
        let period = (self.settings.session_idle / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let evicted = state.evict_idle_sessions().await;
                if evicted > 0 {
                    let remaining = state.session_count().await;
                    tracing::info!(
                        evicted,
                        remaining,
                        "Evicted idle search sessions"
                    );
                }
            }
        })
    }
}
