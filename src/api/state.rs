// src/api/state.rs
use crate::config::AppConfig;
use crate::identity::IdentityProvider;
use crate::judge::JudgeBackend;
use crate::proctor::{ProctorSession, ReportedSurface};
use crate::store::{Backends, SubmissionStore};
use crate::tracker::RunTracker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One run tracker per user, so a new run only supersedes that user's runs.
#[derive(Default)]
pub struct RunRegistry {
    trackers: Mutex<HashMap<String, Arc<RunTracker>>>,
}

impl RunRegistry {
    pub fn tracker_for(&self, user_id: &str) -> Arc<RunTracker> {
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(RunTracker::new()))
            .clone()
    }
}

pub struct OwnedSession {
    pub owner: String,
    pub session: ProctorSession<ReportedSurface>,
    last_seen: Instant,
}

impl OwnedSession {
    pub fn new(owner: String, session: ProctorSession<ReportedSurface>) -> Self {
        Self {
            owner,
            session,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Live proctor sessions keyed by id. Dropping an entry ends its session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, OwnedSession>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, OwnedSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a new session, first dropping any that went idle.
    pub fn insert(&self, id: Uuid, owned: OwnedSession) {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            log::info!("Dropped {} idle proctor session(s)", expired);
        }
        sessions.insert(id, owned);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub judge: Arc<JudgeBackend>,
    pub store: Arc<dyn SubmissionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub runs: Arc<RunRegistry>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig, client: reqwest::Client, backends: Backends) -> Self {
        let judge = JudgeBackend::from_config(client, &config.judge);
        let idle_timeout = config.proctor.idle_timeout;
        Self {
            config: Arc::new(config),
            judge: Arc::new(judge),
            store: backends.store,
            identity: backends.identity,
            runs: Arc::new(RunRegistry::default()),
            sessions: Arc::new(SessionRegistry::new(idle_timeout)),
        }
    }
}
