//! Per-session itinerary fetchers
//!
//! Every browser session gets its own [`ItineraryFetcher`], so results and
//! the in-flight guard are never shared between users. Sessions that have
//! been quiet for longer than the idle TTL are evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::RngExt;
use tokio::time::Instant;
use tracing::debug;

use crate::fetcher::{ItineraryFetcher, RequestState};
use crate::generation::GenerationService;

/// Header carrying the session id in both directions
pub const SESSION_HEADER: &str = "x-session-id";

/// Sessions untouched for this long are dropped
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

const MAX_SESSION_ID_LEN: usize = 64;

pub type SharedFetcher = Arc<ItineraryFetcher<dyn GenerationService>>;

struct SessionEntry {
    fetcher: SharedFetcher,
    last_used: Instant,
}

pub struct SessionStore {
    service: Arc<dyn GenerationService>,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            idle_ttl: DEFAULT_IDLE_TTL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Fetcher for `requested`, creating the session when it is unknown.
    ///
    /// Ids that are missing or not well-formed are replaced by a fresh one;
    /// the id actually used is returned alongside the fetcher.
    pub fn get_or_create(&self, requested: Option<&str>) -> (String, SharedFetcher) {
        let now = Instant::now();
        let mut sessions = self.lock_sessions();
        self.evict_expired(&mut sessions, now);

        let id = requested
            .filter(|id| is_valid_session_id(id))
            .map_or_else(new_session_id, str::to_string);

        let entry = sessions.entry(id.clone()).or_insert_with(|| {
            debug!("Opening session {}", id);
            SessionEntry {
                fetcher: Arc::new(ItineraryFetcher::new(self.service.clone())),
                last_used: now,
            }
        });
        entry.last_used = now;

        (id, entry.fetcher.clone())
    }

    /// Lifecycle state of a session; unknown sessions are `Idle`
    pub fn state(&self, id: Option<&str>) -> RequestState {
        let Some(id) = id else {
            return RequestState::Idle;
        };

        let now = Instant::now();
        let mut sessions = self.lock_sessions();
        self.evict_expired(&mut sessions, now);

        match sessions.get_mut(id) {
            Some(entry) => {
                entry.last_used = now;
                entry.fetcher.state()
            }
            None => RequestState::Idle,
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.lock_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        sessions.retain(|id, entry| {
            let fresh = now.duration_since(entry.last_used) < self.idle_ttl
                || entry.fetcher.is_requesting();
            if !fresh {
                debug!("Session {} expired", id);
            }
            fresh
        });
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn new_session_id() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}
