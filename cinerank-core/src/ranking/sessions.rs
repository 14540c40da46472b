//! Server-held state for interactive placements.
//!
//! A session only lives in memory; nothing is written until the caller
//! submits the resolved placement. Each owner has at most one open session,
//! and idle sessions expire.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cinerank_model::{ComparisonDecision, RankedItem, RatingCategory};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::placement::{PlacementState, PlacementStep};

/// One user's in-progress comparison search for a single movie.
#[derive(Debug, Clone)]
pub struct PlacementSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub external_ref: i64,
    pub category: RatingCategory,
    /// Comparison candidates, worst to best, captured when the session started.
    pub candidates: Vec<RankedItem>,
    pub state: PlacementState,
    pub last_touched: DateTime<Utc>,
}

impl PlacementSession {
    /// Start a search over `candidates`, seeded from the movie's category.
    pub fn new(
        owner_id: Uuid,
        external_ref: i64,
        category: RatingCategory,
        candidates: Vec<RankedItem>,
    ) -> Self {
        let state = PlacementState::new(category, candidates.len());
        Self {
            id: Uuid::now_v7(),
            owner_id,
            external_ref,
            category,
            candidates,
            state,
            last_touched: Utc::now(),
        }
    }

    /// The comparison to show next, or the resolved insertion point.
    pub fn step(&self) -> PlacementStep {
        self.state.step()
    }

    /// Record a verdict against the current candidate and refresh the idle timer.
    pub fn apply(&mut self, decision: ComparisonDecision) -> PlacementStep {
        self.last_touched = Utc::now();
        self.state.apply(decision)
    }
}

/// Open placement sessions keyed by session id.
#[derive(Debug)]
pub struct PlacementSessions {
    sessions: DashMap<Uuid, PlacementSession>,
    ttl: chrono::Duration,
}

impl PlacementSessions {
    /// Sessions idle for longer than `ttl` are dropped on the next access or sweep.
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, session: &PlacementSession, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.last_touched) > self.ttl
    }

    /// Store a new session, replacing any session the owner already had open.
    pub fn open(&self, session: PlacementSession) {
        self.purge_expired();
        let owner_id = session.owner_id;
        self.sessions.retain(|_, existing| {
            let keep = existing.owner_id != owner_id;
            if !keep {
                debug!(session_id = %existing.id, "replacing open placement session");
            }
            keep
        });
        self.sessions.insert(session.id, session);
    }

    /// Run `f` against the owner's live session. Sessions belonging to someone
    /// else, and expired ones, are treated as missing.
    pub fn with_session<R>(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        f: impl FnOnce(&mut PlacementSession) -> R,
    ) -> Option<R> {
        let now = Utc::now();
        let mut entry = self.sessions.get_mut(&session_id)?;
        if entry.owner_id != owner_id {
            return None;
        }
        if self.is_expired(&entry, now) {
            drop(entry);
            self.sessions.remove(&session_id);
            return None;
        }
        Some(f(entry.value_mut()))
    }

    /// Remove the owner's session. Returns `false` if it was not open.
    pub fn close(&self, owner_id: Uuid, session_id: Uuid) -> bool {
        self.sessions
            .remove_if(&session_id, |_, session| session.owner_id == owner_id)
            .is_some()
    }

    /// Drop idle sessions, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !self.is_expired(session, now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
