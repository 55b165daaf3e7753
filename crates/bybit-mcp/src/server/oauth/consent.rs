//! Pending consent requests and PIN brute-force counters.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::secure;
use super::types::{AuthorizationParams, PendingConsent, RegisteredClient};
use crate::error::{AuthError, AuthResult};

/// Entropy of a consent id in bytes.
const CONSENT_ID_BYTES: usize = 32;

/// Outcome of comparing the submitted PIN, computed before touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    /// No consent PIN is configured.
    NotRequired,
    Matched,
    Mismatched,
}

#[derive(Default)]
struct ConsentState {
    pending: HashMap<String, PendingConsent>,
    pin_failures: HashMap<String, u32>,
}

/// Holds consent requests between `authorize` and approval or denial.
///
/// Every transition runs under one lock, so a consent id is consumed at most
/// once even when two approvals race.
pub struct ConsentStore {
    state: Mutex<ConsentState>,
    max_pin_attempts: u32,
}

impl ConsentStore {
    #[must_use]
    pub fn new(max_pin_attempts: u32) -> Self {
        Self {
            state: Mutex::new(ConsentState::default()),
            max_pin_attempts,
        }
    }

    /// Store a new pending request and return its consent id.
    pub async fn insert(&self, client: RegisteredClient, params: AuthorizationParams) -> String {
        let consent_id = secure::random_token(CONSENT_ID_BYTES);
        let pending = PendingConsent {
            client,
            params,
            created_at: Instant::now(),
        };
        let mut state = self.state.lock().await;
        state.pending.insert(consent_id.clone(), pending);
        consent_id
    }

    /// Look up a pending request without consuming it.
    pub async fn get(&self, consent_id: &str) -> Option<PendingConsent> {
        self.state.lock().await.pending.get(consent_id).cloned()
    }

    /// Consume a pending request for approval.
    ///
    /// With a PIN configured, a request that has already used up its attempts
    /// is removed and reported as `Locked`; a mismatch counts one failure and
    /// leaves the request in place.
    pub async fn approve(&self, consent_id: &str, pin: PinCheck) -> AuthResult<PendingConsent> {
        let mut state = self.state.lock().await;
        if !state.pending.contains_key(consent_id) {
            return Err(AuthError::NotFound);
        }

        if pin != PinCheck::NotRequired {
            let failures = state.pin_failures.get(consent_id).copied().unwrap_or(0);
            if failures >= self.max_pin_attempts {
                state.pending.remove(consent_id);
                state.pin_failures.remove(consent_id);
                return Err(AuthError::Locked);
            }
            if pin == PinCheck::Mismatched {
                let failures = failures + 1;
                state.pin_failures.insert(consent_id.to_owned(), failures);
                return Err(AuthError::InvalidPin);
            }
        }

        state.pin_failures.remove(consent_id);
        state.pending.remove(consent_id).ok_or(AuthError::NotFound)
    }

    /// Consume a pending request for denial.
    pub async fn deny(&self, consent_id: &str) -> AuthResult<PendingConsent> {
        let mut state = self.state.lock().await;
        state.pin_failures.remove(consent_id);
        state.pending.remove(consent_id).ok_or(AuthError::NotFound)
    }

    /// Drop requests older than `ttl`. Returns how many were removed.
    pub async fn remove_expired(&self, ttl: Duration) -> usize {
        let mut state = self.state.lock().await;
        let before = state.pending.len();
        state.pending.retain(|_, consent| !consent.is_expired(ttl));

        let ConsentState {
            pending,
            pin_failures,
        } = &mut *state;
        pin_failures.retain(|id, _| pending.contains_key(id));

        before - state.pending.len()
    }

    /// Wrong-PIN attempts recorded for a consent id.
    pub async fn pin_failures(&self, consent_id: &str) -> u32 {
        let state = self.state.lock().await;
        state.pin_failures.get(consent_id).copied().unwrap_or(0)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentStore")
            .field("max_pin_attempts", &self.max_pin_attempts)
            .finish()
    }
}
