//! In-memory session context: the current access token, request signing and
//! session-expiry notifications.
//!
//! A [`Session`] is built once by the application's composition root and
//! shared (via `Arc`) with the [`ApiClient`](crate::ApiClient) and the
//! [`TicketBridge`](crate::bridge::TicketBridge). Independent instances never
//! share state, so tests can run several side by side.

use std::sync::{Arc, Weak};

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use parking_lot::{Mutex, RwLock};

use crate::types::AccessToken;

/// Lifecycle of the authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Valid,
    /// A refresh-token exchange is in flight.
    Renewing,
    /// Renewal failed; only an external login can leave this state.
    Expired,
}

#[derive(Debug)]
struct TokenSlot {
    token: Option<AccessToken>,
    generation: u64,
    state: SessionState,
}

/// Headers plus the token generation they were signed with.
#[derive(Debug, Clone)]
pub(crate) struct SignedHeaders {
    pub(crate) headers: HeaderMap,
    pub(crate) generation: u64,
}

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Process-lifetime session context.
pub struct Session {
    slot: RwLock<TokenSlot>,
    listeners: Arc<Mutex<Listeners>>,
    renewal: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("Session")
            .field("has_token", &slot.token.is_some())
            .field("generation", &slot.generation)
            .field("state", &slot.state)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(TokenSlot {
                token: None,
                generation: 0,
                state: SessionState::Valid,
            }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            renewal: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the in-memory access token. No I/O.
    ///
    /// Setting a token marks the session valid; clearing it leaves the state
    /// untouched.
    pub fn set_access_token(&self, token: Option<AccessToken>) {
        let mut slot = self.slot.write();
        if token.is_some() {
            slot.state = SessionState::Valid;
        }
        slot.token = token;
        slot.generation += 1;
    }

    #[must_use]
    pub fn access_token(&self) -> Option<AccessToken> {
        self.slot.read().token.clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.slot.read().state
    }

    /// `Content-Type: application/json`, then `extra`, then
    /// `Authorization: Bearer <token>` when a token is set.
    #[must_use]
    pub fn build_headers(&self, extra: Option<&HeaderMap>) -> HeaderMap {
        self.sign(extra).headers
    }

    /// Headers for endpoints that must never carry the bearer token.
    pub(crate) fn unsigned_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    pub(crate) fn sign(&self, extra: Option<&HeaderMap>) -> SignedHeaders {
        let mut headers = Self::unsigned_headers();
        if let Some(extra) = extra {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }

        let slot = self.slot.read();
        if let Some(token) = &slot.token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Access token is not a valid header value; sending unsigned"),
            }
        }

        SignedHeaders {
            headers,
            generation: slot.generation,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.slot.read().generation
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.slot.write().state = state;
    }

    /// Clear the token and enter [`SessionState::Expired`].
    pub(crate) fn expire(&self) {
        let mut slot = self.slot.write();
        slot.token = None;
        slot.generation += 1;
        slot.state = SessionState::Expired;
    }

    pub(crate) async fn renewal_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.renewal.lock().await
    }

    /// Register a listener called each time the session expires.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`unsubscribed`](Subscription::unsubscribe).
    pub fn subscribe_expired<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub(crate) fn notify_expired(&self) {
        // Snapshot first: a listener may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

/// Handle for a session-expiry listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
