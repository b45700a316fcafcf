//! Session renewal: trade the stored refresh token for a new pair when a call
//! fails authentication, or tear the session down when that is impossible.
//!
//! Renewals are coalesced. A single async lock serializes them, and each
//! caller remembers the token generation its failed request was signed with:
//! if the generation moved while it waited, another caller already renewed
//! (or expired) the session and its result is reused without a network call.

use http::Method;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::session::SessionState;
use crate::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStorage};
use crate::transport::Transport;
use crate::types::{RefreshToken, TokenPair};

const REFRESH_PATH: &str = "/api/auth/refresh";

impl<T: Transport, S: TokenStorage> ApiClient<T, S> {
    /// Exchange a refresh token for a new pair. Does not touch any state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Business`]/[`Error::Auth`] on a failure response, or a
    /// transport error if the endpoint was unreachable.
    pub async fn refresh_tokens(&self, refresh_token: &RefreshToken) -> Result<TokenPair> {
        let body = json!({ "refreshToken": refresh_token.as_str() }).to_string();
        let payload = self
            .send_public(Method::POST, REFRESH_PATH, Some(body))
            .await?;
        TokenPair::from_payload(payload)
    }

    /// Renew the session for a request signed at `signed_generation`.
    ///
    /// On failure the session is expired, listeners are notified once, and
    /// [`Error::SessionExpired`] carries the renewal's own failure.
    pub(crate) async fn renew(&self, signed_generation: u64) -> Result<()> {
        let _guard = self.session.renewal_guard().await;

        if self.session.generation() != signed_generation {
            return match self.session.access_token() {
                Some(_) => {
                    tracing::debug!("Session already renewed by a concurrent request");
                    Ok(())
                }
                None => Err(Error::SessionExpired {
                    reason: "session ended while the request was in flight".into(),
                }),
            };
        }

        // Unsigned request after expiry; only a new login recovers.
        if self.session.state() == SessionState::Expired {
            return Err(Error::SessionExpired {
                reason: "session expired; sign in again".into(),
            });
        }

        self.session.set_state(SessionState::Renewing);
        match self.renew_from_storage().await {
            Ok(()) => {
                tracing::info!("Session renewed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session renewal failed, expiring session");
                self.expire_session().await;
                Err(Error::SessionExpired {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn renew_from_storage(&self) -> Result<()> {
        let refresh_token = self
            .storage
            .get(REFRESH_TOKEN_KEY)
            .await
            .map_err(Error::storage)?
            .map(RefreshToken)
            .ok_or_else(|| Error::Auth {
                message: "No refresh token available".into(),
            })?;

        let pair = self.refresh_tokens(&refresh_token).await?;
        if pair.access_token.is_none() {
            return Err(Error::Auth {
                message: "Refresh response carried no access token".into(),
            });
        }

        // Registration tokens are irrelevant to an established session.
        let pair = TokenPair {
            registration_token: None,
            ..pair
        };
        self.activate(&pair).await
    }

    /// Clear the in-memory token, delete durable access/refresh tokens and
    /// notify expiry listeners.
    async fn expire_session(&self) {
        self.session.expire();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(error = %e, key, "Failed to delete token during expiry");
            }
        }
        self.session.notify_expired();
    }
}
