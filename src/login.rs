//! Provider login: Kakao and Apple entry points, ticket exchange and the
//! final token activation shared by every login path.

use http::Method;
use http::header::LOCATION;
use serde::Serialize;
use url::Url;

use crate::classify::{Classification, classify, parse_body};
use crate::client::ApiClient;
use crate::config::KakaoConfig;
use crate::error::{Error, Result};
use crate::nonce;
use crate::storage::TokenStorage;
use crate::transport::{HttpResponse, Transport};
use crate::types::{Route, Ticket, TokenPair};

/// Kakao authorization URL with the `state` to check on callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct KakaoAuthorization {
    pub url: String,
    pub state: String,
}

/// Generate the Kakao authorization URL the login screen opens.
#[must_use]
pub fn kakao_authorization_url(config: &KakaoConfig) -> KakaoAuthorization {
    let state = nonce::generate_state();

    let mut url = config.authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.rest_api_key)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("response_type", "code")
        .append_pair("state", &state);

    KakaoAuthorization {
        url: url.into(),
        state,
    }
}

/// Fresh `state` and `nonce` for a native Sign in with Apple request.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AppleAuthorization {
    pub state: String,
    pub nonce: String,
}

impl AppleAuthorization {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            state: nonce::generate_state(),
            nonce: nonce::generate_nonce(),
        }
    }
}

/// Credential returned by native Sign in with Apple.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct AppleCredential {
    pub identity_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl AppleCredential {
    #[must_use]
    pub fn new(identity_token: impl Into<String>) -> Self {
        Self {
            identity_token: identity_token.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_authorization_code(mut self, code: impl Into<String>) -> Self {
        self.authorization_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, given: impl Into<String>, family: impl Into<String>) -> Self {
        self.given_name = Some(given.into());
        self.family_name = Some(family.into());
        self
    }
}

impl<T: Transport, S: TokenStorage> ApiClient<T, S> {
    /// Kakao authorization URL for the configured app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if Kakao login is not configured.
    pub fn kakao_authorize_url(&self) -> Result<KakaoAuthorization> {
        let kakao = self
            .config
            .kakao
            .as_ref()
            .ok_or_else(|| Error::Config("Kakao login is not configured".into()))?;
        Ok(kakao_authorization_url(kakao))
    }

    /// Exchange a one-time login ticket for tokens. Does not touch any state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Business`]/[`Error::Auth`] for failure responses,
    /// including HTTP 200 bodies shaped like errors, or a transport error.
    pub async fn exchange_ticket(&self, ticket: &Ticket) -> Result<TokenPair> {
        let path = format!(
            "/api/auth/exchange?ticket={}",
            urlencoding::encode(ticket.as_str())
        );
        let payload = self.send_public(Method::GET, &path, None).await?;
        TokenPair::from_payload(payload)
    }

    /// Persist a login result and pick the next screen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ticket`] if the pair carries neither an access nor a
    /// registration token, or [`Error::Storage`] if persisting fails.
    pub async fn complete_login(&self, pair: &TokenPair) -> Result<Route> {
        if !pair.is_usable() {
            return Err(Error::Ticket("no usable token received".into()));
        }
        self.activate(pair).await?;

        Ok(if pair.is_account_registered {
            Route::Home
        } else {
            Route::RoleSelection
        })
    }

    /// Resolve the login ticket for a Kakao authorization `code`.
    ///
    /// The backend answers with a redirect whose `Location` carries the
    /// ticket, or with a JSON body `{ "ticket": ... }` (optionally wrapped in
    /// `result`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ticket`] if no ticket was issued, or the classified
    /// error for failure responses.
    pub async fn kakao_ticket(&self, code: &str) -> Result<Ticket> {
        if code.trim().is_empty() {
            return Err(Error::Ticket("missing Kakao authorization code".into()));
        }
        let path = format!(
            "/api/auth/kakao/redirect?code={}",
            urlencoding::encode(code)
        );
        let response = self.send_public_raw(Method::GET, &path, None).await?;

        let ticket = if response.is_redirect() {
            self.ticket_from_location(&response)
        } else if matches!(response.status, 200 | 204) {
            ticket_from_body(&response)?
        } else {
            let body = parse_body(&response.body);
            return Err(match classify(response.status, body.as_ref(), &response.body) {
                Classification::AuthError { message } => Error::Auth { message },
                Classification::BusinessError { status, message } => {
                    Error::Business { status, message }
                }
                Classification::Success(_) => {
                    Error::Ticket(format!("unexpected HTTP {}", response.status))
                }
            });
        };

        ticket.ok_or_else(|| Error::Ticket("Kakao login did not issue a ticket".into()))
    }

    fn ticket_from_location(&self, response: &HttpResponse) -> Option<Ticket> {
        let location = response.headers.get(LOCATION)?.to_str().ok()?;
        let url = Url::options()
            .base_url(Some(&self.config.base_url))
            .parse(location)
            .ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "ticket")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .map(Ticket)
    }

    /// Web Kakao callback: code → ticket → tokens → next screen.
    ///
    /// # Errors
    ///
    /// Any error from [`kakao_ticket`](Self::kakao_ticket),
    /// [`exchange_ticket`](Self::exchange_ticket) or
    /// [`complete_login`](Self::complete_login).
    pub async fn login_with_kakao_code(&self, code: &str) -> Result<Route> {
        let ticket = self.kakao_ticket(code).await?;
        let pair = self.exchange_ticket(&ticket).await?;
        let route = self.complete_login(&pair).await?;
        tracing::info!(?route, "Kakao login completed");
        Ok(route)
    }

    /// Trade a native Apple credential for Onsikku tokens.
    ///
    /// # Errors
    ///
    /// Returns the classified error for failure responses (HTTP 200 error
    /// bodies included), or any error from [`complete_login`](Self::complete_login).
    pub async fn login_with_apple(&self, credential: &AppleCredential) -> Result<Route> {
        let body = serde_json::to_string(credential)?;
        let payload = self
            .send_public(Method::POST, "/api/auth/apple", Some(body))
            .await?;
        let pair = TokenPair::from_payload(payload)?;
        let route = self.complete_login(&pair).await?;
        tracing::info!(?route, "Apple login completed");
        Ok(route)
    }
}

/// `ticket` from a JSON body, optionally wrapped in `result`.
fn ticket_from_body(response: &HttpResponse) -> Result<Option<Ticket>> {
    let Some(body) = parse_body(&response.body) else {
        return Ok(None);
    };
    match classify(response.status, Some(&body), &response.body) {
        Classification::Success(payload) => Ok(payload
            .get("ticket")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| Ticket(t.to_owned()))),
        Classification::AuthError { message } => Err(Error::Auth { message }),
        Classification::BusinessError { status, message } => {
            Err(Error::Business { status, message })
        }
    }
}
