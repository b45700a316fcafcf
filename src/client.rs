use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::classify::{Classification, classify, parse_body};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::{Session, SignedHeaders};
use crate::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REGISTRATION_TOKEN_KEY, TokenStorage};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{AccessToken, TokenPair};

/// Per-call request description.
///
/// ```rust,ignore
/// let options = RequestOptions::patch().with_json(&patch)?;
/// let page: MyPage = client.fetch("/api/members/mypage", options).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) method: Method,
    pub(crate) headers: Option<HeaderMap>,
    pub(crate) body: Option<String>,
    /// Set once the call has gone through renewal; blocks a second renewal.
    pub(crate) retried: bool,
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serialize `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if serialization fails.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Successful response after classification.
struct Delivered {
    payload: JsonValue,
    raw: String,
    parsed: bool,
}

/// Authenticated Onsikku API client.
///
/// Every API call goes through [`fetch`](Self::fetch) (or
/// [`fetch_text`](Self::fetch_text)): sign, send, classify, renew and retry
/// once on an auth failure, then decode.
pub struct ApiClient<T, S> {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) transport: Arc<T>,
    pub(crate) storage: Arc<S>,
    pub(crate) session: Arc<Session>,
}

// Manual Clone: avoid derive adding `T: Clone, S: Clone` bounds.
impl<T, S> Clone for ApiClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            storage: self.storage.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T, S> std::fmt::Debug for ApiClient<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, S: TokenStorage> ApiClient<T, S> {
    #[must_use]
    pub fn new(config: ClientConfig, transport: T, storage: S, session: Arc<Session>) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            storage: Arc::new(storage),
            session,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Authenticated JSON call returning the unwrapped, decoded payload.
    ///
    /// # Errors
    ///
    /// - [`Error::Business`] for classified business failures.
    /// - [`Error::Auth`] if the call still fails authentication after one renewal.
    /// - [`Error::SessionExpired`] if renewal failed (the session is already torn down).
    /// - [`Error::Transport`]/[`Error::Http`] if no response was obtained.
    /// - [`Error::Decode`] if the payload does not match `R`.
    pub async fn fetch<R: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<R> {
        let delivered = self.execute(path, options).await?;
        if !delivered.parsed && !delivered.raw.trim().is_empty() {
            // Non-JSON body on a JSON endpoint; surface the parser's error.
            serde_json::from_str::<JsonValue>(&delivered.raw)?;
        }
        Ok(serde_json::from_value(delivered.payload)?)
    }

    /// Authenticated call returning the raw response text.
    ///
    /// Same signing, classification and renewal as [`fetch`](Self::fetch);
    /// the body is returned without envelope unwrapping.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), minus decoding.
    pub async fn fetch_text(&self, path: &str, options: RequestOptions) -> Result<String> {
        Ok(self.execute(path, options).await?.raw)
    }

    async fn execute(&self, path: &str, mut options: RequestOptions) -> Result<Delivered> {
        let url = self.config.endpoint(path);

        loop {
            // Signing reads the token store after any renewal has completed.
            let SignedHeaders {
                headers,
                generation,
            } = self.session.sign(options.headers.as_ref());

            tracing::debug!(
                method = %options.method,
                path,
                retried = options.retried,
                "API request"
            );

            let response = self
                .transport
                .send(HttpRequest {
                    method: options.method.clone(),
                    url: url.clone(),
                    headers,
                    body: options.body.clone(),
                })
                .await?;

            let body = parse_body(&response.body);
            match classify(response.status, body.as_ref(), &response.body) {
                Classification::Success(payload) => {
                    return Ok(Delivered {
                        payload,
                        parsed: body.is_some(),
                        raw: response.body,
                    });
                }
                Classification::BusinessError { status, message } => {
                    tracing::debug!(path, status, %message, "Business error");
                    return Err(Error::Business { status, message });
                }
                Classification::AuthError { message } if !options.retried => {
                    tracing::debug!(path, %message, "Auth failure, renewing session");
                    self.renew(generation).await?;
                    options.retried = true;
                }
                Classification::AuthError { message } => {
                    tracing::debug!(path, %message, "Auth failure after renewal");
                    return Err(Error::Auth { message });
                }
            }
        }
    }

    /// Unauthenticated JSON call with the same classification rules.
    ///
    /// Used by endpoints that mint tokens (refresh, signup, ticket exchange);
    /// an auth failure here never triggers renewal.
    pub(crate) async fn send_public(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<JsonValue> {
        let response = self.send_public_raw(method, path, body).await?;
        let parsed = parse_body(&response.body);
        match classify(response.status, parsed.as_ref(), &response.body) {
            Classification::Success(payload) => Ok(payload),
            Classification::BusinessError { status, message } => {
                Err(Error::Business { status, message })
            }
            Classification::AuthError { message } => Err(Error::Auth { message }),
        }
    }

    /// Unauthenticated call returning the response as-is.
    pub(crate) async fn send_public_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpResponse> {
        tracing::debug!(%method, path, "Public API request");
        self.transport
            .send(HttpRequest {
                method,
                url: self.config.endpoint(path),
                headers: Session::unsigned_headers(),
                body,
            })
            .await
    }

    /// Persist a freshly issued pair and activate its access token.
    ///
    /// Durable storage is written first; the in-memory token follows, so the
    /// two never disagree once this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a write fails; the in-memory token is
    /// then left unchanged.
    pub async fn activate(&self, pair: &TokenPair) -> Result<()> {
        if let Some(registration) = &pair.registration_token {
            self.storage
                .set(REGISTRATION_TOKEN_KEY, registration.as_str())
                .await
                .map_err(Error::storage)?;
        }
        if let Some(access) = &pair.access_token {
            self.storage
                .set(ACCESS_TOKEN_KEY, access.as_str())
                .await
                .map_err(Error::storage)?;
        }
        if let Some(refresh) = &pair.refresh_token {
            self.storage
                .set(REFRESH_TOKEN_KEY, refresh.as_str())
                .await
                .map_err(Error::storage)?;
        }
        if let Some(access) = &pair.access_token {
            self.session.set_access_token(Some(access.clone()));
        }
        Ok(())
    }

    /// Reload the access token from durable storage after a restart.
    ///
    /// Returns whether a token was found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the read fails.
    pub async fn restore_session(&self) -> Result<bool> {
        let token = self
            .storage
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(Error::storage)?
            .map(AccessToken);
        let found = token.is_some();
        if found {
            self.session.set_access_token(token);
        }
        Ok(found)
    }

    /// Drop every token, in memory and durable. Storage failures are logged.
    pub async fn clear_tokens(&self) {
        self.session.set_access_token(None);
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REGISTRATION_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(error = %e, key, "Token removal failed");
            }
        }
    }
}
