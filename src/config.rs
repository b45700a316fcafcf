use url::Url;

use crate::error::Error;
use crate::types::Route;

const DEFAULT_BASE_URL: &str = "https://api.onsikku.xyz";
const DEFAULT_AUTH_SCHEME: &str = "onsikku://auth";
const KAKAO_AUTHORIZE_URL: &str = "https://kauth.kakao.com/oauth/authorize";

/// Onsikku API client configuration.
///
/// ```rust,ignore
/// use onsikku_client::ClientConfig;
///
/// let config = ClientConfig::new("https://staging.onsikku.xyz".parse()?)
///     .with_auth_scheme("onsikku-dev://auth");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) auth_scheme: String,
    pub(crate) routes: RouteTable,
    pub(crate) kakao: Option<KakaoConfig>,
    pub(crate) apple_login_url: Option<Url>,
}

/// Paths the core hands to the shell's navigator.
#[derive(Debug, Clone)]
pub(crate) struct RouteTable {
    pub(crate) home: String,
    pub(crate) role_selection: String,
    pub(crate) landing: String,
}

/// Kakao login settings.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct KakaoConfig {
    pub(crate) rest_api_key: String,
    pub(crate) redirect_uri: Url,
    pub(crate) authorize_url: Url,
}

impl KakaoConfig {
    #[must_use]
    pub fn new(rest_api_key: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            rest_api_key: rest_api_key.into(),
            redirect_uri,
            authorize_url: KAKAO_AUTHORIZE_URL.parse().expect("valid default URL"),
        }
    }

    /// Override the Kakao authorization endpoint.
    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    #[must_use]
    pub fn rest_api_key(&self) -> &str {
        &self.rest_api_key
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.parse().expect("valid default URL"))
    }
}

impl ClientConfig {
    /// Create a configuration for the given API base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            auth_scheme: DEFAULT_AUTH_SCHEME.into(),
            routes: RouteTable {
                home: "/home".into(),
                role_selection: "/signup/role".into(),
                landing: "/".into(),
            },
            kakao: None,
            apple_login_url: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Optional env vars
    /// - `ONSIKKU_API_BASE`: API base URL (empty or unset uses the production URL)
    /// - `ONSIKKU_AUTH_SCHEME`: deep-link prefix carrying login tickets
    /// - `KAKAO_REST_API_KEY` + `KAKAO_REDIRECT_URI`: enable Kakao login (both required)
    /// - `APPLE_LOGIN_URL`: browser fallback for Apple login
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a URL is invalid or only one Kakao variable is set.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(base) = env_non_empty("ONSIKKU_API_BASE") {
            let url: Url = base
                .parse()
                .map_err(|e| Error::Config(format!("ONSIKKU_API_BASE: {e}")))?;
            config = config.with_base_url(url);
        }
        if let Some(scheme) = env_non_empty("ONSIKKU_AUTH_SCHEME") {
            config = config.with_auth_scheme(scheme);
        }

        match (env_non_empty("KAKAO_REST_API_KEY"), env_non_empty("KAKAO_REDIRECT_URI")) {
            (Some(key), Some(redirect)) => {
                let redirect: Url = redirect
                    .parse()
                    .map_err(|e| Error::Config(format!("KAKAO_REDIRECT_URI: {e}")))?;
                config = config.with_kakao(KakaoConfig::new(key, redirect));
            }
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "KAKAO_REST_API_KEY and KAKAO_REDIRECT_URI must be set together".into(),
                ));
            }
        }

        if let Some(url) = env_non_empty("APPLE_LOGIN_URL") {
            let url: Url = url
                .parse()
                .map_err(|e| Error::Config(format!("APPLE_LOGIN_URL: {e}")))?;
            config = config.with_apple_login_url(url);
        }

        Ok(config)
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    /// Override the deep-link prefix (default: `onsikku://auth`).
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    /// Path for the home screen (default: `/home`).
    #[must_use]
    pub fn with_home_route(mut self, path: impl Into<String>) -> Self {
        self.routes.home = path.into();
        self
    }

    /// Path for the first registration step (default: `/signup/role`).
    #[must_use]
    pub fn with_role_selection_route(mut self, path: impl Into<String>) -> Self {
        self.routes.role_selection = path.into();
        self
    }

    /// Path for the landing screen shown after expiry or failed login (default: `/`).
    #[must_use]
    pub fn with_landing_route(mut self, path: impl Into<String>) -> Self {
        self.routes.landing = path.into();
        self
    }

    /// Enable Kakao login.
    #[must_use]
    pub fn with_kakao(mut self, kakao: KakaoConfig) -> Self {
        self.kakao = Some(kakao);
        self
    }

    /// Browser fallback for Apple login.
    ///
    /// Hosts open this URL in the system browser when native Sign in with
    /// Apple is unavailable; the backend then finishes the login with an
    /// auth deep link handled by [`TicketBridge`](crate::bridge::TicketBridge).
    #[must_use]
    pub fn with_apple_login_url(mut self, url: Url) -> Self {
        self.apple_login_url = Some(url);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn auth_scheme(&self) -> &str {
        &self.auth_scheme
    }

    #[must_use]
    pub fn kakao(&self) -> Option<&KakaoConfig> {
        self.kakao.as_ref()
    }

    /// Browser fallback for Apple login, if configured.
    #[must_use]
    pub fn apple_login_url(&self) -> Option<&Url> {
        self.apple_login_url.as_ref()
    }

    /// Path the navigator receives for `route`.
    #[must_use]
    pub fn route_path(&self, route: Route) -> &str {
        match route {
            Route::Home => &self.routes.home,
            Route::RoleSelection => &self.routes.role_selection,
            Route::Landing => &self.routes.landing,
        }
    }

    /// Absolute URL for an API path (which may carry a query string).
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
