use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

macro_rules! secret_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        // Token values stay out of logs.
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "(len={})"), self.0.len())
            }
        }
    };
}

secret_newtype!(
    /// Short-lived bearer credential attached to authenticated requests.
    AccessToken
);
secret_newtype!(
    /// Longer-lived credential exchanged for a new access token.
    RefreshToken
);
secret_newtype!(
    /// Credential for an identity that still has to finish local signup.
    RegistrationToken
);

/// Single-use code handed back through the deep link after a provider login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Ticket(pub String);

impl Ticket {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tokens issued by login, signup, refresh and ticket exchange.
///
/// Either `access_token` or `registration_token` is expected; an identity
/// holds a full session or is mid-registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct TokenPair {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub registration_token: Option<RegistrationToken>,
    pub is_account_registered: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenPayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    registration_token: Option<String>,
    #[serde(default)]
    is_registered: Option<bool>,
    #[serde(default)]
    registered: Option<bool>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<AccessToken>, refresh_token: impl Into<RefreshToken>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            registration_token: None,
            is_account_registered: true,
        }
    }

    /// Parse an unwrapped auth payload.
    ///
    /// The registered flag is read from `isRegistered`, then `registered`;
    /// empty token strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the payload is not an object of the expected shape.
    pub fn from_payload(payload: JsonValue) -> Result<Self, Error> {
        let raw: RawTokenPayload = if payload.is_null() {
            RawTokenPayload::default()
        } else {
            serde_json::from_value(payload)?
        };

        Ok(Self {
            access_token: non_empty(raw.access_token).map(AccessToken),
            refresh_token: non_empty(raw.refresh_token).map(RefreshToken),
            registration_token: non_empty(raw.registration_token).map(RegistrationToken),
            is_account_registered: raw.is_registered.or(raw.registered).unwrap_or(false),
        })
    }

    /// Whether the pair carries anything the app can continue with.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.access_token.is_some() || self.registration_token.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Screens the core navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    /// First step of the registration wizard.
    RoleSelection,
    Landing,
}
