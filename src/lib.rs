#![doc = include_str!("../README.md")]

pub mod api;
pub mod bridge;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod login;
pub mod models;
pub mod nonce;
mod renewal;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-exports for convenient access
pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, KakaoConfig};
pub use error::{BoxError, Error, Result};
pub use login::{AppleAuthorization, AppleCredential, KakaoAuthorization, kakao_authorization_url};
pub use session::{Session, SessionState, Subscription};
pub use storage::{MemoryStorage, TokenStorage};
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
pub use transport::{HttpRequest, HttpResponse, Transport};
pub use types::{AccessToken, RefreshToken, RegistrationToken, Route, Ticket, TokenPair};
