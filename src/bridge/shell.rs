use std::future::Future;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::BoxError;
use crate::session::Subscription;
use crate::storage::TokenStorage;
use crate::transport::Transport;
use crate::types::Route;

/// Native shell services the core drives.
///
/// # Example
///
/// ```rust,ignore
/// impl AppShell for CapacitorShell {
///     fn navigate(&self, path: &str, replace: bool) {
///         self.router.go_to(path, replace);
///     }
///
///     async fn close_browser(&self) -> Result<(), BoxError> {
///         self.browser.close().await.map_err(Into::into)
///     }
///
///     fn show_error(&self, message: &str) {
///         self.dialogs.alert(message);
///     }
/// }
/// ```
pub trait AppShell: Send + Sync + 'static {
    /// Go to an app route; `replace` drops the current history entry.
    fn navigate(&self, path: &str, replace: bool);

    /// Close the external browser used for provider login. Best effort.
    fn close_browser(&self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Show a user-visible error.
    fn show_error(&self, message: &str);
}

/// Navigate to the landing route (replacing history) whenever the session expires.
pub fn redirect_on_expiry<T, S, H>(client: &ApiClient<T, S>, shell: Arc<H>) -> Subscription
where
    T: Transport,
    S: TokenStorage,
    H: AppShell,
{
    let landing = client.config().route_path(Route::Landing).to_owned();
    client.session().subscribe_expired(move || {
        shell.navigate(&landing, true);
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value as JsonValue, json};

    use super::*;
    use crate::client::RequestOptions;
    use crate::storage::{ACCESS_TOKEN_KEY, MemoryStorage};
    use crate::testutil::{RecordingShell, ScriptedTransport, ShellEvent, reply, test_client};

    async fn client_without_refresh_token() -> ApiClient<ScriptedTransport, MemoryStorage> {
        let storage = MemoryStorage::new();
        storage.set(ACCESS_TOKEN_KEY, "a1").await.unwrap();
        let transport = ScriptedTransport::new(|_| Ok(reply(401, json!({}))));
        let client = test_client(transport, storage);
        client.restore_session().await.unwrap();
        client
    }

    #[tokio::test]
    async fn expiry_navigates_to_landing_with_replace() {
        let client = client_without_refresh_token().await;
        let shell = Arc::new(RecordingShell::new());
        let _expiry = redirect_on_expiry(&client, shell.clone());

        let err = client
            .fetch::<JsonValue>("/api/members/mypage", RequestOptions::get())
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(
            shell.events(),
            vec![ShellEvent::Navigate {
                path: "/".into(),
                replace: true
            }]
        );
    }

    #[tokio::test]
    async fn dropped_subscription_stops_navigation() {
        let client = client_without_refresh_token().await;
        let shell = Arc::new(RecordingShell::new());
        let expiry = redirect_on_expiry(&client, shell.clone());
        drop(expiry);

        client
            .fetch::<JsonValue>("/api/members/mypage", RequestOptions::get())
            .await
            .unwrap_err();

        assert!(shell.events().is_empty());
    }

    #[tokio::test]
    async fn custom_landing_route_is_used() {
        let storage = MemoryStorage::new();
        storage.set(ACCESS_TOKEN_KEY, "a1").await.unwrap();
        let client = ApiClient::new(
            crate::testutil::test_config().with_landing_route("/login"),
            ScriptedTransport::new(|_| Ok(reply(401, json!({})))),
            storage,
            Arc::new(crate::session::Session::new()),
        );
        client.restore_session().await.unwrap();
        let shell = Arc::new(RecordingShell::new());
        let _expiry = redirect_on_expiry(&client, shell.clone());

        client
            .fetch::<JsonValue>("/api/questions", RequestOptions::get())
            .await
            .unwrap_err();

        assert_eq!(shell.navigations(), vec!["/login".to_string()]);
    }
}
