use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;

use super::deep_link::{extract_ticket, matches_auth_scheme};
use super::shell::AppShell;
use crate::client::ApiClient;
use crate::error::Error;
use crate::storage::TokenStorage;
use crate::transport::Transport;
use crate::types::{Route, Ticket};

/// Last ticket taken up for exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTicket {
    pub ticket: Ticket,
    /// Set once the exchange succeeded.
    pub handled_at: Option<OffsetDateTime>,
}

/// Why a deep link produced no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not the auth deep link.
    ForeignUrl,
    /// Same ticket as the last one taken up; platforms may fire the event twice.
    DuplicateTicket,
    /// Another exchange is running.
    ExchangeInFlight,
}

/// Result of one deep-link delivery.
#[derive(Debug)]
pub enum BridgeOutcome {
    Ignored(IgnoreReason),
    Routed(Route),
    /// The error was already shown to the user.
    Failed(Error),
}

#[derive(Debug, Default)]
struct BridgeState {
    last_handled: Option<PendingTicket>,
    is_handling: bool,
}

/// Exchanges login tickets delivered by deep link, at most one at a time.
pub struct TicketBridge<T, S, H> {
    client: ApiClient<T, S>,
    shell: Arc<H>,
    state: Mutex<BridgeState>,
}

/// Clears `is_handling` on every exit path, including cancellation.
struct HandlingGuard<'a> {
    state: &'a Mutex<BridgeState>,
}

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().is_handling = false;
    }
}

impl<T: Transport, S: TokenStorage, H: AppShell> TicketBridge<T, S, H> {
    #[must_use]
    pub fn new(client: ApiClient<T, S>, shell: Arc<H>) -> Self {
        Self {
            client,
            shell,
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// Ticket most recently taken up, if it has not been released by a failure.
    #[must_use]
    pub fn last_handled(&self) -> Option<PendingTicket> {
        self.state.lock().last_handled.clone()
    }

    #[must_use]
    pub fn is_handling(&self) -> bool {
        self.state.lock().is_handling
    }

    /// React to a deep link opened by the native shell.
    ///
    /// Foreign URLs, repeated tickets and deliveries during another exchange
    /// are ignored without side effects. Failures are shown to the user,
    /// release the ticket for a retry and navigate to the landing route.
    pub async fn handle_deep_link(&self, url: &str) -> BridgeOutcome {
        if !matches_auth_scheme(url, self.client.config().auth_scheme()) {
            return BridgeOutcome::Ignored(IgnoreReason::ForeignUrl);
        }

        let Some(ticket) = extract_ticket(url) else {
            let error = Error::Ticket("deep link carried no ticket".into());
            tracing::warn!("Auth deep link without ticket");
            self.shell.show_error(&error.to_string());
            return BridgeOutcome::Failed(error);
        };

        let _handling = match self.begin(&ticket) {
            Ok(guard) => guard,
            Err(reason) => {
                tracing::debug!(?reason, "Deep link ignored");
                return BridgeOutcome::Ignored(reason);
            }
        };

        match self.exchange(&ticket).await {
            Ok(route) => {
                if let Some(pending) = self.state.lock().last_handled.as_mut() {
                    pending.handled_at = Some(OffsetDateTime::now_utc());
                }
                let path = self.client.config().route_path(route);
                tracing::info!(path, "Ticket exchange completed");
                self.shell.navigate(path, true);
                BridgeOutcome::Routed(route)
            }
            Err(error) => {
                tracing::error!(error = %error, "Ticket exchange failed");
                self.shell.show_error(&error.to_string());
                self.state.lock().last_handled = None;
                self.shell
                    .navigate(self.client.config().route_path(Route::Landing), true);
                BridgeOutcome::Failed(error)
            }
        }
    }

    fn begin(&self, ticket: &Ticket) -> Result<HandlingGuard<'_>, IgnoreReason> {
        let mut state = self.state.lock();
        if state
            .last_handled
            .as_ref()
            .is_some_and(|pending| &pending.ticket == ticket)
        {
            return Err(IgnoreReason::DuplicateTicket);
        }
        if state.is_handling {
            return Err(IgnoreReason::ExchangeInFlight);
        }

        state.last_handled = Some(PendingTicket {
            ticket: ticket.clone(),
            handled_at: None,
        });
        state.is_handling = true;
        Ok(HandlingGuard { state: &self.state })
    }

    async fn exchange(&self, ticket: &Ticket) -> Result<Route, Error> {
        if let Err(e) = self.shell.close_browser().await {
            tracing::warn!(error = %e, "Closing the login browser failed");
        }

        let pair = self.client.exchange_ticket(ticket).await?;
        self.client.complete_login(&pair).await
    }
}
