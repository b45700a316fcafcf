//! Deep-link bridge for social login on native shells.
//!
//! The backend finishes a provider login in the system browser and redirects
//! to `onsikku://auth?ticket=...`. The shell forwards that URL to
//! [`TicketBridge::handle_deep_link`], which exchanges the ticket for tokens
//! and routes the app.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use onsikku_client::bridge::{TicketBridge, redirect_on_expiry};
//!
//! // 1. Implement AppShell for your native shell
//! // 2. Build the bridge around the shared client
//! let bridge = TicketBridge::new(client.clone(), shell.clone());
//!
//! // 3. Send users to the landing screen when the session expires
//! let _expiry = redirect_on_expiry(&client, shell);
//!
//! // 4. Forward deep links
//! bridge.handle_deep_link(&event.url).await;
//! ```

mod deep_link;
mod shell;
mod ticket;

pub use deep_link::{extract_ticket, matches_auth_scheme};
pub use shell::{AppShell, redirect_on_expiry};
pub use ticket::{BridgeOutcome, IgnoreReason, PendingTicket, TicketBridge};
