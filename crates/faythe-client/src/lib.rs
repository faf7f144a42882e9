//! Faythe API client.
//!
//! Provides an asynchronous client for the Faythe cloud-management API:
//! login and bearer-token refresh, plus one call per resource action for
//! clouds, scalers, healers, silences, users, policies and name resolvers.
//!
//! ```no_run
//! use faythe_client::{FaytheClient, ListFilter};
//!
//! # async fn run() -> faythe_client::Result<()> {
//! let client = FaytheClient::connect("faythe.example.com:8600", "admin", "secret").await?;
//! let clouds = client.list_clouds(None, &ListFilter::new().with_tags(["prod"])).await?;
//! println!("{clouds}");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod auth;
pub mod client;
pub mod models;

pub use auth::{Authenticator, PasswordAuthenticator, Token};
pub use client::{FaytheClient, FaytheClientBuilder};
pub use faythe_core::ids::{CloudId, HealerId, Identifier, Provider, ScalerId, SilenceId, Username};
pub use faythe_core::{Error, FaytheClientConfig};
pub use models::{
    Action, AutomationEngine, CloudAuth, CloudRegistration, HealerSpec, ListFilter,
    MonitorBackend, NewUser, Policy, ScalerSpec, SilenceSpec,
};

/// Convenient result alias that reuses the shared Faythe error type.
pub type Result<T> = faythe_core::Result<T>;
