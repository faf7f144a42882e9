//! # faythe-core
//!
//! Core types and utilities for talking to the Faythe cloud-management API.
//!
//! This crate provides the error taxonomy, the HTTP transport, client
//! configuration and request path construction used by `faythe-client`.
//!
//! ## Modules
//!
//! - [`error`] - Error types and transport failure mapping
//! - [`client`] - HTTP session, request dispatch and response handling
//! - [`config`] - Endpoint, credential and TLS configuration
//! - [`query`] - Request path and query string construction
//! - [`ids`] - Strongly-typed resource identifiers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod ids;
pub mod query;

// Re-export commonly used types
pub use client::{HttpClient, HttpClientBuilder};
pub use config::FaytheClientConfig;
pub use error::{Error, Result};
