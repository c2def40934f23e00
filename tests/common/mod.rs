//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_session_loads_page() {
//!     let server = TestServer::spawn_seeded().await;
//!     let client = TestClient::new(&server.base_url, &server.ws_url());
//!
//!     let session = client.start_session().await;
//!     server.wait_for_push_clients(1).await;
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{malformed_notification_json, notification_json, seeded_notifications};
pub use server::TestServer;
