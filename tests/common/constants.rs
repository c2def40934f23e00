//! Shared constants for end-to-end tests
//!
//! When test data changes (tokens, user ids, seeded rows), update only this
//! file.

// ============================================================================
// Test Users
// ============================================================================

/// Bearer token accepted by the mock backend
pub const TEST_TOKEN: &str = "test-token-123";

/// Id of the logged-in test user
pub const TEST_USER_ID: i64 = 1;

/// Some other user, whose notifications must never reach the test user
pub const OTHER_USER_ID: i64 = 2;

// ============================================================================
// Seeded Notifications
// ============================================================================

/// Number of rows seeded by `TestServer::spawn_seeded()`
pub const SEEDED_COUNT: usize = 5;

/// Unread rows among the seeded ones
pub const SEEDED_UNREAD: usize = 2;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for a pushed event to show up (milliseconds)
pub const PUSH_TIMEOUT_MS: u64 = 3000;
