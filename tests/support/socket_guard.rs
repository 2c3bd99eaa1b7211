//! Skips wiremock tests on hosts that forbid binding localhost sockets.
//!
//! Set `LINKFETCH_REQUIRE_SOCKET_TESTS=1` (CI) to turn a skip into a panic.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "LINKFETCH_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_ENV).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )
    })
}

/// Starts a mock server, or returns `None` after reporting why the calling
/// test is being skipped.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = Location::caller();
    let can_bind = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if can_bind {
            return Some(MockServer::start().await);
        }
        let message = format!(
            "cannot bind a localhost socket for the mock server ({}:{})",
            caller.file(),
            caller.line()
        );
        assert!(!sockets_required(), "{message}; unset {REQUIRE_ENV} to skip instead");
        eprintln!("skipping: {message}; set {REQUIRE_ENV}=1 to fail instead");
        None
    }
}

/// Value returned by a skipped test.
pub fn socket_skip_return() {}
