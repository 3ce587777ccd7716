use std::net::TcpListener;

use wiremock::MockServer;

const STRICT_VAR: &str = "METAMASTER_REQUIRE_SOCKET_TESTS";

fn strict_mode() -> bool {
    std::env::var(STRICT_VAR)
        .is_ok_and(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a wiremock server, or returns `None` when loopback sockets are
/// unavailable (sandboxed CI). Panics instead when strict mode is set.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }

    let test = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();
    assert!(
        !strict_mode(),
        "{test}: loopback bind failed and {STRICT_VAR} demands socket tests run"
    );
    eprintln!("{test}: loopback bind failed, skipping mock-server test (set {STRICT_VAR}=1 to fail)");
    None
}
