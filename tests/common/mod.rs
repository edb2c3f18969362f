//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ai_worker_breaker::resilience::{BreakerRegistry, ManualClock};
use ai_worker_breaker::BreakerConfig;

/// Registry on a manual clock starting at t=0.
#[allow(dead_code)]
pub fn manual_registry(defaults: BreakerConfig) -> (BreakerRegistry, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let registry = BreakerRegistry::new(defaults).with_clock(clock.clone());
    (registry, clock)
}

/// Start a mock AI worker whose response is decided per request by `f`.
///
/// Binds an ephemeral port and returns its address.
#[allow(dead_code)]
pub async fn start_programmable_worker<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}
