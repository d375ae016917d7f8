//! # sunsink-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **liveness endpoint** (`GET /health`) used by container
//!   orchestrators and uptime checks
//! - Trace every request through `tower-http`
//! - Stop accepting connections when the shared shutdown token fires
//!
//! The endpoint is stateless: it reports that the process is up
//! and its runtime responsive, not how the control loop is doing.
//!
//! ## Dependency rule
//! Shares nothing with the control loop. Never leaks axum types into the
//! domain.

pub mod router;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serve the router on `listener` until `shutdown` fires.
///
/// Binding happens in the caller so that a port conflict fails startup
/// before the control loop begins.
///
/// # Errors
///
/// Returns an I/O error if the listener fails while serving.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "liveness endpoint listening");
    axum::serve(listener, router::build())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("liveness endpoint stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn should_answer_over_tcp_and_stop_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, shutdown.clone()));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
