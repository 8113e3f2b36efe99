//! # Daily Record Server
//!
//! A tiny static-file server for viewing the Daily Record app (`dr.html` and
//! its assets) without a build step. It serves the current working directory
//! over plain HTTP, reachable both from this machine and from other devices
//! on the same local network.
//!
//! Every response carries `Cache-Control: no-store`, so the browser always
//! picks up the latest edit on reload.
//!
//! ## Example
//!
//! ```no_run
//! use daily_record_server::serve;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     serve(8080).await
//! }
//! ```

use std::{
    error::Error,
    io::{self, Write},
    net::{SocketAddr, UdpSocket},
    num::ParseIntError,
};

use axum::{
    Router,
    http::{HeaderValue, header},
};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

/// Port used when none is given on the command line.
pub const DEFAULT_PORT: u16 = 8080;

/// Parses an optional port argument, defaulting to [`DEFAULT_PORT`].
///
/// # Errors
///
/// An argument that is not a valid port number (`abc`, `70000`) is an error:
/// better to fail at startup than to silently serve on a port the user did
/// not ask for.
pub fn parse_port(arg: Option<String>) -> Result<u16, ParseIntError> {
    arg.map_or(Ok(DEFAULT_PORT), |p| p.parse())
}

/// Returns the LAN-facing IP address of this machine, for display only.
///
/// Connecting a UDP socket to a public address lets the OS routing table pick
/// the outbound interface; no packet is ever sent. Falls back to `127.0.0.1`
/// when there is no usable route (offline, sandboxed), so the result is
/// always a printable address.
pub fn local_ip() -> String {
    outbound_ip().unwrap_or_else(|| "127.0.0.1".to_string())
}

fn outbound_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

/// Builds the router: static files from the current directory, with caching
/// disabled on every response.
///
/// The no-store layer wraps the whole router, so 404s and directory indexes
/// carry the header as well.
pub fn router() -> Router {
    Router::new()
        .fallback_service(ServeDir::new("."))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Binds a listener on `0.0.0.0:<port>` with `SO_REUSEADDR` enabled.
///
/// Reuse lets a quick restart claim the port while the previous socket is
/// still in `TIME_WAIT`. Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the port cannot be bound (privileged port, or held by
/// a live process).
pub fn bind(port: u16) -> io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    TcpListener::from_std(socket.into())
}

/// Starts the static file server and runs it until Ctrl+C.
///
/// Prints the loopback and network URLs before entering the serving loop.
/// An interrupt is the normal way to stop: the loop exits cleanly and this
/// returns `Ok(())`.
///
/// # Arguments
///
/// * `port` - The port to listen on
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub async fn serve(port: u16) -> Result<(), Box<dyn Error>> {
    let app = router();
    let listener = bind(port)?;

    print_banner(port, &local_ip());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn print_banner(port: u16, ip: &str) {
    println!();
    println!("  Daily Record – local server");
    println!();
    println!("  Local:   http://localhost:{port}/");
    println!("  Network: http://{ip}:{port}/");
    println!();
    println!("  Stop with Ctrl+C");
    println!();
    let _ = io::stdout().flush();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No Ctrl+C handler available: park forever, the process can still
        // be killed externally.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[test]
    fn test_parse_port_default() {
        assert_eq!(parse_port(None).unwrap(), 8080);
    }

    #[test]
    fn test_parse_port_explicit() {
        assert_eq!(parse_port(Some("9090".to_string())).unwrap(), 9090);
    }

    #[test]
    fn test_parse_port_rejects_garbage() {
        assert!(parse_port(Some("not-a-port".to_string())).is_err());
    }

    #[test]
    fn test_parse_port_rejects_out_of_range() {
        assert!(parse_port(Some("70000".to_string())).is_err());
    }

    #[test]
    fn test_local_ip_is_always_an_address() {
        let ip = local_ip();
        assert!(!ip.is_empty());
        assert!(ip.parse::<std::net::IpAddr>().is_ok());
    }

    #[tokio::test]
    async fn test_existing_file_served_with_no_store() {
        // cargo runs tests from the package root, so Cargo.toml is a file
        // the ServeDir root is guaranteed to contain.
        let response = router()
            .oneshot(Request::get("/Cargo.toml").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let on_disk = std::fs::read("Cargo.toml").unwrap();
        assert_eq!(body.as_ref(), on_disk.as_slice());
    }

    #[tokio::test]
    async fn test_missing_file_is_404_with_no_store() {
        let response = router()
            .oneshot(
                Request::get("/no-such-file.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }

    #[tokio::test]
    async fn test_rebind_same_port_after_close() {
        let first = bind(0).unwrap();
        let port = first.local_addr().unwrap().port();
        drop(first);

        let second = bind(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }
}
