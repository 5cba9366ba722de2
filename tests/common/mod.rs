//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use bare_http::config::ServiceConfig;
use bare_http::files::{FileServer, ResourceStore};
use bare_http::http::{HttpServer, Service};
use bare_http::lifecycle::Shutdown;
use bare_http::net::{ConnectionGate, ConnectionTracker, Listener, ListenerError};
use bare_http::proxy::ForwardProxy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A service running on an ephemeral local port.
pub struct RunningService {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub gate: Option<ConnectionGate>,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

/// Config bound to 127.0.0.1 on an ephemeral port.
pub fn local_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

pub async fn start_service<S: Service>(service: S, config: ServiceConfig) -> RunningService {
    let inner = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let listener = Listener::new(inner, config.listener.max_clients);
    let addr = listener.local_addr().unwrap();
    let gate = listener.gate().cloned();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(service, config);
    let tracker = server.tracker();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningService {
        addr,
        shutdown,
        tracker,
        gate,
        handle,
    }
}

/// Start the file server rooted at `root`.
pub async fn start_file_server(root: &Path, max_clients: Option<usize>) -> RunningService {
    let mut config = local_config();
    config.files.root = root.to_path_buf();
    config.listener.max_clients = max_clients;

    let store = ResourceStore::new(&config.files).unwrap();
    start_service(FileServer::new(store), config).await
}

pub async fn start_proxy() -> RunningService {
    let config = local_config();
    start_service(ForwardProxy::new(config.timeouts), config).await
}

/// Send `request`, half-close, and read everything until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

/// Start a raw upstream that answers every connection with `response`.
///
/// The request head each connection sent is delivered on the returned
/// channel.
pub async fn start_raw_backend(response: &'static [u8]) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let _ = tx.send(head);
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// An address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
