//! Concurrency gate behaviour under more clients than slots.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn gate_bounds_active_handlers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "hi").unwrap();
    let server = common::start_file_server(dir.path(), Some(3)).await;
    let gate = server.gate.clone().unwrap();

    // Connect without sending anything; only three can hold a handler.
    let mut clients = Vec::new();
    for _ in 0..8 {
        clients.push(TcpStream::connect(server.addr).await.unwrap());
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(gate.in_use(), 3);
    assert_eq!(server.tracker.active_count(), 3);

    let mut tasks = Vec::new();
    for mut client in clients {
        tasks.push(tokio::spawn(async move {
            client.write_all(b"GET /index.html HTTP/1.1\r\n\r\n").await.unwrap();
            client.shutdown().await.unwrap();
            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        }));
    }

    for task in tasks {
        let out = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .expect("client was never served")
            .unwrap();
        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\nhi".to_vec());
    }

    assert!(gate.peak() <= 3);
    assert_eq!(gate.peak(), 3);
}

#[tokio::test]
async fn slow_upload_holds_its_slot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "hi").unwrap();
    let server = common::start_file_server(dir.path(), Some(1)).await;
    let gate = server.gate.clone().unwrap();

    let mut uploader = TcpStream::connect(server.addr).await.unwrap();
    uploader
        .write_all(b"POST /slow.txt HTTP/1.1\r\nContent-Length: 6\r\n\r\nabc")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gate.available(), 0);

    // Queued behind the upload.
    let reader = tokio::spawn(common::send_raw(server.addr, b"GET /index.html HTTP/1.1\r\n\r\n"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!reader.is_finished());

    uploader.write_all(b"def").await.unwrap();
    uploader.shutdown().await.unwrap();
    let mut out = Vec::new();
    uploader.read_to_end(&mut out).await.unwrap();
    assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(std::fs::read(dir.path().join("slow.txt")).unwrap(), b"abcdef");

    let out = tokio::time::timeout(Duration::from_secs(5), reader).await.unwrap().unwrap();
    assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn proxy_is_ungated_by_default() {
    let proxy = common::start_proxy().await;
    assert!(proxy.gate.is_none());

    let mut idle = Vec::new();
    for _ in 0..20 {
        idle.push(TcpStream::connect(proxy.addr).await.unwrap());
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(proxy.tracker.active_count(), 20);
}
