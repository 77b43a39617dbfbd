#![allow(dead_code)]

use axum::extract::ConnectInfo;
use mail_tracker::{OpenEvent, Tracker, TrackerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tower::Layer;

pub const DOMAIN: &str = "localhost:8080";
pub const PATH: &str = "/pixel";

/// Tracker whose callback forwards every event into the returned receiver.
pub fn collecting_tracker(
    config: TrackerConfig,
) -> (Tracker, mpsc::UnboundedReceiver<OpenEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let tracker = Tracker::new(config, move |event: OpenEvent| {
        let _ = tx.send(event);
    })
    .unwrap();
    (tracker, rx)
}

pub fn default_config() -> TrackerConfig {
    TrackerConfig::new(8080, DOMAIN, PATH)
}

/// Request path of the tracking link for `id`.
pub fn pixel_path(tracker: &Tracker, id: &str) -> String {
    let link = tracker.generate_link(id);
    link.strip_prefix(&format!("http://{DOMAIN}"))
        .unwrap()
        .to_string()
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<OpenEvent>) -> OpenEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no open event within 2s")
        .expect("dispatch channel closed")
}

/// Waits briefly, then asserts nothing else was dispatched.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<OpenEvent>) {
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err(), "unexpected open event");
}

/// Sends a bare HTTP/1.1 request and returns the status code and body.
pub async fn raw_request(addr: SocketAddr, method: &str, path: &str) -> (u16, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nUser-Agent: raw-test/1.0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    let head_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("incomplete HTTP response");
    let head = String::from_utf8_lossy(&response[..head_end]);
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("missing status code");

    (status, response[head_end + 4..].to_vec())
}

pub async fn raw_get(addr: SocketAddr, path: &str) -> (u16, Vec<u8>) {
    raw_request(addr, "GET", path).await
}

/// One persistent HTTP/1.1 connection issuing requests back to back.
pub struct KeepAliveConnection {
    reader: BufReader<TcpStream>,
    host: SocketAddr,
}

impl KeepAliveConnection {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            reader: BufReader::new(stream),
            host: addr,
        }
    }

    /// Sends a GET and reads the full response before returning.
    pub async fn get(&mut self, path: &str) -> (u16, Vec<u8>) {
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {}\r\nUser-Agent: raw-test/1.0\r\n\r\n",
            self.host
        );
        self.reader
            .get_mut()
            .write_all(request.as_bytes())
            .await
            .unwrap();

        let mut status_line = String::new();
        self.reader.read_line(&mut status_line).await.unwrap();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("missing status code");

        let mut content_length = 0;
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut body = vec![0; content_length];
        self.reader.read_exact(&mut body).await.unwrap();
        (status, body)
    }
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "192.0.2.10:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
