//! Shared test support: a minimal HTTP stub standing in for the update
//! server, and helpers for building installation fixtures.

// Each integration test binary compiles this module; not every binary uses
// every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned response for one route.
#[derive(Clone)]
pub enum StubResponse {
    /// 200 with a JSON body.
    Json(String),
    /// 200 with raw bytes and the given content type.
    Bytes(&'static str, Vec<u8>),
    /// An empty body with the given status code.
    Status(u16),
    /// 200 whose body dribbles out chunk by chunk, for cancellation tests.
    Slow {
        chunk: Vec<u8>,
        chunks: usize,
        delay: Duration,
    },
}

type Routes = Arc<Mutex<HashMap<String, StubResponse>>>;

/// A tiny HTTP/1.1 server serving canned responses on 127.0.0.1.
pub struct StubServer {
    addr: SocketAddr,
    routes: Routes,
}

impl StubServer {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server addr");
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let accept_routes = routes.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = accept_routes.clone();
                tokio::spawn(async move {
                    handle_connection(stream, routes).await;
                });
            }
        });

        Self { addr, routes }
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register (or replace) a route.
    pub fn route(&self, path: impl Into<String>, response: StubResponse) {
        self.routes.lock().unwrap().insert(path.into(), response);
    }
}

async fn handle_connection(mut stream: TcpStream, routes: Routes) {
    let Some(path) = read_request(&mut stream).await else {
        return;
    };

    let response = routes.lock().unwrap().get(&path).cloned();
    match response {
        Some(StubResponse::Json(body)) => {
            write_response(&mut stream, 200, "application/json", body.as_bytes()).await;
        }
        Some(StubResponse::Bytes(content_type, body)) => {
            write_response(&mut stream, 200, content_type, &body).await;
        }
        Some(StubResponse::Status(status)) => {
            write_response(&mut stream, status, "text/plain", b"").await;
        }
        Some(StubResponse::Slow { chunk, chunks, delay }) => {
            let total = chunk.len() * chunks;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
                 Content-Length: {total}\r\nConnection: close\r\n\r\n"
            );
            if stream.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for _ in 0..chunks {
                // The client may hang up mid-transfer (cancellation); that
                // is exactly what the test wants.
                if stream.write_all(&chunk).await.is_err() {
                    return;
                }
                let _ = stream.flush().await;
                tokio::time::sleep(delay).await;
            }
        }
        None => {
            write_response(&mut stream, 404, "text/plain", b"not found").await;
        }
    }
}

/// Read the request head (and any body indicated by Content-Length),
/// returning the request path.
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(8192);
    let mut scratch = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut scratch).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&scratch[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    // Drain the body so the client never sees a reset while still writing.
    let mut body_read = buf.len() - head_end;
    while body_read < content_length {
        let n = stream.read(&mut scratch).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    let path = head.lines().next()?.split_whitespace().nth(1)?.to_string();
    Some(path)
}

async fn write_response(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if stream.write_all(head.as_bytes()).await.is_ok() {
        let _ = stream.write_all(body).await;
        let _ = stream.flush().await;
    }
}

/// Build an install tree with the given version directories, each holding
/// the same file set.
pub fn build_install_tree(root: &Path, versions: &[&str], files: &[(&str, &[u8])]) {
    for version in versions {
        let dir = root.join(version);
        for (name, contents) in files {
            let path = dir.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, contents).unwrap();
        }
    }
}

/// Build a ZIP package holding the given entries.
pub fn build_zip_package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

/// SHA-256 of `data`, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
