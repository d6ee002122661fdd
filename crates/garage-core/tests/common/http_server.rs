//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of files by path, answers 404 for anything else and
//! counts GET requests per path. Can answer the first requests with 503
//! to exercise retries.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Hits = Arc<Mutex<HashMap<String, usize>>>;

pub struct TestServer {
    base_url: String,
    hits: Hits,
}

impl TestServer {
    /// Start serving `files` (name, body) in a background thread. The server
    /// runs until the process exits.
    pub fn start(files: Vec<(&str, Vec<u8>)>) -> Self {
        Self::start_flaky(files, 0)
    }

    /// Like `start`, but the first `failures` GET requests get a 503.
    pub fn start_flaky(files: Vec<(&str, Vec<u8>)>, failures: usize) -> Self {
        let failures = Arc::new(AtomicUsize::new(failures));
        let files: HashMap<String, Vec<u8>> = files
            .into_iter()
            .map(|(name, body)| (format!("/{}", name), body))
            .collect();
        let files = Arc::new(files);
        let hits: Hits = Arc::default();

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let served = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let files = Arc::clone(&files);
                let hits = Arc::clone(&served);
                let failures = Arc::clone(&failures);
                thread::spawn(move || handle(stream, &files, &hits, &failures));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}/", port),
            hits,
        }
    }

    /// Base URL ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }

    /// GET requests received for `name` so far.
    pub fn hits(&self, name: &str) -> usize {
        let hits = self.hits.lock().unwrap();
        hits.get(&format!("/{}", name)).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

fn handle(
    mut stream: TcpStream,
    files: &HashMap<String, Vec<u8>>,
    hits: &Hits,
    failures: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first = request.lines().next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    *hits.lock().unwrap().entry(path.to_string()).or_default() += 1;

    let failing = failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        let _ = stream.write_all(
            b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    match files.get(path) {
        Some(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    }
}
