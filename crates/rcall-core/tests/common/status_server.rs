//! Minimal HTTP/1.1 server for integration tests.
//!
//! Replies to each request with the next scripted (status, body) pair and
//! repeats the last one once the script runs out. Records the request heads.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone)]
pub struct StatusServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StatusServer {
    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Raw request heads in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. Returns its handle with the base
/// URL (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
pub fn start(script: Vec<(u16, &'static str)>) -> StatusServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let served = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let index = served.lock().unwrap().len();
            let (status, body) = script
                .get(index)
                .or_else(|| script.last())
                .copied()
                .unwrap_or((200, ""));
            handle(stream, status, body, &served);
        }
    });
    StatusServer {
        url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

/// Returns a URL on a port with nothing listening.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream, status: u16, body: &str, served: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let head = String::from_utf8_lossy(&buf[..n]).into_owned();
    served.lock().unwrap().push(head);

    let response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}
