//! Minimal HTTP/1.1 server imitating a file host's download endpoint.
//!
//! Files are looked up by the `id` query parameter. Supports `Range: bytes=N-`
//! (206 / 416), `Content-Disposition` filenames, the confirmation cookie
//! handshake, and bodies that stall after a number of bytes.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ServedFile {
    pub body: Vec<u8>,
    /// Sent as `Content-Disposition: attachment; filename="..."`.
    pub filename: Option<String>,
    /// When set, the file is only served with `confirm=<token>` and the
    /// matching cookie; other requests get the warning page and the cookie.
    pub confirm_token: Option<String>,
    /// Send this many body bytes, then hold the connection open without data.
    pub stall_after: Option<usize>,
}

impl ServedFile {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }
}

/// One request as seen by the server.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub id: Option<String>,
    pub confirm: Option<String>,
    pub range: Option<String>,
    pub cookie: Option<String>,
    pub connection: Option<String>,
}

pub struct DriveServer {
    /// Endpoint URL with the `export=download` query, like the real one.
    pub endpoint: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl DriveServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

const COOKIE_NAME: &str = "download_warning_13058876669334088843_1aln";

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(files: Vec<(&str, ServedFile)>) -> DriveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<HashMap<String, ServedFile>> = Arc::new(
        files
            .into_iter()
            .map(|(id, f)| (id.to_string(), f))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &files, &log));
        }
    });
    DriveServer {
        endpoint: format!("http://127.0.0.1:{port}/uc?export=download"),
        requests,
    }
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, files: &HashMap<String, ServedFile>, log: &Mutex<Vec<Recorded>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(head) = read_head(&mut stream) else {
        return;
    };
    let request = parse_request(&head);
    log.lock().unwrap().push(request.clone());

    let Some(file) = request.id.as_deref().and_then(|id| files.get(id)) else {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    };

    if let Some(token) = &file.confirm_token {
        let cookie_ok = request
            .cookie
            .as_deref()
            .is_some_and(|c| c.contains(&format!("{COOKIE_NAME}={token}")));
        if request.confirm.as_deref() != Some(token.as_str()) || !cookie_ok {
            let page = b"<html>Google Drive can't scan this file for viruses.</html>";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
Set-Cookie: NID=511=abc; Path=/\r\n\
Set-Cookie: {COOKIE_NAME}={token}; Domain=127.0.0.1; Path=/uc; Secure; HttpOnly\r\n\
Content-Length: {}\r\nConnection: close\r\n\r\n",
                page.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(page);
            return;
        }
    }

    let total = file.body.len();
    let offset = request
        .range
        .as_deref()
        .and_then(|r| r.trim().strip_prefix("bytes="))
        .and_then(|r| r.strip_suffix('-'))
        .and_then(|n| n.trim().parse::<usize>().ok());
    let (status, extra, slice) = match offset {
        Some(start) if start >= total => (
            "416 Range Not Satisfiable",
            format!("Content-Range: bytes */{total}\r\n"),
            &file.body[0..0],
        ),
        Some(start) => (
            "206 Partial Content",
            format!("Content-Range: bytes {start}-{}/{total}\r\n", total - 1),
            &file.body[start..],
        ),
        None => ("200 OK", String::new(), &file.body[..]),
    };
    let disposition = file
        .filename
        .as_ref()
        .map(|f| format!("Content-Disposition: attachment; filename=\"{f}\"\r\n"))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/octet-stream\r\n\
Content-Length: {}\r\n{extra}{disposition}Connection: close\r\n\r\n",
        slice.len()
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }

    match file.stall_after {
        Some(n) if n < slice.len() => {
            let _ = stream.write_all(&slice[..n]);
            let _ = stream.flush();
            // Hold the connection until the client gives up.
            let mut probe = [0u8; 1];
            let _ = stream.set_read_timeout(Some(Duration::from_secs(30)));
            let _ = stream.read(&mut probe);
        }
        _ => {
            let _ = stream.write_all(slice);
        }
    }
}

fn parse_request(head: &str) -> Recorded {
    let mut recorded = Recorded::default();
    let mut lines = head.lines();
    let target = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("");
    if let Some((_, query)) = target.split_once('?') {
        for pair in query.split('&') {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            match k {
                "id" => recorded.id = Some(v.to_string()),
                "confirm" => recorded.confirm = Some(v.to_string()),
                _ => {}
            }
        }
    }
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = Some(value.trim().to_string());
        match name.trim().to_ascii_lowercase().as_str() {
            "range" => recorded.range = value,
            "cookie" => recorded.cookie = value,
            "connection" => recorded.connection = value,
            _ => {}
        }
    }
    recorded
}
