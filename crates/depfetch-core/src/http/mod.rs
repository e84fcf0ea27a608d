//! Streaming HTTP GET on top of libcurl.
//!
//! libcurl pushes data through callbacks; callers want a status code, the
//! headers, and a body they can pull in fixed-size chunks. Each request runs
//! on its own short-lived thread that forwards the final response's header
//! block through a one-shot channel and body data through a bounded channel.
//! The progress callback consults the cancellation token, so a transfer that
//! is stalled in a read is still aborted within about a second of a cancel.

mod body;
mod headers;

pub use headers::HeaderList;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Read;
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::config::HttpConfig;
use crate::error::FetchError;
use body::{BodyFrame, ChannelBody};
use headers::parse_status_line;

/// Body frames buffered between the transfer thread and the reader.
const BODY_QUEUE_FRAMES: usize = 16;

/// Final response of a request: status, headers, and the unbuffered body.
pub struct RemoteResponse {
    pub status: u32,
    pub headers: HeaderList,
    pub body: Box<dyn Read + Send>,
}

impl RemoteResponse {
    pub fn new(status: u32, headers: HeaderList, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for RemoteResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Transfer settings applied to every request.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        HttpOptions::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for HttpOptions {
    fn from(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            max_redirections: cfg.max_redirections,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Blocking HTTP client. Cheap to clone; holds no connection state.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    options: HttpOptions,
}

struct ResponseHead {
    status: u32,
    headers: HeaderList,
}

#[derive(Default)]
struct HeaderBlock {
    status: Option<u32>,
    /// Proxy answer to CONNECT; the origin's response follows.
    tunnel: bool,
    lines: Vec<String>,
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> Self {
        Self { options }
    }

    /// Sends a GET and returns once the final response's headers have arrived.
    ///
    /// Redirects and interim `1xx` responses are followed transparently. The
    /// body is streamed; dropping it aborts the transfer.
    pub fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, FetchError> {
        if cancel.is_signalled() {
            return Err(FetchError::Cancelled);
        }
        let (head_tx, head_rx) = mpsc::sync_channel(1);
        let (body_tx, body_rx) = mpsc::sync_channel(BODY_QUEUE_FRAMES);

        let url_owned = url.to_string();
        let headers_owned = headers.to_vec();
        let options = self.options.clone();
        let cancel_owned = cancel.clone();
        thread::Builder::new()
            .name("depfetch-http".into())
            .spawn(move || {
                run_transfer(
                    &url_owned,
                    &headers_owned,
                    &options,
                    &cancel_owned,
                    head_tx,
                    body_tx,
                )
            })
            .map_err(|e| FetchError::transport("spawn", e))?;

        let head = head_rx.recv().map_err(|_| {
            FetchError::transport("request", "transfer ended before response headers")
        })??;
        tracing::debug!(url, status = head.status, "response headers received");
        Ok(RemoteResponse {
            status: head.status,
            headers: head.headers,
            body: Box::new(ChannelBody::new(body_rx)),
        })
    }
}

/// Body of the transfer thread. Delivers exactly one head result, or body
/// frames ending in either a clean disconnect or a `Failed` frame.
fn run_transfer(
    url: &str,
    headers: &[(String, String)],
    options: &HttpOptions,
    cancel: &CancellationToken,
    head_tx: SyncSender<Result<ResponseHead, FetchError>>,
    body_tx: SyncSender<BodyFrame>,
) {
    let head_tx = RefCell::new(Some(head_tx));
    let block = RefCell::new(HeaderBlock::default());
    let reader_gone = Cell::new(false);

    let result = perform(
        url,
        headers,
        options,
        cancel,
        &head_tx,
        &block,
        &body_tx,
        &reader_gone,
    );

    match result {
        Ok(code) => {
            // Bodyless responses can finish without a write callback.
            if let Some(tx) = head_tx.borrow_mut().take() {
                let block = block.borrow();
                let _ = tx.send(Ok(ResponseHead {
                    status: block.status.unwrap_or(code),
                    headers: HeaderList::from_lines(&block.lines),
                }));
            }
        }
        Err(e) => {
            let err = if cancel.is_signalled() {
                FetchError::Cancelled
            } else {
                FetchError::transport("request", &e)
            };
            if let Some(tx) = head_tx.borrow_mut().take() {
                let _ = tx.send(Err(err));
            } else if !reader_gone.get() {
                tracing::debug!(url, error = %e, "transfer failed mid-body");
                let _ = body_tx.send(BodyFrame::Failed(err.to_string()));
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn perform(
    url: &str,
    headers: &[(String, String)],
    options: &HttpOptions,
    cancel: &CancellationToken,
    head_tx: &RefCell<Option<SyncSender<Result<ResponseHead, FetchError>>>>,
    block: &RefCell<HeaderBlock>,
    body_tx: &SyncSender<BodyFrame>,
    reader_gone: &Cell<bool>,
) -> Result<u32, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(options.max_redirections)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.low_speed_limit(options.low_speed_limit)?;
    easy.low_speed_time(options.low_speed_time)?;
    if let Some(agent) = &options.user_agent {
        easy.useragent(agent)?;
    }
    easy.progress(true)?;
    // Ignore proxy environment variables; transfers go straight to the host.
    easy.noproxy("*")?;

    if !headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (name, value) in headers {
            list.append(&format!("{}: {}", name.trim(), value.trim()))?;
        }
        easy.http_headers(list)?;
    }

    let send_head = || {
        if let Some(tx) = head_tx.borrow_mut().take() {
            let block = block.borrow();
            let _ = tx.send(Ok(ResponseHead {
                status: block.status.unwrap_or(0),
                headers: HeaderList::from_lines(&block.lines),
            }));
        }
    };

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            let text = String::from_utf8_lossy(data);
            let line = text.trim_end_matches(|c| c == '\r' || c == '\n');
            if let Some(status) = parse_status_line(line) {
                let mut block = block.borrow_mut();
                block.status = Some(status);
                block.tunnel = is_tunnel_established(line);
                block.lines.clear();
            } else if line.is_empty() {
                if !is_intermediate(&block.borrow()) {
                    send_head();
                }
            } else {
                block.borrow_mut().lines.push(line.to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            send_head();
            match body_tx.send(BodyFrame::Data(data.to_vec())) {
                Ok(()) => Ok(data.len()),
                Err(_) => {
                    // Reader dropped the body: abort the transfer.
                    reader_gone.set(true);
                    Ok(0)
                }
            }
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_signalled())?;
        transfer.perform()?;
    }

    easy.response_code()
}

/// Header blocks that libcurl follows up with another response.
fn is_intermediate(block: &HeaderBlock) -> bool {
    if block.tunnel {
        return true;
    }
    match block.status {
        Some(100..=199) => true,
        Some(300..=399) => block
            .lines
            .iter()
            .filter_map(|l| l.split_once(':'))
            .any(|(name, _)| name.trim().eq_ignore_ascii_case("location")),
        _ => false,
    }
}

/// `HTTP/1.1 200 Connection established`, as sent by proxies for CONNECT.
fn is_tunnel_established(status_line: &str) -> bool {
    let mut parts = status_line.splitn(3, ' ');
    let (_, code, reason) = (parts.next(), parts.next(), parts.next());
    matches!(code, Some(c) if c.starts_with('2'))
        && reason.is_some_and(|r| r.trim().eq_ignore_ascii_case("connection established"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(status: u32, lines: &[&str]) -> HeaderBlock {
        HeaderBlock {
            status: Some(status),
            tunnel: false,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn interim_and_redirect_blocks_are_skipped() {
        assert!(is_intermediate(&block(100, &[])));
        assert!(is_intermediate(&block(302, &["Location: /next"])));
        assert!(!is_intermediate(&block(304, &["ETag: x"])));
        assert!(!is_intermediate(&block(200, &["Location: /ignored"])));
        assert!(!is_intermediate(&block(416, &[])));
    }

    #[test]
    fn proxy_connect_block_is_skipped() {
        let mut tunnel = block(200, &[]);
        tunnel.tunnel = is_tunnel_established("HTTP/1.1 200 Connection established");
        assert!(is_intermediate(&tunnel));
        assert!(is_tunnel_established("HTTP/1.0 200 connection established"));
        assert!(!is_tunnel_established("HTTP/1.1 200 OK"));
        assert!(!is_tunnel_established("HTTP/1.1 206 Partial Content"));
        assert!(!is_intermediate(&block(206, &["Content-Length: 6144"])));
    }

    #[test]
    fn options_follow_config() {
        let cfg = HttpConfig {
            connect_timeout_secs: 5,
            low_speed_limit: 10,
            low_speed_time_secs: 7,
            max_redirections: 3,
            user_agent: Some("depfetch-test".into()),
        };
        let opts = HttpOptions::from(&cfg);
        assert_eq!(opts.connect_timeout, Duration::from_secs(5));
        assert_eq!(opts.low_speed_time, Duration::from_secs(7));
        assert_eq!(opts.max_redirections, 3);
        assert_eq!(opts.user_agent.as_deref(), Some("depfetch-test"));
    }

    #[test]
    fn signalled_token_prevents_request() {
        let token = CancellationToken::new();
        token.signal();
        let err = HttpClient::default()
            .get("http://127.0.0.1:9/never", &[], &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
