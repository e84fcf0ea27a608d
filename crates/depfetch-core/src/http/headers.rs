//! Response header collection.

/// Ordered response headers. Lookups are case-insensitive; repeated headers
/// (e.g. `Set-Cookie`) are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")?.trim().parse().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses raw `Name: value` lines, skipping anything without a colon.
    pub(crate) fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut list = Self::new();
        for line in lines {
            if let Some((name, value)) = line.as_ref().split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    list.push(name, value.trim());
                }
            }
        }
        list
    }
}

/// Status code from an HTTP status line (`HTTP/1.1 206 Partial Content`, `HTTP/2 200`).
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
