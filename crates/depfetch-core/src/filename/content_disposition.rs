//! `Content-Disposition` filename extraction.

/// Returns the filename announced by a `Content-Disposition` header value.
///
/// `filename*=charset'lang'value` (RFC 5987) wins over `filename=`; the plain
/// form may be quoted (with backslash escapes) or a bare token.
pub fn parse_content_disposition(header_value: &str) -> Option<String> {
    let mut plain = None;
    for (name, value) in params(header_value) {
        if name.eq_ignore_ascii_case("filename*") {
            if let Some(decoded) = decode_ext_value(value).filter(|s| !s.is_empty()) {
                return Some(decoded);
            }
        } else if name.eq_ignore_ascii_case("filename") {
            let value = unquote(value);
            if !value.is_empty() {
                plain = Some(value);
            }
        }
    }
    plain
}

/// `name=value` pairs after the disposition type. Splits on `;` outside quotes.
fn params(header_value: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let bytes = header_value.as_bytes();
    for i in 0..=bytes.len() {
        let at_end = i == bytes.len();
        if !at_end {
            let b = bytes[i];
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' if in_quotes => escaped = true,
                b'"' => in_quotes = !in_quotes,
                _ => {}
            }
            if b != b';' || in_quotes {
                continue;
            }
        }
        let part = header_value[start..i].trim();
        if let Some((name, value)) = part.split_once('=') {
            out.push((name.trim(), value.trim()));
        }
        start = i + 1;
    }
    out
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Decodes `charset'lang'pct-encoded`. Only UTF-8 and ISO-8859-1 are accepted.
fn decode_ext_value(value: &str) -> Option<String> {
    let value = value.trim_matches('"');
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    let bytes = percent_decode(encoded)?;
    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        None
    }
}

fn percent_decode(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}
