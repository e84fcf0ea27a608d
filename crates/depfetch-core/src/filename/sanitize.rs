//! Local filename sanitization.

/// Linux `NAME_MAX`; also leaves room below it for the `.part` suffix.
const MAX_NAME_BYTES: usize = 250;

/// Makes a server-provided name safe to join onto a destination directory.
///
/// Path separators, NUL and control characters become `_` (runs collapse to
/// one), surrounding whitespace and dots are trimmed, and the result is cut
/// at a char boundary so `<name>.part` still fits in one path component.
/// Returns `None` if nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c == '\0' || c.is_control() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let mut end = trimmed.len().min(MAX_NAME_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    let result = trimmed[..end].trim_end();
    if result.is_empty() || result == "_" {
        None
    } else {
        Some(result.to_string())
    }
}
