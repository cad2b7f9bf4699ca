use crate::scan::is_escapable;

/// Normalises a reference-link identifier: backslash escapes are decoded,
/// ASCII letters lowered, and every whitespace run collapses to one space.
/// Definition and use sites both go through here, so lookup is symmetric.
pub(crate) fn normalize_link_id(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_uppercase() {
            out.push(b.to_ascii_lowercase());
            i += 1;
        } else if b == b'\\' && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) {
            out.push(bytes[i + 1]);
            i += 2;
        } else if matches!(b, b' ' | b'\t' | b'\n') {
            while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n') {
                i += 1;
            }
            out.push(b' ');
        } else {
            out.push(b);
            i += 1;
        }
    }
    match String::from_utf8(out) {
        Ok(value) => value,
        Err(err) => String::from_utf8_lossy(&err.into_bytes()).to_string(),
    }
}

/// Decodes `\c` pairs for the characters the dialect lets backslash protect;
/// any other backslash stays put.
pub(crate) fn unescape_backslash(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) {
            out.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(value) => value,
        Err(err) => String::from_utf8_lossy(&err.into_bytes()).to_string(),
    }
}
