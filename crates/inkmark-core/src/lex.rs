use crate::label::normalize_link_id;
use crate::refdict::RefDict;
use crate::scan::{
    count_run, eat, find, is_block_tag, is_graph, is_print, is_space, is_white, rskip_while,
    scan_html_tag, scan_quoted, skip_at_most, skip_while,
};
use crate::token::{Token, TokenKind};

/// Pass 1: one front-to-back scan of the buffer. Fenced code, raw hypertext
/// blocks, and reference definitions are carved out first; everything else
/// becomes one token per physical line, `Blank` or `Line`.
pub(crate) fn split_lines(src: &str, dict: &mut RefDict) -> Vec<Token> {
    let bytes = src.as_bytes();
    let end = bytes.len();
    let mut output = Vec::new();
    let mut pos = 0usize;
    while pos < end {
        if let Some(next) = parse_fenced_code(bytes, pos, end, &mut output) {
            pos = next;
            continue;
        }
        if let Some(next) = parse_html_block(src, pos, end, &mut output) {
            pos = next;
            continue;
        }
        if let Some(next) = parse_ref_def(src, pos, end, dict) {
            pos = next;
            continue;
        }
        let p2 = skip_while(bytes, pos, end, is_space);
        let p3 = skip_while(bytes, p2, end, is_print);
        let p4 = eat(bytes, p3, end, b'\n').unwrap_or(p3);
        if p4 == pos {
            // A byte outside the printable set; a one-byte line token keeps
            // the scan moving and downstream passes treat it as plain text.
            let mut next = pos + 1;
            while next < end && !src.is_char_boundary(next) {
                next += 1;
            }
            output.push(Token::new(TokenKind::Line, pos, next));
            pos = next;
            continue;
        }
        if p2 == p3 {
            output.push(Token::new(TokenKind::Blank, p3, p4));
        } else {
            output.push(Token::new(TokenKind::Line, pos, p4));
        }
        pos = p4;
    }
    output
}

/// Both fenced code and hypertext blocks only open when the two preceding
/// bytes are newlines, i.e. after an empty line or at the buffer start.
fn at_block_boundary(bytes: &[u8], pos: usize) -> bool {
    (pos < 2 || bytes[pos - 2] == b'\n') && (pos < 1 || bytes[pos - 1] == b'\n')
}

/// A block ends at a blank-line boundary: optional spaces, newline, then a
/// blank line or end of input. Returns the offset just past the first
/// newline; the blank line itself stays in the stream.
fn check_blockend(bytes: &[u8], pos: usize, end: usize) -> Option<usize> {
    let p1 = skip_while(bytes, pos, end, is_space);
    let p2 = eat(bytes, p1, end, b'\n').unwrap_or(p1);
    let p3 = skip_while(bytes, p2, end, is_space);
    let p4 = eat(bytes, p3, end, b'\n').unwrap_or(p3);
    if p4 >= end || (p1 < p2 && p3 < p4) {
        Some(p2)
    } else {
        None
    }
}

fn parse_fenced_code(
    bytes: &[u8],
    pos: usize,
    end: usize,
    output: &mut Vec<Token>,
) -> Option<usize> {
    if !at_block_boundary(bytes, pos) {
        return None;
    }
    if count_run(bytes, pos, end, b'`') < 3 {
        return None;
    }
    let p1 = pos + 3;
    // Info string up to the newline; parsed, discarded.
    let p2 = skip_while(bytes, p1, end, is_print);
    let p3 = eat(bytes, p2, end, b'\n')?;
    let mut search_from = p3;
    loop {
        let p4 = find(bytes, search_from, end, b"\n```")?;
        let after = p4 + 4;
        if let Some(next) = check_blockend(bytes, after, end) {
            output.push(Token::new(TokenKind::PreBegin, p1, p2));
            output.push(Token::new(TokenKind::Code, p3, p4));
            output.push(Token::new(TokenKind::PreEnd, p4, p4));
            return Some(next);
        }
        search_from = after;
    }
}

fn parse_html_block(src: &str, pos: usize, end: usize, output: &mut Vec<Token>) -> Option<usize> {
    let bytes = src.as_bytes();
    if !at_block_boundary(bytes, pos) {
        return None;
    }
    let tag = scan_html_tag(bytes, pos, end)?;
    let name = tag.name.slice(src);
    if !(tag.comment || is_block_tag(name)) {
        return None;
    }
    if tag.comment || name == "hr" || tag.self_closing {
        let next = check_blockend(bytes, tag.end, end)?;
        output.push(Token::new(TokenKind::Html, pos, next));
        return Some(next);
    }
    let pat = format!("</{}", name);
    let mut p1 = tag.end;
    while p1 < end {
        let p2 = find(bytes, p1, end, pat.as_bytes())?;
        let p3 = skip_while(bytes, p2 + pat.len(), end, is_white);
        let after = eat(bytes, p3, end, b'>')?;
        if let Some(next) = check_blockend(bytes, after, end) {
            output.push(Token::new(TokenKind::Html, pos, next));
            return Some(next);
        }
        p1 = after;
    }
    None
}

fn parse_ref_def(src: &str, pos: usize, end: usize, dict: &mut RefDict) -> Option<usize> {
    let bytes = src.as_bytes();
    let (id, p1) = scan_refdef_id(src, pos, end)?;
    // Identifiers opening with a caret are reserved.
    if id.starts_with('^') {
        return None;
    }
    let (uri, p2) = scan_refdef_uri(src, p1, end)?;
    let (title, p3) = match scan_refdef_title(src, p2, end) {
        Some((title, next)) => (title, next),
        None => (String::new(), p2),
    };
    let p4 = skip_while(bytes, p3, end, is_space);
    let p5 = eat(bytes, p4, end, b'\n').unwrap_or(p4);
    if p5 < end && p4 == p5 {
        return None;
    }
    dict.insert(id, uri, title);
    Some(p5)
}

fn scan_refdef_id(src: &str, pos: usize, end: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let p1 = skip_at_most(bytes, pos, end, 3, b' ');
    let p2 = scan_quoted(bytes, p1, end, b'[', b']', is_print)?;
    if bytes[p1 + 1] == b']' {
        return None;
    }
    let p3 = eat(bytes, p2, end, b':')?;
    let p4 = skip_while(bytes, p3, end, is_space);
    if p4 == p3 {
        return None;
    }
    Some((normalize_link_id(&src[p1 + 1..p2 - 1]), p4))
}

fn scan_refdef_uri(src: &str, pos: usize, end: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if let Some(p3) = scan_quoted(bytes, pos, end, b'<', b'>', is_print) {
        if pos + 1 >= p3 - 1 {
            return None;
        }
        return Some((src[pos + 1..p3 - 1].to_string(), p3));
    }
    let p3 = skip_while(bytes, pos, end, is_graph);
    if pos >= p3 {
        return None;
    }
    Some((src[pos..p3].to_string(), p3))
}

/// Title may sit on the same line or alone on the next; it runs to the end
/// of its line and is delimited by `"…"`, `'…'`, backticks, or `(…)`.
fn scan_refdef_title(src: &str, pos: usize, end: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let p1 = skip_while(bytes, pos, end, is_space);
    let p2 = match eat(bytes, p1, end, b'\n') {
        Some(p) => skip_while(bytes, p, end, is_space),
        None => p1,
    };
    if !(pos < p2 && p2 < end) {
        return None;
    }
    let open = bytes[p2];
    if !matches!(open, b'"' | b'\'' | b'`' | b'(') {
        return None;
    }
    let close = if open == b'(' { b')' } else { open };
    let p4 = skip_while(bytes, p2, end, is_print);
    let p3 = rskip_while(bytes, p2, p4, is_space);
    if p3 - p2 > 2 && bytes[p3 - 1] == close {
        return Some((src[p2 + 1..p3 - 1].to_string(), p4));
    }
    None
}

#[cfg(test)]
mod ref_def_tests {
    use super::split_lines;
    use crate::refdict::RefDict;
    use crate::token::TokenKind;

    #[test]
    fn definition_with_title_is_consumed() {
        let mut dict = RefDict::new();
        let tokens = split_lines("[Ex]: http://e.x \"t\"\npara\n", &mut dict);
        let entry = dict.get("ex").expect("definition");
        assert_eq!(entry.uri, "http://e.x");
        assert_eq!(entry.title, "t");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Line);
    }

    #[test]
    fn definition_title_on_next_line() {
        let mut dict = RefDict::new();
        split_lines("[a]: <http://a> \n    'title here'\n", &mut dict);
        let entry = dict.get("a").expect("definition");
        assert_eq!(entry.uri, "http://a");
        assert_eq!(entry.title, "title here");
    }

    #[test]
    fn caret_identifiers_are_reserved() {
        let mut dict = RefDict::new();
        let tokens = split_lines("[^note]: http://e.x\n", &mut dict);
        assert_eq!(dict.len(), 0);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Line));
    }

    #[test]
    fn fenced_code_needs_blank_line_after_close() {
        let mut dict = RefDict::new();
        let tokens = split_lines("```\ncode\n```\ntrailing\n", &mut dict);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Line));
    }

    #[test]
    fn fenced_code_tokens_cover_interior() {
        let mut dict = RefDict::new();
        let tokens = split_lines("```info\nlet x;\n```\n", &mut dict);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::PreBegin, TokenKind::Code, TokenKind::PreEnd]
        );
        assert_eq!(tokens[1].span.slice("```info\nlet x;\n```\n"), "let x;");
    }
}
