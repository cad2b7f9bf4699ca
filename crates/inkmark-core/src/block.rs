use crate::scan::{
    count_run, eat, is_digit, is_graph, is_space, is_white, rskip_byte, rskip_while, skip_at_most,
    skip_while,
};
use crate::token::{Token, TokenKind};

/// Pass 2: turns the line-token stream into a marker-bracketed block stream.
/// Rules are tried in a fixed priority and the first match commits; quote and
/// list bodies are rewritten into fresh line streams and parsed recursively.
pub(crate) fn parse_blocks(input: &[Token], src: &str) -> Vec<Token> {
    let mut output = Vec::new();
    parse_into(input, src, &mut output);
    output
}

fn parse_into(input: &[Token], src: &str, output: &mut Vec<Token>) {
    let mut dot = 0usize;
    // Carried across iterations: a Line right after an item marker is the
    // item's own body and gets no paragraph wrapper.
    let mut in_listitem = false;
    while dot < input.len() {
        let line = input[dot];
        if line.kind == TokenKind::ItemBegin {
            in_listitem = true;
        }
        if line.kind == TokenKind::Line {
            if let Some(next) = parse_hrule(input, dot, src, output) {
                dot = next;
                continue;
            }
            if let Some(next) = parse_indented_code(input, dot, src, output) {
                dot = next;
                continue;
            }
            if let Some(next) = parse_blockquote(input, dot, src, output) {
                dot = next;
                continue;
            }
            if let Some(next) = parse_atx_heading(input, dot, src, output) {
                dot = next;
                continue;
            }
            if let Some(next) = parse_list(input, dot, src, output) {
                dot = next;
                continue;
            }
            if let Some(next) = parse_setext_heading(input, dot, src, output) {
                dot = next;
                continue;
            }
            let attempt = if in_listitem {
                parse_listitem_body(input, dot, src, output)
            } else {
                parse_paragraph(input, dot, src, output)
            };
            in_listitem = false;
            if let Some(next) = attempt {
                dot = next;
                continue;
            }
        }
        output.push(input[dot]);
        dot += 1;
    }
}

/// One tab stop of indentation: four spaces, or up to three spaces and a tab.
fn scan_tab(bytes: &[u8], pos: usize, end: usize) -> usize {
    let p1 = skip_at_most(bytes, pos, end, 3, b' ');
    if let Some(p2) = eat(bytes, p1, end, b' ')
        && p2 - pos == 4
    {
        return p2;
    }
    if let Some(p3) = eat(bytes, p1, end, b'\t') {
        return p3;
    }
    pos
}

fn scan_tab_not(bytes: &[u8], pos: usize, end: usize) -> usize {
    skip_at_most(bytes, pos, end, 3, b' ')
}

fn scan_hrule(bytes: &[u8], pos: usize, end: usize) -> Option<usize> {
    let p1 = scan_tab_not(bytes, pos, end);
    if !(p1 < end && matches!(bytes[p1], b'*' | b'_' | b'-')) {
        return None;
    }
    let dash = bytes[p1];
    let mut n = 0usize;
    let mut p = p1;
    while p < end && (is_space(bytes[p]) || bytes[p] == dash) {
        if bytes[p] == dash {
            n += 1;
        }
        p += 1;
    }
    if n < 3 || !(p >= end || bytes[p] == b'\n') {
        return None;
    }
    Some(p)
}

/// A list marker: `*`, `+`, or `-` plus a space, or digits, `.`, space.
/// Returns the offset just past the marker character (or past the `.`).
fn scan_listmark(bytes: &[u8], pos: usize, end: usize) -> Option<usize> {
    let p1 = scan_tab_not(bytes, pos, end);
    if p1 >= end {
        return None;
    }
    match bytes[p1] {
        b'*' | b'+' | b'-' => {
            let p2 = p1 + 1;
            if p2 < end && is_space(bytes[p2]) {
                Some(p2)
            } else {
                None
            }
        }
        b if is_digit(b) => {
            let p2 = skip_while(bytes, p1, end, is_digit);
            let p3 = eat(bytes, p2, end, b'.')?;
            if p3 < end && is_space(bytes[p3]) {
                Some(p3)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn skip_blank(input: &[Token], dot: usize) -> usize {
    let mut i = dot;
    while i < input.len() && input[i].kind == TokenKind::Blank {
        i += 1;
    }
    i
}

fn parse_hrule(input: &[Token], dot: usize, src: &str, output: &mut Vec<Token>) -> Option<usize> {
    let line = input[dot];
    scan_hrule(src.as_bytes(), line.span.start, line.span.end)?;
    output.push(Token::new(TokenKind::Rule, line.span.start, line.span.end));
    Some(dot + 1)
}

fn parse_setext_heading(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let line2 = input.get(dot + 1)?;
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    if !(p1 < line.span.end && is_graph(bytes[p1])) {
        return None;
    }
    let p2 = scan_tab_not(bytes, line2.span.start, line2.span.end);
    if !(p2 < line2.span.end && matches!(bytes[p2], b'=' | b'-')) {
        return None;
    }
    let dash = bytes[p2];
    let p3 = p2 + count_run(bytes, p2, line2.span.end, dash);
    let p4 = skip_while(bytes, p3, line2.span.end, is_space);
    if !(p4 >= line2.span.end || bytes[p4] == b'\n') {
        return None;
    }
    let level = if dash == b'=' { 1 } else { 2 };
    output.push(Token::new(TokenKind::HeadingBegin(level), p1, p1));
    output.push(Token::new(TokenKind::Inline, p1, line.span.end));
    output.push(Token::new(
        TokenKind::HeadingEnd(level),
        line.span.end,
        line.span.end,
    ));
    Some(dot + 2)
}

fn parse_atx_heading(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    let run = count_run(bytes, p1, line.span.end, b'#');
    if run == 0 {
        return None;
    }
    let level = run.min(6) as u8;
    let p2 = p1 + run;
    let p3 = skip_while(bytes, p2, line.span.end, is_space);
    if p3 == p2 {
        return None;
    }
    // Trailing `#` runs and padding are not content.
    let mut p4 = line.span.end;
    p4 = rskip_while(bytes, p3, p4, is_white);
    p4 = rskip_byte(bytes, p3, p4, b'#');
    p4 = rskip_while(bytes, p3, p4, is_space);
    if p3 == p4 {
        return None;
    }
    output.push(Token::new(TokenKind::HeadingBegin(level), p3, p3));
    output.push(Token::new(TokenKind::Inline, p3, p4));
    output.push(Token::new(TokenKind::HeadingEnd(level), p4, p4));
    Some(dot + 1)
}

fn parse_listitem_body(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    if !(p1 < line.span.end && is_graph(bytes[p1])) {
        return None;
    }
    output.push(Token::new(TokenKind::Inline, p1, line.span.end));
    let mut i = dot + 1;
    while i < input.len() && input[i].kind == TokenKind::Line {
        let next = input[i];
        if scan_listmark(bytes, next.span.start, next.span.end).is_some() {
            break;
        }
        output.push(Token::new(TokenKind::Inline, next.span.start, next.span.end));
        i += 1;
    }
    Some(i)
}

fn parse_paragraph(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    if !(p1 < line.span.end && is_graph(bytes[p1])) {
        return None;
    }
    output.push(Token::new(TokenKind::ParaBegin, p1, p1));
    output.push(Token::new(TokenKind::Inline, p1, line.span.end));
    let mut i = dot + 1;
    let mut last_end = line.span.end;
    while i < input.len() && input[i].kind == TokenKind::Line {
        let next = input[i];
        output.push(Token::new(TokenKind::Inline, next.span.start, next.span.end));
        last_end = next.span.end;
        i += 1;
    }
    output.push(Token::new(TokenKind::ParaEnd, last_end, last_end));
    Some(i)
}

fn parse_indented_code(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_tab(bytes, line.span.start, line.span.end);
    if p1 == line.span.start {
        return None;
    }
    output.push(Token::new(TokenKind::PreBegin, p1, p1));
    output.push(Token::new(TokenKind::Code, p1, line.span.end));
    let mut last_end = line.span.end;
    let mut i = dot + 1;
    while i < input.len() {
        match input[i].kind {
            TokenKind::Line => {
                let next = input[i];
                let p = scan_tab(bytes, next.span.start, next.span.end);
                if p == next.span.start {
                    break;
                }
                output.push(Token::new(TokenKind::Code, p, next.span.end));
                last_end = next.span.end;
                i += 1;
            }
            TokenKind::Blank => {
                // Blank lines fold into the block only when indented code
                // resumes afterwards.
                let j = skip_blank(input, i);
                if !(j < input.len() && input[j].kind == TokenKind::Line) {
                    break;
                }
                let resume = input[j];
                if scan_tab(bytes, resume.span.start, resume.span.end) == resume.span.start {
                    break;
                }
                for blank in &input[i..j] {
                    output.push(Token::new(
                        TokenKind::Code,
                        blank.span.start,
                        blank.span.end,
                    ));
                    last_end = blank.span.end;
                }
                i = j;
            }
            _ => break,
        }
    }
    output.push(Token::new(TokenKind::PreEnd, last_end, last_end));
    Some(i)
}

fn parse_blockquote(
    input: &[Token],
    dot: usize,
    src: &str,
    output: &mut Vec<Token>,
) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    let p2 = eat(bytes, p1, line.span.end, b'>')?;
    let mut block = vec![Token::new(TokenKind::QuoteBegin, p2, p2)];
    let mut lazy = false;
    let mut last_end = line.span.end;
    let mut i = dot;
    while i < input.len() {
        match input[i].kind {
            TokenKind::Line => {
                quote_line(bytes, input[i], &mut block, &mut lazy);
                last_end = input[i].span.end;
                i += 1;
            }
            TokenKind::Blank => match quote_blank(bytes, input, i, &mut block) {
                Some(j) => {
                    lazy = false;
                    i = j;
                }
                None => break,
            },
            _ => break,
        }
    }
    block.push(Token::new(TokenKind::QuoteEnd, last_end, last_end));
    parse_into(&block, src, output);
    Some(i)
}

/// Strips one optional `>` and one optional space from a quoted line. A
/// prefixed line arriving right after a lazy (unprefixed) one starts a new
/// paragraph inside the quote.
fn quote_line(bytes: &[u8], line: Token, block: &mut Vec<Token>, lazy: &mut bool) {
    let (start, end) = (line.span.start, line.span.end);
    let p1 = scan_tab_not(bytes, start, end);
    let p2 = eat(bytes, p1, end, b'>').unwrap_or(p1);
    let p3 = eat(bytes, p2, end, b' ').unwrap_or(p2);
    let p4 = skip_while(bytes, p3, end, is_space);
    if p4 >= end || bytes[p4] == b'\n' {
        block.push(Token::new(TokenKind::Blank, p4, end));
    } else {
        if *lazy && p1 != p2 {
            block.push(Token::new(TokenKind::Blank, p3, p3));
        }
        block.push(Token::new(TokenKind::Line, p3, end));
    }
    *lazy = p1 == p2;
}

/// Blank lines continue the quote only when a `>`-prefixed line follows.
fn quote_blank(
    bytes: &[u8],
    input: &[Token],
    dot: usize,
    block: &mut Vec<Token>,
) -> Option<usize> {
    let j = skip_blank(input, dot);
    if !(j < input.len() && input[j].kind == TokenKind::Line) {
        return None;
    }
    let line = input[j];
    let p1 = scan_tab_not(bytes, line.span.start, line.span.end);
    eat(bytes, p1, line.span.end, b'>')?;
    for blank in &input[dot..j] {
        block.push(*blank);
    }
    Some(j)
}

fn parse_list(input: &[Token], dot: usize, src: &str, output: &mut Vec<Token>) -> Option<usize> {
    let bytes = src.as_bytes();
    let line = input[dot];
    let p1 = scan_listmark(bytes, line.span.start, line.span.end)?;
    let indicator = bytes[p1 - 1];
    let (open, close) = if indicator == b'.' {
        (TokenKind::OrderedBegin, TokenKind::OrderedEnd)
    } else {
        (TokenKind::BulletBegin, TokenKind::BulletEnd)
    };
    let p2 = skip_while(bytes, p1, line.span.end, is_space);
    let mut block = vec![
        Token::new(open, p2, p2),
        Token::new(TokenKind::ItemBegin, p2, p2),
        Token::new(TokenKind::Line, p2, line.span.end),
    ];
    let mut last_end = line.span.end;
    let mut i = dot + 1;
    while i < input.len() {
        match input[i].kind {
            TokenKind::Line => {
                list_line(bytes, input[i], &mut block);
                last_end = input[i].span.end;
                i += 1;
            }
            TokenKind::Blank => match list_blank(bytes, input, i, &mut block) {
                Some(j) => i = j,
                None => break,
            },
            _ => break,
        }
    }
    block.push(Token::new(TokenKind::ItemEnd, last_end, last_end));
    block.push(Token::new(close, last_end, last_end));
    parse_into(&block, src, output);
    Some(i)
}

/// A marker line opens the next item; a markerless line continues the
/// current one with one indent level stripped.
fn list_line(bytes: &[u8], line: Token, block: &mut Vec<Token>) {
    let (start, end) = (line.span.start, line.span.end);
    match scan_listmark(bytes, start, end) {
        None => {
            let p2 = scan_tab(bytes, start, end);
            block.push(Token::new(TokenKind::Line, p2, end));
        }
        Some(p1) => {
            let p2 = skip_while(bytes, p1, end, is_space);
            block.push(Token::new(TokenKind::ItemEnd, p2, p2));
            block.push(Token::new(TokenKind::ItemBegin, p2, p2));
            block.push(Token::new(TokenKind::Line, p2, end));
        }
    }
}

/// Blanks before an indented continuation stay in the item; blanks before a
/// marker line are dropped; an hrule or an unindented markerless line ends
/// the list.
fn list_blank(
    bytes: &[u8],
    input: &[Token],
    dot: usize,
    block: &mut Vec<Token>,
) -> Option<usize> {
    let j = skip_blank(input, dot);
    if !(j < input.len() && input[j].kind == TokenKind::Line) {
        return None;
    }
    let line = input[j];
    if scan_hrule(bytes, line.span.start, line.span.end).is_some() {
        return None;
    }
    let marked = scan_listmark(bytes, line.span.start, line.span.end).is_some();
    let indented = scan_tab(bytes, line.span.start, line.span.end) != line.span.start;
    if indented {
        for blank in &input[dot..j] {
            block.push(*blank);
        }
    } else if !marked {
        return None;
    }
    Some(j)
}
