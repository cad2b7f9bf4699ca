use crate::refdict::RefDict;
use crate::scan::{
    count_run, eat, find_byte, is_any, is_escapable, is_print, is_white, rskip_while,
    scan_html_tag, scan_quoted, skip_while,
};
use crate::token::{Token, TokenKind};

const SCHEMES: &[&str] = &["https://", "http://", "ftp://", "ftps://", "mailto:"];

/// One pending construct on the nest stack. `n` encodes what the anchor
/// token is waiting for: 0 a link sentinel, 1 `<em>`, 2 `<strong>`, 3 a
/// combined triple run whose nesting order is decided on close.
#[derive(Clone, Copy, Debug)]
struct Frame {
    anchor: usize,
    n: u8,
}

/// Pass 3: parses one concatenated inline run into tokens. The parser owns
/// its buffer; resolved reference uri/title text is appended past the
/// original length so attribute tokens stay plain spans. Returns the buffer
/// together with the tokens that index it.
pub(crate) fn parse_inlines(src: String, dict: &RefDict) -> (String, Vec<Token>) {
    let mut parser = InlineParser {
        limit: src.len(),
        buf: src,
        dict,
        out: Vec::new(),
        nest: Vec::new(),
    };
    parser.run();
    (parser.buf, parser.out)
}

struct InlineParser<'d> {
    buf: String,
    /// Length of the original run; appended reference text is never scanned.
    limit: usize,
    dict: &'d RefDict,
    out: Vec<Token>,
    nest: Vec<Frame>,
}

fn is_special(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\\' | b'`' | b'*' | b'_' | b'<' | b'!' | b'[' | b']'
    )
}

fn match_uri(bytes: &[u8]) -> bool {
    SCHEMES.iter().any(|s| bytes.starts_with(s.as_bytes()))
}

impl<'d> InlineParser<'d> {
    fn run(&mut self) {
        let end = self.limit;
        let mut pos = 0usize;
        while pos < end {
            let next = self.parse_range(pos, end);
            if next == pos {
                // The loop only stalls on a `]` with no opener; plain text.
                pos = self.push_text(pos, pos + 1);
            } else {
                pos = next;
            }
        }
        // Anything still open never found its closer.
        while let Some(frame) = self.nest.pop() {
            if let Some(token) = self.out.get_mut(frame.anchor) {
                token.kind = TokenKind::Text;
            }
        }
    }

    /// Dispatch loop; stops at `]` so link parsing can see its closer.
    fn parse_range(&mut self, pos: usize, end: usize) -> usize {
        let mut p = pos;
        while p < end && self.buf.as_bytes()[p] != b']' {
            let b = self.buf.as_bytes()[p];
            p = match b {
                b' ' => self.parse_space(p, end),
                b'\\' => self.parse_escape(p, end),
                b'`' => self.parse_code_span(p, end),
                b'*' | b'_' => self.parse_emphasis(p, end),
                b'<' => self.parse_angle(p, end),
                b'[' => self.parse_link(p, end),
                b'!' => self.parse_image(p, end),
                _ => {
                    let bytes = self.buf.as_bytes();
                    let mut q = p;
                    while q < end && !is_special(bytes[q]) {
                        q += 1;
                    }
                    self.push_text(p, q)
                }
            };
        }
        p
    }

    /// Pushes a text token, merging into the previous one when the spans
    /// touch; the writer re-batches anyway, this just keeps streams short.
    fn push_text(&mut self, start: usize, end: usize) -> usize {
        if start >= end {
            return end;
        }
        if let Some(last) = self.out.last_mut()
            && last.kind == TokenKind::Text
            && last.span.end == start
        {
            last.span.end = end;
            return end;
        }
        self.out.push(Token::new(TokenKind::Text, start, end));
        end
    }

    fn parse_space(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        let p1 = skip_while(bytes, pos, end, |b| b == b' ');
        let p2 = eat(bytes, p1, end, b'\n').unwrap_or(p1);
        if p1 - pos >= 2 && p2 > p1 {
            self.out.push(Token::new(TokenKind::HardBreak, pos, p2));
            return p2;
        }
        self.push_text(pos, p2)
    }

    fn parse_escape(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        if pos + 1 < end && is_escapable(bytes[pos + 1]) {
            // Deferred: the writer unescapes text, so the pair rides along.
            self.push_text(pos, pos + 2)
        } else {
            self.push_text(pos, pos + 1)
        }
    }

    fn parse_code_span(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        let ticks = count_run(bytes, pos, end, b'`');
        let p1 = pos + ticks;
        let p2 = skip_while(bytes, p1, end, is_white);
        // The next run of at least `ticks` backticks closes the span; its
        // last `ticks` characters are the closer.
        let mut search = p2;
        let close = loop {
            if search >= end {
                break None;
            }
            if bytes[search] == b'`' {
                let run = count_run(bytes, search, end, b'`');
                if run >= ticks {
                    break Some(search);
                }
                search += run;
            } else {
                search += 1;
            }
        };
        let Some(p3) = close else {
            return self.push_text(pos, p2);
        };
        let p4 = p3 + ticks + count_run(bytes, p3 + ticks, end, b'`');
        let content_end = rskip_while(bytes, p2, p4 - ticks, is_white);
        self.out.push(Token::new(TokenKind::CodeBegin, p2, p2));
        self.out.push(Token::new(TokenKind::Code, p2, content_end));
        self.out
            .push(Token::new(TokenKind::CodeEnd, content_end, content_end));
        p4
    }

    fn nest_exists(&self, n: u8) -> bool {
        self.nest.iter().any(|frame| match n {
            0 => frame.n == 0,
            1 => frame.n == 1 || frame.n == 3,
            2 => frame.n == 2 || frame.n == 3,
            _ => frame.n > 0,
        })
    }

    fn parse_emphasis(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        let run = count_run(bytes, pos, end, bytes[pos]);
        let p1 = pos + run;
        let leftwhite = pos == 0 || is_white(bytes[pos - 1]);
        // A run touching sentence punctuation still counts as right-white.
        let rightwhite = p1 >= end
            || is_white(bytes[p1])
            || (matches!(bytes[p1], b'.' | b',' | b';' | b':')
                && (p1 + 1 >= end || is_white(bytes[p1 + 1])));
        if run > 3 || (leftwhite && rightwhite) {
            return self.push_text(pos, p1);
        }
        if run == 3 {
            self.patch_emphasis_three(pos, p1, leftwhite, rightwhite);
        } else {
            self.patch_emphasis(pos, p1, leftwhite, rightwhite);
        }
        p1
    }

    /// Open/close for runs of length one and two. Closing against a combined
    /// frame splits it: the start marker is rewritten to the other length's
    /// opener and the remaining half stays pending.
    fn patch_emphasis(&mut self, start: usize, end: usize, leftwhite: bool, rightwhite: bool) {
        let n1 = (end - start) as u8;
        let n2 = 3 - n1;
        let open1 = if n1 == 1 {
            TokenKind::EmBegin
        } else {
            TokenKind::StrongBegin
        };
        let close1 = if n1 == 1 {
            TokenKind::EmEnd
        } else {
            TokenKind::StrongEnd
        };
        let open2 = if n2 == 1 {
            TokenKind::EmBegin
        } else {
            TokenKind::StrongBegin
        };
        if !self.nest_exists(n1) {
            if !rightwhite {
                self.nest.push(Frame {
                    anchor: self.out.len(),
                    n: n1,
                });
                self.out.push(Token::new(open1, start, end));
                return;
            }
        } else if let Some(top) = self.nest.last().copied()
            && (top.n == n1 || top.n == 3)
        {
            let bytes = self.buf.as_bytes();
            let smark = self
                .out
                .get(top.anchor)
                .and_then(|t| bytes.get(t.span.start))
                .copied();
            if !leftwhite && smark == Some(bytes[start]) {
                self.nest.pop();
                self.out.push(Token::new(close1, start, end));
                if let Some(pending) = self.nest.last_mut()
                    && pending.n == 3
                {
                    let anchor = pending.anchor;
                    pending.n = n2;
                    if let Some(token) = self.out.get_mut(anchor) {
                        token.kind = open2;
                        token.span.end = token.span.start + n2 as usize;
                    }
                    if let Some(token) = self.out.get_mut(anchor + 1) {
                        token.kind = open1;
                    }
                }
                return;
            }
        }
        self.push_text(start, end);
    }

    /// A length-three run opens both constructs at once; which end marker
    /// comes first on close depends on what the inner frame turned into.
    fn patch_emphasis_three(&mut self, start: usize, end: usize, leftwhite: bool, rightwhite: bool) {
        let nnest = self.nest.len();
        if !self.nest_exists(3) {
            if !rightwhite {
                let anchor = self.out.len();
                self.nest.push(Frame { anchor, n: 3 });
                self.nest.push(Frame { anchor, n: 3 });
                self.out.push(Token::new(TokenKind::StrongBegin, start, end));
                self.out.push(Token::new(TokenKind::EmBegin, start, start));
                return;
            }
        } else if nnest >= 2 && self.nest[nnest - 1].n > 0 && self.nest[nnest - 2].n > 0 {
            let top = self.nest[nnest - 1];
            let bytes = self.buf.as_bytes();
            let smark = self
                .out
                .get(top.anchor)
                .and_then(|t| bytes.get(t.span.start))
                .copied();
            if leftwhite || smark != Some(bytes[start]) {
                // literal text
            } else if top.n != 2 {
                self.out.push(Token::new(TokenKind::EmEnd, start, end));
                self.out.push(Token::new(TokenKind::StrongEnd, start, end));
                self.nest.pop();
                self.nest.pop();
                return;
            } else {
                self.out.push(Token::new(TokenKind::StrongEnd, start, end));
                self.out.push(Token::new(TokenKind::EmEnd, start, end));
                self.nest.pop();
                self.nest.pop();
                return;
            }
        }
        self.push_text(start, end);
    }

    /// `<…>`: an inline tag passes through raw, a known scheme becomes an
    /// auto-link, anything else leaves the `<` run as text.
    fn parse_angle(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        if let Some(tag) = scan_html_tag(bytes, pos, end) {
            self.out.push(Token::new(TokenKind::Html, pos, tag.end));
            return tag.end;
        }
        if let Some(close) = scan_quoted(bytes, pos, end, b'<', b'>', is_print)
            && close - pos > 2
            && match_uri(&bytes[pos + 1..close - 1])
        {
            self.out.push(Token::new(TokenKind::AnchorBegin, pos, pos));
            self.out.push(Token::new(TokenKind::Uri, pos + 1, close - 1));
            self.out.push(Token::new(TokenKind::AnchorText, close, close));
            self.out.push(Token::new(TokenKind::Text, pos + 1, close - 1));
            self.out.push(Token::new(TokenKind::AnchorEnd, close, close));
            return close;
        }
        let p = pos + count_run(bytes, pos, end, b'<');
        self.push_text(pos, p)
    }

    fn parse_link(&mut self, pos: usize, end: usize) -> usize {
        // The sentinel forbids nested links while the inner content parses.
        self.nest.push(Frame {
            anchor: self.out.len(),
            n: 0,
        });
        let p1 = pos + 1;
        let saved = std::mem::take(&mut self.out);
        let p2 = self.parse_range(p1, end);
        let mut inner = std::mem::replace(&mut self.out, saved);
        while let Some(top) = self.nest.last().copied() {
            if top.n == 0 {
                break;
            }
            if let Some(token) = inner.get_mut(top.anchor) {
                token.kind = TokenKind::Text;
            }
            self.nest.pop();
        }
        let close = eat(self.buf.as_bytes(), p2, end, b']');
        self.nest.pop();
        let already = self.nest_exists(0);
        let Some(p3) = close else {
            return self.push_text(pos, p1);
        };
        if p1 == p2 {
            return self.push_text(pos, p1);
        }
        let mut attrs: Vec<Token> = Vec::new();
        if let Some(p4) = self.parse_link_paren(p3, end, &mut attrs)
            && !already
        {
            return self.make_link(pos, p4, inner, attrs);
        }
        let p5 = self.parse_link_bracket(p3, end, p1, p2, &mut attrs);
        if !already && self.fetch_reference(&mut attrs) {
            return self.make_link(pos, p5, inner, attrs);
        }
        self.push_text(pos, p1);
        self.parse_range(p1, p2);
        self.push_text(p2, p5)
    }

    /// `(uri "title")` directly after the closing bracket. The uri may be
    /// `<bracketed>`; a title quote must be preceded by whitespace.
    fn parse_link_paren(&mut self, pos: usize, end: usize, attrs: &mut Vec<Token>) -> Option<usize> {
        let bytes = self.buf.as_bytes();
        let p6 = scan_quoted(bytes, pos, end, b'(', b')', is_any)?;
        let p1 = pos + 1;
        let p5 = rskip_while(bytes, p1, p6 - 1, is_white);
        let p2 = if bytes.get(p1) == Some(&b'<') {
            match scan_quoted(bytes, p1, p5, b'<', b'>', is_any) {
                Some(q) => q - 1,
                None => p1 + 1,
            }
        } else {
            p1 + 1
        };
        let mut p3 = p5;
        let mut p4 = p5;
        if p5 > p1 && matches!(bytes[p5 - 1], b'"' | b'\'') {
            let quote = bytes[p5 - 1];
            let mut q = find_byte(bytes, p2, p5, quote).unwrap_or(p5);
            while q < p5 && !is_white(bytes[q - 1]) {
                q = find_byte(bytes, q + 1, p5, quote).unwrap_or(p5);
            }
            p4 = q;
            p3 = rskip_while(bytes, p2, p4, is_white);
        }
        if p3 > p1 + 1 && bytes[p1] == b'<' && bytes[p3 - 1] == b'>' {
            attrs.push(Token::new(TokenKind::Uri, p1 + 1, p3 - 1));
        } else {
            attrs.push(Token::new(TokenKind::Uri, p1, p3));
        }
        if p5 > p4 + 1 && bytes[p4] == bytes[p5 - 1] && matches!(bytes[p5 - 1], b'"' | b'\'') {
            attrs.push(Token::new(TokenKind::Title, p4 + 1, p5 - 1));
        }
        Some(p6)
    }

    /// `[id]` reference form; an empty or missing bracket falls back to the
    /// inner text as the identifier.
    fn parse_link_bracket(
        &mut self,
        pos: usize,
        end: usize,
        alt_start: usize,
        alt_end: usize,
        attrs: &mut Vec<Token>,
    ) -> usize {
        let bytes = self.buf.as_bytes();
        let p1 = skip_while(bytes, pos, end, is_white);
        match scan_quoted(bytes, p1, end, b'[', b']', is_any) {
            Some(p2) if p2 - p1 > 2 => {
                attrs.push(Token::new(TokenKind::LinkId, p1 + 1, p2 - 1));
                p2
            }
            Some(p2) => {
                attrs.push(Token::new(TokenKind::LinkId, alt_start, alt_end));
                p2
            }
            None => {
                attrs.push(Token::new(TokenKind::LinkId, alt_start, alt_end));
                p1
            }
        }
    }

    /// Swaps the pending identifier for the dictionary's uri/title. The raw
    /// text is appended to the working buffer so the tokens stay spans.
    fn fetch_reference(&mut self, attrs: &mut Vec<Token>) -> bool {
        let Some(first) = attrs.first() else {
            return false;
        };
        let raw = first.span.slice(&self.buf).to_string();
        let entry = match self.dict.get(&raw) {
            Some(entry) => entry.clone(),
            None => return false,
        };
        attrs.clear();
        let uri_start = self.buf.len();
        self.buf.push_str(&entry.uri);
        attrs.push(Token::new(TokenKind::Uri, uri_start, self.buf.len()));
        if !entry.title.is_empty() {
            let title_start = self.buf.len();
            self.buf.push_str(&entry.title);
            attrs.push(Token::new(TokenKind::Title, title_start, self.buf.len()));
        }
        true
    }

    fn make_link(
        &mut self,
        begin: usize,
        end: usize,
        inner: Vec<Token>,
        attrs: Vec<Token>,
    ) -> usize {
        self.out.push(Token::new(TokenKind::AnchorBegin, begin, begin));
        self.out.extend(attrs);
        self.out.push(Token::new(TokenKind::AnchorText, begin, begin));
        self.out.extend(inner);
        self.out.push(Token::new(TokenKind::AnchorEnd, end, end));
        end
    }

    /// `![alt](…)` / `![alt][id]`. Alt is plain text, never inline-parsed.
    /// When no image forms, the `!` turns to text and the bracket gets
    /// redispatched as a link.
    fn parse_image(&mut self, pos: usize, end: usize) -> usize {
        let bytes = self.buf.as_bytes();
        let p1 = pos + 1;
        if eat(bytes, p1, end, b'[').is_none() {
            return self.push_text(pos, p1);
        }
        let Some(p3) = scan_quoted(bytes, p1, end, b'[', b']', is_any) else {
            return self.push_text(pos, p1);
        };
        let p2 = p1 + 1;
        let alt = Token::new(TokenKind::Alt, p2, p3 - 1);
        let mut attrs: Vec<Token> = Vec::new();
        if let Some(p4) = self.parse_link_paren(p3, end, &mut attrs) {
            return self.make_image(p4, alt, attrs);
        }
        let p5 = self.parse_link_bracket(p3, end, p2, p3 - 1, &mut attrs);
        if self.fetch_reference(&mut attrs) {
            return self.make_image(p5, alt, attrs);
        }
        self.push_text(pos, p1)
    }

    fn make_image(&mut self, pos: usize, alt: Token, attrs: Vec<Token>) -> usize {
        self.out.push(Token::new(TokenKind::ImageBegin, pos, pos));
        self.out.extend(attrs);
        self.out.push(alt);
        self.out.push(Token::new(TokenKind::ImageEnd, pos, pos));
        pos
    }
}
