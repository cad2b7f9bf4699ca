use crate::span::Span;

/// One token of any pass: a kind plus a half-open range into the buffer the
/// pass was run over. Marker kinds render as fixed literals; content kinds
/// render from their slice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    // line tokens (pass 1)
    Blank,
    Line,
    Html,
    Code,
    // content tokens
    Text,
    Inline,
    LinkId,
    Uri,
    Title,
    Alt,
    // inline markup
    AnchorBegin,
    AnchorText,
    AnchorEnd,
    ImageBegin,
    ImageEnd,
    HardBreak,
    CodeBegin,
    CodeEnd,
    EmBegin,
    EmEnd,
    StrongBegin,
    StrongEnd,
    // block markup
    Rule,
    PreBegin,
    PreEnd,
    HeadingBegin(u8),
    HeadingEnd(u8),
    QuoteBegin,
    QuoteEnd,
    BulletBegin,
    BulletEnd,
    OrderedBegin,
    OrderedEnd,
    ItemBegin,
    ItemEnd,
    ParaBegin,
    ParaEnd,
}

impl TokenKind {
    /// Fixed output string of a markup marker. Content kinds have no
    /// literal and render as the empty string.
    pub fn literal(&self) -> &'static str {
        match self {
            TokenKind::AnchorBegin => "<a href=\"",
            TokenKind::AnchorText => "\">",
            TokenKind::AnchorEnd => "</a>",
            TokenKind::ImageBegin => "<img src=\"",
            TokenKind::ImageEnd => "\" />",
            TokenKind::HardBreak => "<br />\n",
            TokenKind::CodeBegin => "<code>",
            TokenKind::CodeEnd => "</code>",
            TokenKind::EmBegin => "<em>",
            TokenKind::EmEnd => "</em>",
            TokenKind::StrongBegin => "<strong>",
            TokenKind::StrongEnd => "</strong>",
            TokenKind::Rule => "<hr />\n",
            TokenKind::PreBegin => "<pre><code>",
            TokenKind::PreEnd => "</code></pre>\n",
            TokenKind::HeadingBegin(1) => "<h1>",
            TokenKind::HeadingBegin(2) => "<h2>",
            TokenKind::HeadingBegin(3) => "<h3>",
            TokenKind::HeadingBegin(4) => "<h4>",
            TokenKind::HeadingBegin(5) => "<h5>",
            TokenKind::HeadingBegin(_) => "<h6>",
            TokenKind::HeadingEnd(1) => "</h1>\n",
            TokenKind::HeadingEnd(2) => "</h2>\n",
            TokenKind::HeadingEnd(3) => "</h3>\n",
            TokenKind::HeadingEnd(4) => "</h4>\n",
            TokenKind::HeadingEnd(5) => "</h5>\n",
            TokenKind::HeadingEnd(_) => "</h6>\n",
            TokenKind::QuoteBegin => "<blockquote>\n",
            TokenKind::QuoteEnd => "</blockquote>\n",
            TokenKind::BulletBegin => "<ul>\n",
            TokenKind::BulletEnd => "</ul>\n",
            TokenKind::OrderedBegin => "<ol>\n",
            TokenKind::OrderedEnd => "</ol>\n",
            TokenKind::ItemBegin => "<li>",
            TokenKind::ItemEnd => "</li>\n",
            TokenKind::ParaBegin => "<p>",
            TokenKind::ParaEnd => "</p>\n",
            _ => "",
        }
    }

    /// Inline markers the writer emits as bare literals.
    pub fn is_inline_markup(&self) -> bool {
        matches!(
            self,
            TokenKind::HardBreak
                | TokenKind::CodeBegin
                | TokenKind::CodeEnd
                | TokenKind::AnchorEnd
                | TokenKind::EmBegin
                | TokenKind::EmEnd
                | TokenKind::StrongBegin
                | TokenKind::StrongEnd
        )
    }

    /// Block markers produced by the block parser.
    pub fn is_block_markup(&self) -> bool {
        matches!(
            self,
            TokenKind::Rule
                | TokenKind::PreBegin
                | TokenKind::PreEnd
                | TokenKind::HeadingBegin(_)
                | TokenKind::HeadingEnd(_)
                | TokenKind::QuoteBegin
                | TokenKind::QuoteEnd
                | TokenKind::BulletBegin
                | TokenKind::BulletEnd
                | TokenKind::OrderedBegin
                | TokenKind::OrderedEnd
                | TokenKind::ItemBegin
                | TokenKind::ItemEnd
                | TokenKind::ParaBegin
                | TokenKind::ParaEnd
        )
    }
}
