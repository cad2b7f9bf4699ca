//! A Markdown-to-HTML translator built as a three-pass pipeline over one
//! immutable buffer: a line tokenizer that also collects reference-link
//! definitions, a block parser that brackets the line stream with paired
//! markers, and a per-run inline parser driven by the output writer. Every
//! rule that fails to match degrades to literal text, so translation is a
//! total function of its input.

mod block;
mod emit;
mod inline;
mod label;
mod lex;
mod refdict;
mod scan;
mod span;
mod token;

use refdict::RefDict;

/// Translates one Markdown document into an HTML fragment.
///
/// The output is deterministic in the input bytes: no I/O, no global state,
/// no failure mode. Callers normalise CRLF line endings beforehand if their
/// input may carry them; only `\n` terminates a line here.
pub fn translate(input: &str) -> String {
    let mut dict = RefDict::new();
    let lines = lex::split_lines(input, &mut dict);
    let blocks = block::parse_blocks(&lines, input);
    let mut out = String::new();
    emit::print_blocks(&blocks, input, &dict, &mut out);
    out
}
