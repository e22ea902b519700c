//! Stylesheet scoping: prefix top-level selectors so rules only match inside
//! the preview surface.
//!
//! The pass is source preserving. Only the selector text of first-level style
//! rules changes; at-rules, declarations, comments and whitespace are copied
//! from the input byte for byte.

use cssparser::{
    ParseError, ParseErrorKind, Parser, ParserInput, SourceLocation, SourcePosition, Token,
};

use crate::error::{PreviewError, PreviewResult};

/// Reasons a stylesheet is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    UnclosedBlock,
    UnexpectedCloseBrace,
    MissingBlock,
    BadString,
    BadUrl,
}

impl Malformed {
    fn message(self) -> &'static str {
        match self {
            Malformed::UnclosedBlock => "unclosed block",
            Malformed::UnexpectedCloseBrace => "unexpected '}'",
            Malformed::MissingBlock => "selector without a declaration block",
            Malformed::BadString => "unclosed string",
            Malformed::BadUrl => "malformed url()",
        }
    }
}

type ScanResult<'i, T> = Result<T, ParseError<'i, Malformed>>;

fn malformed<'i>(location: SourceLocation, kind: Malformed) -> ParseError<'i, Malformed> {
    ParseError {
        kind: ParseErrorKind::Custom(kind),
        location,
    }
}

fn to_preview_error(err: ParseError<'_, Malformed>) -> PreviewError {
    let message = match err.kind {
        ParseErrorKind::Custom(kind) => kind.message().to_string(),
        ParseErrorKind::Basic(kind) => format!("{:?}", kind),
    };
    PreviewError::Stylesheet {
        line: err.location.line + 1,
        column: err.location.column,
        message,
    }
}

/// Prefix every top-level rule's selectors with `scope`.
///
/// Each selector of a comma-separated list is prefixed:
/// `.a, .b { }` becomes `#scope .a, #scope .b { }`.
pub fn scope_stylesheet(css: &str, scope: &str) -> PreviewResult<String> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut out = String::with_capacity(css.len() + 64);

    loop {
        let start = parser.position();
        let location = parser.current_source_location();
        let state = parser.state();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_)
            | Token::Comment(_)
            | Token::CDO
            | Token::CDC
            | Token::Semicolon => out.push_str(parser.slice_from(start)),
            Token::AtKeyword(_) => {
                consume_at_rule(&mut parser).map_err(to_preview_error)?;
                out.push_str(parser.slice_from(start));
            }
            Token::CloseCurlyBracket => {
                return Err(to_preview_error(malformed(
                    location,
                    Malformed::UnexpectedCloseBrace,
                )));
            }
            _ => {
                parser.reset(&state);
                let (block_start, commas) =
                    consume_qualified_rule(&mut parser).map_err(to_preview_error)?;
                let prelude = &css[start.byte_index()..block_start.byte_index()];
                let commas: Vec<usize> = commas
                    .iter()
                    .map(|comma| comma - start.byte_index())
                    .collect();
                out.push_str(&scope_selector(prelude, &commas, scope));
                out.push_str(parser.slice_from(block_start));
            }
        }
    }

    Ok(out)
}

/// Rewrite a selector prelude; `commas` are byte offsets of top-level commas.
fn scope_selector(prelude: &str, commas: &[usize], scope: &str) -> String {
    let mut out = String::with_capacity(prelude.len() + scope.len() + 1);
    let mut from = 0;

    for &end in commas.iter().chain(std::iter::once(&prelude.len())) {
        let segment = &prelude[from..end];
        let selector = segment.trim_start();
        out.push_str(&segment[..segment.len() - selector.len()]);
        if !selector.trim_end().is_empty() {
            out.push_str(scope);
            out.push(' ');
        }
        out.push_str(selector);
        if end < prelude.len() {
            out.push(',');
        }
        from = end + 1;
    }

    out
}

// ─── Rule scanning ───────────────────────────────────────────────────────────

/// Consume a style rule; returns the position of its `{` and its top-level comma offsets.
fn consume_qualified_rule<'i>(
    parser: &mut Parser<'i, '_>,
) -> ScanResult<'i, (SourcePosition, Vec<usize>)> {
    let mut commas = Vec::new();
    loop {
        let before = parser.position();
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Err(malformed(location, Malformed::MissingBlock)),
        };
        match token {
            Token::Comma => commas.push(before.byte_index()),
            Token::CurlyBracketBlock => {
                consume_block(parser, location)?;
                return Ok((before, commas));
            }
            Token::Semicolon => return Err(malformed(location, Malformed::MissingBlock)),
            Token::CloseCurlyBracket => {
                return Err(malformed(location, Malformed::UnexpectedCloseBrace))
            }
            Token::BadString(_) => return Err(malformed(location, Malformed::BadString)),
            Token::BadUrl(_) => return Err(malformed(location, Malformed::BadUrl)),
            _ => {}
        }
    }
}

/// Consume an at-rule (after its keyword) up to `;`, its block, or end of input.
fn consume_at_rule<'i>(parser: &mut Parser<'i, '_>) -> ScanResult<'i, ()> {
    loop {
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        match token {
            Token::Semicolon => return Ok(()),
            Token::CurlyBracketBlock => return consume_block(parser, location),
            Token::CloseCurlyBracket => {
                return Err(malformed(location, Malformed::UnexpectedCloseBrace))
            }
            Token::BadString(_) => return Err(malformed(location, Malformed::BadString)),
            Token::BadUrl(_) => return Err(malformed(location, Malformed::BadUrl)),
            _ => {}
        }
    }
}

/// Consume a `{}` block whose opening brace was just read, rejecting it if
/// the input ends before its own closing brace.
///
/// The block is closed iff the outer parser moved past the point where the
/// block's contents ended, i.e. it consumed a `}`.
fn consume_block<'i>(parser: &mut Parser<'i, '_>, location: SourceLocation) -> ScanResult<'i, ()> {
    let contents_end = parser.parse_nested_block(check_block)?;
    if parser.position().byte_index() > contents_end.byte_index() {
        Ok(())
    } else {
        Err(malformed(location, Malformed::UnclosedBlock))
    }
}

/// Scan a block's contents; returns the position where they end.
fn check_block<'i, 't>(parser: &mut Parser<'i, 't>) -> ScanResult<'i, SourcePosition> {
    loop {
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(parser.position()),
        };
        match token {
            Token::BadString(_) => return Err(malformed(location, Malformed::BadString)),
            Token::BadUrl(_) => return Err(malformed(location, Malformed::BadUrl)),
            Token::CurlyBracketBlock => consume_block(parser, location)?,
            Token::ParenthesisBlock | Token::SquareBracketBlock | Token::Function(_) => {
                parser.parse_nested_block(check_block)?;
            }
            _ => {}
        }
    }
}
