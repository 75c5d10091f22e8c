//! Move inline tags off token interiors.
//!
//! Tags inserted at character offsets can open or close in the middle of
//! a whitespace-delimited token (`pre-<X>Tuesday</X>`). Downstream tools
//! expect tags on token edges, so each interrupted tag pair is widened to
//! the tokens it touches. With offset notations the opening tag records
//! how far it moved (`<X-S_OFF="4">pre-Tuesday</X>`), which keeps the
//! original span recoverable.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConvertError, Result};

/// Desubtokenizer behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesubtokenizeOptions {
    /// Annotate moved opening tags with `-S_OFF="n"` / `-E_OFF="m"`.
    pub add_offset_notations: bool,
    /// Drop interrupted tag pairs instead of moving them.
    pub delete_interrupted: bool,
}

/// Result of [`desubtokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desubtokenized {
    /// Text with every tag on a token edge.
    pub text: String,
    /// Moved tag boundaries plus deleted pairs.
    pub changes: usize,
}

/// Literal rewrites of angle-bracket sequences that are not annotation tags.
const LITERAL_FIXES: [(&str, &str); 6] = [
    ("<TURN>", "-TURN-"),
    ("<POSTER>", "-POSTER-"),
    ("<removed_junk>", "-removed_junk-"),
    ("<< ", "-- "),
    ("<  ", "-  "),
    ("< J</ENAM", "- J</ENAM"),
];

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn rewrites() -> &'static [Rewrite] {
    static REWRITES: OnceLock<Vec<Rewrite>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        [
            // <+word+>, urls and email addresses become bracketed text
            (r"<(\+[^>]*\+)>", "[$1]"),
            (r"<(http[^><]*?)>", "[$1]"),
            (r"<([^<>@]*?@[^<>@]*?)>", "[$1]"),
            // closing tags hug the preceding token, opening tags the next
            (r" (</[^>]*>)", "$1 "),
            (r"(<[^/>][^>]*>) ", " $1"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| Rewrite {
            pattern: Regex::new(pattern).expect("static pattern"),
            replacement,
        })
        .collect()
    })
}

fn normalize(text: &str) -> String {
    let literal = LITERAL_FIXES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to));
    rewrites().iter().fold(literal, |acc, rewrite| {
        rewrite
            .pattern
            .replace_all(&acc, rewrite.replacement)
            .into_owned()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Space(&'a str),
    Word(&'a str),
    Open(&'a str),
    Close(&'a str),
}

/// Split into single whitespace characters, maximal runs of other
/// characters, and tags. A `<` always starts a tag, which runs to the next
/// `>` or to the end of the text.
fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let len = if c == '<' {
            let len = rest.find('>').map_or(rest.len(), |gt| gt + 1);
            let tag = &rest[..len];
            out.push(if tag.starts_with("</") { Piece::Close(tag) } else { Piece::Open(tag) });
            len
        } else if c.is_whitespace() {
            out.push(Piece::Space(&rest[..c.len_utf8()]));
            c.len_utf8()
        } else {
            let len = rest
                .find(|ch: char| ch == '<' || ch.is_whitespace())
                .unwrap_or(rest.len());
            out.push(Piece::Word(&rest[..len]));
            len
        };
        rest = &rest[len..];
    }
    out
}

/// Where a tag was seen: the token it attaches to and how many characters
/// of that token came before it.
#[derive(Debug, Clone, Copy)]
struct Mark<'a> {
    tag: &'a str,
    token: usize,
    offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct TagPair<'a> {
    open: Mark<'a>,
    close: Mark<'a>,
}

fn mark<'a>(tokens: &[String], in_token: bool, tag: &'a str) -> Mark<'a> {
    match tokens.last() {
        Some(last) if in_token => Mark { tag, token: tokens.len() - 1, offset: char_len(last) },
        _ => Mark { tag, token: tokens.len(), offset: 0 },
    }
}

/// Element name of an open or close tag: `<COREF-ID="E1"...>` and
/// `</COREF>` both name `COREF`.
fn tag_name(tag: &str) -> &str {
    let body = tag.trim_start_matches('<').trim_start_matches('/');
    let end = body
        .find(|c: char| matches!(c, '>' | '-' | '=' | '"') || c.is_whitespace())
        .unwrap_or(body.len());
    &body[..end]
}

fn is_space_token(token: &str) -> bool {
    token.chars().all(char::is_whitespace)
}

fn char_len(token: &str) -> usize {
    token.chars().count()
}

fn with_offsets(tag: &str, start_offset: usize, end_offset: usize) -> String {
    let mut out = tag.to_string();
    for (name, value) in [("S_OFF", start_offset), ("E_OFF", end_offset)] {
        if value != 0 {
            let stem = out.strip_suffix('>').unwrap_or(&out).to_string();
            out = format!(r#"{stem}-{name}="{value}">"#);
        }
    }
    out
}

/// Re-attach tags so that none opens or closes inside a token.
///
/// Errors with `DesubtokenizationFailed` on a closing tag without an open
/// one, or on tags still open at the end of the text.
pub fn desubtokenize(text: &str, options: DesubtokenizeOptions) -> Result<Desubtokenized> {
    let normalized = normalize(text);

    let mut tokens: Vec<String> = Vec::new();
    let mut stack: Vec<Mark<'_>> = Vec::new();
    let mut pairs: Vec<TagPair<'_>> = Vec::new();

    for piece in pieces(&normalized) {
        let in_token = !matches!(piece, Piece::Space(_))
            && tokens.last().is_some_and(|last| !is_space_token(last));

        match piece {
            Piece::Open(tag) => stack.push(mark(&tokens, in_token, tag)),
            Piece::Close(tag) => {
                let close = mark(&tokens, in_token, tag);
                let open = stack.pop().ok_or_else(|| {
                    ConvertError::DesubtokenizationFailed(format!(
                        "closing tag {tag} at token {} has no opening tag",
                        close.token
                    ))
                })?;
                if tag_name(open.tag) != tag_name(tag) {
                    return Err(ConvertError::DesubtokenizationFailed(format!(
                        "closing tag {tag} at token {} does not match open tag {}",
                        close.token, open.tag
                    )));
                }
                pairs.push(TagPair { open, close });
            }
            Piece::Word(word) => match tokens.last_mut() {
                Some(last) if in_token => last.push_str(word),
                _ => tokens.push(word.to_string()),
            },
            Piece::Space(space) => tokens.push(space.to_string()),
        }
    }

    if !stack.is_empty() {
        let open: Vec<&str> = stack.iter().map(|m| m.tag).collect();
        return Err(ConvertError::DesubtokenizationFailed(format!(
            "unclosed tags at end of text: {}",
            open.join(" ")
        )));
    }

    // a tag at the very end attaches to a token that does not exist yet
    let needed = pairs
        .iter()
        .map(|p| p.open.token.max(p.close.token) + 1)
        .max()
        .unwrap_or(0);
    while tokens.len() < needed {
        tokens.push(String::new());
    }

    // later openings first; then earlier closing token; then earlier
    // closing character
    pairs.sort_by(|a, b| {
        b.open
            .token
            .cmp(&a.open.token)
            .then(a.close.token.cmp(&b.close.token))
            .then(a.close.offset.cmp(&b.close.offset))
    });

    let end_offsets: Vec<usize> = pairs
        .iter()
        .map(|p| char_len(&tokens[p.close.token]).saturating_sub(p.close.offset))
        .collect();

    let mut changes = 0;
    for (pair, end_offset) in pairs.iter().zip(end_offsets) {
        let start_offset = pair.open.offset;
        let moved = usize::from(start_offset != 0) + usize::from(end_offset != 0);
        if moved > 0 && options.delete_interrupted {
            changes += 1;
            continue;
        }
        changes += moved;

        let open = if options.add_offset_notations {
            with_offsets(pair.open.tag, start_offset, end_offset)
        } else {
            pair.open.tag.to_string()
        };
        tokens[pair.open.token].insert_str(0, &open);
        tokens[pair.close.token].push_str(pair.close.tag);
    }

    if changes > 0 {
        debug!(pairs = pairs.len(), changes, "tags moved to token edges");
    }
    Ok(Desubtokenized {
        text: tokens.concat(),
        changes,
    })
}
