use std::{collections::HashMap, fmt::Display, ops::Range};

use tracing::{debug, trace};

/// Identifiers longer than this are split into several lexemes.
pub const MAX_IDENTIFIER_LEN: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
    Symbol,
    Identifier,
    Comment,
    Number,
    CharacterString,
}

impl Display for LexemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexemeKind::Symbol => write!(f, "Symbol"),
            LexemeKind::Identifier => write!(f, "Identifier"),
            LexemeKind::Comment => write!(f, "Comment"),
            LexemeKind::Number => write!(f, "Number"),
            LexemeKind::CharacterString => write!(f, "CharacterString"),
        }
    }
}

/// A classified span `[begin, end)` of the original input, in characters.
///
/// Only comments carry `children`: the comments nested inside them, with
/// offsets in the same coordinate space as the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub begin: usize,
    pub end: usize,
    pub children: Vec<Lexeme>,
}

impl Lexeme {
    pub fn new(kind: LexemeKind, begin: usize, end: usize) -> Self {
        Self::with_children(kind, begin, end, Vec::new())
    }

    pub fn with_children(
        kind: LexemeKind,
        begin: usize,
        end: usize,
        children: Vec<Lexeme>,
    ) -> Self {
        debug_assert!(begin <= end);
        Lexeme {
            kind,
            begin,
            end,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn span(&self) -> Range<usize> {
        self.begin..self.end
    }

    /// The original (not case-folded) text this lexeme covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let byte = |offset: usize| {
            source
                .char_indices()
                .nth(offset)
                .map_or(source.len(), |(byte, _)| byte)
        };
        &source[byte(self.begin)..byte(self.end)]
    }
}

impl Display for Lexeme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{},{}]", self.kind, self.begin, self.end)?;
        if let Some((last, rest)) = self.children.split_last() {
            write!(f, ":")?;
            for child in rest {
                write!(f, "{child}, ")?;
            }
            write!(f, "{last};")?;
        }
        Ok(())
    }
}

/// Splits text into lexemes that cover it with no gaps or overlaps.
///
/// Classification runs against an ASCII lower-cased copy of the input, so
/// `$FF` and `$ff` scan the same; offsets always refer to the input as given.
pub struct Lexer<'de> {
    whole: &'de str,
    folded: String,
    ascii: bool,
    pub byte: usize,
    chars: usize,
    comments: CommentCache,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            folded: input.to_ascii_lowercase(),
            ascii: input.is_ascii(),
            byte: 0,
            chars: 0,
            comments: CommentCache::default(),
        }
    }

    pub fn whole(&self) -> &'de str {
        self.whole
    }
}

impl Iterator for Lexer<'_> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.folded.as_bytes()[self.byte..];
        if rest.is_empty() {
            return None;
        }

        let at = self.byte;
        let mut lexeme = match next_lexeme(rest, at, &mut self.comments) {
            Some(lexeme) => lexeme,
            None => {
                // a whole char, so the next lexeme still starts on a boundary
                let width = self.whole[at..].chars().next().map_or(1, char::len_utf8);
                Lexeme::new(LexemeKind::Symbol, at, at + width)
            }
        };

        let text = &self.whole[lexeme.span()];
        trace!("Lexeme {} at {:?}: {:?}", lexeme.kind, lexeme.span(), text);
        self.byte = lexeme.end;
        if self.ascii {
            self.chars = self.byte;
        } else {
            let begin = self.chars;
            self.chars += text.chars().count();
            to_char_offsets(&mut lexeme, self.whole, at, begin);
        }
        Some(lexeme)
    }
}

/// Rewrites the byte offsets of `lexeme` and its children as char offsets,
/// given that byte `byte_base` is char `char_base`.
fn to_char_offsets(lexeme: &mut Lexeme, whole: &str, byte_base: usize, char_base: usize) {
    let (begin, end) = (lexeme.begin, lexeme.end);
    lexeme.begin = char_base + whole[byte_base..begin].chars().count();
    lexeme.end = lexeme.begin + whole[begin..end].chars().count();
    for child in &mut lexeme.children {
        to_char_offsets(child, whole, begin, lexeme.begin);
    }
}

/// Comment scans already done, keyed by the absolute byte range the scan
/// could see. Unclosed openers would otherwise be rescanned from every
/// enclosing opener and again from every following top-level position.
#[derive(Debug, Default)]
struct CommentCache {
    scanned: HashMap<(usize, usize), Option<Lexeme>>,
}

/// Scans the whole of `text`. Never fails: anything unrecognised becomes a
/// one-character [`LexemeKind::Symbol`].
pub fn tokenize(text: &str) -> Vec<Lexeme> {
    let lexemes: Vec<_> = Lexer::new(text).collect();
    debug!("scanned {} bytes into {} lexemes", text.len(), lexemes.len());
    lexemes
}

/// The lexeme at the start of `text`, or `None` when only the symbol
/// fallback applies.
fn next_lexeme(text: &[u8], at: usize, comments: &mut CommentCache) -> Option<Lexeme> {
    enum Start {
        CharacterString,
        Comment,
        Identifier,
        Number,
    }

    let started = match text {
        [b'\'' | b'#', ..] => Start::CharacterString,
        [b'(', b'*', ..] | [b'{', ..] | [b'/', b'/', ..] => Start::Comment,
        [b'a'..=b'z' | b'_', ..] | [b'&', b'a'..=b'z' | b'_', ..] => Start::Identifier,
        [b'0'..=b'9' | b'%' | b'$' | b'+' | b'-', ..] | [b'&', b'0'..=b'9', ..] => {
            Start::Number
        }
        _ => return None,
    };

    let lexeme = match started {
        Start::CharacterString => {
            Lexeme::new(LexemeKind::CharacterString, at, at + character_string(text))
        }
        Start::Comment => comment(text, at, comments)?,
        Start::Identifier => Lexeme::new(LexemeKind::Identifier, at, at + identifier(text)?),
        Start::Number => Lexeme::new(LexemeKind::Number, at, at + number(text)?),
    };

    (!lexeme.is_empty()).then_some(lexeme)
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_lowercase() || c == b'_'
}

fn is_identifier_char(c: u8) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// `&`? (letter | `_`) (letter | digit | `_`)*, at most [`MAX_IDENTIFIER_LEN`] long.
fn identifier(text: &[u8]) -> Option<usize> {
    let text = &text[..text.len().min(MAX_IDENTIFIER_LEN)];
    let mut current = usize::from(text.first() == Some(&b'&'));
    if !text.get(current).is_some_and(|&c| is_identifier_start(c)) {
        return None;
    }
    current += text[current..]
        .iter()
        .take_while(|&&c| is_identifier_char(c))
        .count();
    Some(current)
}

/// An optionally signed number. A sign with no number after it is not a number.
fn number(text: &[u8]) -> Option<usize> {
    match text.split_first()? {
        (b'+' | b'-', unsigned) => unsigned_number(unsigned).map(|len| len + 1),
        _ => unsigned_number(text),
    }
}

fn unsigned_number(text: &[u8]) -> Option<usize> {
    match text.split_first() {
        Some((b'&', digits)) => radix_digits(digits, |c| matches!(c, b'0'..=b'7')),
        Some((b'%', digits)) => radix_digits(digits, |c| matches!(c, b'0' | b'1')),
        Some((b'$', digits)) => radix_digits(digits, |c| matches!(c, b'0'..=b'9' | b'a'..=b'f')),
        _ => Some(decimal(text)).filter(|&len| len > 0),
    }
}

/// Length of a radix-prefixed integer, prefix included. Needs at least one digit.
fn radix_digits(digits: &[u8], is_digit: impl Fn(u8) -> bool) -> Option<usize> {
    let len = digits.iter().take_while(|&&c| is_digit(c)).count();
    (len > 0).then_some(len + 1)
}

/// digits* [`.` digits*] [`e` [sign] digits*]
///
/// An `e` that ends the input is left for the next lexeme.
fn decimal(text: &[u8]) -> usize {
    let digits = |from: usize| text[from..].iter().take_while(|c| c.is_ascii_digit()).count();

    let mut current = digits(0);
    if text.get(current) == Some(&b'.') {
        current += 1;
        current += digits(current);
    }
    if text.get(current) == Some(&b'e') && current + 1 < text.len() {
        current += 1;
        if matches!(text[current], b'+' | b'-') {
            current += 1;
        }
        current += digits(current);
    }
    current
}

/// Quoted segments and `#<digits>` control codes, up to the end of the line.
///
/// An unterminated quote or a `#` without digits ends the string before it.
fn character_string(text: &[u8]) -> usize {
    let line = &text[..text
        .iter()
        .position(|&c| matches!(c, b'\n' | b'\r'))
        .unwrap_or(text.len())];

    let mut current = 0;
    while current < line.len() {
        let segment = match line[current] {
            b'\'' => line[current + 1..]
                .iter()
                .position(|&c| c == b'\'')
                .map(|close| close + 2),
            b'#' => radix_digits(&line[current + 1..], |c| c.is_ascii_digit()),
            _ => None,
        };
        match segment {
            Some(len) => current += len,
            None => break,
        }
    }
    current
}

fn is_comment_open(text: &[u8]) -> bool {
    text.starts_with(b"(*") || text.starts_with(b"{") || text.starts_with(b"//")
}

/// A `//`, `(* *)` or `{ }` comment starting at `text[0]`, found at absolute
/// offset `at`, with every comment nested inside recorded as a child.
///
/// Line comments end before the newline (or at the end of input). Block and
/// brace comments end at the first close delimiter outside a nested comment;
/// without one there is no comment at all.
fn comment(text: &[u8], at: usize, cache: &mut CommentCache) -> Option<Lexeme> {
    let key = (at, at + text.len());
    if let Some(scanned) = cache.scanned.get(&key) {
        return scanned.clone();
    }
    let scanned = scan_comment(text, at, cache);
    cache.scanned.insert(key, scanned.clone());
    scanned
}

fn scan_comment(text: &[u8], at: usize, cache: &mut CommentCache) -> Option<Lexeme> {
    let (open, close): (usize, Option<&[u8]>) = if text.starts_with(b"//") {
        (2, None)
    } else if text.starts_with(b"(*") {
        (2, Some(&b"*)"[..]))
    } else if text.starts_with(b"{") {
        (1, Some(&b"}"[..]))
    } else {
        return None;
    };

    let text = match close {
        Some(_) => text,
        None => &text[..text.iter().position(|&c| c == b'\n').unwrap_or(text.len())],
    };

    let mut children = Vec::new();
    let mut current = open;
    while current < text.len() {
        if is_comment_open(&text[current..]) {
            if let Some(child) = comment(&text[current..], at + current, cache) {
                trace!("nested comment at {:?}", child.span());
                current = child.end - at;
                children.push(child);
                continue;
            }
        }
        if let Some(close) = close {
            if text[current..].starts_with(close) {
                let end = at + current + close.len();
                return Some(Lexeme::with_children(LexemeKind::Comment, at, end, children));
            }
        }
        current += 1;
    }

    match close {
        Some(_) => None,
        None => Some(Lexeme::with_children(
            LexemeKind::Comment,
            at,
            at + text.len(),
            children,
        )),
    }
}
