/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

// https://drafts.csswg.org/css-syntax/#tokenization

use std::borrow::Cow::{self, Borrowed, Owned};
use std::char;

use self::Token::*;

/// One of the pieces the CSS input is broken into.
///
/// Some components use `Cow` in order to borrow from the original input string
/// and avoid allocating/copying when possible.
/// An `Owned` value is text that went through escape processing.
#[derive(PartialEq, Debug, Clone)]
pub enum Token<'a> {
    /// A [`<ident-token>`](https://drafts.csswg.org/css-syntax/#ident-token-diagram)
    Ident(Cow<'a, str>),

    /// A [`<at-keyword-token>`](https://drafts.csswg.org/css-syntax/#at-keyword-token-diagram)
    ///
    /// The value does not include the `@` marker.
    AtKeyword(Cow<'a, str>),

    /// A [`<hash-token>`](https://drafts.csswg.org/css-syntax/#hash-token-diagram) with the type flag set to "unrestricted"
    ///
    /// The value does not include the `#` marker.
    Hash(Cow<'a, str>),

    /// A [`<hash-token>`](https://drafts.csswg.org/css-syntax/#hash-token-diagram) with the type flag set to "id"
    ///
    /// The value does not include the `#` marker.
    IDHash(Cow<'a, str>), // Hash that is a valid ID selector.

    /// A [`<string-token>`](https://drafts.csswg.org/css-syntax/#string-token-diagram)
    ///
    /// The value does not include the quotes.
    QuotedString(Cow<'a, str>),

    /// A [`<url-token>`](https://drafts.csswg.org/css-syntax/#url-token-diagram)
    ///
    /// The value does not include the `url(` `)` markers.  Note that `url( <string-token> )` is represented by a
    /// `Function` token.
    Url(Cow<'a, str>),

    /// A `<delim-token>`
    Delim(char),

    /// A [`<number-token>`](https://drafts.csswg.org/css-syntax/#number-token-diagram)
    Number(NumericValue),

    /// A [`<percentage-token>`](https://drafts.csswg.org/css-syntax/#percentage-token-diagram)
    ///
    /// The value is the number as written, `50%` has a value of 50.
    Percentage(NumericValue),

    /// A [`<dimension-token>`](https://drafts.csswg.org/css-syntax/#dimension-token-diagram)
    Dimension(NumericValue, Cow<'a, str>),

    /// A `U+XXXX-YYYY` unicode range.
    ///
    /// Components are the start and end code points, respectively.
    ///
    /// The tokenizer only reads up to 6 hex digit (up to 0xFF_FFFF),
    /// but does not check that code points are within the range of Unicode (up to U+10_FFFF).
    UnicodeRange(u32, u32),

    /// A [`<whitespace-token>`](https://drafts.csswg.org/css-syntax/#whitespace-token-diagram)
    WhiteSpace(&'a str),

    /// A comment.
    ///
    /// CSS Syntax Level 3 does not generate tokens for comments,
    /// But we do, because we can (borrowed &str makes it cheap).
    ///
    /// The value does not include the `/*` `*/` markers.
    Comment(&'a str),

    /// A `:` `<colon-token>`
    Colon, // :

    /// A `;` `<semicolon-token>`
    Semicolon, // ;

    /// A `,` `<comma-token>`
    Comma, // ,

    /// A `~=` [`<include-match-token>`](https://drafts.csswg.org/css-syntax/#include-match-token-diagram)
    IncludeMatch,

    /// A `|=` [`<dash-match-token>`](https://drafts.csswg.org/css-syntax/#dash-match-token-diagram)
    DashMatch,

    /// A `^=` [`<prefix-match-token>`](https://drafts.csswg.org/css-syntax/#prefix-match-token-diagram)
    PrefixMatch,

    /// A `$=` [`<suffix-match-token>`](https://drafts.csswg.org/css-syntax/#suffix-match-token-diagram)
    SuffixMatch,

    /// A `*=` [`<substring-match-token>`](https://drafts.csswg.org/css-syntax/#substring-match-token-diagram)
    SubstringMatch,

    /// A `||` [`<column-token>`](https://drafts.csswg.org/css-syntax/#column-token-diagram)
    Column,

    /// A `<!--` [`<CDO-token>`](https://drafts.csswg.org/css-syntax/#CDO-token-diagram)
    CDO,

    /// A `-->` [`<CDC-token>`](https://drafts.csswg.org/css-syntax/#CDC-token-diagram)
    CDC,

    /// A [`<function-token>`](https://drafts.csswg.org/css-syntax/#function-token-diagram)
    ///
    /// The value (name) does not include the `(` marker.
    Function(Cow<'a, str>),

    /// A `<(-token>`
    ParenthesisBlock,

    /// A `<[-token>`
    SquareBracketBlock,

    /// A `<{-token>`
    CurlyBracketBlock,

    /// A `<bad-url-token>`
    ///
    /// This token always indicates a parse error.
    BadUrl,

    /// A `<bad-string-token>`
    ///
    /// This token always indicates a parse error.
    BadString,

    /// A `<)-token>`
    CloseParenthesis,

    /// A `<]-token>`
    CloseSquareBracket,

    /// A `<}-token>`
    CloseCurlyBracket,

    /// The end of the input.
    ///
    /// Never produced by the tokenizer itself,
    /// this is what a `TokenRange` yields once it is exhausted.
    Eof,
}

impl<'a> Token<'a> {
    /// Return whether this token represents a parse error.
    ///
    /// `BadUrl` and `BadString` are tokenizer-level parse errors.
    ///
    /// `CloseParenthesis`, `CloseSquareBracket`, and `CloseCurlyBracket` are *unmatched*
    /// and therefore parse errors when returned by one of the `TokenRange::consume*` methods
    /// outside of the block they close.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            *self,
            BadUrl | BadString | CloseParenthesis | CloseSquareBracket | CloseCurlyBracket
        )
    }

    /// Whether the text of this token went through escape processing
    /// and is therefore not a slice of the original input.
    pub fn has_string_backing(&self) -> bool {
        match *self {
            Ident(ref value)
            | AtKeyword(ref value)
            | Hash(ref value)
            | IDHash(ref value)
            | QuotedString(ref value)
            | Url(ref value)
            | Function(ref value)
            | Dimension(_, ref value) => matches!(*value, Owned(_)),
            _ => false,
        }
    }

    /// The string value of the token kinds that have one.
    ///
    /// For `Dimension` this is the unit.
    pub fn value(&self) -> Option<&str> {
        match *self {
            Ident(ref value)
            | AtKeyword(ref value)
            | Hash(ref value)
            | IDHash(ref value)
            | QuotedString(ref value)
            | Url(ref value)
            | Function(ref value)
            | Dimension(_, ref value) => Some(&**value),
            _ => None,
        }
    }
}

/// Whether a number was written with an explicit sign.
///
/// This is used is some cases like the <An+B> micro syntax. (See the `parse_nth` function.)
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NumericSign {
    /// No sign, `5`
    NoSign,
    /// `+5`
    Plus,
    /// `-5`
    Minus,
}

/// The numeric type flag of a number, percentage or dimension.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NumericType {
    /// The source had neither a fractional part nor an exponent.
    Integer,
    /// Anything else.
    Number,
}

/// The numeric value of `Number`, `Percentage` and `Dimension` tokens.
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct NumericValue {
    /// The value as a float
    pub value: f32,

    /// If the origin source did not include a fractional part, the value as an integer.
    pub int_value: Option<i32>,

    /// Whether the number had a `+` or `-` sign.
    pub sign: NumericSign,
}

impl NumericValue {
    /// Whether the source number was an integer.
    #[inline]
    pub fn numeric_type(&self) -> NumericType {
        if self.int_value.is_some() {
            NumericType::Integer
        } else {
            NumericType::Number
        }
    }

    /// Whether the number was written with a leading `+` or `-`.
    #[inline]
    pub fn has_sign(&self) -> bool {
        self.sign != NumericSign::NoSign
    }
}

/// A position from the start of the input, counted in UTF-8 bytes.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct SourcePosition(pub(crate) usize);

impl SourcePosition {
    /// Returns the current byte index in the original input.
    #[inline]
    pub fn byte_index(&self) -> usize {
        self.0
    }
}

/// The line and column number for a given position within the input.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SourceLocation {
    /// The line number, starting at 1 for the first line.
    pub line: u32,

    /// The column number within a line, starting at 1 for first the character of the line.
    pub column: u32,
}

/// Lazily turn CSS text into tokens, one per call to `next`.
///
/// Comments are returned as `Comment` tokens; `TokenList` decides what to do with them.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    /// Counted in bytes, not code points. From 0.
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Start at the beginning of `input`.
    #[inline]
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer { input, position: 0 }
    }

    /// Where the next token starts.
    #[inline]
    pub fn current_position(&self) -> SourcePosition {
        SourcePosition(self.position)
    }

    /// The input from `start_pos` to the current position.
    #[inline]
    pub fn slice_from(&self, start_pos: SourcePosition) -> &'a str {
        &self.input[start_pos.0..self.position]
    }

    /// Line and column of `position`, both starting at 1.
    pub fn source_location(&self, position: SourcePosition) -> SourceLocation {
        source_location(self.input, position.0)
    }

    #[inline]
    fn is_eof(&self) -> bool {
        !self.has_at_least(0)
    }

    // If true, the input has at least `n` bytes left *after* the current one.
    // That is, `tokenizer.byte_at(n)` will not panic.
    #[inline]
    fn has_at_least(&self, n: usize) -> bool {
        self.position + n < self.input.len()
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.position += n
    }

    // Assumes non-EOF
    #[inline]
    fn next_byte_unchecked(&self) -> u8 {
        self.byte_at(0)
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        self.input.as_bytes()[self.position + offset]
    }

    #[inline]
    fn next_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).cloned()
    }

    // Assumes non-EOF
    #[inline]
    fn next_char(&self) -> char {
        self.input[self.position..].chars().next().unwrap_or('\u{FFFD}')
    }

    #[inline]
    fn consume_char(&mut self) -> char {
        let c = self.next_char();
        self.position += c.len_utf8();
        c
    }

    #[inline]
    fn has_newline_at(&self, offset: usize) -> bool {
        self.position + offset < self.input.len()
            && matches!(self.byte_at(offset), b'\n' | b'\r' | b'\x0C')
    }

    #[inline]
    fn starts_with(&self, needle: &[u8]) -> bool {
        self.input.as_bytes()[self.position..].starts_with(needle)
    }

    // Skip a newline, treating `\r\n` as one.
    #[inline]
    fn consume_newline(&mut self) {
        let byte = self.next_byte_unchecked();
        self.advance(1);
        if byte == b'\r' && self.next_byte() == Some(b'\n') {
            self.advance(1);
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    #[inline]
    fn next(&mut self) -> Option<Token<'a>> {
        next_token(self)
    }
}

/// Tokenize all of `input`, whitespace and comments included.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}

pub(crate) fn source_location(input: &str, target: usize) -> SourceLocation {
    let mut line = 1;
    let mut line_start = 0;
    let bytes = input.as_bytes();
    let target = target.min(bytes.len());
    let mut i = 0;
    while i < target {
        match bytes[i] {
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') && i + 1 < target {
                    i += 1;
                }
                line += 1;
                line_start = i + 1;
            }
            b'\n' | b'\x0C' => {
                line += 1;
                line_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    SourceLocation {
        line,
        // `target == line_start` at the beginning of the line,
        // so add 1 so that the column numbers start at 1.
        column: (input[line_start..target].chars().count() + 1) as u32,
    }
}

fn next_token<'a>(tokenizer: &mut Tokenizer<'a>) -> Option<Token<'a>> {
    if tokenizer.is_eof() {
        return None;
    }
    let b = tokenizer.next_byte_unchecked();
    let token = match b {
        b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' => {
            let start_position = tokenizer.current_position();
            tokenizer.advance(1);
            while let Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0C') = tokenizer.next_byte() {
                tokenizer.advance(1);
            }
            WhiteSpace(tokenizer.slice_from(start_position))
        }
        b'"' => consume_string(tokenizer, false),
        b'#' => {
            tokenizer.advance(1);
            if is_ident_start(tokenizer) {
                IDHash(consume_name(tokenizer))
            } else if !tokenizer.is_eof()
                && match tokenizer.next_byte_unchecked() {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'\0' => true,
                    b'\\' => !tokenizer.has_newline_at(1),
                    byte => !byte.is_ascii(),
                }
            {
                Hash(consume_name(tokenizer))
            } else {
                Delim('#')
            }
        }
        b'$' => {
            if tokenizer.starts_with(b"$=") {
                tokenizer.advance(2);
                SuffixMatch
            } else {
                tokenizer.advance(1);
                Delim('$')
            }
        }
        b'\'' => consume_string(tokenizer, true),
        b'(' => {
            tokenizer.advance(1);
            ParenthesisBlock
        }
        b')' => {
            tokenizer.advance(1);
            CloseParenthesis
        }
        b'*' => {
            if tokenizer.starts_with(b"*=") {
                tokenizer.advance(2);
                SubstringMatch
            } else {
                tokenizer.advance(1);
                Delim('*')
            }
        }
        b'+' => {
            if starts_number_after_sign(tokenizer) {
                consume_numeric(tokenizer)
            } else {
                tokenizer.advance(1);
                Delim('+')
            }
        }
        b',' => {
            tokenizer.advance(1);
            Comma
        }
        b'-' => {
            if starts_number_after_sign(tokenizer) {
                consume_numeric(tokenizer)
            } else if tokenizer.starts_with(b"-->") {
                tokenizer.advance(3);
                CDC
            } else if is_ident_start(tokenizer) {
                consume_ident_like(tokenizer)
            } else {
                tokenizer.advance(1);
                Delim('-')
            }
        }
        b'.' => {
            if tokenizer.has_at_least(1) && tokenizer.byte_at(1).is_ascii_digit() {
                consume_numeric(tokenizer)
            } else {
                tokenizer.advance(1);
                Delim('.')
            }
        }
        b'/' if tokenizer.starts_with(b"/*") => Comment(consume_comment(tokenizer)),
        b'0'..=b'9' => consume_numeric(tokenizer),
        b':' => {
            tokenizer.advance(1);
            Colon
        }
        b';' => {
            tokenizer.advance(1);
            Semicolon
        }
        b'<' => {
            if tokenizer.starts_with(b"<!--") {
                tokenizer.advance(4);
                CDO
            } else {
                tokenizer.advance(1);
                Delim('<')
            }
        }
        b'@' => {
            tokenizer.advance(1);
            if is_ident_start(tokenizer) {
                AtKeyword(consume_name(tokenizer))
            } else {
                Delim('@')
            }
        }
        b'u' | b'U' => {
            if tokenizer.has_at_least(2)
                && tokenizer.byte_at(1) == b'+'
                && matches!(tokenizer.byte_at(2), b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' | b'?')
            {
                consume_unicode_range(tokenizer)
            } else {
                consume_ident_like(tokenizer)
            }
        }
        b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'\0' => consume_ident_like(tokenizer),
        b'[' => {
            tokenizer.advance(1);
            SquareBracketBlock
        }
        b'\\' => {
            if !tokenizer.has_newline_at(1) {
                consume_ident_like(tokenizer)
            } else {
                tokenizer.advance(1);
                Delim('\\')
            }
        }
        b']' => {
            tokenizer.advance(1);
            CloseSquareBracket
        }
        b'^' => {
            if tokenizer.starts_with(b"^=") {
                tokenizer.advance(2);
                PrefixMatch
            } else {
                tokenizer.advance(1);
                Delim('^')
            }
        }
        b'{' => {
            tokenizer.advance(1);
            CurlyBracketBlock
        }
        b'|' => {
            if tokenizer.starts_with(b"|=") {
                tokenizer.advance(2);
                DashMatch
            } else if tokenizer.starts_with(b"||") {
                tokenizer.advance(2);
                Column
            } else {
                tokenizer.advance(1);
                Delim('|')
            }
        }
        b'}' => {
            tokenizer.advance(1);
            CloseCurlyBracket
        }
        b'~' => {
            if tokenizer.starts_with(b"~=") {
                tokenizer.advance(2);
                IncludeMatch
            } else {
                tokenizer.advance(1);
                Delim('~')
            }
        }
        _ => {
            if !b.is_ascii() {
                consume_ident_like(tokenizer)
            } else {
                tokenizer.advance(1);
                Delim(b as char)
            }
        }
    };
    Some(token)
}

#[inline]
fn starts_number_after_sign(tokenizer: &Tokenizer) -> bool {
    (tokenizer.has_at_least(1) && tokenizer.byte_at(1).is_ascii_digit())
        || (tokenizer.has_at_least(2)
            && tokenizer.byte_at(1) == b'.'
            && tokenizer.byte_at(2).is_ascii_digit())
}

fn consume_comment<'a>(tokenizer: &mut Tokenizer<'a>) -> &'a str {
    tokenizer.advance(2); // consume "/*"
    let start_position = tokenizer.current_position();
    match tokenizer.input[tokenizer.position..].find("*/") {
        Some(offset) => {
            tokenizer.advance(offset);
            let content = tokenizer.slice_from(start_position);
            tokenizer.advance(2);
            content
        }
        None => {
            tokenizer.position = tokenizer.input.len();
            tokenizer.slice_from(start_position)
        }
    }
}

fn consume_string<'a>(tokenizer: &mut Tokenizer<'a>, single_quote: bool) -> Token<'a> {
    match consume_quoted_string(tokenizer, single_quote) {
        Ok(value) => QuotedString(value),
        Err(()) => BadString,
    }
}

/// Return `Err(())` on syntax error (ie. unescaped newline)
fn consume_quoted_string<'a>(
    tokenizer: &mut Tokenizer<'a>,
    single_quote: bool,
) -> Result<Cow<'a, str>, ()> {
    tokenizer.advance(1); // Skip the initial quote
    let start_pos = tokenizer.current_position();
    let mut string;
    loop {
        if tokenizer.is_eof() {
            return Ok(Borrowed(tokenizer.slice_from(start_pos)));
        }
        match tokenizer.next_byte_unchecked() {
            b'"' if !single_quote => {
                let value = tokenizer.slice_from(start_pos);
                tokenizer.advance(1);
                return Ok(Borrowed(value));
            }
            b'\'' if single_quote => {
                let value = tokenizer.slice_from(start_pos);
                tokenizer.advance(1);
                return Ok(Borrowed(value));
            }
            b'\\' | b'\0' => {
                string = tokenizer.slice_from(start_pos).to_owned();
                break;
            }
            b'\n' | b'\r' | b'\x0C' => return Err(()),
            _ => {
                tokenizer.consume_char();
            }
        }
    }

    while !tokenizer.is_eof() {
        if tokenizer.has_newline_at(0) {
            return Err(());
        }
        match tokenizer.consume_char() {
            '"' if !single_quote => break,
            '\'' if single_quote => break,
            '\\' => {
                if !tokenizer.is_eof() {
                    if tokenizer.has_newline_at(0) {
                        // Escaped newline
                        tokenizer.consume_newline();
                    } else {
                        string.push(consume_escape(tokenizer))
                    }
                }
                // else: escaped EOF, do nothing.
            }
            '\0' => string.push('\u{FFFD}'),
            c => string.push(c),
        }
    }
    Ok(Owned(string))
}

#[inline]
fn is_ident_start(tokenizer: &Tokenizer) -> bool {
    !tokenizer.is_eof()
        && match tokenizer.next_byte_unchecked() {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'\0' => true,
            b'-' => {
                tokenizer.has_at_least(1)
                    && match tokenizer.byte_at(1) {
                        b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_' | b'\0' => true,
                        b'\\' => !tokenizer.has_newline_at(2),
                        byte => !byte.is_ascii(),
                    }
            }
            b'\\' => !tokenizer.has_newline_at(1),
            byte => !byte.is_ascii(),
        }
}

fn consume_ident_like<'a>(tokenizer: &mut Tokenizer<'a>) -> Token<'a> {
    let value = consume_name(tokenizer);
    if tokenizer.next_byte() != Some(b'(') {
        return Ident(value);
    }
    tokenizer.advance(1);
    if value.eq_ignore_ascii_case("url") && !url_starts_with_quote(tokenizer) {
        consume_unquoted_url(tokenizer)
    } else {
        Function(value)
    }
}

// `url(` followed by optional whitespace then a quote is a function token,
// the string is tokenized separately.
fn url_starts_with_quote(tokenizer: &Tokenizer) -> bool {
    let rest = &tokenizer.input.as_bytes()[tokenizer.position..];
    rest.iter()
        .find(|&&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C'))
        .map_or(false, |&b| b == b'"' || b == b'\'')
}

fn consume_name<'a>(tokenizer: &mut Tokenizer<'a>) -> Cow<'a, str> {
    let start_pos = tokenizer.current_position();
    let mut value;
    loop {
        if tokenizer.is_eof() {
            return Borrowed(tokenizer.slice_from(start_pos));
        }
        match tokenizer.next_byte_unchecked() {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' => tokenizer.advance(1),
            b'\\' | b'\0' => {
                value = tokenizer.slice_from(start_pos).to_owned();
                break;
            }
            b if b.is_ascii() => return Borrowed(tokenizer.slice_from(start_pos)),
            _ => {
                tokenizer.consume_char();
            }
        }
    }

    while !tokenizer.is_eof() {
        let c = match tokenizer.next_byte_unchecked() {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' => tokenizer.consume_char(),
            b'\\' => {
                if tokenizer.has_newline_at(1) {
                    break;
                }
                tokenizer.advance(1);
                consume_escape(tokenizer)
            }
            b'\0' => {
                tokenizer.advance(1);
                '\u{FFFD}'
            }
            b if b.is_ascii() => break,
            _ => tokenizer.consume_char(),
        };
        value.push(c)
    }
    Owned(value)
}

fn consume_digits(tokenizer: &mut Tokenizer) {
    while let Some(b'0'..=b'9') = tokenizer.next_byte() {
        tokenizer.advance(1)
    }
}

fn consume_numeric<'a>(tokenizer: &mut Tokenizer<'a>) -> Token<'a> {
    // Parse [+-]?\d*(\.\d+)?([eE][+-]?\d+)?
    // But this is always called so that there is at least one digit in \d*(\.\d+)?
    let start_pos = tokenizer.current_position();
    let mut is_integer = true;
    let sign = match tokenizer.next_byte_unchecked() {
        b'-' => NumericSign::Minus,
        b'+' => NumericSign::Plus,
        _ => NumericSign::NoSign,
    };
    if sign != NumericSign::NoSign {
        tokenizer.advance(1);
    }
    consume_digits(tokenizer);
    if tokenizer.has_at_least(1)
        && tokenizer.next_byte_unchecked() == b'.'
        && tokenizer.byte_at(1).is_ascii_digit()
    {
        is_integer = false;
        tokenizer.advance(2); // '.' and first digit
        consume_digits(tokenizer);
    }
    if (tokenizer.has_at_least(1)
        && matches!(tokenizer.next_byte_unchecked(), b'e' | b'E')
        && tokenizer.byte_at(1).is_ascii_digit())
        || (tokenizer.has_at_least(2)
            && matches!(tokenizer.next_byte_unchecked(), b'e' | b'E')
            && matches!(tokenizer.byte_at(1), b'+' | b'-')
            && tokenizer.byte_at(2).is_ascii_digit())
    {
        is_integer = false;
        tokenizer.advance(2); // 'e' or 'E', and sign or first digit
        consume_digits(tokenizer);
    }

    let repr = tokenizer.slice_from(start_pos);
    // The grammar above only ever accepts valid float syntax.
    let value = repr.parse::<f64>().unwrap_or(0.);
    let int_value = if is_integer {
        Some(repr.parse::<i64>().map_or(
            if sign == NumericSign::Minus { i32::MIN } else { i32::MAX },
            |int| int.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        ))
    } else {
        None
    };
    let numeric = NumericValue {
        value: value as f32,
        int_value,
        sign,
    };

    if tokenizer.next_byte() == Some(b'%') {
        tokenizer.advance(1);
        return Percentage(numeric);
    }
    if is_ident_start(tokenizer) {
        Dimension(numeric, consume_name(tokenizer))
    } else {
        Number(numeric)
    }
}

fn consume_unquoted_url<'a>(tokenizer: &mut Tokenizer<'a>) -> Token<'a> {
    while let Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0C') = tokenizer.next_byte() {
        tokenizer.advance(1);
    }
    let start_pos = tokenizer.current_position();
    let mut string;
    loop {
        if tokenizer.is_eof() {
            return Url(Borrowed(tokenizer.slice_from(start_pos)));
        }
        match tokenizer.next_byte_unchecked() {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' => {
                let value = tokenizer.slice_from(start_pos);
                return consume_url_end(tokenizer, Borrowed(value));
            }
            b')' => {
                let value = tokenizer.slice_from(start_pos);
                tokenizer.advance(1);
                return Url(Borrowed(value));
            }
            b'\x01'..=b'\x08' | b'\x0B' | b'\x0E'..=b'\x1F' | b'\x7F' // non-printable
                | b'"' | b'\'' | b'(' => {
                tokenizer.advance(1);
                return consume_bad_url(tokenizer)
            }
            b'\\' | b'\0' => {
                string = tokenizer.slice_from(start_pos).to_owned();
                break;
            }
            _ => {
                tokenizer.consume_char();
            }
        }
    }
    while !tokenizer.is_eof() {
        let next_char = match tokenizer.consume_char() {
            ' ' | '\t' | '\n' | '\r' | '\x0C' => return consume_url_end(tokenizer, Owned(string)),
            ')' => break,
            '\x01'..='\x08' | '\x0B' | '\x0E'..='\x1F' | '\x7F' // non-printable
                | '"' | '\'' | '(' => return consume_bad_url(tokenizer),
            '\\' => {
                if tokenizer.has_newline_at(0) {
                    return consume_bad_url(tokenizer);
                }
                consume_escape(tokenizer)
            }
            '\0' => '\u{FFFD}',
            c => c,
        };
        string.push(next_char)
    }
    Url(Owned(string))
}

fn consume_url_end<'a>(tokenizer: &mut Tokenizer<'a>, string: Cow<'a, str>) -> Token<'a> {
    while !tokenizer.is_eof() {
        match tokenizer.consume_char() {
            ' ' | '\t' | '\n' | '\r' | '\x0C' => {}
            ')' => break,
            _ => return consume_bad_url(tokenizer),
        }
    }
    Url(string)
}

fn consume_bad_url<'a>(tokenizer: &mut Tokenizer<'a>) -> Token<'a> {
    // Consume up to the closing )
    while !tokenizer.is_eof() {
        match tokenizer.consume_char() {
            ')' => break,
            '\\' => {
                if !tokenizer.is_eof() {
                    tokenizer.consume_char(); // Skip an escaped ')' or '\'
                }
            }
            _ => {}
        }
    }
    BadUrl
}

fn consume_unicode_range<'a>(tokenizer: &mut Tokenizer<'a>) -> Token<'a> {
    tokenizer.advance(2); // Skip U+
    let (first, hex_digits) = consume_hex_digits(tokenizer);
    let mut question_marks = 0;
    while question_marks < 6 - hex_digits && tokenizer.next_byte() == Some(b'?') {
        question_marks += 1;
        tokenizer.advance(1)
    }

    if question_marks > 0 {
        return UnicodeRange(
            first << (question_marks * 4),
            ((first + 1) << (question_marks * 4)) - 1,
        );
    }

    let start = first;
    let mut end = start;
    if tokenizer.has_at_least(1)
        && tokenizer.next_byte_unchecked() == b'-'
        && tokenizer.byte_at(1).is_ascii_hexdigit()
    {
        tokenizer.advance(1);
        end = consume_hex_digits(tokenizer).0;
    }
    UnicodeRange(start, end)
}

// Consume up to six hex digits. Return the value and the number of digits.
fn consume_hex_digits(tokenizer: &mut Tokenizer) -> (u32, u32) {
    let mut value = 0;
    let mut digits = 0;
    while digits < 6 {
        let digit = match tokenizer.next_byte().and_then(|b| (b as char).to_digit(16)) {
            Some(digit) => digit,
            None => break,
        };
        value = value * 16 + digit;
        digits += 1;
        tokenizer.advance(1);
    }
    (value, digits)
}

// Assumes that the U+005C REVERSE SOLIDUS (\) has already been consumed
// and that the next input character has already been verified
// to not be a newline.
fn consume_escape(tokenizer: &mut Tokenizer) -> char {
    if tokenizer.is_eof() {
        return '\u{FFFD}';
    } // Escaped EOF
    match tokenizer.next_byte_unchecked() {
        b'0'..=b'9' | b'A'..=b'F' | b'a'..=b'f' => {
            let (c, _) = consume_hex_digits(tokenizer);
            if !tokenizer.is_eof() {
                match tokenizer.next_byte_unchecked() {
                    b' ' | b'\t' => tokenizer.advance(1),
                    b'\n' | b'\x0C' | b'\r' => tokenizer.consume_newline(),
                    _ => {}
                }
            }
            static REPLACEMENT_CHAR: char = '\u{FFFD}';
            if c != 0 {
                char::from_u32(c).unwrap_or(REPLACEMENT_CHAR)
            } else {
                REPLACEMENT_CHAR
            }
        }
        b'\0' => {
            tokenizer.advance(1);
            '\u{FFFD}'
        }
        _ => tokenizer.consume_char(),
    }
}
