/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;

use thiserror::Error;

use crate::serializer::{ToCss, TokenSerializationType};
use crate::tokenizer::{source_location, SourceLocation, SourcePosition, Token, Tokenizer};

/// The kinds of error that can make one rule, declaration, or condition be dropped.
///
/// None of them is fatal: the grammar recovers at the smallest unit that failed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseErrorKind {
    /// The input ended where more was expected.
    #[error("unexpected end of input")]
    EndOfInput,
    /// A token that the grammar does not accept at this point.
    #[error("unexpected token")]
    UnexpectedToken,
    /// Input that was left over after a complete construct.
    #[error("unexpected input after the end of the construct")]
    TrailingInput,
    /// A known at-rule where the rule ordering or nesting forbids it.
    #[error("@{0} is not allowed here")]
    DisallowedAtRule(String),
    /// An at-rule nobody knows about.
    #[error("unknown at-rule @{0}")]
    UnknownAtRule(String),
    /// A known at-rule with a prelude that does not match its grammar.
    #[error("invalid @{0} prelude")]
    InvalidPrelude(String),
    /// The selector grammar rejected the prelude of a rule.
    #[error("invalid selector list")]
    InvalidSelector,
    /// A declaration for a property that is neither known nor custom.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    /// The value grammar rejected the value of a declaration.
    #[error("invalid value for `{0}`")]
    InvalidValue(String),
    /// `!important` in a `@font-face` or keyframe block.
    #[error("!important is not allowed in this context")]
    ImportantNotAllowed,
    /// A keyframe selector that is not a list of `from`, `to` or `0%`..`100%`.
    #[error("invalid keyframe selector")]
    InvalidKeyframeSelector,
    /// An `@supports` condition that evaluated to `Invalid`.
    #[error("invalid @supports condition")]
    InvalidSupportsCondition,
    /// Rules or conditions nested deeper than `ParserOptions::max_nesting_depth`.
    #[error("nesting is too deep")]
    NestingTooDeep,
}

/// A local parse error, with the byte offset where it was detected.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{kind} at byte {}", .position.byte_index())]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Where it went wrong.
    pub position: SourcePosition,
}

/// The bracket kind of a block.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum BlockType {
    Parenthesis,
    SquareBracket,
    CurlyBracket,
}

impl BlockType {
    fn opening(token: &Token) -> Option<BlockType> {
        match *token {
            Token::Function(_) | Token::ParenthesisBlock => Some(BlockType::Parenthesis),
            Token::SquareBracketBlock => Some(BlockType::SquareBracket),
            Token::CurlyBracketBlock => Some(BlockType::CurlyBracket),
            _ => None,
        }
    }

    fn closing(token: &Token) -> Option<BlockType> {
        match *token {
            Token::CloseParenthesis => Some(BlockType::Parenthesis),
            Token::CloseSquareBracket => Some(BlockType::SquareBracket),
            Token::CloseCurlyBracket => Some(BlockType::CurlyBracket),
            _ => None,
        }
    }
}

/// The role a token plays in block structure.
///
/// Computed once by `TokenList`, so that a `TokenRange` can skip a balanced block
/// by counting, without keeping a stack.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BlockRole {
    /// Any token that neither opens nor closes a block,
    /// including a closing bracket that does not match the innermost open block.
    NotBlock,
    /// `(`, `[`, `{` or a function token.
    Start,
    /// The `)`, `]` or `}` matching the innermost open block.
    End,
}

/// A comment that was removed from the token sequence,
/// kept for the instrumentation hook.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CommentSpan {
    /// How many tokens of the sequence precede the comment.
    pub tokens_before: usize,
    /// Byte offset of the `/*`.
    pub start: usize,
    /// Byte offset just after the `*/`.
    pub end: usize,
}

/// The token sequence for one parse.
///
/// Owns the tokens, which borrow from the input or own their escape-processed text.
/// Immutable once built: `TokenRange`s are views into it.
pub struct TokenList<'i> {
    input: &'i str,
    tokens: Vec<Token<'i>>,
    block_roles: Vec<BlockRole>,
    /// `offsets[i]` is where token `i` starts; the extra last entry is the input length.
    offsets: Vec<usize>,
    comments: Vec<CommentSpan>,
}

impl<'i> TokenList<'i> {
    /// Tokenize `input`, dropping comments.
    pub fn new(input: &'i str) -> TokenList<'i> {
        TokenList::tokenize(input, false)
    }

    /// Tokenize `input`, recording the position of comments in a side table.
    ///
    /// Comments never appear in the token sequence itself.
    pub fn with_comments(input: &'i str) -> TokenList<'i> {
        TokenList::tokenize(input, true)
    }

    fn tokenize(input: &'i str, retain_comments: bool) -> TokenList<'i> {
        let mut tokenizer = Tokenizer::new(input);
        let mut tokens = Vec::new();
        let mut block_roles = Vec::new();
        let mut offsets = Vec::new();
        let mut comments = Vec::new();
        let mut open_blocks = Vec::new();
        loop {
            let start = tokenizer.current_position().byte_index();
            let token = match tokenizer.next() {
                Some(token) => token,
                None => break,
            };
            if let Token::Comment(_) = token {
                if retain_comments {
                    comments.push(CommentSpan {
                        tokens_before: tokens.len(),
                        start,
                        end: tokenizer.current_position().byte_index(),
                    });
                }
                continue;
            }
            let role = if let Some(block_type) = BlockType::opening(&token) {
                open_blocks.push(block_type);
                BlockRole::Start
            } else if let Some(block_type) = BlockType::closing(&token) {
                if open_blocks.last() == Some(&block_type) {
                    open_blocks.pop();
                    BlockRole::End
                } else {
                    BlockRole::NotBlock
                }
            } else {
                BlockRole::NotBlock
            };
            tokens.push(token);
            block_roles.push(role);
            offsets.push(start);
        }
        offsets.push(input.len());
        TokenList {
            input,
            tokens,
            block_roles,
            offsets,
            comments,
        }
    }

    /// A range over the whole sequence.
    #[inline]
    pub fn range(&self) -> TokenRange<'_, 'i> {
        TokenRange {
            list: self,
            start: 0,
            end: self.tokens.len(),
        }
    }

    /// The tokens, in order.
    #[inline]
    pub fn tokens(&self) -> &[Token<'i>] {
        &self.tokens
    }

    /// The comments that were removed from the sequence, in order.
    #[inline]
    pub fn comments(&self) -> &[CommentSpan] {
        &self.comments
    }

    /// The text that was tokenized.
    #[inline]
    pub fn input(&self) -> &'i str {
        self.input
    }

    /// Line and column of a byte offset, for diagnostics.
    pub fn source_location(&self, position: SourcePosition) -> SourceLocation {
        source_location(self.input, position.byte_index())
    }
}

static EOF_TOKEN: Token<'static> = Token::Eof;

/// A view over a contiguous part of a `TokenList`.
///
/// Copying a range is cheap, and none of its operations allocate.
/// Consuming tokens only moves the start of this view; the list itself never changes.
#[derive(Clone, Copy)]
pub struct TokenRange<'t, 'i> {
    list: &'t TokenList<'i>,
    start: usize,
    end: usize,
}

impl<'t, 'i> TokenRange<'t, 'i> {
    /// Whether all tokens of the range have been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.start >= self.end
    }

    /// The number of tokens left.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Same as `at_end`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.at_end()
    }

    /// The remaining tokens.
    #[inline]
    pub fn tokens(&self) -> &'t [Token<'i>] {
        &self.list.tokens[self.start..self.end]
    }

    /// The list this range is a view of.
    #[inline]
    pub fn list(&self) -> &'t TokenList<'i> {
        self.list
    }

    /// The index of the next token in the whole list.
    #[inline]
    pub fn index(&self) -> usize {
        self.start
    }

    /// The next token, or `Token::Eof` at the end of the range.
    #[inline]
    pub fn peek(&self) -> &'t Token<'i> {
        if self.at_end() {
            &EOF_TOKEN
        } else {
            &self.list.tokens[self.start]
        }
    }

    /// The block role of the next token.
    #[inline]
    pub fn peek_block_role(&self) -> BlockRole {
        if self.at_end() {
            BlockRole::NotBlock
        } else {
            self.list.block_roles[self.start]
        }
    }

    /// Return the next token and move past it.
    ///
    /// Nothing stops at block boundaries: a block-opening token is returned like any other.
    #[inline]
    pub fn consume(&mut self) -> &'t Token<'i> {
        let token = self.peek();
        if !self.at_end() {
            self.start += 1;
        }
        token
    }

    /// Return the next token, then skip any whitespace after it.
    #[inline]
    pub fn consume_including_whitespace(&mut self) -> &'t Token<'i> {
        let token = self.consume();
        self.consume_whitespace();
        token
    }

    /// Skip whitespace tokens.
    #[inline]
    pub fn consume_whitespace(&mut self) {
        while let Token::WhiteSpace(_) = *self.peek() {
            self.start += 1;
        }
    }

    /// Consume a whole block, starting at its opening token,
    /// and return the range of its contents (without the brackets).
    ///
    /// A block left unclosed runs until the end of this range.
    /// If the next token does not open a block, it is consumed alone
    /// and the returned range is empty.
    pub fn consume_block(&mut self) -> TokenRange<'t, 'i> {
        if self.peek_block_role() != BlockRole::Start {
            debug_assert!(false, "consume_block called on a token that does not open a block");
            self.consume();
            return self.sub_range(self.start, self.start);
        }
        let contents_start = self.start + 1;
        let mut nesting_level = 0usize;
        while !self.at_end() {
            let role = self.list.block_roles[self.start];
            self.start += 1;
            match role {
                BlockRole::Start => nesting_level += 1,
                BlockRole::End => {
                    nesting_level -= 1;
                    if nesting_level == 0 {
                        return self.sub_range(contents_start, self.start - 1);
                    }
                }
                BlockRole::NotBlock => {}
            }
        }
        self.sub_range(contents_start, self.end)
    }

    /// Consume one component value: a whole block, or a single token.
    #[inline]
    pub fn consume_component_value(&mut self) {
        if self.peek_block_role() == BlockRole::Start {
            self.consume_block();
        } else {
            self.consume();
        }
    }

    /// The range from the current position of `self`
    /// to the current position of `later`, a copy of `self` that was advanced.
    #[inline]
    pub fn until(&self, later: &TokenRange<'t, 'i>) -> TokenRange<'t, 'i> {
        debug_assert!(std::ptr::eq(self.list, later.list));
        debug_assert!(self.start <= later.start && later.start <= self.end);
        self.sub_range(self.start, later.start)
    }

    /// This range without the tokens at and after relative index `len`.
    #[inline]
    pub fn truncate(&self, len: usize) -> TokenRange<'t, 'i> {
        self.sub_range(self.start, self.end.min(self.start + len))
    }

    /// This range without leading and trailing whitespace.
    pub fn trim_whitespace(mut self) -> TokenRange<'t, 'i> {
        self.consume_whitespace();
        while self.end > self.start {
            match self.list.tokens[self.end - 1] {
                Token::WhiteSpace(_) => self.end -= 1,
                _ => break,
            }
        }
        self
    }

    #[inline]
    fn sub_range(&self, start: usize, end: usize) -> TokenRange<'t, 'i> {
        TokenRange {
            list: self.list,
            start,
            end,
        }
    }

    /// Byte offset where the range starts in the input.
    #[inline]
    pub fn start_offset(&self) -> usize {
        self.list.offsets[self.start.min(self.end)]
    }

    /// Byte offset where the range ends in the input,
    /// which is where the token after it starts.
    #[inline]
    pub fn end_offset(&self) -> usize {
        self.list.offsets[self.end]
    }

    /// Byte offset of the token just before the range,
    /// typically the `{` of a block whose contents this range is.
    #[inline]
    pub fn previous_token_start_offset(&self) -> usize {
        match self.start {
            0 => 0,
            start => self.list.offsets[start - 1],
        }
    }

    /// The input text covered by the range, comments included.
    #[inline]
    pub fn source_text(&self) -> &'i str {
        let input = self.list.input;
        &input[self.start_offset()..self.end_offset()]
    }

    /// The remaining tokens paired with their block role.
    pub fn tokens_with_roles(&self) -> impl Iterator<Item = (&'t Token<'i>, BlockRole)> + 't {
        let roles = &self.list.block_roles[self.start..self.end];
        self.tokens().iter().zip(roles.iter().copied())
    }

    /// The position of the next token, for error reporting.
    #[inline]
    pub fn position(&self) -> SourcePosition {
        SourcePosition(self.start_offset())
    }

    /// Create a new error at the current position.
    #[inline]
    pub fn new_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            position: self.position(),
        }
    }

    /// Create a new error at the current position, unless at the end of the range.
    #[inline]
    pub fn new_unexpected_token_error(&self) -> ParseError {
        if self.at_end() {
            self.new_error(ParseErrorKind::EndOfInput)
        } else {
            self.new_error(ParseErrorKind::UnexpectedToken)
        }
    }

    /// Fail unless the range is exhausted.
    #[inline]
    pub fn expect_exhausted(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.new_error(ParseErrorKind::TrailingInput))
        }
    }

    /// Serialize the remaining tokens back to CSS.
    ///
    /// Whitespace runs become a single space.
    pub fn serialize(&self) -> String {
        let mut s = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.to_css(&mut s);
        s
    }
}

impl<'t, 'i> ToCss for TokenRange<'t, 'i> {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let mut previous = TokenSerializationType::nothing();
        for token in self.tokens() {
            let token_type = token.serialization_type();
            if previous.needs_separator_when_before(token_type) {
                dest.write_str("/**/")?;
            }
            previous = token_type;
            match *token {
                Token::WhiteSpace(_) => dest.write_str(" ")?,
                _ => token.to_css(dest)?,
            }
        }
        Ok(())
    }
}

impl<'t, 'i> fmt::Debug for TokenRange<'t, 'i> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("tokens", &self.tokens())
            .finish()
    }
}
