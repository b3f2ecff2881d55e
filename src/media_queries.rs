/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Media query lists (`@media`, `@import`) and media conditions.
//!
//! Parsing is a state machine fed one token at a time. A malformed query never fails
//! the whole list: it is replaced by `not all`, which matches nothing, and parsing
//! resumes after the next top-level comma.

use std::fmt;

use smallvec::SmallVec;

use crate::grammar::{BasicGrammar, MediaFeatureValidator};
use crate::parser::{BlockRole, TokenList, TokenRange};
use crate::properties::UnitType;
use crate::serializer::ToCss;
use crate::tokenizer::Token;

/// The `not` / `only` qualifier of a media query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Restrictor {
    /// No qualifier.
    None,
    /// `not`
    Not,
    /// `only`
    Only,
}

/// `(name)` or `(name: value)`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MediaFeatureExpression {
    /// The feature name, ASCII lower-cased.
    pub name: String,
    /// The value as serialized tokens, `None` for the boolean form.
    pub value: Option<String>,
}

impl ToCss for MediaFeatureExpression {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        dest.write_str("(")?;
        dest.write_str(&self.name)?;
        if let Some(ref value) = self.value {
            dest.write_str(": ")?;
            dest.write_str(value)?;
        }
        dest.write_str(")")
    }
}

/// One query of a media query list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MediaQuery {
    /// `not`, `only` or nothing.
    pub restrictor: Restrictor,
    /// The media type, ASCII lower-cased. `all` when the query has none.
    pub media_type: String,
    /// The feature expressions joined by `and`, in order.
    pub expressions: Vec<MediaFeatureExpression>,
}

impl MediaQuery {
    /// `not all`, what a malformed query is replaced with.
    pub fn not_all() -> MediaQuery {
        MediaQuery {
            restrictor: Restrictor::Not,
            media_type: "all".to_owned(),
            expressions: Vec::new(),
        }
    }
}

impl ToCss for MediaQuery {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match self.restrictor {
            Restrictor::Only => dest.write_str("only ")?,
            Restrictor::Not => dest.write_str("not ")?,
            Restrictor::None => {}
        }
        if self.expressions.is_empty() {
            return dest.write_str(&self.media_type);
        }
        if self.media_type != "all" || self.restrictor != Restrictor::None {
            dest.write_str(&self.media_type)?;
            dest.write_str(" and ")?;
        }
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                dest.write_str(" and ")?;
            }
            expression.to_css(dest)?;
        }
        Ok(())
    }
}

/// A comma-separated list of media queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MediaQueryList {
    /// The queries, in order.
    pub queries: Vec<MediaQuery>,
}

impl MediaQueryList {
    /// Whether the list has no query. An empty list matches all media.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl ToCss for MediaQueryList {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        for (i, query) in self.queries.iter().enumerate() {
            if i > 0 {
                dest.write_str(", ")?;
            }
            query.to_css(dest)?;
        }
        Ok(())
    }
}

/// Parse a comma-separated media query list, as in `@media` or `<link media>`.
pub fn parse_media_query_list(text: &str) -> MediaQueryList {
    let list = TokenList::new(text);
    parse_media_query_list_from_range(list.range(), &BasicGrammar)
}

/// Parse a single media condition: no media type, and commas are not separators.
pub fn parse_media_condition(text: &str) -> MediaQueryList {
    let list = TokenList::new(text);
    parse_media_condition_from_range(list.range(), &BasicGrammar)
}

/// Like `parse_media_query_list`, on an already tokenized range.
pub fn parse_media_query_list_from_range<V>(range: TokenRange, validator: &V) -> MediaQueryList
where
    V: MediaFeatureValidator + ?Sized,
{
    MediaQueryParser::new(ParserType::MediaQuerySet, validator).parse(range)
}

/// Like `parse_media_condition`, on an already tokenized range.
pub fn parse_media_condition_from_range<V>(range: TokenRange, validator: &V) -> MediaQueryList
where
    V: MediaFeatureValidator + ?Sized,
{
    MediaQueryParser::new(ParserType::MediaCondition, validator).parse(range)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParserType {
    MediaQuerySet,
    MediaCondition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    ReadRestrictor,
    ReadMediaNot,
    ReadMediaType,
    ReadAnd,
    ReadFeatureStart,
    ReadFeature,
    ReadFeatureColon,
    ReadFeatureValue,
    ReadFeatureEnd,
    SkipUntilComma,
    SkipUntilBlockEnd,
    Done,
}

fn restrictor_keyword(ident: &str) -> Option<Restrictor> {
    match_ignore_ascii_case! { ident,
        "not" => Some(Restrictor::Not),
        "only" => Some(Restrictor::Only),
        _ => None,
    }
}

fn is_restrictor_or_logical_operator(ident: &str) -> bool {
    match_ignore_ascii_case! { ident,
        "not" | "and" | "or" | "only" => true,
        _ => false,
    }
}

/// The query being built.
struct MediaQueryData<'i> {
    restrictor: Restrictor,
    media_type: Option<String>,
    expressions: Vec<MediaFeatureExpression>,
    feature: String,
    value: SmallVec<[Token<'i>; 4]>,
}

impl<'i> MediaQueryData<'i> {
    fn new() -> Self {
        MediaQueryData {
            restrictor: Restrictor::None,
            media_type: None,
            expressions: Vec::new(),
            feature: String::new(),
            value: SmallVec::new(),
        }
    }

    fn clear(&mut self) {
        self.restrictor = Restrictor::None;
        self.media_type = None;
        self.expressions.clear();
        self.feature.clear();
        self.value.clear();
    }

    fn set_media_type(&mut self, media_type: &str) {
        self.media_type = Some(media_type.to_ascii_lowercase());
    }

    fn try_add_token(&mut self, token: &Token<'i>) -> bool {
        match *token {
            Token::Number(_)
            | Token::Percentage(_)
            | Token::Dimension(..)
            | Token::Delim(_)
            | Token::Ident(_) => {
                self.value.push(token.clone());
                true
            }
            _ => false,
        }
    }

    /// Close the current feature expression and report whether it is valid.
    /// The expression is kept either way: an invalid one discards the whole query later.
    fn add_expression<V>(&mut self, validator: &V) -> bool
    where
        V: MediaFeatureValidator + ?Sized,
    {
        let name = self.feature.to_ascii_lowercase();
        let valid = validator.validate(&name, &self.value);
        let value = if self.value.is_empty() {
            None
        } else {
            let mut value = String::new();
            for token in &self.value {
                // Writing to a `String` cannot fail.
                let _ = token.to_css(&mut value);
            }
            Some(value)
        };
        self.expressions.push(MediaFeatureExpression { name, value });
        self.value.clear();
        valid
    }

    fn changed(&self) -> bool {
        self.restrictor != Restrictor::None
            || self.media_type.is_some()
            || !self.expressions.is_empty()
    }

    fn take_media_query(&mut self) -> MediaQuery {
        let query = MediaQuery {
            restrictor: self.restrictor,
            media_type: self.media_type.take().unwrap_or_else(|| "all".to_owned()),
            expressions: std::mem::take(&mut self.expressions),
        };
        self.clear();
        query
    }
}

struct MediaQueryParser<'v, 'i, V: ?Sized> {
    parser_type: ParserType,
    state: State,
    data: MediaQueryData<'i>,
    queries: Vec<MediaQuery>,
    block_level: usize,
    validator: &'v V,
}

impl<'v, 'i, V> MediaQueryParser<'v, 'i, V>
where
    V: MediaFeatureValidator + ?Sized,
{
    fn new(parser_type: ParserType, validator: &'v V) -> Self {
        let state = match parser_type {
            ParserType::MediaQuerySet => State::ReadRestrictor,
            ParserType::MediaCondition => State::ReadMediaNot,
        };
        MediaQueryParser {
            parser_type,
            state,
            data: MediaQueryData::new(),
            queries: Vec::new(),
            block_level: 0,
            validator,
        }
    }

    fn parse(mut self, mut range: TokenRange<'_, 'i>) -> MediaQueryList {
        while !range.at_end() {
            let role = range.peek_block_role();
            let token = range.consume();
            self.process_token(token, role);
        }
        if self.parser_type == ParserType::MediaQuerySet {
            self.process_token(&Token::Eof, BlockRole::NotBlock);
        }

        match self.state {
            State::ReadAnd | State::ReadRestrictor | State::Done | State::ReadMediaNot => {
                if self.data.changed() {
                    let query = self.data.take_media_query();
                    self.queries.push(query);
                }
            }
            _ => self.queries.push(MediaQuery::not_all()),
        }
        MediaQueryList { queries: self.queries }
    }

    fn process_token(&mut self, token: &Token<'i>, role: BlockRole) {
        // Any block other than the parentheses of a feature is skipped whole.
        if role == BlockRole::Start && (*token != Token::ParenthesisBlock || self.block_level > 0) {
            self.state = State::SkipUntilBlockEnd;
        }
        match role {
            BlockRole::Start => self.block_level += 1,
            BlockRole::End => self.block_level = self.block_level.saturating_sub(1),
            BlockRole::NotBlock => {}
        }
        if let Token::WhiteSpace(_) = *token {
            return;
        }
        match self.state {
            State::ReadRestrictor | State::ReadMediaType => self.read_media_type(token),
            State::ReadMediaNot => self.read_media_not(token),
            State::ReadAnd => self.read_and(token),
            State::ReadFeatureStart => self.read_feature_start(token),
            State::ReadFeature => self.read_feature(token),
            State::ReadFeatureColon => self.read_feature_colon(token),
            State::ReadFeatureValue => self.read_feature_value(token),
            State::ReadFeatureEnd => self.read_feature_end(token),
            State::SkipUntilComma => self.skip_until_comma(token),
            State::SkipUntilBlockEnd => self.skip_until_block_end(role),
            State::Done => {}
        }
    }

    fn set_state_and_restrict(&mut self, state: State, restrictor: Restrictor) {
        self.data.restrictor = restrictor;
        self.state = state;
    }

    fn read_media_not(&mut self, token: &Token<'i>) {
        match *token {
            Token::Ident(ref ident) if restrictor_keyword(ident) == Some(Restrictor::Not) => {
                self.set_state_and_restrict(State::ReadFeatureStart, Restrictor::Not)
            }
            _ => self.read_feature_start(token),
        }
    }

    fn read_media_type(&mut self, token: &Token<'i>) {
        match *token {
            Token::ParenthesisBlock => {
                self.state = if self.data.restrictor != Restrictor::None {
                    State::SkipUntilComma
                } else {
                    State::ReadFeature
                };
            }
            Token::Ident(ref ident) => {
                let restrictor = match self.state {
                    State::ReadRestrictor => restrictor_keyword(ident),
                    _ => None,
                };
                if let Some(restrictor) = restrictor {
                    self.set_state_and_restrict(State::ReadMediaType, restrictor);
                } else if self.data.restrictor != Restrictor::None
                    && is_restrictor_or_logical_operator(ident)
                {
                    self.state = State::SkipUntilComma;
                } else {
                    self.data.set_media_type(ident);
                    self.state = State::ReadAnd;
                }
            }
            Token::Eof if self.queries.is_empty() || self.state != State::ReadRestrictor => {
                self.state = State::Done;
            }
            _ => {
                self.state = State::SkipUntilComma;
                if *token == Token::Comma {
                    self.skip_until_comma(token);
                }
            }
        }
    }

    fn read_and(&mut self, token: &Token<'i>) {
        match *token {
            Token::Ident(ref ident) if ident.eq_ignore_ascii_case("and") => {
                self.state = State::ReadFeatureStart;
            }
            Token::Comma if self.parser_type != ParserType::MediaCondition => {
                let query = self.data.take_media_query();
                self.queries.push(query);
                self.state = State::ReadRestrictor;
            }
            Token::Eof => self.state = State::Done,
            _ => self.state = State::SkipUntilComma,
        }
    }

    fn read_feature_start(&mut self, token: &Token<'i>) {
        self.state = match *token {
            Token::ParenthesisBlock => State::ReadFeature,
            _ => State::SkipUntilComma,
        };
    }

    fn read_feature(&mut self, token: &Token<'i>) {
        match *token {
            Token::Ident(ref ident) => {
                self.data.feature.clear();
                self.data.feature.push_str(ident);
                self.state = State::ReadFeatureColon;
            }
            _ => self.state = State::SkipUntilComma,
        }
    }

    fn read_feature_colon(&mut self, token: &Token<'i>) {
        match *token {
            Token::Colon => self.state = State::ReadFeatureValue,
            Token::CloseParenthesis | Token::Eof => self.read_feature_end(token),
            _ => self.state = State::SkipUntilBlockEnd,
        }
    }

    fn read_feature_value(&mut self, token: &Token<'i>) {
        if let Token::Dimension(_, ref unit) = *token {
            if UnitType::from_unit(unit).is_none() {
                self.state = State::SkipUntilComma;
                return;
            }
        }
        self.state = if self.data.try_add_token(token) {
            State::ReadFeatureEnd
        } else {
            State::SkipUntilBlockEnd
        };
    }

    fn read_feature_end(&mut self, token: &Token<'i>) {
        match *token {
            Token::CloseParenthesis | Token::Eof => {
                self.state = if self.data.add_expression(self.validator) {
                    State::ReadAnd
                } else {
                    State::SkipUntilComma
                };
            }
            Token::Delim('/') => {
                self.data.try_add_token(token);
                self.state = State::ReadFeatureValue;
            }
            _ => self.state = State::SkipUntilBlockEnd,
        }
    }

    fn skip_until_comma(&mut self, token: &Token<'i>) {
        let at_separator = match *token {
            Token::Comma => self.block_level == 0,
            Token::Eof => true,
            _ => false,
        };
        if at_separator {
            self.state = State::ReadRestrictor;
            self.data.clear();
            self.queries.push(MediaQuery::not_all());
        }
    }

    fn skip_until_block_end(&mut self, role: BlockRole) {
        if role == BlockRole::End && self.block_level == 0 {
            self.state = State::SkipUntilComma;
        }
    }
}
