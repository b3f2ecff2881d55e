/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The grammars the rule parser hands sub-ranges to.
//!
//! Property values, selectors and media feature values have grammars of their own
//! that are much larger than the rule grammar. The rule parser only needs a yes/no
//! answer (and a stored form) from each of them, which is what these traits provide.
//! `BasicGrammar` implements all of them with syntactic checks only.

use std::fmt;

use crate::nth::parse_nth;
use crate::parser::{BlockRole, ParseError, ParseErrorKind, TokenRange};
use crate::properties::{PropertyId, UnitType};
use crate::rules::{Declaration, PropertyName, RuleType};
use crate::serializer::ToCss;
use crate::stylesheet::Namespaces;
use crate::tokenizer::Token;

/// The value grammar of properties.
pub trait ValueGrammar {
    /// Parse the value of a known property, in the given rule context.
    ///
    /// On success, append the resulting declarations (more than one for shorthands)
    /// to `declarations`. The range has the `!important` marker already removed
    /// and may have leading and trailing whitespace.
    fn parse_value<'t, 'i>(
        &self,
        property: PropertyId,
        value: TokenRange<'t, 'i>,
        important: bool,
        context: RuleType,
        declarations: &mut Vec<Declaration>,
    ) -> Result<(), ParseError>;

    /// Parse the value of a custom property (`--*`).
    fn parse_custom_property_value<'t, 'i>(
        &self,
        name: &str,
        value: TokenRange<'t, 'i>,
        important: bool,
    ) -> Result<Declaration, ParseError>;
}

/// The selector grammar.
pub trait SelectorGrammar {
    /// Parse the prelude of a style rule.
    fn parse_selector_list<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
        namespaces: &Namespaces,
    ) -> Result<SelectorList, ParseError>;

    /// Parse the prelude of a `@page` rule.
    fn parse_page_selector<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
    ) -> Result<SelectorList, ParseError>;
}

/// Checks the value of a media feature, like `(min-width: 900px)`.
pub trait MediaFeatureValidator {
    /// `name` is ASCII lower-case. `value` is empty for the boolean form `(color)`,
    /// and otherwise holds numbers, percentages, dimensions, delimiters and identifiers only.
    fn validate(&self, name: &str, value: &[Token]) -> bool;
}

/// All the collaborators the rule parser needs.
pub trait Grammar: ValueGrammar + SelectorGrammar + MediaFeatureValidator {}

impl<T> Grammar for T where T: ValueGrammar + SelectorGrammar + MediaFeatureValidator {}

/// A parsed selector list, kept as normalized text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SelectorList {
    /// One entry per comma-separated selector.
    pub selectors: Vec<String>,
}

impl SelectorList {
    /// Whether the list has no selector, or only an empty one.
    pub fn is_empty(&self) -> bool {
        self.selectors.iter().all(|s| s.is_empty())
    }
}

impl ToCss for SelectorList {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                dest.write_str(", ")?;
            }
            dest.write_str(selector)?;
        }
        Ok(())
    }
}

/// Syntax-only implementations of all the grammar traits.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicGrammar;

/// Descriptors that only make sense in `@font-face`, `@viewport` or `@page`.
fn descriptor_context(property: PropertyId) -> Option<RuleType> {
    match property {
        PropertyId::Src | PropertyId::UnicodeRange | PropertyId::FontDisplay => {
            Some(RuleType::FontFace)
        }
        PropertyId::MinZoom
        | PropertyId::MaxZoom
        | PropertyId::UserZoom
        | PropertyId::Orientation => Some(RuleType::Viewport),
        PropertyId::Size => Some(RuleType::Page),
        _ => None,
    }
}

fn allowed_in(property: PropertyId, context: RuleType) -> bool {
    match context {
        RuleType::FontFace => matches!(
            property,
            PropertyId::FontFamily
                | PropertyId::Src
                | PropertyId::UnicodeRange
                | PropertyId::FontDisplay
                | PropertyId::FontStyle
                | PropertyId::FontWeight
        ),
        RuleType::Viewport => matches!(
            property,
            PropertyId::Width
                | PropertyId::Height
                | PropertyId::MinWidth
                | PropertyId::MaxWidth
                | PropertyId::MinHeight
                | PropertyId::MaxHeight
                | PropertyId::Zoom
                | PropertyId::MinZoom
                | PropertyId::MaxZoom
                | PropertyId::UserZoom
                | PropertyId::Orientation
        ),
        _ => match descriptor_context(property) {
            Some(descriptor_context) => descriptor_context == context,
            None => true,
        },
    }
}

/// Whether a value is made of well-formed tokens:
/// no bad strings or urls, no closing bracket without its opening one.
/// Unless `allow_blocks_and_bang`, `{}` blocks and a top-level `!` are also rejected.
fn is_well_formed(value: &TokenRange, allow_blocks_and_bang: bool) -> bool {
    let mut depth = 0usize;
    for (token, role) in value.tokens_with_roles() {
        match role {
            BlockRole::Start => {
                if !allow_blocks_and_bang && *token == Token::CurlyBracketBlock {
                    return false;
                }
                depth += 1;
                continue;
            }
            BlockRole::End => {
                depth = depth.saturating_sub(1);
                continue;
            }
            BlockRole::NotBlock => {}
        }
        match *token {
            Token::BadString | Token::BadUrl => return false,
            Token::CloseParenthesis | Token::CloseSquareBracket | Token::CloseCurlyBracket => {
                return false
            }
            Token::Delim('!') if depth == 0 && !allow_blocks_and_bang => return false,
            _ => {}
        }
    }
    true
}

impl ValueGrammar for BasicGrammar {
    fn parse_value<'t, 'i>(
        &self,
        property: PropertyId,
        value: TokenRange<'t, 'i>,
        important: bool,
        context: RuleType,
        declarations: &mut Vec<Declaration>,
    ) -> Result<(), ParseError> {
        let value = value.trim_whitespace();
        let invalid = || value.new_error(ParseErrorKind::InvalidValue(property.name().to_owned()));
        if value.at_end() || !allowed_in(property, context) || !is_well_formed(&value, false) {
            return Err(invalid());
        }
        declarations.push(Declaration {
            name: PropertyName::Known(property),
            value: value.serialize(),
            important,
        });
        Ok(())
    }

    fn parse_custom_property_value<'t, 'i>(
        &self,
        name: &str,
        value: TokenRange<'t, 'i>,
        important: bool,
    ) -> Result<Declaration, ParseError> {
        let value = value.trim_whitespace();
        if !is_well_formed(&value, true) {
            return Err(value.new_error(ParseErrorKind::InvalidValue(name.to_owned())));
        }
        Ok(Declaration {
            name: PropertyName::Custom(name.to_owned()),
            value: value.source_text().to_owned(),
            important,
        })
    }
}

fn is_combinator(token: &Token) -> bool {
    matches!(*token, Token::Delim('>') | Token::Delim('+') | Token::Delim('~'))
}

fn is_nth_function(name: &str) -> Option<bool> {
    // The value says whether an `of <selector>` suffix is allowed.
    match_ignore_ascii_case! { name,
        "nth-child" | "nth-last-child" => Some(true),
        "nth-of-type" | "nth-last-of-type" => Some(false),
        _ => None,
    }
}

fn invalid_selector(range: &TokenRange) -> ParseError {
    range.new_error(ParseErrorKind::InvalidSelector)
}

/// Check one complex selector, without its surrounding whitespace.
fn check_selector(selector: TokenRange, namespaces: &Namespaces) -> Result<(), ParseError> {
    if selector.at_end() || !is_well_formed(&selector, false) {
        return Err(invalid_selector(&selector));
    }
    let tokens = selector.tokens();
    if tokens.first().map_or(false, is_combinator) || tokens.last().map_or(false, is_combinator) {
        return Err(invalid_selector(&selector));
    }

    let mut range = selector;
    let mut previous: Option<&Token> = None;
    while !range.at_end() {
        let token_range = range;
        if range.peek_block_role() == BlockRole::Start {
            let token = range.peek();
            let nth = match (previous, token) {
                (Some(&Token::Colon), &Token::Function(ref name)) => is_nth_function(name),
                _ => None,
            };
            let mut arguments = range.consume_block();
            if let Some(allows_of) = nth {
                parse_nth(&mut arguments)?;
                arguments.consume_whitespace();
                if !arguments.at_end() {
                    let is_of = matches!(
                        *arguments.consume_including_whitespace(),
                        Token::Ident(ref ident) if ident.eq_ignore_ascii_case("of")
                    );
                    if !allows_of || !is_of || arguments.at_end() {
                        return Err(invalid_selector(&arguments));
                    }
                }
            }
            previous = Some(token);
            continue;
        }
        let token = range.consume();
        match *token {
            Token::Semicolon => return Err(invalid_selector(&token_range)),
            // `prefix|name`: the prefix must have been declared by `@namespace`.
            Token::Delim('|') => {
                if let Some(&Token::Ident(ref prefix)) = previous {
                    let followed_by_name =
                        matches!(*range.peek(), Token::Ident(_) | Token::Delim('*'));
                    if followed_by_name && !namespaces.has_prefix(prefix) {
                        return Err(invalid_selector(&token_range));
                    }
                }
            }
            _ => {}
        }
        previous = Some(token);
    }
    Ok(())
}

impl SelectorGrammar for BasicGrammar {
    fn parse_selector_list<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
        namespaces: &Namespaces,
    ) -> Result<SelectorList, ParseError> {
        let mut selectors = Vec::new();
        let mut range = prelude;
        loop {
            let start = range;
            while !range.at_end() && *range.peek() != Token::Comma {
                range.consume_component_value();
            }
            let selector = start.until(&range).trim_whitespace();
            check_selector(selector, namespaces)?;
            selectors.push(selector.serialize());
            if range.at_end() {
                break;
            }
            // Comma
            range.consume();
        }
        Ok(SelectorList { selectors })
    }

    fn parse_page_selector<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
    ) -> Result<SelectorList, ParseError> {
        let mut range = prelude;
        range.consume_whitespace();
        let mut selector = String::new();
        if let Token::Ident(ref page_type) = *range.peek() {
            selector.push_str(page_type);
            range.consume();
        }
        if *range.peek() == Token::Colon {
            range.consume();
            match *range.consume() {
                Token::Ident(ref pseudo) => {
                    selector.push(':');
                    selector.push_str(pseudo);
                }
                _ => return Err(range.new_error(ParseErrorKind::InvalidSelector)),
            }
        }
        range.consume_whitespace();
        if !range.at_end() {
            return Err(range.new_error(ParseErrorKind::InvalidSelector));
        }
        Ok(SelectorList {
            selectors: vec![selector],
        })
    }
}

/// What a media feature accepts as its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FeatureValue {
    Length,
    Ratio,
    Resolution,
    Integer,
    Keyword(&'static [&'static str]),
}

struct MediaFeature {
    value: FeatureValue,
    /// Whether `min-` and `max-` prefixes apply.
    range: bool,
}

fn media_feature(name: &str) -> Option<&'static MediaFeature> {
    static LENGTH: MediaFeature = MediaFeature {
        value: FeatureValue::Length,
        range: true,
    };
    static RATIO: MediaFeature = MediaFeature {
        value: FeatureValue::Ratio,
        range: true,
    };
    static RESOLUTION: MediaFeature = MediaFeature {
        value: FeatureValue::Resolution,
        range: true,
    };
    static INTEGER: MediaFeature = MediaFeature {
        value: FeatureValue::Integer,
        range: true,
    };
    static GRID: MediaFeature = MediaFeature {
        value: FeatureValue::Integer,
        range: false,
    };
    static ORIENTATION: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["portrait", "landscape"]),
        range: false,
    };
    static SCAN: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["interlace", "progressive"]),
        range: false,
    };
    static HOVER: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["none", "hover"]),
        range: false,
    };
    static POINTER: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["none", "coarse", "fine"]),
        range: false,
    };
    static COLOR_SCHEME: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["light", "dark"]),
        range: false,
    };
    static REDUCED_MOTION: MediaFeature = MediaFeature {
        value: FeatureValue::Keyword(&["no-preference", "reduce"]),
        range: false,
    };
    match_ignore_ascii_case! { name,
        "width" | "height" | "device-width" | "device-height" => Some(&LENGTH),
        "aspect-ratio" | "device-aspect-ratio" => Some(&RATIO),
        "resolution" => Some(&RESOLUTION),
        "color" | "color-index" | "monochrome" => Some(&INTEGER),
        "grid" => Some(&GRID),
        "orientation" => Some(&ORIENTATION),
        "scan" => Some(&SCAN),
        "hover" | "any-hover" => Some(&HOVER),
        "pointer" | "any-pointer" => Some(&POINTER),
        "prefers-color-scheme" => Some(&COLOR_SCHEME),
        "prefers-reduced-motion" => Some(&REDUCED_MOTION),
        _ => None,
    }
}

fn is_positive_integer(token: &Token) -> bool {
    matches!(*token, Token::Number(value) if value.int_value.map_or(false, |i| i > 0))
}

fn value_matches(kind: FeatureValue, value: &[Token]) -> bool {
    match (kind, value) {
        (FeatureValue::Length, [Token::Dimension(number, unit)]) => {
            number.value >= 0. && UnitType::from_unit(unit) == Some(UnitType::Length)
        }
        (FeatureValue::Length, [Token::Number(number)]) => number.value == 0.,
        (FeatureValue::Ratio, [numerator, Token::Delim('/'), denominator]) => {
            is_positive_integer(numerator) && is_positive_integer(denominator)
        }
        (FeatureValue::Resolution, [Token::Dimension(number, unit)]) => {
            number.value > 0. && UnitType::from_unit(unit) == Some(UnitType::Resolution)
        }
        (FeatureValue::Integer, [Token::Number(number)]) => {
            number.int_value.map_or(false, |i| i >= 0)
        }
        (FeatureValue::Keyword(keywords), [Token::Ident(ident)]) => {
            keywords.iter().any(|k| ident.eq_ignore_ascii_case(k))
        }
        _ => false,
    }
}

impl MediaFeatureValidator for BasicGrammar {
    fn validate(&self, name: &str, value: &[Token]) -> bool {
        let unprefixed = name
            .strip_prefix("min-")
            .or_else(|| name.strip_prefix("max-"));
        let (feature, prefixed) = match unprefixed {
            Some(unprefixed) => match media_feature(unprefixed) {
                Some(feature) if feature.range => (feature, true),
                _ => return false,
            },
            None => match media_feature(name) {
                Some(feature) => (feature, false),
                None => return false,
            },
        };
        if value.is_empty() {
            return !prefixed;
        }
        value_matches(feature.value, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TokenList;

    fn selectors(css: &str, namespaces: &Namespaces) -> Option<Vec<String>> {
        let list = TokenList::new(css);
        BasicGrammar
            .parse_selector_list(list.range(), namespaces)
            .ok()
            .map(|list| list.selectors)
    }

    #[test]
    fn selector_lists() {
        let none = Namespaces::default();
        assert_eq!(
            selectors("a ,  b > c", &none),
            Some(vec!["a".to_owned(), "b > c".to_owned()])
        );
        assert_eq!(selectors("a,", &none), None);
        assert_eq!(selectors("a;b", &none), None);
        assert_eq!(selectors("> a", &none), None);
        assert_eq!(
            selectors("li:nth-child(odd)", &none),
            Some(vec!["li:nth-child(odd)".to_owned()])
        );
        assert!(selectors("li:nth-child(2n+1)", &none).is_some());
        assert!(selectors("li:NTH-LAST-CHILD(-n+ 3)", &none).is_some());
        assert_eq!(selectors("li:nth-child(2n+1 of .x)", &none).map(|s| s.len()), Some(1));
        assert_eq!(selectors("li:nth-of-type(2n+1 of .x)", &none), None);
        assert_eq!(selectors("li:nth-child(foo)", &none), None);
    }

    #[test]
    fn selector_namespace_prefixes() {
        let mut namespaces = Namespaces::default();
        assert_eq!(selectors("svg|rect", &namespaces), None);
        assert!(selectors("*|rect", &namespaces).is_some());
        assert!(selectors("[lang|=en]", &namespaces).is_some());
        namespaces.add(Some("svg".into()), "http://www.w3.org/2000/svg".into());
        assert!(selectors("svg|rect", &namespaces).is_some());
    }

    #[test]
    fn page_selectors() {
        let page = |css: &str| {
            let list = TokenList::new(css);
            BasicGrammar.parse_page_selector(list.range()).ok().map(|list| list.selectors)
        };
        assert_eq!(page(""), Some(vec![String::new()]));
        assert_eq!(page(" :first "), Some(vec![":first".to_owned()]));
        assert_eq!(page("toc:left"), Some(vec!["toc:left".to_owned()]));
        assert_eq!(page("toc left"), None);
        assert_eq!(page(":"), None);
    }

    #[test]
    fn values() {
        let parse = |property, css: &str, context| {
            let list = TokenList::new(css);
            let mut declarations = Vec::new();
            BasicGrammar
                .parse_value(property, list.range(), false, context, &mut declarations)
                .ok()
                .map(|()| declarations[0].value.clone())
        };
        assert_eq!(
            parse(PropertyId::Border, "  1px   solid red ", RuleType::Style),
            Some("1px solid red".to_owned())
        );
        assert_eq!(parse(PropertyId::Color, "  ", RuleType::Style), None);
        assert_eq!(parse(PropertyId::Color, "red ! foo", RuleType::Style), None);
        assert_eq!(parse(PropertyId::Color, "{ red }", RuleType::Style), None);
        assert_eq!(parse(PropertyId::Color, "red)", RuleType::Style), None);
        assert_eq!(parse(PropertyId::Src, "url(a.woff)", RuleType::Style), None);
        assert_eq!(
            parse(PropertyId::Src, "url(a.woff)", RuleType::FontFace),
            Some("url(a.woff)".to_owned())
        );
        assert_eq!(parse(PropertyId::Color, "red", RuleType::FontFace), None);
    }

    #[test]
    fn media_features() {
        let validate = |name: &str, css: &str| {
            let list = TokenList::new(css);
            let value: Vec<Token> = list
                .tokens()
                .iter()
                .filter(|t| !matches!(**t, Token::WhiteSpace(_)))
                .cloned()
                .collect();
            BasicGrammar.validate(name, &value)
        };
        assert!(validate("min-width", "900px"));
        assert!(validate("width", "0"));
        assert!(!validate("min-width", "900"));
        assert!(!validate("min-width", ""));
        assert!(validate("color", ""));
        assert!(validate("aspect-ratio", "16/9"));
        assert!(!validate("aspect-ratio", "16"));
        assert!(validate("orientation", "PORTRAIT"));
        assert!(!validate("min-orientation", "portrait"));
        assert!(validate("min-resolution", "2dppx"));
        assert!(!validate("blabla", ""));
    }
}
