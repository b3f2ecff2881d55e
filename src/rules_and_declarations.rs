/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

// https://drafts.csswg.org/css-syntax/#parsing

use tracing::{debug, trace};

use crate::grammar::{BasicGrammar, Grammar, SelectorList};
use crate::media_queries::{
    parse_media_condition_from_range, parse_media_query_list_from_range, MediaQueryList,
};
use crate::observer::{ObserverWrapper, ParserObserver};
use crate::parser::{ParseError, ParseErrorKind, TokenList, TokenRange};
use crate::properties::{is_custom_property_name, PropertyId};
use crate::rules::{
    CharsetRule, CssRule, Declaration, DeclarationBlock, FontFaceRule, ImportRule, KeyframeRule,
    KeyframesRule, MediaRule, NamespaceRule, PageRule, RuleType, StyleRule, SupportsRule,
    ViewportRule,
};
use crate::stylesheet::{Namespaces, StyleSheetSink};
use crate::supports::{supports_condition, DeclarationProbe, SupportsParsingMode, SupportsResult};
use crate::tokenizer::Token;

/// Knobs of a `CssParser`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// How deep `@media` / `@supports` rules and supports conditions may nest.
    /// Anything deeper is dropped.
    pub max_nesting_depth: usize,
    /// Whether `@viewport` is recognized. When not, it is an unknown at-rule.
    pub viewport_rule_enabled: bool,
    /// Keep comment spans in the token list. Always on when an observer is attached.
    pub retain_comments: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            max_nesting_depth: 64,
            viewport_rule_enabled: true,
            retain_comments: false,
        }
    }
}

/// Which rules a rule list accepts at this point.
///
/// In a style sheet this only narrows: after the first rule that is not
/// `@charset`, `@import` or `@namespace`, none of those is accepted anymore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllowedRules {
    /// Anything, including `@charset`. The start of a style sheet.
    AllowCharset,
    /// `@import` and everything after it.
    AllowImport,
    /// `@namespace` and everything after it.
    AllowNamespace,
    /// Style rules and at-rules with a block.
    RegularRules,
    /// Keyframe rules only, inside `@keyframes`.
    KeyframeRules,
    /// Nothing, inside a declaration list.
    NoRules,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuleListType {
    TopLevel,
    Regular,
    Keyframes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AtRuleId {
    Charset,
    Import,
    Namespace,
    Media,
    Supports,
    Viewport,
    FontFace,
    Keyframes,
    WebkitKeyframes,
    Page,
    Unknown,
}

fn at_rule_id(name: &str) -> AtRuleId {
    match_ignore_ascii_case! { name,
        "charset" => AtRuleId::Charset,
        "import" => AtRuleId::Import,
        "namespace" => AtRuleId::Namespace,
        "media" => AtRuleId::Media,
        "supports" => AtRuleId::Supports,
        "viewport" => AtRuleId::Viewport,
        "font-face" => AtRuleId::FontFace,
        "keyframes" => AtRuleId::Keyframes,
        "-webkit-keyframes" => AtRuleId::WebkitKeyframes,
        "page" => AtRuleId::Page,
        _ => AtRuleId::Unknown,
    }
}

fn compute_new_allowed_rules(allowed: AllowedRules, rule: &CssRule) -> AllowedRules {
    match allowed {
        AllowedRules::KeyframeRules | AllowedRules::NoRules => allowed,
        _ => match *rule {
            CssRule::Charset(_) | CssRule::Import(_) => AllowedRules::AllowImport,
            CssRule::Namespace(_) => AllowedRules::AllowNamespace,
            _ => AllowedRules::RegularRules,
        },
    }
}

/// A CSS parser: rules, declarations, and the conditions used by rules.
///
/// Every entry point consumes the parser, so that each parse starts from a fresh state.
///
/// ```
/// use cssrules::{CssParser, CssRule, ParserOptions, StyleSheetContents};
///
/// let mut sheet = StyleSheetContents::new();
/// CssParser::new(&ParserOptions::default())
///     .parse_stylesheet("@media print { a { color: red } }", &mut sheet);
/// assert!(matches!(sheet.rules[0], CssRule::Media(_)));
/// ```
pub struct CssParser<'o, G = BasicGrammar> {
    options: ParserOptions,
    grammar: G,
    observer: Option<&'o mut dyn ParserObserver>,
    namespaces: Namespaces,
}

impl CssParser<'static, BasicGrammar> {
    /// A parser using `BasicGrammar` for values, selectors and media features.
    pub fn new(options: &ParserOptions) -> Self {
        CssParser::with_grammar(options, BasicGrammar)
    }
}

impl Default for CssParser<'static, BasicGrammar> {
    fn default() -> Self {
        CssParser::new(&ParserOptions::default())
    }
}

impl<'o, G> CssParser<'o, G>
where
    G: Grammar,
{
    /// A parser using a custom grammar.
    pub fn with_grammar(options: &ParserOptions, grammar: G) -> Self {
        CssParser {
            options: options.clone(),
            grammar,
            observer: None,
            namespaces: Namespaces::default(),
        }
    }

    /// Report the source offsets of what gets parsed to `observer`.
    pub fn observer<'p>(self, observer: &'p mut dyn ParserObserver) -> CssParser<'p, G> {
        CssParser {
            options: self.options,
            grammar: self.grammar,
            observer: Some(observer),
            namespaces: self.namespaces,
        }
    }

    /// Start with namespaces already declared, as when parsing a rule for an existing sheet.
    pub fn namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    fn tokenize<'i>(&self, text: &'i str) -> TokenList<'i> {
        let list = if self.observer.is_some() || self.options.retain_comments {
            TokenList::with_comments(text)
        } else {
            TokenList::new(text)
        };
        trace!(
            target: "cssrules::rules",
            bytes = text.len(),
            tokens = list.tokens().len(),
            "tokenized"
        );
        list
    }

    /// Parse a style sheet and hand its top-level rules to `sink`.
    ///
    /// `@charset` rules are not appended. Once every rule is parsed, the sink is told
    /// whether the first rule was valid, and gets the `rem` and `@font-face` flags.
    pub fn parse_stylesheet<S>(self, text: &str, sink: &mut S)
    where
        S: StyleSheetSink + ?Sized,
    {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let first_rule_valid =
            parser.consume_rule_list(list.range(), RuleListType::TopLevel, |rule| {
                if let CssRule::Charset(_) = rule {
                    return;
                }
                sink.append_rule(rule);
            });
        sink.set_has_syntactically_valid_css_header(first_rule_valid);
        if parser.uses_rem_units {
            sink.set_uses_rem_units();
        }
        if parser.has_font_face_rule {
            sink.set_has_font_face_rule();
        }
    }

    /// Parse exactly one rule, with nothing but whitespace around it.
    pub fn parse_rule(self, text: &str, allowed: AllowedRules) -> Option<CssRule> {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let mut range = list.range();
        range.consume_whitespace();
        if range.at_end() {
            return None;
        }
        let result = match *range.peek() {
            Token::AtKeyword(_) => parser.consume_at_rule(&mut range, allowed),
            _ => parser.consume_qualified_rule(&mut range, allowed),
        };
        let rule = parser.ok_or_log(result, "rule")?;
        range.consume_whitespace();
        let result = range.expect_exhausted().map(|()| rule);
        parser.ok_or_log(result, "rule")
    }

    /// Parse a declaration list and merge it into `block`.
    ///
    /// Returns whether any declaration was accepted.
    pub fn parse_declaration_list(self, text: &str, block: &mut DeclarationBlock) -> bool {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let declarations = parser.consume_declaration_list(list.range(), RuleType::Style);
        if declarations.is_empty() {
            return false;
        }
        block.merge(DeclarationBlock::finalize(declarations));
        true
    }

    /// Parse the contents of a `style` attribute.
    pub fn parse_inline_style(self, text: &str) -> DeclarationBlock {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        DeclarationBlock::finalize(parser.consume_declaration_list(list.range(), RuleType::Style))
    }

    /// Parse the value of one property, as in `element.style.setProperty()`.
    ///
    /// Shorthands can expand to several declarations. Empty when the value is invalid.
    pub fn parse_value(
        self,
        property: PropertyId,
        text: &str,
        important: bool,
    ) -> Vec<Declaration> {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let mut declarations = Vec::new();
        let result = parser.consume_declaration_value(
            property,
            list.range(),
            important,
            RuleType::Style,
            &mut declarations,
        );
        if parser.ok_or_log(result, "value").is_none() {
            declarations.clear();
        }
        declarations
    }

    /// Parse the value of a custom property.
    pub fn parse_custom_property_value(
        self,
        name: &str,
        text: &str,
        important: bool,
    ) -> Option<Declaration> {
        let list = self.tokenize(text);
        let parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let result = parser.grammar.parse_custom_property_value(name, list.range(), important);
        parser.ok_or_log(result, "custom property value")
    }

    /// Parse a keyframe selector like `from, 50%`. Offsets are in `[0, 1]`.
    ///
    /// Any invalid key makes the whole list invalid.
    pub fn parse_keyframe_key_list(self, text: &str) -> Option<Vec<f32>> {
        let list = self.tokenize(text);
        consume_keyframe_key_list(list.range())
    }

    /// Parse the prelude of a `@page` rule.
    pub fn parse_page_selector(self, text: &str) -> Option<SelectorList> {
        let list = self.tokenize(text);
        let parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let result = parser.grammar.parse_page_selector(list.range());
        parser.ok_or_log(result, "page selector")
    }

    /// Evaluate a supports condition, as in `@supports` or `CSS.supports()`.
    pub fn parse_supports_condition(self, text: &str, mode: SupportsParsingMode) -> SupportsResult {
        let list = self.tokenize(text);
        let mut parser = RuleParser::new(
            &self.grammar,
            &self.options,
            self.observer,
            self.namespaces,
            &list,
        );
        let max_depth = self.options.max_nesting_depth;
        supports_condition(list.range(), &mut parser, mode, max_depth)
    }

    /// Parse a media query list with this parser's media feature validator.
    pub fn parse_media_query_list(self, text: &str) -> MediaQueryList {
        let list = self.tokenize(text);
        parse_media_query_list_from_range(list.range(), &self.grammar)
    }

    /// Parse a media condition with this parser's media feature validator.
    pub fn parse_media_condition(self, text: &str) -> MediaQueryList {
        let list = self.tokenize(text);
        parse_media_condition_from_range(list.range(), &self.grammar)
    }
}

/// The state of one parse.
struct RuleParser<'a, 'o, 't, 'i, G> {
    grammar: &'a G,
    options: &'a ParserOptions,
    observer: Option<ObserverWrapper<'o, 't>>,
    namespaces: Namespaces,
    list: &'t TokenList<'i>,
    depth: usize,
    uses_rem_units: bool,
    has_font_face_rule: bool,
}

impl<'a, 'o, 't, 'i, G> RuleParser<'a, 'o, 't, 'i, G>
where
    G: Grammar,
{
    fn new(
        grammar: &'a G,
        options: &'a ParserOptions,
        observer: Option<&'o mut dyn ParserObserver>,
        namespaces: Namespaces,
        list: &'t TokenList<'i>,
    ) -> Self {
        RuleParser {
            grammar,
            options,
            observer: observer.map(|observer| ObserverWrapper::new(observer, list.comments())),
            namespaces,
            list,
            depth: 0,
            uses_rem_units: false,
            has_font_face_rule: false,
        }
    }

    fn ok_or_log<T>(&self, result: Result<T, ParseError>, what: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                let location = self.list.source_location(error.position);
                debug!(
                    target: "cssrules::rules",
                    line = location.line,
                    column = location.column,
                    error = %error.kind,
                    "dropped {}",
                    what
                );
                None
            }
        }
    }

    fn observe<F>(&mut self, f: F)
    where
        F: FnOnce(&mut (dyn ParserObserver + 'o)),
    {
        if let Some(ref mut wrapper) = self.observer {
            f(wrapper.observer())
        }
    }

    /// Header and body events of a rule whose body is a rule list.
    fn observe_grouping_rule_start(
        &mut self,
        rule_type: RuleType,
        prelude: &TokenRange,
        block: &TokenRange,
    ) {
        self.observe(|observer| {
            observer.start_rule_header(rule_type, prelude.start_offset());
            observer.end_rule_header(prelude.end_offset());
            observer.start_rule_body(block.previous_token_start_offset());
        });
    }

    /// Header and body events of a rule with no observed body.
    fn observe_empty_rule(&mut self, rule_type: RuleType, prelude: &TokenRange) {
        self.observe(|observer| {
            let end = prelude.end_offset();
            observer.start_rule_header(rule_type, prelude.start_offset());
            observer.end_rule_header(end);
            observer.start_rule_body(end);
            observer.end_rule_body(end);
        });
    }

    /// Returns whether the first rule of the list was valid.
    fn consume_rule_list<F>(
        &mut self,
        mut range: TokenRange<'t, 'i>,
        list_type: RuleListType,
        mut callback: F,
    ) -> bool
    where
        F: FnMut(CssRule),
    {
        let mut allowed = match list_type {
            RuleListType::TopLevel => AllowedRules::AllowCharset,
            RuleListType::Regular => AllowedRules::RegularRules,
            RuleListType::Keyframes => AllowedRules::KeyframeRules,
        };
        let mut seen_rule = false;
        let mut first_rule_valid = false;
        while !range.at_end() {
            let result = match *range.peek() {
                Token::WhiteSpace(_) => {
                    range.consume_whitespace();
                    continue;
                }
                Token::AtKeyword(_) => self.consume_at_rule(&mut range, allowed),
                Token::CDO | Token::CDC if list_type == RuleListType::TopLevel => {
                    range.consume();
                    continue;
                }
                _ => self.consume_qualified_rule(&mut range, allowed),
            };
            let rule = self.ok_or_log(result, "rule");
            if !seen_rule {
                seen_rule = true;
                first_rule_valid = rule.is_some();
            }
            if let Some(rule) = rule {
                allowed = compute_new_allowed_rules(allowed, &rule);
                callback(rule);
            }
        }
        first_rule_valid
    }

    fn consume_at_rule(
        &mut self,
        range: &mut TokenRange<'t, 'i>,
        allowed: AllowedRules,
    ) -> Result<CssRule, ParseError> {
        let name = match *range.consume_including_whitespace() {
            Token::AtKeyword(ref name) => name,
            _ => return Err(range.new_unexpected_token_error()),
        };
        let id = at_rule_id(name);

        let prelude_start = *range;
        while !range.at_end() {
            match *range.peek() {
                Token::CurlyBracketBlock | Token::Semicolon => break,
                _ => range.consume_component_value(),
            }
        }
        let prelude = prelude_start.until(range);

        if range.at_end() || *range.peek() == Token::Semicolon {
            range.consume();
            return match id {
                AtRuleId::Charset if allowed == AllowedRules::AllowCharset => {
                    consume_charset_rule(prelude)
                }
                AtRuleId::Import if allowed <= AllowedRules::AllowImport => {
                    self.consume_import_rule(prelude)
                }
                AtRuleId::Namespace if allowed <= AllowedRules::AllowNamespace => {
                    self.consume_namespace_rule(prelude)
                }
                AtRuleId::Unknown => {
                    Err(prelude.new_error(ParseErrorKind::UnknownAtRule(name.to_string())))
                }
                _ => Err(prelude.new_error(ParseErrorKind::DisallowedAtRule(name.to_string()))),
            };
        }

        let block = range.consume_block();
        if allowed == AllowedRules::KeyframeRules || allowed == AllowedRules::NoRules {
            return Err(prelude.new_error(ParseErrorKind::DisallowedAtRule(name.to_string())));
        }
        match id {
            AtRuleId::Media => self.consume_media_rule(prelude, block),
            AtRuleId::Supports => self.consume_supports_rule(prelude, block),
            AtRuleId::Viewport if self.options.viewport_rule_enabled => {
                self.consume_viewport_rule(prelude, block)
            }
            AtRuleId::FontFace => self.consume_font_face_rule(prelude, block),
            AtRuleId::Keyframes => self.consume_keyframes_rule(false, prelude, block),
            AtRuleId::WebkitKeyframes => self.consume_keyframes_rule(true, prelude, block),
            AtRuleId::Page => self.consume_page_rule(prelude, block),
            AtRuleId::Charset | AtRuleId::Import | AtRuleId::Namespace => {
                Err(prelude.new_error(ParseErrorKind::DisallowedAtRule(name.to_string())))
            }
            AtRuleId::Viewport | AtRuleId::Unknown => {
                Err(prelude.new_error(ParseErrorKind::UnknownAtRule(name.to_string())))
            }
        }
    }

    fn consume_qualified_rule(
        &mut self,
        range: &mut TokenRange<'t, 'i>,
        allowed: AllowedRules,
    ) -> Result<CssRule, ParseError> {
        let prelude_start = *range;
        while !range.at_end() && *range.peek() != Token::CurlyBracketBlock {
            range.consume_component_value();
        }
        if range.at_end() {
            return Err(range.new_error(ParseErrorKind::EndOfInput));
        }
        let prelude = prelude_start.until(range);
        let block = range.consume_block();

        match allowed {
            AllowedRules::KeyframeRules => self.consume_keyframe_style_rule(prelude, block),
            AllowedRules::NoRules => Err(prelude.new_unexpected_token_error()),
            _ => self.consume_style_rule(prelude, block),
        }
    }

    fn consume_import_rule(
        &mut self,
        mut prelude: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let whole_prelude = prelude;
        let url = match consume_string_or_uri(&mut prelude) {
            Some(url) => url,
            None => {
                return Err(whole_prelude.new_error(ParseErrorKind::InvalidPrelude("import".into())))
            }
        };
        self.observe_empty_rule(RuleType::Import, &whole_prelude);
        let media = parse_media_query_list_from_range(prelude, self.grammar);
        Ok(CssRule::Import(ImportRule { url, media }))
    }

    fn consume_namespace_rule(
        &mut self,
        mut prelude: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let prefix = match *prelude.peek() {
            Token::Ident(ref prefix) => {
                prelude.consume_including_whitespace();
                Some(prefix.to_string())
            }
            _ => None,
        };
        let url = match consume_string_or_uri(&mut prelude) {
            Some(url) if prelude.at_end() => url,
            _ => return Err(prelude.new_error(ParseErrorKind::InvalidPrelude("namespace".into()))),
        };
        self.namespaces.add(prefix.clone(), url.clone());
        Ok(CssRule::Namespace(NamespaceRule { prefix, url }))
    }

    fn consume_nested_rules(
        &mut self,
        block: TokenRange<'t, 'i>,
    ) -> Result<Vec<CssRule>, ParseError> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(block.new_error(ParseErrorKind::NestingTooDeep));
        }
        self.depth += 1;
        let mut rules = Vec::new();
        self.consume_rule_list(block, RuleListType::Regular, |rule| rules.push(rule));
        self.depth -= 1;
        Ok(rules)
    }

    fn consume_media_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        self.observe_grouping_rule_start(RuleType::Media, &prelude, &block);
        let rules = self.consume_nested_rules(block);
        self.observe(|observer| observer.end_rule_body(block.end_offset()));
        let rules = rules?;
        Ok(CssRule::Media(MediaRule {
            media: parse_media_query_list_from_range(prelude, self.grammar),
            rules,
        }))
    }

    fn consume_supports_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let max_depth = self.options.max_nesting_depth;
        let result = supports_condition(prelude, self, SupportsParsingMode::AtRule, max_depth);
        let supported = match result {
            SupportsResult::Invalid => {
                return Err(prelude.new_error(ParseErrorKind::InvalidSupportsCondition))
            }
            result => result == SupportsResult::Supported,
        };
        self.observe_grouping_rule_start(RuleType::Supports, &prelude, &block);
        let rules = self.consume_nested_rules(block);
        self.observe(|observer| observer.end_rule_body(block.end_offset()));
        let rules = rules?;
        Ok(CssRule::Supports(SupportsRule {
            condition_text: prelude.trim_whitespace().serialize(),
            supported,
            rules,
        }))
    }

    fn consume_viewport_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        if !prelude.at_end() {
            return Err(prelude.new_error(ParseErrorKind::InvalidPrelude("viewport".into())));
        }
        self.observe_empty_rule(RuleType::Viewport, &prelude);
        let declarations = self.consume_declaration_list(block, RuleType::Viewport);
        Ok(CssRule::Viewport(ViewportRule {
            declarations: DeclarationBlock::finalize(declarations),
        }))
    }

    fn consume_font_face_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        if !prelude.at_end() {
            return Err(prelude.new_error(ParseErrorKind::InvalidPrelude("font-face".into())));
        }
        self.observe_empty_rule(RuleType::FontFace, &prelude);
        let declarations = self.consume_declaration_list(block, RuleType::FontFace);
        self.has_font_face_rule = true;
        Ok(CssRule::FontFace(FontFaceRule {
            declarations: DeclarationBlock::finalize(declarations),
        }))
    }

    fn consume_keyframes_rule(
        &mut self,
        vendor_prefixed: bool,
        mut prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let whole_prelude = prelude;
        let name_token = prelude.consume_including_whitespace();
        let name = match *name_token {
            _ if !prelude.at_end() => None,
            Token::Ident(ref name) => Some(name),
            Token::QuotedString(ref name) if vendor_prefixed => Some(name),
            _ => None,
        };
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let kind = ParseErrorKind::InvalidPrelude("keyframes".into());
                return Err(whole_prelude.new_error(kind));
            }
        };

        self.observe_grouping_rule_start(RuleType::Keyframes, &whole_prelude, &block);
        let mut keyframes = Vec::new();
        self.consume_rule_list(block, RuleListType::Keyframes, |rule| {
            if let CssRule::Keyframe(keyframe) = rule {
                keyframes.push(keyframe);
            }
        });
        self.observe(|observer| observer.end_rule_body(block.end_offset()));

        Ok(CssRule::Keyframes(KeyframesRule {
            name,
            vendor_prefixed,
            keyframes,
        }))
    }

    fn consume_page_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let selector = self.grammar.parse_page_selector(prelude)?;
        self.observe(|observer| {
            observer.start_rule_header(RuleType::Page, prelude.start_offset());
            observer.end_rule_header(prelude.end_offset());
        });
        let declarations = self.consume_declaration_list(block, RuleType::Page);
        Ok(CssRule::Page(PageRule {
            selector,
            declarations: DeclarationBlock::finalize(declarations),
        }))
    }

    fn consume_keyframe_style_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let keys = match consume_keyframe_key_list(prelude) {
            Some(keys) => keys,
            None => return Err(prelude.new_error(ParseErrorKind::InvalidKeyframeSelector)),
        };
        self.observe(|observer| {
            observer.start_rule_header(RuleType::Keyframe, prelude.start_offset());
            observer.end_rule_header(prelude.end_offset());
        });
        let declarations = self.consume_declaration_list(block, RuleType::Keyframe);
        Ok(CssRule::Keyframe(KeyframeRule {
            keys,
            declarations: DeclarationBlock::finalize(declarations),
        }))
    }

    fn consume_style_rule(
        &mut self,
        prelude: TokenRange<'t, 'i>,
        block: TokenRange<'t, 'i>,
    ) -> Result<CssRule, ParseError> {
        let selectors = self.grammar.parse_selector_list(prelude, &self.namespaces)?;
        self.observe(|observer| {
            observer.start_rule_header(RuleType::Style, prelude.start_offset());
            observer.end_rule_header(prelude.end_offset());
        });
        let declarations = self.consume_declaration_list(block, RuleType::Style);
        Ok(CssRule::Style(StyleRule {
            selectors,
            declarations: DeclarationBlock::finalize(declarations),
        }))
    }

    /// The accepted declarations of a declaration list, in source order.
    fn consume_declaration_list(
        &mut self,
        mut range: TokenRange<'t, 'i>,
        rule_type: RuleType,
    ) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        let use_observer = observes_declarations(rule_type);
        if let Some(wrapper) = self.observer.as_mut().filter(|_| use_observer) {
            wrapper.observer().start_rule_body(range.previous_token_start_offset());
            wrapper.skip_comments_before(&range, true);
        }

        while !range.at_end() {
            match *range.peek() {
                Token::WhiteSpace(_) | Token::Semicolon => {
                    range.consume();
                }
                Token::Ident(_) => {
                    let declaration_start = range;
                    if let Some(wrapper) = self.observer.as_mut().filter(|_| use_observer) {
                        wrapper.yield_comments_before(&range);
                    }
                    while !range.at_end() && *range.peek() != Token::Semicolon {
                        range.consume_component_value();
                    }
                    let declaration = declaration_start.until(&range);
                    self.consume_declaration(declaration, rule_type, &mut declarations);
                    if let Some(wrapper) = self.observer.as_mut().filter(|_| use_observer) {
                        wrapper.skip_comments_before(&range, false);
                    }
                }
                Token::AtKeyword(_) => {
                    let result = self.consume_at_rule(&mut range, AllowedRules::NoRules);
                    self.ok_or_log(result, "at-rule in declaration list");
                }
                _ => {
                    let garbage_start = range;
                    while !range.at_end() && *range.peek() != Token::Semicolon {
                        range.consume_component_value();
                    }
                    let error = garbage_start.new_unexpected_token_error();
                    self.ok_or_log::<()>(Err(error), "declaration");
                }
            }
        }

        if let Some(wrapper) = self.observer.as_mut().filter(|_| use_observer) {
            wrapper.yield_comments_before(&range);
            wrapper.observer().end_rule_body(range.end_offset());
        }
        declarations
    }

    /// `range` starts at the property name and stops before the `;`.
    fn consume_declaration(
        &mut self,
        mut range: TokenRange<'t, 'i>,
        rule_type: RuleType,
        declarations: &mut Vec<Declaration>,
    ) {
        let whole_declaration = range;
        let name = match *range.consume_including_whitespace() {
            Token::Ident(ref name) => name,
            _ => return,
        };
        if *range.consume() != Token::Colon {
            self.ok_or_log::<()>(Err(range.new_unexpected_token_error()), "declaration");
            return;
        }
        let (value, important) = strip_important(range);
        let accepted_before = declarations.len();

        let property = PropertyId::from_name(name);
        let result = match property {
            None if is_custom_property_name(name) => self
                .grammar
                .parse_custom_property_value(name, value, important)
                .map(|declaration| declarations.push(declaration)),
            _ if important && matches!(rule_type, RuleType::FontFace | RuleType::Keyframe) => {
                let error = value.new_error(ParseErrorKind::ImportantNotAllowed);
                self.ok_or_log::<()>(Err(error), "declaration");
                return;
            }
            Some(property) => {
                self.consume_declaration_value(property, value, important, rule_type, declarations)
            }
            None => {
                let kind = ParseErrorKind::UnknownProperty(name.to_string());
                Err(whole_declaration.new_error(kind))
            }
        };
        self.ok_or_log(result, "declaration");

        if observes_declarations(rule_type) {
            let parsed = declarations.len() != accepted_before;
            self.observe(|observer| {
                observer.observe_property(
                    whole_declaration.start_offset(),
                    whole_declaration.end_offset(),
                    important,
                    parsed,
                )
            });
        }
    }

    fn consume_declaration_value(
        &mut self,
        property: PropertyId,
        value: TokenRange<'t, 'i>,
        important: bool,
        rule_type: RuleType,
        declarations: &mut Vec<Declaration>,
    ) -> Result<(), ParseError> {
        self.grammar.parse_value(property, value, important, rule_type, declarations)?;
        let uses_rem = value.tokens().iter().any(|token| match *token {
            Token::Dimension(_, ref unit) => unit.eq_ignore_ascii_case("rem"),
            _ => false,
        });
        if uses_rem {
            self.uses_rem_units = true;
        }
        Ok(())
    }
}

impl<'a, 'o, 't, 'i, G> DeclarationProbe<'t, 'i> for RuleParser<'a, 'o, 't, 'i, G>
where
    G: Grammar,
{
    fn supports_declaration(&mut self, range: TokenRange<'t, 'i>) -> bool {
        // A probe is not part of any rule body: keep it away from the observer and the sheet flags.
        let observer = self.observer.take();
        let uses_rem_units = self.uses_rem_units;
        let mut declarations = Vec::new();
        self.consume_declaration(range, RuleType::Style, &mut declarations);
        self.observer = observer;
        self.uses_rem_units = uses_rem_units;
        !declarations.is_empty()
    }
}

/// Declarations of `@font-face` and `@viewport` are not reported to the observer.
fn observes_declarations(rule_type: RuleType) -> bool {
    matches!(rule_type, RuleType::Style | RuleType::Keyframe | RuleType::Page)
}

/// Split the `!important` marker off the end of a declaration value.
fn strip_important<'t, 'i>(value: TokenRange<'t, 'i>) -> (TokenRange<'t, 'i>, bool) {
    let tokens = value.tokens();
    let skip_whitespace = |mut end: usize| {
        while end > 0 {
            match tokens[end - 1] {
                Token::WhiteSpace(_) => end -= 1,
                _ => break,
            }
        }
        end
    };

    let end = skip_whitespace(tokens.len());
    match tokens[..end].last() {
        Some(&Token::Ident(ref ident)) if ident.eq_ignore_ascii_case("important") => {}
        _ => return (value, false),
    }
    let end = skip_whitespace(end - 1);
    match tokens[..end].last() {
        Some(&Token::Delim('!')) => (value.truncate(end - 1), true),
        _ => (value, false),
    }
}

/// `"uri"`, `url(uri)` or `url("uri")`, and the whitespace after it.
fn consume_string_or_uri(range: &mut TokenRange) -> Option<String> {
    match *range.peek() {
        Token::QuotedString(ref uri) | Token::Url(ref uri) => {
            range.consume_including_whitespace();
            Some(uri.to_string())
        }
        Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
            let mut contents = range.consume_block();
            contents.consume_whitespace();
            let uri = match *contents.consume_including_whitespace() {
                Token::QuotedString(ref uri) => uri.to_string(),
                _ => return None,
            };
            if !contents.at_end() {
                return None;
            }
            range.consume_whitespace();
            Some(uri)
        }
        _ => None,
    }
}

fn consume_charset_rule(mut prelude: TokenRange) -> Result<CssRule, ParseError> {
    match *prelude.consume_including_whitespace() {
        Token::QuotedString(ref encoding) if prelude.at_end() => Ok(CssRule::Charset(CharsetRule {
            encoding: encoding.to_string(),
        })),
        _ => Err(prelude.new_error(ParseErrorKind::InvalidPrelude("charset".into()))),
    }
}

fn consume_keyframe_key_list(mut range: TokenRange) -> Option<Vec<f32>> {
    let mut keys = Vec::new();
    loop {
        range.consume_whitespace();
        let key = match *range.consume_including_whitespace() {
            Token::Percentage(ref percentage) if (0. ..=100.).contains(&percentage.value) => {
                percentage.value / 100.
            }
            Token::Ident(ref ident) => match_ignore_ascii_case! { ident,
                "from" => 0.,
                "to" => 1.,
                _ => return None,
            },
            _ => return None,
        };
        keys.push(key);
        if range.at_end() {
            return Some(keys);
        }
        if *range.consume() != Token::Comma {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(text: &str) -> Option<Vec<f32>> {
        CssParser::default().parse_keyframe_key_list(text)
    }

    #[test]
    fn keyframe_keys() {
        assert_eq!(keys("from"), Some(vec![0.]));
        assert_eq!(keys(" TO "), Some(vec![1.]));
        assert_eq!(keys("0%, 50% ,100%"), Some(vec![0., 0.5, 1.]));
        assert_eq!(keys("10%, from, 2"), None);
        assert_eq!(keys("101%"), None);
        assert_eq!(keys("-1%"), None);
        assert_eq!(keys("from to"), None);
        assert_eq!(keys("from,"), None);
        assert_eq!(keys(""), None);
    }

    #[test]
    fn important_marker() {
        let list = TokenList::new("red ! IMPORTANT ");
        let (value, important) = strip_important(list.range());
        assert!(important);
        assert_eq!(value.serialize(), "red ");

        let list = TokenList::new("red important");
        let (value, important) = strip_important(list.range());
        assert!(!important);
        assert_eq!(value.len(), 3);

        let list = TokenList::new("!important");
        let (value, important) = strip_important(list.range());
        assert!(important);
        assert!(value.at_end());
    }

    #[test]
    fn allowed_rules_narrowing() {
        use super::AllowedRules::*;
        let charset = CssRule::Charset(CharsetRule { encoding: "utf-8".into() });
        let style = CssRule::Style(StyleRule {
            selectors: SelectorList::default(),
            declarations: DeclarationBlock::new(),
        });
        assert_eq!(compute_new_allowed_rules(AllowCharset, &charset), AllowImport);
        assert_eq!(compute_new_allowed_rules(AllowImport, &style), RegularRules);
        assert_eq!(compute_new_allowed_rules(KeyframeRules, &style), KeyframeRules);
        assert_eq!(compute_new_allowed_rules(NoRules, &style), NoRules);
        assert!(AllowCharset < AllowImport && AllowNamespace < RegularRules);
    }

    #[test]
    fn string_or_uri() {
        for text in &["\"a.css\" x", "url(a.css) x", "url( \"a.css\" ) x", "URL('a.css')x"] {
            let list = TokenList::new(text);
            let mut range = list.range();
            assert_eq!(consume_string_or_uri(&mut range).as_deref(), Some("a.css"), "{}", text);
            assert_eq!(*range.peek(), Token::Ident("x".into()));
        }
        let list = TokenList::new("url(\"a\" \"b\")");
        assert_eq!(consume_string_or_uri(&mut list.range()), None);
    }
}
