/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The rule tree produced by the rule grammar.

use std::collections::HashSet;
use std::fmt;

use crate::grammar::SelectorList;
use crate::media_queries::MediaQueryList;
use crate::properties::PropertyId;
use crate::serializer::{serialize_identifier, serialize_string, ToCss};

/// The kind of a rule, also used as the context a declaration list is parsed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RuleType {
    /// `@charset`
    Charset,
    /// `@import`
    Import,
    /// `@namespace`
    Namespace,
    /// `@media`
    Media,
    /// `@supports`
    Supports,
    /// `@viewport`
    Viewport,
    /// `@font-face`
    FontFace,
    /// `@keyframes` and `@-webkit-keyframes`
    Keyframes,
    /// One keyframe inside `@keyframes`
    Keyframe,
    /// `@page`
    Page,
    /// A style rule
    Style,
}

/// A rule of a style sheet.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CssRule {
    /// `@charset "utf-8";`
    Charset(CharsetRule),
    /// `@import url(a.css) screen;`
    Import(ImportRule),
    /// `@namespace svg url(http://www.w3.org/2000/svg);`
    Namespace(NamespaceRule),
    /// `@media screen { ... }`
    Media(MediaRule),
    /// `@supports (display: flex) { ... }`
    Supports(SupportsRule),
    /// `@viewport { ... }`
    Viewport(ViewportRule),
    /// `@font-face { ... }`
    FontFace(FontFaceRule),
    /// `@keyframes name { ... }`
    Keyframes(KeyframesRule),
    /// `50% { ... }` inside `@keyframes`
    Keyframe(KeyframeRule),
    /// `@page :first { ... }`
    Page(PageRule),
    /// `selectors { declarations }`
    Style(StyleRule),
}

impl CssRule {
    /// The kind of this rule.
    pub fn rule_type(&self) -> RuleType {
        match *self {
            CssRule::Charset(_) => RuleType::Charset,
            CssRule::Import(_) => RuleType::Import,
            CssRule::Namespace(_) => RuleType::Namespace,
            CssRule::Media(_) => RuleType::Media,
            CssRule::Supports(_) => RuleType::Supports,
            CssRule::Viewport(_) => RuleType::Viewport,
            CssRule::FontFace(_) => RuleType::FontFace,
            CssRule::Keyframes(_) => RuleType::Keyframes,
            CssRule::Keyframe(_) => RuleType::Keyframe,
            CssRule::Page(_) => RuleType::Page,
            CssRule::Style(_) => RuleType::Style,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct CharsetRule {
    pub encoding: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct ImportRule {
    pub url: String,
    pub media: MediaQueryList,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct NamespaceRule {
    pub prefix: Option<String>,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct MediaRule {
    pub media: MediaQueryList,
    pub rules: Vec<CssRule>,
}

/// `@supports` keeps its condition as text, along with the result of evaluating it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SupportsRule {
    /// The prelude, serialized and trimmed.
    pub condition_text: String,
    /// Whether the condition evaluated to `Supported`.
    pub supported: bool,
    /// The nested rules, kept whatever the condition evaluated to.
    pub rules: Vec<CssRule>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct ViewportRule {
    pub declarations: DeclarationBlock,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct FontFaceRule {
    pub declarations: DeclarationBlock,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct KeyframesRule {
    pub name: String,
    /// Whether this was `@-webkit-keyframes`.
    pub vendor_prefixed: bool,
    pub keyframes: Vec<KeyframeRule>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct KeyframeRule {
    /// Offsets in `[0, 1]`, in source order.
    pub keys: Vec<f32>,
    pub declarations: DeclarationBlock,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct PageRule {
    pub selector: SelectorList,
    pub declarations: DeclarationBlock,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(missing_docs)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: DeclarationBlock,
}

/// The name of a declaration: a known property, or a custom property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PropertyName {
    /// A property from the table of known properties.
    Known(PropertyId),
    /// `--*`, with its name as written (custom property names are case-sensitive).
    Custom(String),
}

impl PropertyName {
    /// Whether this is a custom property.
    pub fn is_custom(&self) -> bool {
        matches!(*self, PropertyName::Custom(_))
    }
}

impl ToCss for PropertyName {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {
            PropertyName::Known(id) => dest.write_str(id.name()),
            PropertyName::Custom(ref name) => serialize_identifier(name, dest),
        }
    }
}

/// One accepted declaration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Declaration {
    /// The property.
    pub name: PropertyName,
    /// The value, as the value grammar stored it.
    pub value: String,
    /// Whether the declaration ended with `!important`.
    pub important: bool,
}

impl ToCss for Declaration {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        self.name.to_css(dest)?;
        dest.write_str(": ")?;
        dest.write_str(&self.value)?;
        if self.important {
            dest.write_str(" !important")?;
        }
        dest.write_str(";")
    }
}

/// An immutable, deduplicated list of declarations.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeclarationBlock {
    declarations: Vec<Declaration>,
}

impl DeclarationBlock {
    /// An empty block.
    pub fn new() -> DeclarationBlock {
        DeclarationBlock::default()
    }

    /// Build a block from declarations in source order,
    /// applying the cascade within the block.
    ///
    /// Later declarations of a known property win over earlier ones,
    /// and important ones win over normal ones whatever their order.
    /// Custom properties are all kept.
    /// Kept normal declarations come first, then kept important ones,
    /// each group in source order.
    pub fn finalize(accumulated: Vec<Declaration>) -> DeclarationBlock {
        let mut seen = HashSet::new();
        let mut important = Vec::new();
        let mut normal = Vec::new();
        filter_declarations(true, &accumulated, &mut seen, &mut important);
        filter_declarations(false, &accumulated, &mut seen, &mut normal);
        normal.reverse();
        important.reverse();
        normal.extend(important);
        DeclarationBlock { declarations: normal }
    }

    /// Merge finalized declarations into this block.
    ///
    /// An incoming declaration replaces the one with the same name,
    /// unless the existing one is important and the incoming one is not.
    /// Returns whether the block changed.
    pub fn merge(&mut self, incoming: DeclarationBlock) -> bool {
        let mut changed = false;
        for declaration in incoming.declarations {
            match self.declarations.iter().position(|d| d.name == declaration.name) {
                Some(index) => {
                    let existing = &mut self.declarations[index];
                    if existing.important && !declaration.important {
                        continue;
                    }
                    if *existing != declaration {
                        *existing = declaration;
                        changed = true;
                    }
                }
                None => {
                    self.declarations.push(declaration);
                    changed = true;
                }
            }
        }
        changed
    }

    /// The declarations, in order.
    #[inline]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// The number of declarations.
    #[inline]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether there are no declarations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// The last declaration for `property`.
    pub fn get(&self, property: PropertyId) -> Option<&Declaration> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.name == PropertyName::Known(property))
    }

    /// The last declaration of the custom property `name` (with its `--` prefix).
    pub fn get_custom(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().rev().find(|d| match d.name {
            PropertyName::Custom(ref n) => n == name,
            PropertyName::Known(_) => false,
        })
    }
}

fn filter_declarations(
    important: bool,
    input: &[Declaration],
    seen: &mut HashSet<PropertyId>,
    output: &mut Vec<Declaration>,
) {
    for declaration in input.iter().rev() {
        if declaration.important != important {
            continue;
        }
        match declaration.name {
            PropertyName::Custom(_) => {}
            PropertyName::Known(id) => {
                if !seen.insert(id) {
                    continue;
                }
            }
        }
        output.push(declaration.clone());
    }
}

impl ToCss for DeclarationBlock {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        for (i, declaration) in self.declarations.iter().enumerate() {
            if i > 0 {
                dest.write_str(" ")?;
            }
            declaration.to_css(dest)?;
        }
        Ok(())
    }
}

fn write_block<W>(declarations: &DeclarationBlock, dest: &mut W) -> fmt::Result
where
    W: fmt::Write,
{
    if declarations.is_empty() {
        return dest.write_str("{ }");
    }
    dest.write_str("{ ")?;
    declarations.to_css(dest)?;
    dest.write_str(" }")
}

fn write_rules<W>(rules: &[CssRule], dest: &mut W) -> fmt::Result
where
    W: fmt::Write,
{
    dest.write_str("{")?;
    for rule in rules {
        dest.write_str(" ")?;
        rule.to_css(dest)?;
    }
    dest.write_str(" }")
}

impl ToCss for CssRule {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {
            CssRule::Charset(ref rule) => {
                dest.write_str("@charset ")?;
                serialize_string(&rule.encoding, dest)?;
                dest.write_str(";")
            }
            CssRule::Import(ref rule) => {
                dest.write_str("@import url(")?;
                serialize_string(&rule.url, dest)?;
                dest.write_str(")")?;
                if !rule.media.is_empty() {
                    dest.write_str(" ")?;
                    rule.media.to_css(dest)?;
                }
                dest.write_str(";")
            }
            CssRule::Namespace(ref rule) => {
                dest.write_str("@namespace ")?;
                if let Some(ref prefix) = rule.prefix {
                    serialize_identifier(prefix, dest)?;
                    dest.write_str(" ")?;
                }
                dest.write_str("url(")?;
                serialize_string(&rule.url, dest)?;
                dest.write_str(");")
            }
            CssRule::Media(ref rule) => {
                dest.write_str("@media ")?;
                rule.media.to_css(dest)?;
                dest.write_str(" ")?;
                write_rules(&rule.rules, dest)
            }
            CssRule::Supports(ref rule) => {
                dest.write_str("@supports ")?;
                dest.write_str(&rule.condition_text)?;
                dest.write_str(" ")?;
                write_rules(&rule.rules, dest)
            }
            CssRule::Viewport(ref rule) => {
                dest.write_str("@viewport ")?;
                write_block(&rule.declarations, dest)
            }
            CssRule::FontFace(ref rule) => {
                dest.write_str("@font-face ")?;
                write_block(&rule.declarations, dest)
            }
            CssRule::Keyframes(ref rule) => {
                dest.write_str(if rule.vendor_prefixed {
                    "@-webkit-keyframes "
                } else {
                    "@keyframes "
                })?;
                serialize_identifier(&rule.name, dest)?;
                dest.write_str(" {")?;
                for keyframe in &rule.keyframes {
                    dest.write_str(" ")?;
                    keyframe.to_css(dest)?;
                }
                dest.write_str(" }")
            }
            CssRule::Keyframe(ref rule) => rule.to_css(dest),
            CssRule::Page(ref rule) => {
                dest.write_str("@page ")?;
                if !rule.selector.is_empty() {
                    rule.selector.to_css(dest)?;
                    dest.write_str(" ")?;
                }
                write_block(&rule.declarations, dest)
            }
            CssRule::Style(ref rule) => {
                rule.selectors.to_css(dest)?;
                dest.write_str(" ")?;
                write_block(&rule.declarations, dest)
            }
        }
    }
}

impl ToCss for KeyframeRule {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                dest.write_str(", ")?;
            }
            (key * 100.).to_css(dest)?;
            dest.write_str("%")?;
        }
        dest.write_str(" ")?;
        write_block(&self.declarations, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(name: PropertyName, value: &str, important: bool) -> Declaration {
        Declaration {
            name,
            value: value.to_owned(),
            important,
        }
    }

    fn known(id: PropertyId, value: &str, important: bool) -> Declaration {
        declaration(PropertyName::Known(id), value, important)
    }

    #[test]
    fn finalize_important_wins_over_later_normal() {
        let block = DeclarationBlock::finalize(vec![
            known(PropertyId::Color, "red", true),
            known(PropertyId::Color, "blue", false),
            known(PropertyId::Width, "1px", false),
            known(PropertyId::Width, "2px", false),
        ]);
        assert_eq!(
            block.declarations(),
            &[known(PropertyId::Width, "2px", false), known(PropertyId::Color, "red", true)][..]
        );
    }

    #[test]
    fn finalize_keeps_every_custom_property() {
        let x = |v: &str| declaration(PropertyName::Custom("--x".into()), v, false);
        let block = DeclarationBlock::finalize(vec![x("1"), x("2")]);
        assert_eq!(block.declarations(), &[x("1"), x("2")][..]);
        assert_eq!(block.get_custom("--x").map(|d| &*d.value), Some("2"));
        assert!(block.declarations().iter().all(|d| d.name.is_custom()));
        assert!(!PropertyName::Known(PropertyId::Color).is_custom());
    }

    #[test]
    fn finalize_is_idempotent() {
        let input = vec![
            known(PropertyId::Color, "red", false),
            known(PropertyId::Margin, "0", true),
            declaration(PropertyName::Custom("--a".into()), "1", false),
            known(PropertyId::Color, "green", true),
            known(PropertyId::Margin, "1px", false),
            declaration(PropertyName::Custom("--a".into()), "2", true),
        ];
        let once = DeclarationBlock::finalize(input);
        let twice = DeclarationBlock::finalize(once.declarations().to_vec());
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_respects_existing_important() {
        let mut block = DeclarationBlock::finalize(vec![known(PropertyId::Color, "red", true)]);
        let changed = block.merge(DeclarationBlock::finalize(vec![
            known(PropertyId::Color, "blue", false),
            known(PropertyId::Width, "1px", false),
        ]));
        assert!(changed);
        assert_eq!(block.get(PropertyId::Color).map(|d| &*d.value), Some("red"));
        assert_eq!(block.get(PropertyId::Width).map(|d| &*d.value), Some("1px"));
        assert!(!block.merge(DeclarationBlock::new()));
    }

    #[test]
    fn block_serialization() {
        let block = DeclarationBlock::finalize(vec![
            known(PropertyId::Color, "red", false),
            known(PropertyId::Width, "1px", true),
        ]);
        assert_eq!(block.to_css_string(), "color: red; width: 1px !important;");
    }
}
