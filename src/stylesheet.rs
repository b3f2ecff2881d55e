/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use crate::rules::CssRule;

/// The namespaces declared by `@namespace` rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespaces {
    /// The namespace of an unprefixed `@namespace` rule.
    pub default: Option<String>,
    /// Prefix to URL.
    pub prefixes: HashMap<String, String>,
}

impl Namespaces {
    /// Record a `@namespace` rule. A later rule for the same prefix replaces an earlier one.
    pub fn add(&mut self, prefix: Option<String>, url: String) {
        match prefix {
            Some(prefix) => {
                self.prefixes.insert(prefix, url);
            }
            None => self.default = Some(url),
        }
    }

    /// Whether `prefix` was declared.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// The URL of a prefix.
    pub fn url(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|url| &**url)
    }
}

/// Where the top-level rules of a style sheet go.
pub trait StyleSheetSink {
    /// A top-level rule was parsed. `@charset` rules are never appended.
    fn append_rule(&mut self, rule: CssRule);

    /// Whether the first top-level rule was valid. Called once, after the last rule.
    fn set_has_syntactically_valid_css_header(&mut self, valid: bool) {
        let _ = valid;
    }

    /// A declaration with a `rem` length was accepted.
    fn set_uses_rem_units(&mut self) {}

    /// A `@font-face` rule was parsed.
    fn set_has_font_face_rule(&mut self) {}
}

/// A simple style sheet store: the rules, and the flags the parser reports.
#[derive(Clone, Debug, Default)]
pub struct StyleSheetContents {
    /// Top-level rules, in order.
    pub rules: Vec<CssRule>,
    /// Namespaces declared by the `@namespace` rules of `rules`.
    pub namespaces: Namespaces,
    /// Whether the first top-level rule was valid.
    pub has_syntactically_valid_css_header: bool,
    /// Whether any declaration used `rem` units.
    pub uses_rem_units: bool,
    /// Whether there was a `@font-face` rule.
    pub has_font_face_rule: bool,
}

impl StyleSheetContents {
    /// An empty style sheet.
    pub fn new() -> StyleSheetContents {
        StyleSheetContents::default()
    }
}

impl StyleSheetSink for StyleSheetContents {
    fn append_rule(&mut self, rule: CssRule) {
        if let CssRule::Namespace(ref namespace) = rule {
            self.namespaces.add(namespace.prefix.clone(), namespace.url.clone());
        }
        self.rules.push(rule);
    }

    fn set_has_syntactically_valid_css_header(&mut self, valid: bool) {
        self.has_syntactically_valid_css_header = valid;
    }

    fn set_uses_rem_units(&mut self) {
        self.uses_rem_units = true;
    }

    fn set_has_font_face_rule(&mut self) {
        self.has_font_face_rule = true;
    }
}
