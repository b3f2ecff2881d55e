/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

#![crate_name = "cssrules"]
#![crate_type = "rlib"]
#![deny(missing_docs)]

/*!

A CSS rule parser: style sheets, rules and declarations,
with media queries and `@supports` conditions,
following [CSS Syntax Module Level 3](https://drafts.csswg.org/css-syntax/)
and the conditional rules of CSS.

# Input

Text is tokenized once into a `TokenList`.
Everything else reads it through `TokenRange` cursors,
which are cheap to copy and never allocate.

# Output

`CssParser` turns text into `CssRule` trees and `DeclarationBlock`s.
Errors never escape the smallest unit that failed:
an invalid declaration is dropped from its block,
an invalid rule from its list,
and a malformed media query becomes `not all`.
Dropped constructs are reported as `tracing` events at the `debug` level.

Property values, selectors and media features are checked by a `Grammar`.
`BasicGrammar` is a permissive one, and callers with real grammars plug theirs in
with `CssParser::with_grammar`.

```rust
use cssrules::{CssParser, CssRule, ParserOptions, StyleSheetContents};

let mut sheet = StyleSheetContents::new();
CssParser::new(&ParserOptions::default()).parse_stylesheet(
    "@import url(base.css) screen; p { margin: 0 !important; margin: 1em }",
    &mut sheet,
);
assert_eq!(sheet.rules.len(), 2);
match sheet.rules[1] {
    CssRule::Style(ref rule) => assert_eq!(rule.declarations.len(), 1),
    _ => unreachable!(),
}
```

*/

#[macro_use]
mod macros;

#[doc(hidden)]
pub use crate::macros::_cssrules_internal_to_lowercase;
#[doc(hidden)]
pub use cssrules_macros::_cssrules_internal_max_len;
#[doc(hidden)]
pub use phf as _cssrules_internal_phf;

pub use crate::grammar::{
    BasicGrammar, Grammar, MediaFeatureValidator, SelectorGrammar, SelectorList, ValueGrammar,
};
pub use crate::media_queries::{
    parse_media_condition, parse_media_condition_from_range, parse_media_query_list,
    parse_media_query_list_from_range, MediaFeatureExpression, MediaQuery, MediaQueryList,
    Restrictor,
};
pub use crate::nth::parse_nth;
pub use crate::observer::ParserObserver;
pub use crate::parser::{BlockRole, CommentSpan, ParseError, ParseErrorKind, TokenList, TokenRange};
pub use crate::properties::{is_custom_property_name, PropertyId, UnitType};
pub use crate::rules::{
    CharsetRule, CssRule, Declaration, DeclarationBlock, FontFaceRule, ImportRule, KeyframeRule,
    KeyframesRule, MediaRule, NamespaceRule, PageRule, PropertyName, RuleType, StyleRule,
    SupportsRule, ViewportRule,
};
pub use crate::rules_and_declarations::{AllowedRules, CssParser, ParserOptions};
pub use crate::serializer::{
    serialize_identifier, serialize_name, serialize_string, CssStringWriter, ToCss,
    TokenSerializationType,
};
pub use crate::stylesheet::{Namespaces, StyleSheetContents, StyleSheetSink};
pub use crate::supports::{SupportsParsingMode, SupportsResult};
pub use crate::tokenizer::{
    tokenize, NumericSign, NumericType, NumericValue, SourceLocation, SourcePosition, Token,
    Tokenizer,
};

mod grammar;
mod media_queries;
mod nth;
mod observer;
mod parser;
mod properties;
mod rules;
mod rules_and_declarations;
mod serializer;
mod stylesheet;
mod supports;
mod tokenizer;

#[cfg(test)]
mod tests;
