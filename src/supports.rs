/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! `@supports` conditions and `CSS.supports()`.

use tracing::trace;

use crate::parser::TokenRange;
use crate::tokenizer::Token;

/// The outcome of evaluating a supports condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SupportsResult {
    /// The condition is well-formed and false.
    Unsupported,
    /// The condition is well-formed and true.
    Supported,
    /// The condition does not parse.
    Invalid,
}

impl SupportsResult {
    fn from_bool(supported: bool) -> Self {
        if supported {
            SupportsResult::Supported
        } else {
            SupportsResult::Unsupported
        }
    }
}

/// Where the condition comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportsParsingMode {
    /// The prelude of an `@supports` rule.
    AtRule,
    /// The one-argument form of `CSS.supports()`, where a bare declaration is allowed.
    WindowCss,
}

/// Tells whether a declaration is supported, by parsing it.
pub(crate) trait DeclarationProbe<'t, 'i> {
    /// `range` starts with the property name and holds the whole declaration.
    fn supports_declaration(&mut self, range: TokenRange<'t, 'i>) -> bool;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClauseType {
    Unresolved,
    Conjunction,
    Disjunction,
}

/// Evaluate the condition in `range`.
pub(crate) fn supports_condition<'t, 'i, P>(
    mut range: TokenRange<'t, 'i>,
    probe: &mut P,
    mode: SupportsParsingMode,
    max_depth: usize,
) -> SupportsResult
where
    P: DeclarationProbe<'t, 'i>,
{
    range.consume_whitespace();
    let mut parser = SupportsParser {
        probe,
        depth: 0,
        max_depth,
        too_deep: false,
    };
    let mut result = parser.consume_condition(range);
    if mode == SupportsParsingMode::WindowCss && result == SupportsResult::Invalid {
        // `CSS.supports("color: red")` reads as if the text was parenthesized, which only
        // changes anything for a declaration or a function.
        result = parser.consume_declaration_condition_or_general_enclosed(range);
    }
    if parser.too_deep {
        return SupportsResult::Invalid;
    }
    result
}

struct SupportsParser<'p, P> {
    probe: &'p mut P,
    depth: usize,
    max_depth: usize,
    too_deep: bool,
}

impl<'p, 't, 'i, P> SupportsParser<'p, P>
where
    P: DeclarationProbe<'t, 'i>,
{
    fn consume_condition(&mut self, range: TokenRange<'t, 'i>) -> SupportsResult {
        if self.depth >= self.max_depth {
            trace!(target: "cssrules::supports", depth = self.depth, "condition nested too deep");
            self.too_deep = true;
            return SupportsResult::Invalid;
        }
        self.depth += 1;
        let result = self.consume_condition_at_depth(range);
        self.depth -= 1;
        result
    }

    fn consume_condition_at_depth(&mut self, mut range: TokenRange<'t, 'i>) -> SupportsResult {
        if let Token::Ident(_) = *range.peek() {
            return self.consume_negation(range);
        }

        let mut result = false;
        let mut clause_type = ClauseType::Unresolved;
        loop {
            let next = match self.consume_condition_in_parenthesis(&mut range) {
                SupportsResult::Invalid => return SupportsResult::Invalid,
                next => next == SupportsResult::Supported,
            };
            match clause_type {
                ClauseType::Unresolved => result = next,
                ClauseType::Conjunction => result &= next,
                ClauseType::Disjunction => result |= next,
            }

            if range.at_end() {
                break;
            }
            // `and` and `or` need whitespace on both sides.
            match *range.peek() {
                Token::WhiteSpace(_) => range.consume_whitespace(),
                _ => return SupportsResult::Invalid,
            }
            if range.at_end() {
                break;
            }

            let keyword = match *range.consume() {
                Token::Ident(ref keyword) => &**keyword,
                _ => return SupportsResult::Invalid,
            };
            // The first combinator fixes the clause type; `and` and `or` never mix.
            if clause_type == ClauseType::Unresolved {
                clause_type = if keyword.len() == 3 {
                    ClauseType::Conjunction
                } else {
                    ClauseType::Disjunction
                };
            }
            let matches = match clause_type {
                ClauseType::Conjunction => keyword.eq_ignore_ascii_case("and"),
                _ => keyword.eq_ignore_ascii_case("or"),
            };
            if !matches {
                return SupportsResult::Invalid;
            }
            match *range.peek() {
                Token::WhiteSpace(_) => range.consume_whitespace(),
                _ => return SupportsResult::Invalid,
            }
        }
        SupportsResult::from_bool(result)
    }

    fn consume_negation(&mut self, mut range: TokenRange<'t, 'i>) -> SupportsResult {
        match *range.consume_including_whitespace() {
            Token::Ident(ref keyword) if keyword.eq_ignore_ascii_case("not") => {}
            _ => return SupportsResult::Invalid,
        }
        let result = self.consume_condition_in_parenthesis(&mut range);
        range.consume_whitespace();
        if !range.at_end() {
            return SupportsResult::Invalid;
        }
        match result {
            SupportsResult::Invalid => SupportsResult::Invalid,
            SupportsResult::Supported => SupportsResult::Unsupported,
            SupportsResult::Unsupported => SupportsResult::Supported,
        }
    }

    /// Either a parenthesized group or a function, which is never supported.
    fn consume_condition_in_parenthesis(
        &mut self,
        range: &mut TokenRange<'t, 'i>,
    ) -> SupportsResult {
        match *range.peek() {
            Token::Function(_) => {
                range.consume_component_value();
                return SupportsResult::Unsupported;
            }
            Token::ParenthesisBlock => {}
            _ => return SupportsResult::Invalid,
        }
        let mut inner = range.consume_block();
        inner.consume_whitespace();
        let result = self.consume_condition(inner);
        if result != SupportsResult::Invalid {
            return result;
        }
        self.consume_declaration_condition_or_general_enclosed(inner)
    }

    fn consume_declaration_condition_or_general_enclosed(
        &mut self,
        mut range: TokenRange<'t, 'i>,
    ) -> SupportsResult {
        match *range.peek() {
            Token::Function(_) => {
                range.consume_component_value();
                if range.at_end() {
                    SupportsResult::Unsupported
                } else {
                    SupportsResult::Invalid
                }
            }
            Token::Ident(_) => SupportsResult::from_bool(self.probe.supports_declaration(range)),
            _ => SupportsResult::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TokenList;

    /// Supports `name: value` for the listed names, whatever the value.
    struct KnownNames(&'static [&'static str]);

    impl<'t, 'i> DeclarationProbe<'t, 'i> for KnownNames {
        fn supports_declaration(&mut self, mut range: TokenRange<'t, 'i>) -> bool {
            let known = match *range.consume_including_whitespace() {
                Token::Ident(ref name) => {
                    self.0.iter().any(|known| name.eq_ignore_ascii_case(known))
                }
                _ => false,
            };
            known && *range.consume() == Token::Colon
        }
    }

    fn evaluate(text: &str, mode: SupportsParsingMode) -> SupportsResult {
        let list = TokenList::new(text);
        supports_condition(list.range(), &mut KnownNames(&["color", "display"]), mode, 32)
    }

    fn at_rule(text: &str) -> SupportsResult {
        evaluate(text, SupportsParsingMode::AtRule)
    }

    #[test]
    fn declarations() {
        assert_eq!(at_rule("(color: red)"), SupportsResult::Supported);
        assert_eq!(at_rule("( display : grid )"), SupportsResult::Supported);
        assert_eq!(at_rule("(blabla: 1)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("(blabla)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("color: red"), SupportsResult::Invalid);
    }

    #[test]
    fn negation() {
        assert_eq!(at_rule("not (blabla)"), SupportsResult::Supported);
        assert_eq!(at_rule("NOT (color: red)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("not(color: red)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("not(blabla)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("not (color: red) foo"), SupportsResult::Invalid);
        assert_eq!(at_rule("nope (color: red)"), SupportsResult::Invalid);
    }

    #[test]
    fn conjunction_and_disjunction() {
        assert_eq!(at_rule("(color: red) and (display: grid)"), SupportsResult::Supported);
        assert_eq!(at_rule("(color: red) and (foo: bar)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("(foo: bar) or (color: red)"), SupportsResult::Supported);
        assert_eq!(at_rule("(foo: bar) or (baz: 1) or (qux: 2)"), SupportsResult::Unsupported);
        assert_eq!(
            at_rule("(color: red) and (display: grid) or (foo: bar)"),
            SupportsResult::Invalid
        );
        assert_eq!(
            at_rule("(color: red) or (display: grid) and (foo: bar)"),
            SupportsResult::Invalid
        );
        assert_eq!(at_rule("(color: red) xor (display: grid)"), SupportsResult::Invalid);
        assert_eq!(at_rule("(color: red) and"), SupportsResult::Invalid);
        assert_eq!(at_rule("(color: red) and "), SupportsResult::Invalid);
    }

    #[test]
    fn combinators_need_whitespace() {
        assert_eq!(at_rule("(color: red)and (display: grid)"), SupportsResult::Invalid);
        assert_eq!(at_rule("(color: red) and(display: grid)"), SupportsResult::Invalid);
        assert_eq!(at_rule("(foo: 1)or (color: red)"), SupportsResult::Invalid);
        assert_eq!(at_rule("(color: red)  AND\n(display: grid) "), SupportsResult::Supported);
    }

    #[test]
    fn nested_conditions() {
        assert_eq!(
            at_rule("((color: red) or (foo: 1)) and (not (bar: 2))"),
            SupportsResult::Supported
        );
        assert_eq!(at_rule("(not (color: red))"), SupportsResult::Unsupported);
    }

    #[test]
    fn general_enclosed() {
        assert_eq!(at_rule("(selector(a b))"), SupportsResult::Unsupported);
        assert_eq!(at_rule("(selector(a) b)"), SupportsResult::Invalid);
        assert_eq!(at_rule("not (selector(a))"), SupportsResult::Supported);
        assert_eq!(at_rule("selector(a)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("(color: red) and foo(x)"), SupportsResult::Unsupported);
        assert_eq!(at_rule("foo(x) or (color: red)"), SupportsResult::Supported);
        assert_eq!(at_rule("not foo(x)"), SupportsResult::Supported);
        assert_eq!(at_rule("foo((color: red)) or bar(x)"), SupportsResult::Unsupported);
    }

    #[test]
    fn window_css() {
        let window = SupportsParsingMode::WindowCss;
        assert_eq!(evaluate("color: red", window), SupportsResult::Supported);
        assert_eq!(evaluate("  blabla: red", window), SupportsResult::Unsupported);
        assert_eq!(evaluate("foo(bar)", window), SupportsResult::Unsupported);
        assert_eq!(evaluate("(color: red)", window), SupportsResult::Supported);
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}(color: red){}", "(".repeat(40), ")".repeat(40));
        assert_eq!(at_rule(&deep), SupportsResult::Invalid);
        let shallow = format!("{}(color: red){}", "(".repeat(10), ")".repeat(10));
        assert_eq!(at_rule(&shallow), SupportsResult::Supported);
    }
}
