/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use difference::Changeset;
use serde_json::{json, Value};

use super::{
    parse_nth, tokenize, AllowedRules, BasicGrammar, CommentSpan, CssParser, CssRule, Declaration,
    DeclarationBlock, MediaFeatureValidator, Namespaces, NumericType, NumericValue, ParseError,
    ParseErrorKind, ParserObserver, ParserOptions, PropertyId, PropertyName, RuleType,
    SelectorGrammar, SelectorList, SourceLocation, StyleSheetContents, SupportsParsingMode,
    SupportsResult, ToCss, Token, TokenList, TokenRange, Tokenizer, ValueGrammar,
};

fn almost_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (&Value::Number(ref a), &Value::Number(ref b)) => {
            let a = a.as_f64().unwrap();
            let b = b.as_f64().unwrap();
            (a - b).abs() <= a.abs() * 1e-6
        }

        (&Value::Bool(a), &Value::Bool(b)) => a == b,
        (&Value::String(ref a), &Value::String(ref b)) => a == b,
        (&Value::Array(ref a), &Value::Array(ref b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(ref a, ref b)| almost_equals(*a, *b))
        }
        (&Value::Object(_), &Value::Object(_)) => panic!("Not implemented"),
        (&Value::Null, &Value::Null) => true,
        _ => false,
    }
}

fn assert_json_eq(results: Value, expected: Value, message: &str) {
    if !almost_equals(&results, &expected) {
        println!(
            "{}",
            Changeset::new(
                &serde_json::to_string_pretty(&results).unwrap(),
                &serde_json::to_string_pretty(&expected).unwrap(),
                "\n",
            )
        );
        panic!("{}", message)
    }
}

/// `tests` alternates inputs and expected results.
fn run_raw_json_tests<F: Fn(Value, Value)>(tests: Value, run: F) {
    let items = match tests {
        Value::Array(items) => items,
        other => panic!("Invalid JSON: {:?}", other),
    };
    assert!(items.len() % 2 == 0);
    let mut input = None;
    for item in items.into_iter() {
        match (&input, item) {
            (&None, json_obj) => input = Some(json_obj),
            (&Some(_), expected) => {
                let input = input.take().unwrap();
                run(input, expected)
            }
        };
    }
}

fn run_json_tests<F: Fn(&str) -> Value>(tests: Value, parse: F) {
    run_raw_json_tests(tests, |input, expected| match input {
        Value::String(input) => {
            let result = parse(&input);
            assert_json_eq(result, expected, &input);
        }
        _ => panic!("Unexpected JSON"),
    });
}

fn tokens_to_json(tokens: &[Token]) -> Value {
    Value::Array(tokens.iter().map(token_to_json).collect())
}

fn token_to_json(token: &Token) -> Value {
    fn numeric(value: NumericValue) -> Vec<Value> {
        vec![
            Token::Number(value).to_css_string().into(),
            match value.int_value {
                Some(i) => json!(i),
                None => json!(value.value),
            },
            match value.int_value {
                Some(_) => "integer",
                None => "number",
            }
            .into(),
        ]
    }

    match *token {
        Token::Ident(ref value) => json!(["ident", value]),
        Token::AtKeyword(ref value) => json!(["at-keyword", value]),
        Token::Hash(ref value) => json!(["hash", value, "unrestricted"]),
        Token::IDHash(ref value) => json!(["hash", value, "id"]),
        Token::QuotedString(ref value) => json!(["string", value]),
        Token::Url(ref value) => json!(["url", value]),
        Token::Delim(value) => value.to_string().into(),

        Token::Number(value) => Value::Array({
            let mut v = vec!["number".into()];
            v.extend(numeric(value));
            v
        }),
        Token::Percentage(value) => Value::Array({
            let mut v = vec!["percentage".into()];
            v.extend(numeric(value));
            v
        }),
        Token::Dimension(value, ref unit) => Value::Array({
            let mut v = vec!["dimension".into()];
            v.extend(numeric(value));
            v.push(unit.to_string().into());
            v
        }),

        Token::UnicodeRange(start, end) => json!(["unicode-range", start, end]),

        Token::WhiteSpace(_) => " ".into(),
        Token::Comment(_) => "/**/".into(),
        Token::Colon => ":".into(),
        Token::Semicolon => ";".into(),
        Token::Comma => ",".into(),
        Token::IncludeMatch => "~=".into(),
        Token::DashMatch => "|=".into(),
        Token::PrefixMatch => "^=".into(),
        Token::SuffixMatch => "$=".into(),
        Token::SubstringMatch => "*=".into(),
        Token::Column => "||".into(),
        Token::CDO => "<!--".into(),
        Token::CDC => "-->".into(),

        Token::Function(ref name) => json!(["function", name]),
        Token::ParenthesisBlock => "(".into(),
        Token::SquareBracketBlock => "[".into(),
        Token::CurlyBracketBlock => "{".into(),
        Token::BadUrl => json!(["error", "bad-url"]),
        Token::BadString => json!(["error", "bad-string"]),
        Token::CloseParenthesis => ")".into(),
        Token::CloseSquareBracket => "]".into(),
        Token::CloseCurlyBracket => "}".into(),
        Token::Eof => Value::Null,
    }
}

fn declarations_to_json(block: &DeclarationBlock) -> Value {
    Value::Array(block.declarations().iter().map(declaration_to_json).collect())
}

fn declaration_to_json(declaration: &Declaration) -> Value {
    json!([
        declaration.name.to_css_string(),
        declaration.value,
        declaration.important
    ])
}

fn stylesheet_to_json(css: &str, options: &ParserOptions) -> Value {
    let mut sheet = StyleSheetContents::new();
    CssParser::new(options).parse_stylesheet(css, &mut sheet);
    Value::Array(sheet.rules.iter().map(|rule| rule.to_css_string().into()).collect())
}

#[test]
fn tokens() {
    run_json_tests(
        json!([
            "foo bar(1 2.5 +3%)", [
                ["ident", "foo"], " ", ["function", "bar"], ["number", "1", 1, "integer"], " ",
                ["number", "2.5", 2.5, "number"], " ", ["percentage", "+3", 3, "integer"], ")"
            ],
            "#a1 #1a", [["hash", "a1", "id"], " ", ["hash", "1a", "unrestricted"]],
            "10px .5em", [
                ["dimension", "10", 10, "integer", "px"], " ",
                ["dimension", "0.5", 0.5, "number", "em"]
            ],
            "url(x.png) url('y')", [
                ["url", "x.png"], " ", ["function", "url"], ["string", "y"], ")"
            ],
            "url(a b)", [["error", "bad-url"]],
            "\"unterminated\n", [["error", "bad-string"], " "],
            "a\\62 c", [["ident", "abc"]],
            "<!-- --> ~= |= ^= $= *= || @media", [
                "<!--", " ", "-->", " ", "~=", " ", "|=", " ", "^=", " ", "$=", " ", "*=", " ",
                "||", " ", ["at-keyword", "media"]
            ],
            "u+26 U+0-7F U+4??", [
                ["unicode-range", 38, 38], " ", ["unicode-range", 0, 127], " ",
                ["unicode-range", 1024, 1279]
            ],
            "/* c */a:b;c,[d]{e}", [
                "/**/", ["ident", "a"], ":", ["ident", "b"], ";", ["ident", "c"], ",", "[",
                ["ident", "d"], "]", "{", ["ident", "e"], "}"
            ],
            "", [],
        ]),
        |input| tokens_to_json(&tokenize(input)),
    );
}

#[test]
fn token_properties() {
    let tokens = tokenize("foo a\\62 c 'x' \"\\79\" 10px 1\\70 x 2.5 -3");
    let tokens: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(**t, Token::WhiteSpace(_)))
        .collect();
    let values: Vec<Option<&str>> = tokens.iter().map(|t| t.value()).collect();
    assert_eq!(
        values,
        vec![Some("foo"), Some("abc"), Some("x"), Some("y"), Some("px"), Some("px"), None, None]
    );
    let backed: Vec<bool> = tokens.iter().map(|t| t.has_string_backing()).collect();
    assert_eq!(backed, vec![false, true, false, true, false, true, false, false]);

    let numeric_types: Vec<NumericType> = tokens
        .iter()
        .filter_map(|t| match **t {
            Token::Number(value) | Token::Dimension(value, _) => Some(value.numeric_type()),
            _ => None,
        })
        .collect();
    assert_eq!(
        numeric_types,
        vec![
            NumericType::Integer,
            NumericType::Integer,
            NumericType::Number,
            NumericType::Integer,
        ]
    );
}

#[test]
fn serializer() {
    run_json_tests(
        json!([
            "a/**/b", "a/**/b",
            "a/**/(b)", "a/**/(b)",
            "1/**/2 #x/**/-y", "1/**/2 #x/**/-y",
            "  foo(  1px , 'a\"b' )  ", " foo( 1px , \"a\\\"b\" ) ",
            "url(x y)", "url(<bad url>)",
            "a,b , -1,2", "a,b , -1,2",
        ]),
        |input| {
            let list = TokenList::new(input);
            let serialized = list.range().serialize();
            let reparsed = TokenList::new(&serialized);
            assert_json_eq(
                tokens_to_json(reparsed.tokens()),
                tokens_to_json(list.tokens()),
                &serialized,
            );
            serialized.into()
        },
    );
}

#[test]
fn line_numbers() {
    let mut input = Tokenizer::new("foo bar\nbaz\r\n\n\"a\\\r\nb\"");
    let location = |input: &Tokenizer| input.source_location(input.current_position());
    assert_eq!(location(&input), SourceLocation { line: 1, column: 1 });
    assert_eq!(input.next(), Some(Token::Ident("foo".into())));
    assert_eq!(location(&input), SourceLocation { line: 1, column: 4 });
    assert_eq!(input.next(), Some(Token::WhiteSpace(" ")));
    assert_eq!(location(&input), SourceLocation { line: 1, column: 5 });
    assert_eq!(input.next(), Some(Token::Ident("bar".into())));
    assert_eq!(location(&input), SourceLocation { line: 1, column: 8 });
    assert_eq!(input.next(), Some(Token::WhiteSpace("\n")));
    assert_eq!(location(&input), SourceLocation { line: 2, column: 1 });
    assert_eq!(input.next(), Some(Token::Ident("baz".into())));
    assert_eq!(location(&input), SourceLocation { line: 2, column: 4 });
    let position = input.current_position();

    assert_eq!(input.next(), Some(Token::WhiteSpace("\r\n\n")));
    assert_eq!(location(&input), SourceLocation { line: 4, column: 1 });

    assert_eq!(input.source_location(position), SourceLocation { line: 2, column: 4 });

    assert_eq!(input.next(), Some(Token::QuotedString("ab".into())));
    assert_eq!(location(&input), SourceLocation { line: 5, column: 3 });
    assert_eq!(input.next(), None);
}

#[test]
fn nth() {
    run_json_tests(
        json!([
            "2n+1", [2, 1],
            "odd", [2, 1],
            "EVEN", [2, 0],
            "-n+3", [-1, 3],
            "n- 1", [1, -1],
            "2n - 1", [2, -1],
            "3n-2", [3, -2],
            "+n", [1, 0],
            "3", [0, 3],
            "+ 5", null,
            "foo", null,
            "2n 1", null,
        ]),
        |input| {
            let list = TokenList::new(input);
            let mut range = list.range();
            let result = parse_nth(&mut range).ok().filter(|_| {
                range.consume_whitespace();
                range.at_end()
            });
            match result {
                Some((a, b)) => json!([a, b]),
                None => Value::Null,
            }
        },
    );
}

#[test]
fn token_ranges() {
    let list = TokenList::new("a (b [c) d] e) f");
    let mut range = list.range();
    assert_eq!(*range.consume_including_whitespace(), Token::Ident("a".into()));
    let block = range.consume_block();
    assert_eq!(block.serialize(), "b [c) d] e");
    range.consume_whitespace();
    assert_eq!(*range.consume(), Token::Ident("f".into()));
    assert!(range.at_end());
    assert_eq!(*range.peek(), Token::Eof);
    assert_eq!(*range.consume(), Token::Eof);

    let list = TokenList::new("(a b");
    let mut range = list.range();
    assert_eq!(range.consume_block().serialize(), "a b");
    assert!(range.at_end());

    let list = TokenList::new("  a [b c] d  ");
    let range = list.range().trim_whitespace();
    assert_eq!(range.serialize(), "a [b c] d");
    let mut rest = range;
    rest.consume_including_whitespace();
    rest.consume_component_value();
    assert_eq!(range.until(&rest).serialize(), "a [b c]");
    assert_eq!(range.truncate(1).serialize(), "a");
    assert_eq!(range.source_text(), "a [b c] d");
}

#[test]
fn comments_side_table() {
    let list = TokenList::with_comments("a/* x */b");
    assert_eq!(list.tokens(), &[Token::Ident("a".into()), Token::Ident("b".into())]);
    assert_eq!(
        list.comments(),
        &[CommentSpan {
            tokens_before: 1,
            start: 1,
            end: 8,
        }]
    );
    assert_eq!(list.range().source_text(), "a/* x */b");
    assert!(TokenList::new("a/* x */b").comments().is_empty());
}

#[test]
fn parse_errors() {
    let list = TokenList::new("a\n  b");
    let mut range = list.range();
    range.consume_including_whitespace();
    let error = range.expect_exhausted().unwrap_err();
    assert_eq!(error.kind, ParseErrorKind::TrailingInput);
    assert_eq!(error.position.byte_index(), 4);
    assert_eq!(list.source_location(error.position), SourceLocation { line: 2, column: 3 });
    assert_eq!(
        error.to_string(),
        "unexpected input after the end of the construct at byte 4"
    );

    range.consume();
    assert_eq!(range.new_unexpected_token_error().kind, ParseErrorKind::EndOfInput);
    assert_eq!(
        ParseErrorKind::UnknownAtRule("foo".into()).to_string(),
        "unknown at-rule @foo"
    );
}

#[test]
fn stylesheet() {
    run_json_tests(
        json!([
            "@charset \"utf-8\"; @import url(base.css) screen; \
             @namespace svg url(http://www.w3.org/2000/svg); \
             svg|a { color: red } foo|b { color: blue }", [
                "@import url(\"base.css\") screen;",
                "@namespace svg url(\"http://www.w3.org/2000/svg\");",
                "svg|a { color: red; }"
            ],
            "a { color: red } @import url(x.css); @charset \"utf-8\"; b { width: 1px }", [
                "a { color: red; }", "b { width: 1px; }"
            ],
            "<!-- a { color: red } -->", ["a { color: red; }"],
            "@media print { a { color: red } @import url(x.css); }", [
                "@media print { a { color: red; } }"
            ],
            "@media screen and (min-width: 900px), foo bar { }", [
                "@media screen and (min-width: 900px), not all { }"
            ],
            "@supports (display: grid) and (not (display: inline-grid)) { a { display: grid } }", [
                "@supports (display: grid) and (not (display: inline-grid)) \
                 { a { display: grid; } }"
            ],
            "@supports (display: grid) and or (color: red) { a { } } b { }", ["b { }"],
            "@font-face { font-family: x !important; src: url(a.woff) }", [
                "@font-face { src: url(a.woff); }"
            ],
            "@keyframes spin { from { opacity: 0 } 50% { opacity: 0.5 } \
             to { opacity: 1 !important } \
             10%, from, 2 { opacity: 0 } @media print { } }", [
                "@keyframes spin { 0% { opacity: 0; } 50% { opacity: 0.5; } 100% { } }"
            ],
            "@-webkit-keyframes \"x\" { } @keyframes \"y\" { } @keyframes a b { }", [
                "@-webkit-keyframes x { }"
            ],
            "@page :first { size: a4; margin: 1in; src: url(a) }", [
                "@page :first { size: a4; margin: 1in; }"
            ],
            "@viewport { width: 100px; color: red }", ["@viewport { width: 100px; }"],
            "a { @media print { b { } } color: red }", ["a { color: red; }"],
            "a { color: red; foo: bar; width }", ["a { color: red; }"],
            "@unknown foo; @unknown { } a { }", ["a { }"],
            "a { color: red", ["a { color: red; }"],
            "a, b", [],
            "a, { } b > { } c d { }", ["c d { }"],
        ]),
        |input| stylesheet_to_json(input, &ParserOptions::default()),
    );
}

#[test]
fn nested_rule_depth() {
    let options = ParserOptions {
        max_nesting_depth: 2,
        ..ParserOptions::default()
    };
    assert_json_eq(
        stylesheet_to_json(
            "@media all { @media all { @media all { a { } } } b { } }",
            &options,
        ),
        json!(["@media all { @media all { } b { } }"]),
        "max_nesting_depth",
    );
    assert_json_eq(
        stylesheet_to_json(
            "@media all { @media all { @media all { a { } } } }",
            &ParserOptions::default(),
        ),
        json!(["@media all { @media all { @media all { a { } } } }"]),
        "default depth",
    );
}

#[test]
fn viewport_rule_can_be_disabled() {
    let options = ParserOptions {
        viewport_rule_enabled: false,
        ..ParserOptions::default()
    };
    assert_json_eq(
        stylesheet_to_json("@viewport { width: 100px } a { }", &options),
        json!(["a { }"]),
        "viewport disabled",
    );
}

#[test]
fn stylesheet_flags() {
    let parse = |css: &str| {
        let mut sheet = StyleSheetContents::new();
        CssParser::default().parse_stylesheet(css, &mut sheet);
        sheet
    };

    let sheet = parse("a { font-size: 2rem } @font-face { font-family: x }");
    assert!(sheet.has_syntactically_valid_css_header);
    assert!(sheet.uses_rem_units);
    assert!(sheet.has_font_face_rule);

    let sheet = parse("@unknown; a { width: 1REM }");
    assert!(!sheet.has_syntactically_valid_css_header);
    assert!(sheet.uses_rem_units);
    assert!(!sheet.has_font_face_rule);
    assert_eq!(sheet.rules.len(), 1);

    // A supports probe is not a declaration of the sheet.
    let sheet = parse("@supports (width: 1rem) { } a { width: 1em; --x: 1rem }");
    assert!(!sheet.uses_rem_units);

    let sheet = parse("@charset \"utf-8\"; @namespace url(http://www.w3.org/1999/xhtml);");
    assert!(sheet.has_syntactically_valid_css_header);
    assert_eq!(sheet.rules.len(), 1);
    assert_eq!(
        sheet.namespaces.default.as_deref(),
        Some("http://www.w3.org/1999/xhtml")
    );

    let sheet = parse("@namespace svg url(http://www.w3.org/2000/svg); svg|rect { }");
    assert_eq!(sheet.namespaces.url("svg"), Some("http://www.w3.org/2000/svg"));
    assert_eq!(sheet.namespaces.url("html"), None);
    assert_eq!(sheet.rules.len(), 2);
}

#[test]
fn supports_rule_result() {
    let mut sheet = StyleSheetContents::new();
    CssParser::default().parse_stylesheet(
        "@supports (display: grid) and (not (display: inline-grid)) { } \
         @supports not (blabla: 1) { } \
         @supports selector(a) or (display: grid) { a { color: red } } \
         @supports (display: grid)and (color: red) { b { color: red } }",
        &mut sheet,
    );
    assert_eq!(sheet.rules.len(), 3);
    let supported: Vec<bool> = sheet
        .rules
        .iter()
        .map(|rule| match *rule {
            CssRule::Supports(ref rule) => rule.supported,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(supported, vec![false, true, true]);
    assert_eq!(
        sheet.rules[2].to_css_string(),
        "@supports selector(a) or (display: grid) { a { color: red; } }"
    );
}

#[test]
fn declaration_lists() {
    run_json_tests(
        json!([
            "color: red; color: blue", [["color", "blue", false]],
            "color: red !important; color: blue", [["color", "red", true]],
            "--x: 1; --x: 2", [["--x", "1", false], ["--x", "2", false]],
            "width: 1px; foo: bar; ; margin: 0 ! IMPORTANT", [
                ["width", "1px", false], ["margin", "0", true]
            ],
            "color: red; width: 1px !important; height: 2px", [
                ["color", "red", false], ["height", "2px", false], ["width", "1px", true]
            ],
            "a: b; {color: red}; color: blue", [["color", "blue", false]],
            "color: ; width", [],
            "color: red } width: 1px", [],
            "--empty:;--block: { a: b } ", [["--empty", "", false], ["--block", "{ a: b }", false]],
        ]),
        |input| declarations_to_json(&CssParser::default().parse_inline_style(input)),
    );
}

#[test]
fn declaration_list_merge() {
    let mut block = CssParser::default().parse_inline_style("color: red !important; width: 1px");
    assert!(CssParser::default()
        .parse_declaration_list("color: blue; height: 2px; width: 3px", &mut block));
    assert_json_eq(
        declarations_to_json(&block),
        json!([["width", "3px", false], ["color", "red", true], ["height", "2px", false]]),
        "merge",
    );
    assert!(!CssParser::default().parse_declaration_list("foo: bar; color:", &mut block));
    assert_eq!(block.len(), 3);
    assert_eq!(
        block.get(PropertyId::Width).map(|d| &*d.value),
        Some("3px")
    );
}

#[test]
fn single_values() {
    let color = CssParser::default().parse_value(PropertyId::Color, " red ", false);
    assert_eq!(
        color,
        vec![Declaration {
            name: PropertyName::Known(PropertyId::Color),
            value: "red".into(),
            important: false,
        }]
    );
    assert!(CssParser::default().parse_value(PropertyId::Color, "", false).is_empty());
    assert!(CssParser::default().parse_value(PropertyId::Src, "url(a)", false).is_empty());
    let width = CssParser::default().parse_value(PropertyId::Width, "2rem", true);
    assert_eq!(width.len(), 1);
    assert!(width[0].important);

    let custom = |text: &str| {
        CssParser::default()
            .parse_custom_property_value("--x", text, false)
            .map(|declaration| declaration.value)
    };
    assert_eq!(custom(" { a } ").as_deref(), Some("{ a }"));
    assert_eq!(custom("a ! b").as_deref(), Some("a ! b"));
    assert_eq!(custom("a)"), None);

    assert_eq!(
        CssParser::default().parse_page_selector("toc:first"),
        Some(SelectorList {
            selectors: vec!["toc:first".into()]
        })
    );
    assert_eq!(CssParser::default().parse_page_selector(": first"), None);
    assert_eq!(
        CssParser::default().parse_keyframe_key_list("to, 25%"),
        Some(vec![1., 0.25])
    );
}

#[test]
fn single_rules() {
    let rule = |css: &str, allowed| {
        CssParser::default()
            .parse_rule(css, allowed)
            .map(|rule| rule.rule_type())
    };
    assert_eq!(rule("  a { color: red }  ", AllowedRules::RegularRules), Some(RuleType::Style));
    assert_eq!(rule("a { } b { }", AllowedRules::RegularRules), None);
    assert_eq!(rule("", AllowedRules::RegularRules), None);
    assert_eq!(rule("@import 'x';", AllowedRules::RegularRules), None);
    assert_eq!(rule("@import 'x';", AllowedRules::AllowImport), Some(RuleType::Import));
    assert_eq!(rule("@charset \"utf-8\";", AllowedRules::AllowCharset), Some(RuleType::Charset));
    assert_eq!(rule("@media print { }", AllowedRules::RegularRules), Some(RuleType::Media));
    assert_eq!(rule("from { opacity: 0 }", AllowedRules::KeyframeRules), Some(RuleType::Keyframe));
    assert_eq!(rule("@media print { }", AllowedRules::KeyframeRules), None);
    assert_eq!(rule("a { }", AllowedRules::NoRules), None);
}

#[test]
fn supports_conditions() {
    let at_rule = |text: &str| {
        CssParser::default().parse_supports_condition(text, SupportsParsingMode::AtRule)
    };
    assert_eq!(at_rule("not (blabla)"), SupportsResult::Supported);
    assert_eq!(at_rule("(min-width: 100px) and (max-width: 900px)"), SupportsResult::Supported);
    assert_eq!(
        at_rule("(min-width: 100px) and (max-width: 900px) or (color: red)"),
        SupportsResult::Invalid
    );
    assert_eq!(at_rule("(--foo: bar)"), SupportsResult::Supported);
    assert_eq!(at_rule("(color: )"), SupportsResult::Unsupported);
    assert_eq!(at_rule("(color: red !important)"), SupportsResult::Supported);
    assert_eq!(at_rule("(src: url(a))"), SupportsResult::Unsupported);
    assert_eq!(at_rule(""), SupportsResult::Invalid);

    let window = |text: &str| {
        CssParser::default().parse_supports_condition(text, SupportsParsingMode::WindowCss)
    };
    assert_eq!(window("color: red"), SupportsResult::Supported);
    assert_eq!(window("(color: red) or (foo: bar)"), SupportsResult::Supported);

    let shallow = ParserOptions {
        max_nesting_depth: 3,
        ..ParserOptions::default()
    };
    assert_eq!(
        CssParser::new(&shallow)
            .parse_supports_condition("((((color: red))))", SupportsParsingMode::AtRule),
        SupportsResult::Invalid
    );
    assert_eq!(at_rule("((((color: red))))"), SupportsResult::Supported);
}

#[test]
fn media_query_lists() {
    run_json_tests(
        json!([
            "screen and (min-width: 900px), print", "screen and (min-width: 900px), print",
            "(min-width: 100px) and (max-width: 900px)",
            "(min-width: 100px) and (max-width: 900px)",
            "NOT Screen And (COLOR)", "not screen and (color)",
            "only print, foo bar, (bogus: 1)", "only print, not all, not all",
            "", "",
        ]),
        |input| CssParser::default().parse_media_query_list(input).to_css_string().into(),
    );
}

/// Rejects `color` everywhere: as a property, and as a media feature.
struct NoColor;

impl ValueGrammar for NoColor {
    fn parse_value<'t, 'i>(
        &self,
        property: PropertyId,
        value: TokenRange<'t, 'i>,
        important: bool,
        context: RuleType,
        declarations: &mut Vec<Declaration>,
    ) -> Result<(), ParseError> {
        if property == PropertyId::Color {
            return Err(value.new_error(ParseErrorKind::InvalidValue("color".into())));
        }
        BasicGrammar.parse_value(property, value, important, context, declarations)
    }

    fn parse_custom_property_value<'t, 'i>(
        &self,
        name: &str,
        value: TokenRange<'t, 'i>,
        important: bool,
    ) -> Result<Declaration, ParseError> {
        BasicGrammar.parse_custom_property_value(name, value, important)
    }
}

impl SelectorGrammar for NoColor {
    fn parse_selector_list<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
        namespaces: &Namespaces,
    ) -> Result<SelectorList, ParseError> {
        BasicGrammar.parse_selector_list(prelude, namespaces)
    }

    fn parse_page_selector<'t, 'i>(
        &self,
        prelude: TokenRange<'t, 'i>,
    ) -> Result<SelectorList, ParseError> {
        BasicGrammar.parse_page_selector(prelude)
    }
}

impl MediaFeatureValidator for NoColor {
    fn validate(&self, name: &str, value: &[Token]) -> bool {
        name != "color" && BasicGrammar.validate(name, value)
    }
}

#[test]
fn custom_grammar() {
    let options = ParserOptions::default();
    let block =
        CssParser::with_grammar(&options, NoColor).parse_inline_style("color: red; width: 1px");
    assert_json_eq(declarations_to_json(&block), json!([["width", "1px", false]]), "values");

    let media =
        CssParser::with_grammar(&options, NoColor).parse_media_query_list("(color), (width: 0)");
    assert_eq!(media.to_css_string(), "not all, (width: 0)");

    assert_eq!(
        CssParser::with_grammar(&options, NoColor)
            .parse_supports_condition("(color: red)", SupportsParsingMode::AtRule),
        SupportsResult::Unsupported
    );
}

#[derive(Default)]
struct Recorder {
    events: Vec<Value>,
}

impl ParserObserver for Recorder {
    fn start_rule_header(&mut self, rule_type: RuleType, offset: usize) {
        self.events
            .push(json!(["start_rule_header", format!("{:?}", rule_type), offset]));
    }

    fn end_rule_header(&mut self, offset: usize) {
        self.events.push(json!(["end_rule_header", offset]));
    }

    fn start_rule_body(&mut self, offset: usize) {
        self.events.push(json!(["start_rule_body", offset]));
    }

    fn end_rule_body(&mut self, offset: usize) {
        self.events.push(json!(["end_rule_body", offset]));
    }

    fn observe_property(&mut self, start: usize, end: usize, important: bool, parsed: bool) {
        self.events.push(json!(["property", start, end, important, parsed]));
    }

    fn observe_comment(&mut self, start: usize, end: usize) {
        self.events.push(json!(["comment", start, end]));
    }
}

#[test]
fn observer_events() {
    run_json_tests(
        json!([
            "a { color: red; /* c */ width: 1px }", [
                ["start_rule_header", "Style", 0], ["end_rule_header", 2], ["start_rule_body", 2],
                ["property", 4, 14, false, true],
                ["comment", 16, 23],
                ["property", 24, 35, false, true],
                ["end_rule_body", 35]
            ],
            "a { foo: 1 }", [
                ["start_rule_header", "Style", 0], ["end_rule_header", 2], ["start_rule_body", 2],
                ["property", 4, 11, false, false],
                ["end_rule_body", 11]
            ],
            "@media print { a {} }", [
                ["start_rule_header", "Media", 7], ["end_rule_header", 13],
                ["start_rule_body", 13],
                ["start_rule_header", "Style", 15], ["end_rule_header", 17],
                ["start_rule_body", 17],
                ["end_rule_body", 18],
                ["end_rule_body", 20]
            ],
        ]),
        |input| {
            let mut recorder = Recorder::default();
            let mut sheet = StyleSheetContents::new();
            CssParser::default()
                .observer(&mut recorder)
                .parse_stylesheet(input, &mut sheet);
            Value::Array(recorder.events)
        },
    );
}

#[test]
fn observer_does_not_change_results() {
    let css = "@import 'a.css'; /* x */ a { color: red; /* y */ } \
               @media print { @supports (color: red) { b { width: 1px !important } } } \
               @keyframes k { from { opacity: 0 } } @page { margin: 0 } @font-face { src: url(a) }";
    let mut plain = StyleSheetContents::new();
    CssParser::default().parse_stylesheet(css, &mut plain);

    let mut recorder = Recorder::default();
    let mut observed = StyleSheetContents::new();
    CssParser::default()
        .observer(&mut recorder)
        .parse_stylesheet(css, &mut observed);

    assert_eq!(plain.rules, observed.rules);
    assert_eq!(plain.rules.len(), 6);
    assert!(!recorder.events.is_empty());
}
