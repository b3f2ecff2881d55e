#![no_main]

use cssrules::*;

const DEBUG: bool = false;

/// Checks that offsets stay inside the input and never go backwards within a rule.
struct OffsetChecker {
    len: usize,
    open_bodies: Vec<usize>,
}

impl ParserObserver for OffsetChecker {
    fn start_rule_header(&mut self, _: RuleType, offset: usize) {
        assert!(offset <= self.len);
    }

    fn end_rule_header(&mut self, offset: usize) {
        assert!(offset <= self.len);
    }

    fn start_rule_body(&mut self, offset: usize) {
        assert!(offset <= self.len);
        self.open_bodies.push(offset);
    }

    fn end_rule_body(&mut self, offset: usize) {
        let start = self.open_bodies.pop().expect("unbalanced rule body");
        assert!(start <= offset && offset <= self.len);
    }

    fn observe_property(&mut self, start: usize, end: usize, _: bool, _: bool) {
        assert!(start <= end && end <= self.len);
    }

    fn observe_comment(&mut self, start: usize, end: usize) {
        assert!(start < end && end <= self.len);
    }
}

fn serialize_rules(input: &str) -> String {
    let mut sheet = StyleSheetContents::new();
    let mut checker = OffsetChecker {
        len: input.len(),
        open_bodies: Vec::new(),
    };
    CssParser::default()
        .observer(&mut checker)
        .parse_stylesheet(input, &mut sheet);
    assert!(checker.open_bodies.is_empty());
    sheet
        .rules
        .iter()
        .map(|rule| rule.to_css_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn fuzz(data: &str) {
    let tokens = TokenList::new(data);
    let serialization = tokens.range().serialize();
    let retokenized = TokenList::new(&serialization);
    if DEBUG {
        println!("IN: {:?}", serialization);
        println!("OUT: {:?}", retokenized.range().serialize());
    }

    let rules = serialize_rules(data);
    let reserialization = serialize_rules(&rules);
    if DEBUG {
        println!("RULES: {:?}", rules);
        println!("AGAIN: {:?}", reserialization);
    }
    // TODO: assert that rule serialization is idempotent once numbers near the
    // f32 precision limits round-trip through dtoa-short.

    CssParser::default().parse_supports_condition(data, SupportsParsingMode::WindowCss);
    CssParser::default().parse_media_query_list(data);
    CssParser::default().parse_inline_style(data);
}

libfuzzer_sys::fuzz_target!(|data: &str| {
    fuzz(data);
});
