/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use super::{NumericValue, ParseError, ParseErrorKind, Token, TokenRange};

/// Parse the *An+B* notation, as found in the `:nth-child()` selector.
/// The input is typically the arguments of a function,
/// in which case the caller needs to check if the arguments' range is exhausted.
/// Return `Ok((A, B))`, or an error for a syntax error.
pub fn parse_nth(input: &mut TokenRange) -> Result<(i32, i32), ParseError> {
    input.consume_whitespace();
    let error = input.new_unexpected_token_error();
    match *input.consume_including_whitespace() {
        Token::Number(value) => Ok((0, integer(&value).ok_or(error)?)),
        Token::Dimension(value, ref unit) => {
            let a = integer(&value).ok_or_else(|| error.clone())?;
            match_ignore_ascii_case! { unit,
                "n" => parse_b(input, a),
                "n-" => parse_signless_b(input, a, -1),
                _ => match parse_n_dash_digits(unit) {
                    Some(b) => Ok((a, b)),
                    None => Err(error),
                },
            }
        }
        Token::Ident(ref value) => {
            match_ignore_ascii_case! { value,
                "even" => Ok((2, 0)),
                "odd" => Ok((2, 1)),
                "n" => parse_b(input, 1),
                "-n" => parse_b(input, -1),
                "n-" => parse_signless_b(input, 1, -1),
                "-n-" => parse_signless_b(input, -1, -1),
                _ => {
                    let (slice, a) = if let Some(stripped) = value.strip_prefix('-') {
                        (stripped, -1)
                    } else {
                        (&**value, 1)
                    };
                    match parse_n_dash_digits(slice) {
                        Some(b) => Ok((a, b)),
                        None => Err(error),
                    }
                }
            }
        }
        // `+n` has no whitespace between the sign and the `n`,
        // which the tokenizer already guaranteed by producing an ident right after the delim.
        Token::Delim('+') => match *input.consume_including_whitespace() {
            Token::Ident(ref value) => {
                match_ignore_ascii_case! { value,
                    "n" => parse_b(input, 1),
                    "n-" => parse_signless_b(input, 1, -1),
                    _ => match parse_n_dash_digits(value) {
                        Some(b) => Ok((1, b)),
                        None => Err(error),
                    },
                }
            }
            _ => Err(error),
        },
        _ => Err(error),
    }
}

fn parse_b(input: &mut TokenRange, a: i32) -> Result<(i32, i32), ParseError> {
    let start = *input;
    match *input.consume_including_whitespace() {
        Token::Delim('+') => parse_signless_b(input, a, 1),
        Token::Delim('-') => parse_signless_b(input, a, -1),
        Token::Number(ref value) if value.has_sign() => {
            let b = integer(value).ok_or_else(|| start.new_error(ParseErrorKind::UnexpectedToken))?;
            Ok((a, b))
        }
        _ => {
            *input = start;
            Ok((a, 0))
        }
    }
}

fn parse_signless_b(input: &mut TokenRange, a: i32, b_sign: i32) -> Result<(i32, i32), ParseError> {
    let error = input.new_unexpected_token_error();
    match *input.consume_including_whitespace() {
        Token::Number(ref value) if !value.has_sign() => {
            let b = integer(value).ok_or(error)?;
            Ok((a, b_sign * b))
        }
        _ => Err(error),
    }
}

fn parse_n_dash_digits(string: &str) -> Option<i32> {
    let bytes = string.as_bytes();
    if bytes.len() >= 3
        && bytes[..2].eq_ignore_ascii_case(b"n-")
        && bytes[2..].iter().all(|&c| matches!(c, b'0'..=b'9'))
    {
        // Include the minus sign
        parse_number_saturate(&string[1..])
    } else {
        None
    }
}

fn parse_number_saturate(string: &str) -> Option<i32> {
    let list = super::TokenList::new(string);
    let mut range = list.range();
    let number = match *range.consume() {
        Token::Number(NumericValue {
            int_value: Some(int), ..
        }) => int,
        _ => return None,
    };
    if !range.at_end() {
        return None;
    }
    Some(number)
}

#[inline]
fn integer(value: &NumericValue) -> Option<i32> {
    value.int_value
}
