/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

/// Expands to a `match` expression with string patterns,
/// matching case-insensitively in the ASCII range.
///
/// Every keyword comparison in the grammar goes through this macro
/// (or through `ascii_case_insensitive_phf_map!`),
/// so that all call sites agree on what "case-insensitive" means.
///
/// The patterns must be string literals in ASCII lowercase,
/// which is checked at compile time. The last arm must be a `_` fallback.
///
/// # Example
///
/// ```rust
/// #[macro_use] extern crate cssrules;
///
/// # fn main() {}  // Make doctest not wrap everything in its own main
/// fn restrictor(keyword: &str) -> Option<bool> {
///     match_ignore_ascii_case! { keyword,
///         "not" => Some(true),
///         "only" => Some(false),
///         _ => None,
///     }
/// }
/// ```
#[macro_export]
macro_rules! match_ignore_ascii_case {
    ( $input:expr,
        $( $( $string:literal )|+ => $then:expr, )+
        _ => $fallback:expr $(,)?
    ) => {
        {
            // The proc-macro can only be expanded in item position.
            mod cssrules_internal {
                $crate::_cssrules_internal_max_len! {
                    $( $( $string )+ )+
                }
            }
            $crate::_cssrules_internal_to_lowercase!(
                $input, cssrules_internal::MAX_LENGTH => lowercase
            );
            // "A" can never match: every pattern is verified to be ASCII lowercase.
            match lowercase.unwrap_or("A") {
                $(
                    $( $string )|+ => $then,
                )+
                _ => $fallback,
            }
        }
    };
}

/// Define a function `$name(&str) -> Option<&'static $ValueType>`
///
/// The function finds a match for the input string
/// in a [`phf` map](https://github.com/sfackler/rust-phf)
/// and returns a reference to the corresponding value.
/// Matching is case-insensitive in the ASCII range.
///
/// ## Example:
///
/// ```rust
/// #[macro_use] extern crate cssrules;
///
/// # fn main() {}  // Make doctest not wrap everything in its own main
///
/// fn at_rule_id(name: &str) -> Option<u8> {
///     ascii_case_insensitive_phf_map! {
///         keyword -> u8 = {
///             "media" => 1,
///             "supports" => 2,
///         }
///     }
///     keyword(name).cloned()
/// }
/// ```
#[macro_export]
macro_rules! ascii_case_insensitive_phf_map {
    ($name: ident -> $ValueType: ty = { $( $key: tt => $value: expr ),+ }) => {
        ascii_case_insensitive_phf_map!($name -> $ValueType = { $( $key => $value, )+ })
    };
    ($name: ident -> $ValueType: ty = { $( $key: tt => $value: expr, )+ }) => {
        pub fn $name(input: &str) -> Option<&'static $ValueType> {
            // See the comment on the similar module in `match_ignore_ascii_case!`.
            mod cssrules_internal {
                $crate::_cssrules_internal_max_len! {
                    $( $key )+
                }
            }
            use $crate::_cssrules_internal_phf as phf;
            static MAP: phf::Map<&'static str, $ValueType> = phf::phf_map! {
                $(
                    $key => $value,
                )*
            };
            $crate::_cssrules_internal_to_lowercase!(
                input, cssrules_internal::MAX_LENGTH => lowercase
            );
            lowercase.and_then(|s| MAP.get(s))
        }
    }
}

/// Implementation detail of match_ignore_ascii_case! and ascii_case_insensitive_phf_map! macros.
///
/// **This macro is not part of the public API. It can change or be removed between any versions.**
///
/// Define a local variable named `$output`
/// to the result of calling `_cssrules_internal_to_lowercase`
/// with a stack-allocated buffer as long as the longest expected string.
#[macro_export]
#[doc(hidden)]
macro_rules! _cssrules_internal_to_lowercase {
    ($input: expr, $BUFFER_SIZE: expr => $output: ident) => {
        let mut buffer = [0u8; $BUFFER_SIZE];
        let input: &str = $input;
        let $output = $crate::_cssrules_internal_to_lowercase(&mut buffer, input);
    };
}

/// Implementation detail of match_ignore_ascii_case! and ascii_case_insensitive_phf_map! macros.
///
/// **This function is not part of the public API. It can change or be removed between any versions.**
///
/// If `input` is larger than buffer, return `None`.
/// Otherwise, return `input` ASCII-lowercased, using `buffer` as temporary space if necessary.
#[doc(hidden)]
#[allow(non_snake_case)]
#[inline]
pub fn _cssrules_internal_to_lowercase<'a>(
    buffer: &'a mut [u8],
    input: &'a str,
) -> Option<&'a str> {
    let buffer = buffer.get_mut(..input.len())?;
    match input.bytes().position(|byte| byte.is_ascii_uppercase()) {
        Some(first_uppercase) => {
            buffer.copy_from_slice(input.as_bytes());
            buffer[first_uppercase..].make_ascii_lowercase();
            // A copy of a `&str` with only ASCII bytes changed is still UTF-8.
            ::std::str::from_utf8(buffer).ok()
        }
        // common case: input is already lower-case
        None => Some(input),
    }
}
