/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::parser::{CommentSpan, TokenRange};
use crate::rules::RuleType;

/// Receives the byte offsets of what the parser sees, for source-mapping tools.
///
/// All offsets are in bytes from the start of the parsed text.
/// Attaching an observer never changes what gets parsed.
/// Every method does nothing by default.
pub trait ParserObserver {
    /// The prelude of a rule starts.
    fn start_rule_header(&mut self, rule_type: RuleType, offset: usize) {
        let _ = (rule_type, offset);
    }

    /// The prelude of a rule ends.
    fn end_rule_header(&mut self, offset: usize) {
        let _ = offset;
    }

    /// The body of a rule starts, at its `{`.
    fn start_rule_body(&mut self, offset: usize) {
        let _ = offset;
    }

    /// The body of a rule ends.
    fn end_rule_body(&mut self, offset: usize) {
        let _ = offset;
    }

    /// A declaration in a style or keyframe rule.
    /// `parsed` tells whether the value grammar accepted it.
    fn observe_property(&mut self, start: usize, end: usize, important: bool, parsed: bool) {
        let _ = (start, end, important, parsed);
    }

    /// A comment inside a declaration list.
    fn observe_comment(&mut self, start: usize, end: usize) {
        let _ = (start, end);
    }
}

/// Pairs an observer with the comments of the token list,
/// so that comments are reported in order with the declarations around them.
pub(crate) struct ObserverWrapper<'o, 't> {
    observer: &'o mut dyn ParserObserver,
    comments: &'t [CommentSpan],
    next_comment: usize,
}

impl<'o, 't> ObserverWrapper<'o, 't> {
    pub(crate) fn new(observer: &'o mut dyn ParserObserver, comments: &'t [CommentSpan]) -> Self {
        ObserverWrapper {
            observer,
            comments,
            next_comment: 0,
        }
    }

    #[inline]
    pub(crate) fn observer(&mut self) -> &mut (dyn ParserObserver + 'o) {
        &mut *self.observer
    }

    /// Report the comments that come before the first token of `range`.
    pub(crate) fn yield_comments_before(&mut self, range: &TokenRange) {
        let start_index = range.index();
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.tokens_before > start_index {
                break;
            }
            self.observer.observe_comment(comment.start, comment.end);
            self.next_comment += 1;
        }
    }

    /// Skip the comments before `range` without reporting them.
    ///
    /// With `leave_directly_before`, comments right before the first token of the range are kept
    /// for a later `yield_comments_before`.
    pub(crate) fn skip_comments_before(&mut self, range: &TokenRange, leave_directly_before: bool) {
        let mut start_index = range.index();
        if !leave_directly_before {
            start_index += 1;
        }
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.tokens_before >= start_index {
                break;
            }
            self.next_comment += 1;
        }
    }
}
