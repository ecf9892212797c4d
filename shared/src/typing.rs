//! Character-by-character typing engine.
//!
//! The engine is fed the whole text-box value after every keystroke and
//! compares it to the value it accepted last. Only single-character
//! additions and deletions at the end are legal; anything else (paste,
//! replacing a selection, editing in the middle) is rejected and the box
//! must be put back to [`InputOutcome::value`].
//!
//! Progress counts the longest correct prefix of each word plus the spaces
//! between finished words. One wrong character stops the count for the rest
//! of that word until it is erased.

use crate::text::RaceText;

/// Position of the typist inside the text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypingCursor {
    pub line_index: usize,
    pub word_index: usize,
    pub typed_in_word: String,
    pub correct_prefix_len: usize,
    pub has_error_in_word: bool,
}

impl TypingCursor {
    fn typed_len(&self) -> usize {
        self.typed_in_word.chars().count()
    }

    fn next_word(&mut self) {
        self.word_index += 1;
        self.reset_word();
    }

    fn next_line(&mut self) {
        self.line_index += 1;
        self.word_index = 0;
        self.reset_word();
    }

    fn reset_word(&mut self) {
        self.typed_in_word.clear();
        self.correct_prefix_len = 0;
        self.has_error_in_word = false;
    }
}

/// Correct characters (and separators) counted so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressCounter {
    typed_total: usize,
    total_chars: usize,
}

impl ProgressCounter {
    pub fn new(total_chars: usize) -> Self {
        Self {
            typed_total: 0,
            total_chars,
        }
    }

    pub fn typed_total(&self) -> usize {
        self.typed_total
    }

    pub fn ratio(&self) -> f64 {
        if self.total_chars == 0 {
            return 0.0;
        }
        (self.typed_total as f64 / self.total_chars as f64).min(1.0)
    }

    fn increment(&mut self) {
        self.typed_total = (self.typed_total + 1).min(self.total_chars);
    }

    fn decrement(&mut self) {
        self.typed_total = self.typed_total.saturating_sub(1);
    }
}

/// How a new text-box value relates to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    Unchanged,
    Addition(char),
    Deletion,
    Rejected,
}

/// Classify `next` against `prev`, counting characters rather than bytes.
pub fn classify_edit(prev: &str, next: &str) -> Edit {
    if prev == next {
        return Edit::Unchanged;
    }
    let prev_len = prev.chars().count();
    let next_len = next.chars().count();
    if next_len == prev_len + 1 && next.starts_with(prev) {
        return match next[prev.len()..].chars().next() {
            Some(c) => Edit::Addition(c),
            None => Edit::Rejected,
        };
    }
    if next_len + 1 == prev_len && prev.starts_with(next) {
        return Edit::Deletion;
    }
    Edit::Rejected
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TypingEvent {
    /// New progress ratio in `[0, 1]`, fired whenever the counted total moves.
    Progress(f64),
    /// The last word of the last line was finalized.
    Complete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputOutcome {
    pub accepted: bool,
    /// Value the text box must hold after this edit.
    pub value: String,
    pub events: Vec<TypingEvent>,
}

/// Highlight state of one character of the active word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharMark {
    Correct,
    Pending,
}

#[derive(Clone, Debug)]
pub struct TypingEngine {
    text: RaceText,
    cursor: TypingCursor,
    progress: ProgressCounter,
    value: String,
    completed: bool,
}

impl TypingEngine {
    pub fn new(text: &str) -> Self {
        let text = RaceText::new(text);
        let progress = ProgressCounter::new(text.total_chars());
        Self {
            text,
            cursor: TypingCursor::default(),
            progress,
            value: String::new(),
            completed: false,
        }
    }

    /// Replace the text and start over from the first word.
    pub fn configure(&mut self, text: &str) {
        *self = Self::new(text);
    }

    pub fn text(&self) -> &RaceText {
        &self.text
    }

    pub fn cursor(&self) -> &TypingCursor {
        &self.cursor
    }

    pub fn typed_total(&self) -> usize {
        self.progress.typed_total()
    }

    pub fn progress_ratio(&self) -> f64 {
        self.progress.ratio()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Current line and the one after it; missing lines are empty.
    pub fn visible_lines(&self) -> [&str; 2] {
        let line = self.cursor.line_index;
        [
            self.text.line(line).unwrap_or(""),
            self.text.line(line + 1).unwrap_or(""),
        ]
    }

    /// Characters of the active word, each marked correct when the typed
    /// character at the same position matches it.
    pub fn word_marks(&self) -> Vec<(char, CharMark)> {
        let target = self.target_word();
        let typed: Vec<char> = self.cursor.typed_in_word.chars().collect();
        target
            .chars()
            .enumerate()
            .map(|(i, c)| match typed.get(i) {
                Some(t) if *t == c => (c, CharMark::Correct),
                _ => (c, CharMark::Pending),
            })
            .collect()
    }

    pub fn apply_input_value(&mut self, new_value: &str) -> InputOutcome {
        if self.completed {
            return self.reject();
        }
        match classify_edit(&self.value, new_value) {
            Edit::Unchanged => self.accept(new_value, Vec::new()),
            Edit::Rejected => self.reject(),
            Edit::Deletion => self.delete(new_value),
            Edit::Addition(' ') => self.finalize_word(new_value),
            Edit::Addition(c) => self.push_char(c, new_value),
        }
    }

    fn target_word(&self) -> &str {
        self.text
            .word(self.cursor.line_index, self.cursor.word_index)
            .unwrap_or("")
    }

    fn delete(&mut self, new_value: &str) -> InputOutcome {
        // never backtrack into a finalized word
        if self.cursor.typed_in_word.is_empty() {
            return self.reject();
        }
        let was_len = self.cursor.typed_len();
        self.cursor.typed_in_word.pop();

        let mut events = Vec::new();
        if was_len == self.cursor.correct_prefix_len {
            self.cursor.correct_prefix_len -= 1;
            self.progress.decrement();
            events.push(TypingEvent::Progress(self.progress.ratio()));
        } else if was_len - 1 == self.cursor.correct_prefix_len {
            self.cursor.has_error_in_word = false;
        }
        self.accept(new_value, events)
    }

    fn finalize_word(&mut self, new_value: &str) -> InputOutcome {
        let word_count = self.text.words(self.cursor.line_index).len();
        let is_last_word = self.cursor.word_index + 1 >= word_count;
        let target = self.target_word();
        let fully_correct =
            self.cursor.typed_in_word == target && !self.cursor.has_error_in_word;

        if !is_last_word {
            if !(fully_correct || target.is_empty()) {
                return self.reject();
            }
            self.progress.increment();
            self.cursor.next_word();
            let events = vec![TypingEvent::Progress(self.progress.ratio())];
            return self.accept(new_value, events);
        }

        if !fully_correct {
            return self.reject();
        }
        // lines carry no trailing space, so the separator is not counted
        self.cursor.next_line();
        let mut events = Vec::new();
        if self.cursor.line_index >= self.text.line_count() {
            self.completed = true;
            events.push(TypingEvent::Complete);
        }
        self.accept("", events)
    }

    fn push_char(&mut self, c: char, new_value: &str) -> InputOutcome {
        let pos = self.cursor.typed_len();
        let expected = self.target_word().chars().nth(pos);
        self.cursor.typed_in_word.push(c);

        let mut events = Vec::new();
        match expected {
            Some(e) if e == c && !self.cursor.has_error_in_word => {
                self.cursor.correct_prefix_len = pos + 1;
                self.progress.increment();
                events.push(TypingEvent::Progress(self.progress.ratio()));
            }
            // mismatch, overflow past the word, or an earlier error
            _ => self.cursor.has_error_in_word = true,
        }
        self.accept(new_value, events)
    }

    fn accept(&mut self, value: &str, events: Vec<TypingEvent>) -> InputOutcome {
        self.value = value.to_string();
        InputOutcome {
            accepted: true,
            value: self.value.clone(),
            events,
        }
    }

    fn reject(&self) -> InputOutcome {
        InputOutcome {
            accepted: false,
            value: self.value.clone(),
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Types `input` one character at a time, as a text box would report it.
    fn type_str(engine: &mut TypingEngine, input: &str) -> Vec<InputOutcome> {
        input
            .chars()
            .map(|c| {
                let next = format!("{}{}", engine.value(), c);
                engine.apply_input_value(&next)
            })
            .collect()
    }

    fn backspace(engine: &mut TypingEngine) -> InputOutcome {
        let mut next = engine.value().to_string();
        next.pop();
        engine.apply_input_value(&next)
    }

    fn completions(outcomes: &[InputOutcome]) -> usize {
        outcomes
            .iter()
            .flat_map(|o| &o.events)
            .filter(|e| **e == TypingEvent::Complete)
            .count()
    }

    #[test]
    fn test_classify_edit() {
        assert_eq!(classify_edit("ab", "abc"), Edit::Addition('c'));
        assert_eq!(classify_edit("abc", "ab"), Edit::Deletion);
        assert_eq!(classify_edit("ab", "ab"), Edit::Unchanged);
        assert_eq!(classify_edit("ab", "abcd"), Edit::Rejected);
        assert_eq!(classify_edit("ab", "xb"), Edit::Rejected);
        assert_eq!(classify_edit("abc", "ac"), Edit::Rejected);
        assert_eq!(classify_edit("h", "hé"), Edit::Addition('é'));
    }

    #[test]
    fn test_full_text_reaches_total_and_completes_once() {
        let text = "the quick fox\njumps over\nit";
        let mut engine = TypingEngine::new(text);
        let mut outcomes = Vec::new();
        for line in text.split('\n') {
            outcomes.extend(type_str(&mut engine, line));
            outcomes.extend(type_str(&mut engine, " "));
        }
        assert!(outcomes.iter().all(|o| o.accepted));
        assert_eq!(engine.typed_total(), engine.text().total_chars());
        assert_eq!(engine.progress_ratio(), 1.0);
        assert_eq!(completions(&outcomes), 1);
        assert!(engine.is_complete());

        // a finished engine ignores further input
        let after = engine.apply_input_value("x");
        assert!(!after.accepted);
        assert!(after.events.is_empty());
    }

    #[test]
    fn test_progress_monotonic_when_typing_forward() {
        let mut engine = TypingEngine::new("abc def");
        let outcomes = type_str(&mut engine, "abc def");
        let ratios: Vec<f64> = outcomes
            .iter()
            .flat_map(|o| &o.events)
            .filter_map(|e| match e {
                TypingEvent::Progress(r) => Some(*r),
                TypingEvent::Complete => None,
            })
            .collect();
        assert_eq!(ratios.len(), 7);
        assert!(ratios.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(engine.typed_total(), 7);
    }

    #[test]
    fn test_backspace_removes_one_counted_char() {
        let mut engine = TypingEngine::new("abcd");
        type_str(&mut engine, "abc");
        let before = engine.progress_ratio();
        let outcome = backspace(&mut engine);
        assert!(outcome.accepted);
        assert_eq!(outcome.value, "ab");
        assert_eq!(engine.cursor().correct_prefix_len, 2);
        match outcome.events.as_slice() {
            [TypingEvent::Progress(r)] => assert!((before - r - 0.25).abs() < 1e-12),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_one_error_poisons_the_rest_of_the_word() {
        let mut engine = TypingEngine::new("abcd");
        type_str(&mut engine, "a");
        // 'x' is wrong; 'c' and 'd' then match positionally but are not counted
        let outcomes = type_str(&mut engine, "xcd");
        assert!(outcomes.iter().all(|o| o.accepted && o.events.is_empty()));
        assert_eq!(engine.typed_total(), 1);
        assert!(engine.cursor().has_error_in_word);
        assert_eq!(engine.value(), "axcd");
    }

    #[test]
    fn test_erasing_error_tail_clears_flag_and_resumes_count() {
        let mut engine = TypingEngine::new("abcd");
        type_str(&mut engine, "abx");
        assert!(engine.cursor().has_error_in_word);
        let outcome = backspace(&mut engine);
        assert!(outcome.events.is_empty());
        assert!(!engine.cursor().has_error_in_word);
        assert_eq!(engine.typed_total(), 2);

        type_str(&mut engine, "cd");
        assert_eq!(engine.typed_total(), 4);
    }

    #[test]
    fn test_error_flag_stays_while_tail_remains() {
        let mut engine = TypingEngine::new("abcd");
        type_str(&mut engine, "axy");
        backspace(&mut engine);
        assert!(engine.cursor().has_error_in_word);
        backspace(&mut engine);
        assert!(!engine.cursor().has_error_in_word);
        assert_eq!(engine.cursor().correct_prefix_len, 1);
    }

    #[test]
    fn test_overflow_marks_error_without_counting() {
        let mut engine = TypingEngine::new("ab cd");
        type_str(&mut engine, "abz");
        assert_eq!(engine.typed_total(), 2);
        assert!(engine.cursor().has_error_in_word);
        let space = type_str(&mut engine, " ");
        assert!(!space[0].accepted);
        assert_eq!(space[0].value, "abz");
    }

    #[test]
    fn test_wrong_last_word_keeps_line() {
        let mut engine = TypingEngine::new("ab cd\nef");
        type_str(&mut engine, "ab cx");
        let space = type_str(&mut engine, " ");
        assert!(!space[0].accepted);
        assert!(space[0].events.is_empty());
        assert_eq!(space[0].value, "ab cx");
        assert_eq!(engine.value(), "ab cx");
        assert_eq!(engine.cursor().line_index, 0);
        assert_eq!(engine.cursor().word_index, 1);
        assert_eq!(engine.typed_total(), 4);
    }

    #[test]
    fn test_rejected_edits_leave_value_unchanged() {
        let mut engine = TypingEngine::new("hello world");
        type_str(&mut engine, "hel");

        let paste = engine.apply_input_value("hello");
        assert!(!paste.accepted);
        assert_eq!(paste.value, "hel");

        let middle = engine.apply_input_value("hxl");
        assert!(!middle.accepted);
        assert_eq!(middle.value, "hel");

        let early_space = type_str(&mut engine, " ");
        assert!(!early_space[0].accepted);
        assert_eq!(engine.value(), "hel");
        assert_eq!(engine.typed_total(), 3);
    }

    #[test]
    fn test_backspace_past_word_start_rejected() {
        let mut engine = TypingEngine::new("ab cd");
        type_str(&mut engine, "ab ");
        assert_eq!(engine.cursor().word_index, 1);
        let outcome = backspace(&mut engine);
        assert!(!outcome.accepted);
        assert_eq!(outcome.value, "ab ");
        assert_eq!(engine.typed_total(), 3);
    }

    #[test]
    fn test_space_counts_separator_but_not_line_end() {
        let mut engine = TypingEngine::new("ab\ncd");
        type_str(&mut engine, "ab");
        let line_end = type_str(&mut engine, " ");
        assert!(line_end[0].accepted);
        assert!(line_end[0].events.is_empty());
        assert_eq!(line_end[0].value, "");
        assert_eq!(engine.typed_total(), 2);
        assert_eq!(engine.cursor().line_index, 1);
        assert_eq!(engine.visible_lines(), ["cd", ""]);
    }

    #[test]
    fn test_empty_target_word_accepts_space() {
        let mut engine = TypingEngine::new("a  b");
        type_str(&mut engine, "a");
        let outcomes = type_str(&mut engine, "  b");
        assert!(outcomes.iter().all(|o| o.accepted));
        assert_eq!(engine.typed_total(), 4);
    }

    #[test]
    fn test_word_marks_highlight_matching_chars() {
        let mut engine = TypingEngine::new("abc");
        type_str(&mut engine, "ax");
        assert_eq!(
            engine.word_marks(),
            vec![
                ('a', CharMark::Correct),
                ('b', CharMark::Pending),
                ('c', CharMark::Pending),
            ]
        );
    }

    #[test]
    fn test_configure_resets_state() {
        let mut engine = TypingEngine::new("abc");
        type_str(&mut engine, "ab");
        engine.configure("xyz");
        assert_eq!(engine.typed_total(), 0);
        assert_eq!(engine.value(), "");
        assert_eq!(engine.cursor(), &TypingCursor::default());
    }
}
