/// Immutable race text: lines of space-separated words.
///
/// `total_chars` counts every character of every line. The line breaks are
/// not part of the budget, so a fully typed text scores exactly
/// `total_chars`.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceText {
    lines: Vec<String>,
    words: Vec<Vec<String>>,
    total_chars: usize,
}

impl RaceText {
    pub fn new(text: &str) -> Self {
        let lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        let words = lines
            .iter()
            .map(|line| line.split(' ').map(str::to_string).collect())
            .collect();
        let total_chars = lines.iter().map(|line| line.chars().count()).sum();
        Self {
            lines,
            words,
            total_chars,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Words of a line. A line always has at least one (possibly empty) word.
    pub fn words(&self, line: usize) -> &[String] {
        self.words.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn word(&self, line: usize, word: usize) -> Option<&str> {
        self.words(line).get(word).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_chars_excludes_line_breaks() {
        let text = RaceText::new("ab cd\nef");
        assert_eq!(text.total_chars(), 7);
        assert_eq!(text.line_count(), 2);
        assert_eq!(text.words(0), ["ab", "cd"]);
        assert_eq!(text.words(1), ["ef"]);
    }

    #[test]
    fn test_crlf_is_a_line_break() {
        let text = RaceText::new("one two\r\nthree");
        assert_eq!(text.line(0), Some("one two"));
        assert_eq!(text.total_chars(), "one two".len() + "three".len());
    }

    #[test]
    fn test_double_space_yields_empty_word() {
        let text = RaceText::new("a  b");
        assert_eq!(text.words(0), ["a", "", "b"]);
        assert_eq!(text.total_chars(), 4);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = RaceText::new("héllo wörld");
        assert_eq!(text.total_chars(), 11);
    }

    #[test]
    fn test_out_of_range_lookups() {
        let text = RaceText::new("x");
        assert!(text.words(3).is_empty());
        assert_eq!(text.word(0, 1), None);
        assert_eq!(text.line(1), None);
    }
}
