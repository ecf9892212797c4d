/// Multi-line passages for typing races. Lines are separated by `\n`; the
/// line break itself is never typed.
pub const PASSAGES: &[&str] = &[
    "The quick brown fox jumps over the lazy dog.\nThis pangram contains every letter of the alphabet at least once.\nPractice it until your fingers find the keys without looking.",
    "It was the best of times, it was the worst of times,\nit was the age of wisdom, it was the age of foolishness,\nit was the epoch of belief, it was the epoch of incredulity.",
    "All happy families are alike; each unhappy family is unhappy in its own way.\nEverything was in confusion in the house of the Oblonskys.",
    "Programming is not about typing, it's about thinking.\nThe keyboard is just the interface between your thoughts and the computer.\nStill, a fast typist loses fewer thoughts on the way.",
    "Rust empowers everyone to build reliable and efficient software.\nIt prevents whole classes of memory bugs at compile time\nand makes fearless concurrency an everyday tool.",
    "lorem ipsum dolor sit amet consectetur adipiscing elit\nsed do eiusmod tempor incididunt ut labore et dolore magna aliqua\nut enim ad minim veniam quis nostrud exercitation ullamco laboris",
];

/// Pick a passage from a caller-supplied seed (for example the current time
/// in milliseconds).
pub fn passage_for_seed(seed: u64) -> &'static str {
    PASSAGES[(seed % PASSAGES.len() as u64) as usize]
}

/// Get passage by index (for deterministic testing)
pub fn get_passage_by_index(index: usize) -> Option<&'static str> {
    PASSAGES.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::RaceText;

    #[test]
    fn test_passages_not_empty() {
        assert!(!PASSAGES.is_empty());
        assert!(PASSAGES.len() >= 5);
    }

    #[test]
    fn test_get_passage_by_index() {
        assert!(get_passage_by_index(0).is_some());
        assert!(get_passage_by_index(PASSAGES.len()).is_none());
    }

    #[test]
    fn test_seeded_passage_wraps() {
        assert_eq!(passage_for_seed(0), PASSAGES[0]);
        assert_eq!(passage_for_seed(PASSAGES.len() as u64 + 1), PASSAGES[1]);
    }

    #[test]
    fn test_passages_have_no_blank_lines() {
        for passage in PASSAGES {
            let text = RaceText::new(passage);
            assert!(text.line_count() >= 2);
            assert!(text.lines().iter().all(|line| !line.is_empty()));
        }
    }
}
