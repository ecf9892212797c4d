//! Ordering and selection of leaderboard entries.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::protocol::ScoreEntry;

pub const DEFAULT_LIMIT: i64 = 10;

/// Two CPS values closer than this identify the same result when placing.
pub const PLACEMENT_TOLERANCE: f64 = 1e-6;

const SAME_CPS: f64 = 1e-9;

/// How a leaderboard listing is shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighscoreQuery {
    /// `<= 0` returns every entry.
    pub limit: i64,
    /// Keep only the best entry per player.
    pub unique_email: bool,
}

impl Default for HighscoreQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            unique_email: false,
        }
    }
}

impl HighscoreQuery {
    /// Build from raw query-string values. Non-numeric limits fall back to
    /// the default; fractional ones are truncated.
    pub fn from_params(limit: Option<&str>, unique_email: Option<&str>) -> Self {
        let limit = limit
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .map(|n| n.trunc() as i64)
            .unwrap_or(DEFAULT_LIMIT);
        let unique_email = matches!(unique_email, Some("1") | Some("true"));
        Self {
            limit,
            unique_email,
        }
    }

    pub fn to_query_string(&self) -> String {
        let mut qs = format!("limit={}", self.limit);
        if self.unique_email {
            qs.push_str("&uniqueEmail=1");
        }
        qs
    }
}

/// Highest CPS first; equal CPS keeps the earlier score first.
pub fn compare_scores(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    b.cps
        .total_cmp(&a.cps)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

pub fn sort_scores(scores: &mut [ScoreEntry]) {
    scores.sort_by(compare_scores);
}

/// Grouping key of a player: trimmed lowercase email, or the name when the
/// email is absent or blank.
pub fn player_key(entry: &ScoreEntry) -> String {
    match entry.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_lowercase(),
        _ => format!("name:{}", entry.name.trim().to_lowercase()),
    }
}

fn is_better(candidate: &ScoreEntry, current: &ScoreEntry) -> bool {
    candidate.cps > current.cps
        || ((candidate.cps - current.cps).abs() < SAME_CPS && candidate.timestamp < current.timestamp)
}

/// Best entry per player, in no particular order.
pub fn unique_best_by_email(scores: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, ScoreEntry> = HashMap::new();
    for entry in scores {
        let key = player_key(&entry);
        let replace = match best.get(&key) {
            Some(current) => is_better(&entry, current),
            None => {
                order.push(key.clone());
                true
            }
        };
        if replace {
            best.insert(key, entry);
        }
    }
    order
        .into_iter()
        .filter_map(|key| best.remove(&key))
        .collect()
}

/// Apply dedup, ordering and truncation.
pub fn rank(scores: Vec<ScoreEntry>, query: &HighscoreQuery) -> Vec<ScoreEntry> {
    let mut list = if query.unique_email {
        unique_best_by_email(scores)
    } else {
        scores
    };
    sort_scores(&mut list);
    if query.limit > 0 {
        list.truncate(query.limit as usize);
    }
    list
}

pub fn top(scores: &[ScoreEntry]) -> Option<&ScoreEntry> {
    scores.iter().min_by(|a, b| compare_scores(a, b))
}

fn same_result(entry_name: &str, entry_cps: f64, name: &str, cps: f64) -> bool {
    entry_name == name && (entry_cps - cps).abs() < PLACEMENT_TOLERANCE
}

/// Whether `entry` is the local result placement would match.
pub fn is_own_result(entry: &ScoreEntry, name: &str, cps: f64) -> bool {
    same_result(&entry.name, entry.cps, name, cps)
}

/// 1-based rank of a local result within a leaderboard snapshot.
///
/// The result is added as a candidate unless an entry with the same name
/// and CPS is already listed (the submission may or may not have landed
/// before the snapshot was taken).
pub fn placement(snapshot: &[ScoreEntry], name: &str, cps: f64) -> Option<usize> {
    let matches = |entry_name: &str, entry_cps: f64| same_result(entry_name, entry_cps, name, cps);
    let mut field: Vec<(&str, f64)> = snapshot
        .iter()
        .map(|entry| (entry.name.as_str(), entry.cps))
        .collect();
    if !field.iter().any(|(n, c)| matches(*n, *c)) {
        field.push((name, cps));
    }
    field.sort_by(|a, b| b.1.total_cmp(&a.1));
    field
        .iter()
        .position(|(n, c)| matches(*n, *c))
        .map(|index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(name: &str, email: Option<&str>, cps: f64, offset_secs: i64) -> ScoreEntry {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ScoreEntry {
            id: format!("{name}-{offset_secs}"),
            name: name.to_string(),
            email: email.map(str::to_string),
            cps,
            chars_typed: (cps * 60.0).round() as u64,
            duration_seconds: 60,
            duration_ms: 60_000,
            accuracy: None,
            timestamp: base + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_sort_desc_with_earlier_first_on_tie() {
        let mut scores = vec![
            entry("late", None, 4.0, 20),
            entry("fast", None, 6.0, 30),
            entry("early", None, 4.0, 10),
        ];
        sort_scores(&mut scores);
        let names: Vec<&str> = scores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["fast", "early", "late"]);
    }

    #[test]
    fn test_default_limit_keeps_top_ten() {
        let scores: Vec<ScoreEntry> = (0..12)
            .map(|i| {
                let chars = 100 + i * 10;
                entry(&format!("P{i}"), None, chars as f64 / 60.0, i)
            })
            .collect();
        let ranked = rank(scores, &HighscoreQuery::default());
        assert_eq!(ranked.len(), 10);
        assert!(ranked.windows(2).all(|w| w[0].cps >= w[1].cps));
        assert_eq!(ranked[0].name, "P11");
    }

    #[test]
    fn test_non_positive_limit_disables_truncation() {
        let scores: Vec<ScoreEntry> = (0..15).map(|i| entry("x", None, i as f64, i)).collect();
        let query = HighscoreQuery {
            limit: 0,
            unique_email: false,
        };
        assert_eq!(rank(scores.clone(), &query).len(), 15);
        let query = HighscoreQuery {
            limit: -1,
            unique_email: false,
        };
        assert_eq!(rank(scores, &query).len(), 15);
    }

    #[test]
    fn test_unique_email_keeps_best() {
        let scores = vec![
            entry("Ann", Some("ann@example.com"), 4.0, 0),
            entry("Ann again", Some(" ANN@example.com "), 6.0, 5),
            entry("Bob", Some("bob@example.com"), 5.0, 1),
        ];
        let query = HighscoreQuery {
            limit: 10,
            unique_email: true,
        };
        let ranked = rank(scores, &query);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].cps, 6.0);
        assert_eq!(ranked[1].name, "Bob");
    }

    #[test]
    fn test_unique_falls_back_to_name_and_prefers_earlier_tie() {
        let scores = vec![
            entry("Cat", None, 3.0, 50),
            entry("cat ", Some(""), 3.0, 10),
        ];
        let best = unique_best_by_email(scores);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].id, "cat -10");
    }

    #[test]
    fn test_query_params() {
        assert_eq!(HighscoreQuery::from_params(None, None), HighscoreQuery::default());
        let q = HighscoreQuery::from_params(Some("3"), Some("1"));
        assert_eq!(q.limit, 3);
        assert!(q.unique_email);
        assert_eq!(HighscoreQuery::from_params(Some("abc"), Some("true")).limit, 10);
        assert_eq!(HighscoreQuery::from_params(Some("0"), Some("yes")).limit, 0);
        assert!(!HighscoreQuery::from_params(None, Some("yes")).unique_email);
        assert_eq!(q.to_query_string(), "limit=3&uniqueEmail=1");
    }

    #[test]
    fn test_top_is_first_in_sort_order() {
        let scores = vec![entry("a", None, 3.0, 0), entry("b", None, 5.0, 0)];
        assert_eq!(top(&scores).map(|s| s.name.as_str()), Some("b"));
        assert!(top(&[]).is_none());
    }

    #[test]
    fn test_placement_inserts_missing_candidate() {
        let snapshot = vec![entry("a", None, 6.0, 0), entry("b", None, 4.0, 0)];
        assert_eq!(placement(&snapshot, "me", 5.0), Some(2));
        assert_eq!(placement(&snapshot, "me", 1.0), Some(3));
        assert_eq!(placement(&[], "me", 1.0), Some(1));
    }

    #[test]
    fn test_placement_uses_existing_entry() {
        let snapshot = vec![
            entry("a", None, 6.0, 0),
            entry("me", None, 5.0, 0),
            entry("b", None, 4.0, 0),
        ];
        assert_eq!(placement(&snapshot, "me", 5.0 + 1e-8), Some(2));
    }

    #[test]
    fn test_placement_unavailable_for_nan() {
        assert_eq!(placement(&[], "me", f64::NAN), None);
    }

    #[test]
    fn test_own_result_matches_name_and_cps() {
        let mine = entry("me", None, 5.0, 0);
        assert!(is_own_result(&mine, "me", 5.0 + 1e-8));
        assert!(!is_own_result(&mine, "me", 5.01));
        assert!(!is_own_result(&mine, "Me", 5.0));
    }
}
